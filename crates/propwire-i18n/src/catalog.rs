#![forbid(unsafe_code)]

//! String catalog keyed by untranslated source text, with locale fallback.
//!
//! The catalog plays the role of a gettext message store: the lookup key is
//! the source string a [`Translatable`](crate::Translatable) was created
//! from, and the stored value is its translation for one locale.
//!
//! # Invariants
//!
//! 1. **Fallback chain terminates**: every lookup walks the chain exactly
//!    once, returning `None` if no locale provides the source.
//!
//! 2. **Requested locale first**: the requested locale is tried before the
//!    chain, and is skipped if it also appears in the chain.
//!
//! 3. **Immutable after construction**: a catalog wrapped in a translator is
//!    shared behind an `Arc` and never mutated.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Missing source | Not in any locale | `get` returns `None`, `translate` returns the source |
//! | Missing locale | Locale not loaded | Falls through chain |
//! | Empty catalog | No locales loaded | All lookups miss |

use std::collections::HashMap;

use tracing::debug;

use crate::I18nError;

/// Locale identifier (e.g., `"en"`, `"fr-CA"`).
pub type Locale = String;

/// Translations for a single locale, keyed by source text.
#[derive(Debug, Clone, Default)]
pub struct LocaleStrings {
    strings: HashMap<String, String>,
}

impl LocaleStrings {
    /// Create an empty locale string set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) the translation of `source`.
    pub fn insert(&mut self, source: impl Into<String>, translation: impl Into<String>) {
        self.strings.insert(source.into(), translation.into());
    }

    /// Insert the translation of `source`, refusing to overwrite an existing
    /// entry.
    ///
    /// # Errors
    ///
    /// Returns [`I18nError::DuplicateEntry`] if `source` is already present.
    pub fn try_insert(
        &mut self,
        locale: &str,
        source: impl Into<String>,
        translation: impl Into<String>,
    ) -> Result<(), I18nError> {
        let source = source.into();
        if self.strings.contains_key(&source) {
            return Err(I18nError::DuplicateEntry {
                locale: locale.to_string(),
                source,
            });
        }
        self.strings.insert(source, translation.into());
        Ok(())
    }

    /// Look up the translation of `source`.
    #[must_use]
    pub fn get(&self, source: &str) -> Option<&str> {
        self.strings.get(source).map(String::as_str)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Whether the locale has no strings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Iterate over all source strings in this locale.
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.strings.keys().map(String::as_str)
    }
}

impl<S, T> FromIterator<(S, T)> for LocaleStrings
where
    S: Into<String>,
    T: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (S, T)>>(iter: I) -> Self {
        let mut strings = Self::new();
        for (source, translation) in iter {
            strings.insert(source, translation);
        }
        strings
    }
}

/// Central message catalog with locale fallback.
///
/// # Example
///
/// ```
/// use propwire_i18n::catalog::{LocaleStrings, StringCatalog};
///
/// let mut catalog = StringCatalog::new();
/// catalog
///     .add_locale("fr", LocaleStrings::from_iter([("Open", "Ouvrir")]))
///     .unwrap();
/// catalog
///     .add_locale("en", LocaleStrings::from_iter([("Close", "Close")]))
///     .unwrap();
/// catalog.set_fallback_chain(vec!["en".into()]);
///
/// assert_eq!(catalog.get("fr", "Open"), Some("Ouvrir"));
/// assert_eq!(catalog.get("fr", "Close"), Some("Close"));
/// assert_eq!(catalog.translate("fr", "Save"), "Save");
/// ```
#[derive(Debug, Clone, Default)]
pub struct StringCatalog {
    locales: HashMap<Locale, LocaleStrings>,
    fallback_chain: Vec<Locale>,
}

impl StringCatalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add strings for a locale, replacing any previous set for that tag.
    ///
    /// # Errors
    ///
    /// Returns [`I18nError::InvalidLocale`] if the tag is empty or contains
    /// characters other than ASCII alphanumerics, `-` and `_`.
    pub fn add_locale(
        &mut self,
        locale: impl Into<String>,
        strings: LocaleStrings,
    ) -> Result<(), I18nError> {
        let locale = locale.into();
        validate_locale(&locale)?;
        debug!(locale = %locale, strings = strings.len(), "locale added to catalog");
        self.locales.insert(locale, strings);
        Ok(())
    }

    /// Set the fallback chain (tried in order when a source is missing).
    pub fn set_fallback_chain(&mut self, chain: Vec<Locale>) {
        self.fallback_chain = chain;
    }

    /// The configured fallback chain.
    #[must_use]
    pub fn fallback_chain(&self) -> &[Locale] {
        &self.fallback_chain
    }

    /// Look up the translation of `source` for `locale`.
    ///
    /// Tries the specified locale first, then walks the fallback chain.
    #[must_use]
    pub fn get(&self, locale: &str, source: &str) -> Option<&str> {
        if let Some(hit) = self.locales.get(locale).and_then(|ls| ls.get(source)) {
            return Some(hit);
        }

        self.fallback_chain
            .iter()
            .filter(|fallback| fallback.as_str() != locale)
            .find_map(|fallback| {
                self.locales
                    .get(fallback.as_str())
                    .and_then(|ls| ls.get(source))
            })
    }

    /// Translate `source`, returning it unchanged when no locale has it.
    #[must_use]
    pub fn translate(&self, locale: &str, source: &str) -> String {
        self.get(locale, source).unwrap_or(source).to_string()
    }

    /// All registered locale tags, sorted.
    #[must_use]
    pub fn locales(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.locales.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    /// Sources from `reference` with no translation for `locale` (after
    /// fallback), sorted and deduplicated.
    #[must_use]
    pub fn untranslated<'a>(&self, locale: &str, reference: &[&'a str]) -> Vec<&'a str> {
        let mut missing: Vec<&'a str> = reference
            .iter()
            .copied()
            .filter(|source| self.get(locale, source).is_none())
            .collect();
        missing.sort_unstable();
        missing.dedup();
        missing
    }
}

fn validate_locale(locale: &str) -> Result<(), I18nError> {
    let well_formed = !locale.is_empty()
        && locale
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if well_formed {
        Ok(())
    } else {
        Err(I18nError::InvalidLocale(locale.to_string()))
    }
}
