#![forbid(unsafe_code)]

//! Localization layer for propwire.
//!
//! Provides the [`Translatable`] text value, which remembers its untranslated
//! source and concatenation history so it can be rendered again whenever the
//! active [`Translator`] changes, plus a [`StringCatalog`] backend with locale
//! fallback chains and the [`LocalizationConfig`] knobs shared by the property
//! layer.
//!
//! This crate has no notion of properties or observers; the re-render
//! protocol lives in `propwire-core`, which owns a translator and the set of
//! properties currently holding translatable values.

pub mod catalog;
pub mod config;
pub mod translatable;
pub mod translator;

use std::fmt;

pub use catalog::{Locale, LocaleStrings, StringCatalog};
pub use config::{JoinDirection, LocalizationConfig};
pub use translatable::{Factor, Fragment, TextValue, Translatable};
pub use translator::Translator;

/// Errors from i18n operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum I18nError {
    /// A locale string was malformed.
    InvalidLocale(String),
    /// Duplicate source string in the same locale.
    DuplicateEntry { locale: String, source: String },
    /// A translatable was multiplied by something other than a boolean or a
    /// non-negative integer.
    InvalidFactor(String),
}

impl fmt::Display for I18nError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidLocale(l) => write!(f, "invalid locale: {l}"),
            Self::DuplicateEntry { locale, source } => {
                write!(f, "duplicate entry '{source}' in locale '{locale}'")
            }
            Self::InvalidFactor(found) => {
                write!(f, "can't multiply translatable text by {found}")
            }
        }
    }
}

impl std::error::Error for I18nError {}
