#![forbid(unsafe_code)]

//! Swappable text → text translation functions.
//!
//! A [`Translator`] is a cheaply cloneable handle to a function from source
//! text to display text, tagged with a label for diagnostics. Three backends
//! are provided:
//!
//! - [`Translator::identity`]: returns the source unchanged (the default).
//! - [`Translator::debug_markers`]: wraps every string as `#text#` so that
//!   strings which bypassed translation stand out on screen.
//! - [`Translator::catalog`]: looks the source up in a [`StringCatalog`] for
//!   one locale, falling back to the source text.

use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use crate::catalog::StringCatalog;

type TranslateFn = Rc<dyn Fn(&str) -> String>;

/// A labelled translation function.
///
/// Cloning shares the underlying function.
#[derive(Clone)]
pub struct Translator {
    label: Cow<'static, str>,
    func: TranslateFn,
}

impl fmt::Debug for Translator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Translator")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

impl Default for Translator {
    fn default() -> Self {
        Self::identity()
    }
}

impl Translator {
    /// Wrap an arbitrary function.
    pub fn from_fn(label: impl Into<Cow<'static, str>>, func: impl Fn(&str) -> String + 'static) -> Self {
        Self {
            label: label.into(),
            func: Rc::new(func),
        }
    }

    /// The no-op translator.
    #[must_use]
    pub fn identity() -> Self {
        Self::from_fn("identity", str::to_string)
    }

    /// Debug translator: `#text#` for every string except a bare newline.
    #[must_use]
    pub fn debug_markers() -> Self {
        Self::from_fn("debug-markers", |s| {
            if s == "\n" {
                s.to_string()
            } else {
                format!("#{s}#")
            }
        })
    }

    /// Catalog-backed translator for `locale`.
    #[must_use]
    pub fn catalog(catalog: Arc<StringCatalog>, locale: impl Into<String>) -> Self {
        let locale = locale.into();
        let label = format!("catalog:{locale}");
        Self::from_fn(label, move |s| catalog.translate(&locale, s))
    }

    /// Translate one string.
    #[must_use]
    pub fn translate(&self, source: &str) -> String {
        (self.func)(source)
    }

    /// Diagnostic label (`identity`, `debug-markers`, `catalog:<locale>`, or
    /// the label given to [`from_fn`](Self::from_fn)).
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether both handles share the same function.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.func, &other.func)
    }
}
