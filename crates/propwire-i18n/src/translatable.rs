#![forbid(unsafe_code)]

//! Translatable text that can be rendered again under a new translator.
//!
//! # Design
//!
//! A [`Translatable`] keeps the untranslated `source` it was created from and
//! an ordered list of [`Fragment`]s appended to it. Rendering runs the source
//! and every [`Fragment::Translated`] piece through the active translator
//! while [`Fragment::Literal`] pieces (separators, numbers, user input) pass
//! through untouched:
//!
//! ```
//! use propwire_i18n::{JoinDirection, Translatable, Translator};
//!
//! let label = Translatable::new("Show Lines") + "\n" + Translatable::new("On");
//! let french = Translator::from_fn("fr", |s| match s {
//!     "Show Lines" => "Afficher les lignes".into(),
//!     "On" => "Activé".into(),
//!     other => other.into(),
//! });
//!
//! assert_eq!(
//!     label.render(&french, JoinDirection::LeftToRight),
//!     "Afficher les lignes\nActivé"
//! );
//! assert_eq!(label.untranslated(), "Show Lines\nOn");
//! ```
//!
//! Concatenation consumes the receiver and returns it, so `+=` keeps growing
//! a single value; there is never a second handle to observe the mutation.
//!
//! # Equality
//!
//! `==` is structural: two translatables are equal when source and fragments
//! match, and a translatable equals a plain string when its *source* equals
//! that string. Change detection uses [`differs_rendered`], which compares
//! the *rendered* forms under the current translator. The two are
//! deliberately different: a label re-tagged with the same source is the
//! same identity, while a label whose display text is unchanged must not
//! notify anyone.
//!
//! [`differs_rendered`]: Translatable::differs_rendered

use std::ops::{Add, AddAssign, Mul};

use crate::I18nError;
use crate::config::JoinDirection;
use crate::translator::Translator;

/// One appended piece of a compound translatable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Fragment {
    /// Emitted verbatim.
    Literal(String),
    /// Untranslated source text, run through the translator at render time.
    Translated(String),
}

impl Fragment {
    fn render(&self, translator: &Translator) -> String {
        match self {
            Self::Literal(text) => text.clone(),
            Self::Translated(source) => translator.translate(source),
        }
    }
}

/// Content of a text property: literal text or a translatable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TextValue {
    Plain(String),
    Translatable(Translatable),
}

impl TextValue {
    /// The empty plain string.
    #[must_use]
    pub fn empty() -> Self {
        Self::Plain(String::new())
    }

    /// Rendered display text.
    #[must_use]
    pub fn render(&self, translator: &Translator, direction: JoinDirection) -> String {
        match self {
            Self::Plain(text) => text.clone(),
            Self::Translatable(t) => t.render(translator, direction),
        }
    }

    /// The translatable, if any.
    #[must_use]
    pub fn as_translatable(&self) -> Option<&Translatable> {
        match self {
            Self::Plain(_) => None,
            Self::Translatable(t) => Some(t),
        }
    }
}

impl From<&str> for TextValue {
    fn from(text: &str) -> Self {
        Self::Plain(text.to_string())
    }
}

impl From<String> for TextValue {
    fn from(text: String) -> Self {
        Self::Plain(text)
    }
}

impl From<Translatable> for TextValue {
    fn from(t: Translatable) -> Self {
        Self::Translatable(t)
    }
}

impl From<&Translatable> for TextValue {
    fn from(t: &Translatable) -> Self {
        Self::Translatable(t.clone())
    }
}

/// Right-hand operand of [`Translatable::multiply`].
#[derive(Debug, Clone, PartialEq)]
pub enum Factor {
    /// Conditional inclusion.
    Bool(bool),
    /// Repetition count; must be non-negative.
    Integer(i64),
    /// Any other operand, described by its type name.
    Unsupported(String),
}

impl From<bool> for Factor {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Factor {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Factor {
    fn from(_: f64) -> Self {
        Self::Unsupported("float".to_string())
    }
}

/// Text tagged with its untranslated source and concatenation history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Translatable {
    source: String,
    fragments: Vec<Fragment>,
}

impl Translatable {
    /// Tag `source` as translatable.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            fragments: Vec::new(),
        }
    }

    /// Re-wrap an existing translatable: keeps its source, drops its
    /// fragments.
    #[must_use]
    pub fn rewrap(other: &Self) -> Self {
        Self::new(other.source.clone())
    }

    /// The untranslated source text.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Appended fragments, in append order.
    #[must_use]
    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// Whether anything has been appended.
    #[must_use]
    pub fn is_compound(&self) -> bool {
        !self.fragments.is_empty()
    }

    /// Append `other` in place.
    ///
    /// A translatable operand contributes its source as a translated fragment
    /// followed by its own fragments.
    pub fn push(&mut self, other: impl Into<TextValue>) {
        match other.into() {
            TextValue::Plain(text) => self.fragments.push(Fragment::Literal(text)),
            TextValue::Translatable(t) => {
                self.fragments.push(Fragment::Translated(t.source));
                self.fragments.extend(t.fragments);
            }
        }
    }

    /// Append `other` and return the accumulated value.
    #[must_use]
    pub fn append(mut self, other: impl Into<TextValue>) -> Self {
        self.push(other);
        self
    }

    /// Render under `translator`.
    #[must_use]
    pub fn render(&self, translator: &Translator, direction: JoinDirection) -> String {
        if self.fragments.is_empty() {
            return translator.translate(&self.source);
        }

        let mut parts = Vec::with_capacity(self.fragments.len() + 1);
        parts.push(translator.translate(&self.source));
        parts.extend(self.fragments.iter().map(|f| f.render(translator)));
        if direction == JoinDirection::RightToLeft {
            parts.reverse();
        }
        parts.concat()
    }

    /// Render with the identity translator, left to right.
    #[must_use]
    pub fn untranslated(&self) -> String {
        self.render(&Translator::identity(), JoinDirection::LeftToRight)
    }

    /// Whether the rendered forms of `self` and `other` differ.
    ///
    /// This is the change-detection comparison; `==` is the identity one.
    #[must_use]
    pub fn differs_rendered(
        &self,
        other: &TextValue,
        translator: &Translator,
        direction: JoinDirection,
    ) -> bool {
        self.render(translator, direction) != other.render(translator, direction)
    }

    /// `true` keeps the value, `false` yields empty plain text.
    #[must_use]
    pub fn include_if(self, condition: bool) -> TextValue {
        if condition {
            TextValue::Translatable(self)
        } else {
            TextValue::empty()
        }
    }

    /// Append `count` copies of the whole value (source and fragments).
    #[must_use]
    pub fn repeat(mut self, count: usize) -> Self {
        if count == 0 {
            return self;
        }
        let mut whole = Vec::with_capacity(self.fragments.len() + 1);
        whole.push(Fragment::Translated(self.source.clone()));
        whole.extend(self.fragments.iter().cloned());
        self.fragments.reserve(whole.len() * count);
        for _ in 0..count {
            self.fragments.extend(whole.iter().cloned());
        }
        self
    }

    /// Dynamic multiplication.
    ///
    /// # Errors
    ///
    /// Returns [`I18nError::InvalidFactor`] for negative integers and for any
    /// operand that is neither a boolean nor an integer.
    pub fn multiply(self, factor: impl Into<Factor>) -> Result<TextValue, I18nError> {
        match factor.into() {
            Factor::Bool(condition) => Ok(self.include_if(condition)),
            Factor::Integer(count) => usize::try_from(count)
                .map(|n| TextValue::Translatable(self.repeat(n)))
                .map_err(|_| I18nError::InvalidFactor(format!("negative integer {count}"))),
            Factor::Unsupported(kind) => Err(I18nError::InvalidFactor(kind)),
        }
    }

    /// Join `values` with `separator` into one translatable.
    ///
    /// The first value becomes the source (keeping its fragments when it is
    /// translatable); each later value is preceded by the separator. Joining
    /// nothing yields an empty translatable.
    pub fn join_all<S, I, V>(separator: S, values: I) -> Self
    where
        S: Into<TextValue>,
        I: IntoIterator<Item = V>,
        V: Into<TextValue>,
    {
        let separator = separator.into();
        let mut values = values.into_iter().map(Into::into);

        let mut joined = match values.next() {
            None => return Self::default(),
            Some(TextValue::Plain(text)) => Self::new(text),
            Some(TextValue::Translatable(t)) => t,
        };
        for value in values {
            joined.push(separator.clone());
            joined.push(value);
        }
        joined
    }
}

impl PartialEq<str> for Translatable {
    fn eq(&self, other: &str) -> bool {
        self.source == other
    }
}

impl PartialEq<&str> for Translatable {
    fn eq(&self, other: &&str) -> bool {
        self.source == *other
    }
}

impl PartialEq<String> for Translatable {
    fn eq(&self, other: &String) -> bool {
        &self.source == other
    }
}

impl<T: Into<TextValue>> Add<T> for Translatable {
    type Output = Self;

    fn add(self, rhs: T) -> Self {
        self.append(rhs)
    }
}

impl<T: Into<TextValue>> AddAssign<T> for Translatable {
    fn add_assign(&mut self, rhs: T) {
        self.push(rhs);
    }
}

impl Mul<bool> for Translatable {
    type Output = TextValue;

    fn mul(self, rhs: bool) -> TextValue {
        self.include_if(rhs)
    }
}

impl Mul<usize> for Translatable {
    type Output = Self;

    fn mul(self, rhs: usize) -> Self {
        self.repeat(rhs)
    }
}
