#![forbid(unsafe_code)]

//! Shared property descriptors.
//!
//! A [`PropertyDescriptor`] is the per-(class, name) half of a property: its
//! kind and its default value. It never references instances; per-instance
//! value and callback state lives in the [`Dispatcher`](crate::Dispatcher)
//! arena and points back at the descriptor through an `Rc`.
//!
//! The default is owned by the descriptor and copied once at construction.
//! Every registration that does not bring its own default receives a fresh
//! clone, so two instances never share a mutable container default.

use std::fmt;

use crate::error::{PropertyError, Result};
use crate::value::Value;

/// Payload shape accepted by a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    /// Any value; typically null, booleans and numbers.
    Scalar,
    /// Plain text or a translatable.
    Text,
    /// A JSON object.
    Mapping,
    /// A JSON array.
    Sequence,
}

impl PropertyKind {
    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scalar => "scalar",
            Self::Text => "text",
            Self::Mapping => "mapping",
            Self::Sequence => "sequence",
        }
    }

    /// Whether a property of this kind may hold `value`.
    #[must_use]
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            Self::Scalar => true,
            Self::Text => value.is_text(),
            Self::Mapping => matches!(value, Value::Map(_)),
            Self::Sequence => matches!(value, Value::List(_)),
        }
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name, kind and default value of a property.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDescriptor {
    name: String,
    kind: PropertyKind,
    default: Value,
}

impl PropertyDescriptor {
    /// Create a descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`PropertyError::InvalidValue`] if `default` does not fit
    /// `kind` (for example a number for a text property).
    pub fn new(name: impl Into<String>, kind: PropertyKind, default: Value) -> Result<Self> {
        let descriptor = Self {
            name: name.into(),
            kind,
            default,
        };
        descriptor.validate(&descriptor.default)?;
        Ok(descriptor)
    }

    /// A scalar descriptor; scalars accept any value.
    pub fn scalar(name: impl Into<String>, default: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            kind: PropertyKind::Scalar,
            default: default.into(),
        }
    }

    /// A text descriptor.
    pub fn text(name: impl Into<String>, default: impl Into<propwire_i18n::TextValue>) -> Self {
        Self {
            name: name.into(),
            kind: PropertyKind::Text,
            default: Value::from(default.into()),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> PropertyKind {
        self.kind
    }

    /// The class-level default.
    #[must_use]
    pub fn default_value(&self) -> &Value {
        &self.default
    }

    /// Check that `value` fits this descriptor's kind.
    ///
    /// # Errors
    ///
    /// Returns [`PropertyError::InvalidValue`] on a shape mismatch.
    pub fn validate(&self, value: &Value) -> Result<()> {
        if self.kind.accepts(value) {
            Ok(())
        } else {
            Err(PropertyError::InvalidValue {
                name: self.name.clone(),
                expected: self.kind,
                found: value.type_name(),
            })
        }
    }
}
