#![forbid(unsafe_code)]

//! Error type shared by the property layer and the document synthesizer.
//!
//! Every variant is a contract violation by the caller (or by a callback);
//! nothing here is transient and nothing is retried.

use std::fmt;

use propwire_i18n::I18nError;

use crate::descriptor::PropertyKind;
use crate::dispatcher::InstanceId;

/// Coarse classification matching the usual attribute / type / value /
/// lookup error families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Missing or undeletable attribute, stale instance.
    Attribute,
    /// Operation not supported for the operand or key.
    Type,
    /// Value of the wrong shape for a property.
    Value,
    /// Key or shape has no entry.
    Lookup,
}

/// Errors from property registration, access, dispatch, and synthesis.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyError {
    /// The instance handle is stale or was never issued by this dispatcher.
    UnknownInstance(InstanceId),
    /// The instance has no property with this name.
    UnknownProperty { name: String },
    /// A value of the wrong shape for the property's kind.
    InvalidValue {
        name: String,
        expected: PropertyKind,
        found: &'static str,
    },
    /// Re-registration with a different descriptor, default, or metadata.
    RegistrationConflict { name: String },
    /// Properties cannot be deleted.
    CannotDelete { name: String },
    /// A document value whose shape has no property kind.
    UnsupportedShape { key: String, shape: String },
    /// Indexed read of a key that is neither property, computed attribute,
    /// nor sub-object.
    NotFound { key: String },
    /// Indexed write to a key that is not backed by a property.
    NotAssignable { key: String },
    /// Indexed write to a computed attribute without a setter.
    ReadOnly { key: String },
    /// A write-through found its key missing from the backing document.
    MissingDocumentKey { key: String },
    /// A merge tried to recurse into a sub-object with a non-object value.
    NotMergeable { key: String, found: &'static str },
    /// Translatable text error.
    I18n(I18nError),
}

impl PropertyError {
    /// Error family of this error.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::UnknownInstance(_)
            | Self::UnknownProperty { .. }
            | Self::CannotDelete { .. }
            | Self::ReadOnly { .. }
            | Self::MissingDocumentKey { .. } => ErrorClass::Attribute,
            Self::NotAssignable { .. } | Self::NotMergeable { .. } | Self::I18n(_) => {
                ErrorClass::Type
            }
            Self::InvalidValue { .. } | Self::RegistrationConflict { .. } => ErrorClass::Value,
            Self::UnsupportedShape { .. } | Self::NotFound { .. } => ErrorClass::Lookup,
        }
    }
}

impl fmt::Display for PropertyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownInstance(id) => write!(f, "unknown or dropped instance {id}"),
            Self::UnknownProperty { name } => write!(f, "no property named '{name}'"),
            Self::InvalidValue {
                name,
                expected,
                found,
            } => write!(
                f,
                "property '{name}' accepts {} values, got {found}",
                expected.as_str()
            ),
            Self::RegistrationConflict { name } => {
                write!(f, "property '{name}' already registered with different metadata")
            }
            Self::CannotDelete { name } => write!(f, "cannot delete property '{name}'"),
            Self::UnsupportedShape { key, shape } => {
                write!(f, "no property kind for '{key}' of shape {shape}")
            }
            Self::NotFound { key } => write!(f, "key '{key}' not found"),
            Self::NotAssignable { key } => {
                write!(f, "cannot set '{key}' using item assignment")
            }
            Self::ReadOnly { key } => write!(f, "attribute '{key}' is read-only"),
            Self::MissingDocumentKey { key } => {
                write!(f, "attribute '{key}' is not found in the backing document")
            }
            Self::NotMergeable { key, found } => {
                write!(f, "cannot merge {found} into sub-object '{key}'")
            }
            Self::I18n(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for PropertyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::I18n(err) => Some(err),
            _ => None,
        }
    }
}

impl From<I18nError> for PropertyError {
    fn from(err: I18nError) -> Self {
        Self::I18n(err)
    }
}

/// Result alias for property operations.
pub type Result<T> = std::result::Result<T, PropertyError>;
