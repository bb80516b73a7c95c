#![forbid(unsafe_code)]

//! Runtime shape of document values and the fixed shape → kind table.
//!
//! | Shape | Property kind |
//! |-------|---------------|
//! | object | `Mapping` |
//! | array | `Sequence` |
//! | bool, integer, float, null | `Scalar` |
//! | string | `Text` |
//!
//! Unsigned integers above `i64::MAX` have a shape but no table entry and
//! cannot be synthesized.

use serde_json::Value as JsonValue;

use propwire_core::{PropertyError, PropertyKind, Result, Value};

/// Shape of a JSON value as seen by the synthesizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Object,
    Array,
    Bool,
    Integer,
    /// Unsigned integer beyond the signed 64-bit range.
    WideUnsigned,
    Float,
    String,
    Null,
}

/// Shapes that map to a property kind.
pub const SHAPE_TABLE: [(Shape, PropertyKind); 7] = [
    (Shape::Object, PropertyKind::Mapping),
    (Shape::Array, PropertyKind::Sequence),
    (Shape::Bool, PropertyKind::Scalar),
    (Shape::Integer, PropertyKind::Scalar),
    (Shape::Float, PropertyKind::Scalar),
    (Shape::Null, PropertyKind::Scalar),
    (Shape::String, PropertyKind::Text),
];

impl Shape {
    #[must_use]
    pub fn of(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(_) => Self::Bool,
            JsonValue::Number(n) if n.is_i64() => Self::Integer,
            JsonValue::Number(n) if n.is_u64() => Self::WideUnsigned,
            JsonValue::Number(_) => Self::Float,
            JsonValue::String(_) => Self::String,
            JsonValue::Array(_) => Self::Array,
            JsonValue::Object(_) => Self::Object,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Object => "object",
            Self::Array => "array",
            Self::Bool => "bool",
            Self::Integer => "integer",
            Self::WideUnsigned => "unsigned integer beyond i64",
            Self::Float => "float",
            Self::String => "string",
            Self::Null => "null",
        }
    }

    /// The table entry for this shape.
    #[must_use]
    pub fn property_kind(self) -> Option<PropertyKind> {
        SHAPE_TABLE
            .iter()
            .find(|(shape, _)| *shape == self)
            .map(|(_, kind)| *kind)
    }
}

/// Property kind for the value under `key`.
///
/// # Errors
///
/// [`PropertyError::UnsupportedShape`] when the shape has no table entry.
pub fn kind_for(key: &str, value: &JsonValue) -> Result<PropertyKind> {
    let shape = Shape::of(value);
    shape
        .property_kind()
        .ok_or_else(|| unsupported(key, shape))
}

/// Convert the document value under `key` into a property value.
///
/// # Errors
///
/// [`PropertyError::UnsupportedShape`] when the value has no property
/// representation.
pub fn value_for(key: &str, value: &JsonValue) -> Result<Value> {
    Value::from_json(value.clone()).ok_or_else(|| unsupported(key, Shape::of(value)))
}

fn unsupported(key: &str, shape: Shape) -> PropertyError {
    PropertyError::UnsupportedShape {
        key: key.to_string(),
        shape: shape.as_str().to_string(),
    }
}
