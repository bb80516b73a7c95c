#![forbid(unsafe_code)]

//! Dynamic property values.
//!
//! [`Value`] is the payload stored per (instance, property). It mirrors the
//! JSON data model with one addition, [`Value::Translatable`], for text that
//! is re-rendered whenever the translator changes. Mapping and sequence
//! payloads stay plain JSON; translatables only appear at property level.

use serde_json::{Map as JsonMap, Number, Value as JsonValue};

use propwire_i18n::{Factor, TextValue, Translatable};

/// A property value.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Translatable(Translatable),
    List(Vec<JsonValue>),
    Map(JsonMap<String, JsonValue>),
}

impl Value {
    /// Short type name used in error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Translatable(_) => "translatable",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    /// Convert a JSON value.
    ///
    /// Returns `None` for numbers outside both `i64` and `f64`
    /// representation (unsigned integers above `i64::MAX`).
    #[must_use]
    pub fn from_json(json: JsonValue) -> Option<Self> {
        Some(match json {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(b) => Self::Bool(b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else if n.is_f64() {
                    Self::Float(n.as_f64()?)
                } else {
                    return None;
                }
            }
            JsonValue::String(s) => Self::Text(s),
            JsonValue::Array(items) => Self::List(items),
            JsonValue::Object(map) => Self::Map(map),
        })
    }

    /// Convert to JSON, with `render` supplying the display text of a
    /// translatable. Non-finite floats become `null`.
    pub fn to_json_with(&self, render: impl FnOnce(&Translatable) -> String) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::Bool(b) => JsonValue::Bool(*b),
            Self::Int(i) => JsonValue::Number((*i).into()),
            Self::Float(f) => Number::from_f64(*f).map_or(JsonValue::Null, JsonValue::Number),
            Self::Text(s) => JsonValue::String(s.clone()),
            Self::Translatable(t) => JsonValue::String(render(t)),
            Self::List(items) => JsonValue::Array(items.clone()),
            Self::Map(map) => JsonValue::Object(map.clone()),
        }
    }

    /// The text content, if this is a text or translatable value.
    #[must_use]
    pub fn as_text_value(&self) -> Option<TextValue> {
        match self {
            Self::Text(s) => Some(TextValue::Plain(s.clone())),
            Self::Translatable(t) => Some(TextValue::Translatable(t.clone())),
            _ => None,
        }
    }

    /// The translatable, if any.
    #[must_use]
    pub fn as_translatable(&self) -> Option<&Translatable> {
        match self {
            Self::Translatable(t) => Some(t),
            _ => None,
        }
    }

    /// The mapping payload, if any.
    #[must_use]
    pub fn as_map(&self) -> Option<&JsonMap<String, JsonValue>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Whether this is text or a translatable.
    #[must_use]
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text(_) | Self::Translatable(_))
    }

    /// Equality that compares numbers by value, so `Int(1)` matches
    /// `Float(1.0)`, including inside lists and maps. Translatables compare
    /// structurally.
    #[must_use]
    pub fn equivalent(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int(i), Self::Float(f)) | (Self::Float(f), Self::Int(i)) => {
                int_matches_float(*i, *f)
            }
            (Self::List(a), Self::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| json_equivalent(x, y))
            }
            (Self::Map(a), Self::Map(b)) => maps_equivalent(a, b),
            _ => self == other,
        }
    }
}

/// JSON equality with numbers compared by value (`1` matches `1.0`).
#[must_use]
pub fn json_equivalent(a: &JsonValue, b: &JsonValue) -> bool {
    match (a, b) {
        (JsonValue::Number(x), JsonValue::Number(y)) => numbers_equivalent(x, y),
        (JsonValue::Array(x), JsonValue::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| json_equivalent(l, r))
        }
        (JsonValue::Object(x), JsonValue::Object(y)) => maps_equivalent(x, y),
        _ => a == b,
    }
}

/// [`json_equivalent`] over two objects. Key order is ignored.
#[must_use]
pub fn maps_equivalent(a: &JsonMap<String, JsonValue>, b: &JsonMap<String, JsonValue>) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .all(|(key, value)| b.get(key).is_some_and(|other| json_equivalent(value, other)))
}

fn numbers_equivalent(a: &Number, b: &Number) -> bool {
    if a.is_f64() || b.is_f64() {
        match (a.as_i64(), b.as_i64(), a.as_f64(), b.as_f64()) {
            (Some(i), None, _, Some(f)) | (None, Some(i), Some(f), _) => int_matches_float(i, f),
            (_, _, Some(x), Some(y)) => x == y,
            _ => false,
        }
    } else {
        a == b
    }
}

// Exact: the float must be integral and within i64 range.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn int_matches_float(i: i64, f: f64) -> bool {
    f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 && f as i64 == i
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Translatable> for Value {
    fn from(t: Translatable) -> Self {
        Self::Translatable(t)
    }
}

impl From<TextValue> for Value {
    fn from(text: TextValue) -> Self {
        match text {
            TextValue::Plain(s) => Self::Text(s),
            TextValue::Translatable(t) => Self::Translatable(t),
        }
    }
}

impl From<Vec<JsonValue>> for Value {
    fn from(items: Vec<JsonValue>) -> Self {
        Self::List(items)
    }
}

impl From<JsonMap<String, JsonValue>> for Value {
    fn from(map: JsonMap<String, JsonValue>) -> Self {
        Self::Map(map)
    }
}

impl From<&Value> for Factor {
    fn from(value: &Value) -> Self {
        match value {
            Value::Bool(b) => Factor::Bool(*b),
            Value::Int(i) => Factor::Integer(*i),
            other => Factor::Unsupported(other.type_name().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_scalars_convert() {
        assert_eq!(Value::from_json(json!(null)), Some(Value::Null));
        assert_eq!(Value::from_json(json!(true)), Some(Value::Bool(true)));
        assert_eq!(Value::from_json(json!(-3)), Some(Value::Int(-3)));
        assert_eq!(Value::from_json(json!(1.5)), Some(Value::Float(1.5)));
        assert_eq!(Value::from_json(json!("x")), Some(Value::Text("x".into())));
    }

    #[test]
    fn huge_unsigned_has_no_representation() {
        assert_eq!(Value::from_json(json!(u64::MAX)), None);
    }

    #[test]
    fn containers_stay_json() {
        let v = Value::from_json(json!({"a": [1, 2]})).unwrap();
        assert_eq!(v.type_name(), "map");
        assert_eq!(v.as_map().unwrap()["a"], json!([1, 2]));
    }

    #[test]
    fn to_json_renders_translatables() {
        let v = Value::Translatable(Translatable::new("hi"));
        assert_eq!(v.to_json_with(|t| t.source().to_uppercase()), json!("HI"));
        assert_eq!(Value::Float(f64::NAN).to_json_with(|_| String::new()), json!(null));
        assert_eq!(Value::Int(7).to_json_with(|_| String::new()), json!(7));
    }

    #[test]
    fn factor_from_value() {
        assert_eq!(Factor::from(&Value::Bool(false)), Factor::Bool(false));
        assert_eq!(Factor::from(&Value::Int(2)), Factor::Integer(2));
        assert_eq!(
            Factor::from(&Value::Text("x".into())),
            Factor::Unsupported("text".into())
        );
    }

    #[test]
    fn numbers_compare_by_value() {
        assert!(Value::Int(1).equivalent(&Value::Float(1.0)));
        assert!(Value::Float(-4.0).equivalent(&Value::Int(-4)));
        assert!(!Value::Int(1).equivalent(&Value::Float(1.5)));
        assert!(!Value::Int(i64::MAX).equivalent(&Value::Float(9.223_372_036_854_776e18)));
        assert!(!Value::Bool(true).equivalent(&Value::Int(1)));
        assert!(!Value::Float(f64::NAN).equivalent(&Value::Float(f64::NAN)));

        let ints = Value::from_json(json!({"a": [1, 2], "b": {"c": 3}})).unwrap();
        let floats = Value::from_json(json!({"b": {"c": 3.0}, "a": [1.0, 2]})).unwrap();
        assert!(ints.equivalent(&floats));
        let changed = Value::from_json(json!({"a": [1, 2], "b": {"c": 3.5}})).unwrap();
        assert!(!ints.equivalent(&changed));
        assert!(json_equivalent(&json!([0, "x"]), &json!([0.0, "x"])));
        assert!(!json_equivalent(&json!([0]), &json!([0, 0])));
    }

    #[test]
    fn multiply_by_property_value() {
        fn scaled(t: Translatable, factor: &Value) -> crate::Result<Value> {
            Ok(Value::from(t.multiply(factor)?))
        }
        let t = Translatable::new("ab");
        assert_eq!(scaled(t.clone(), &Value::Bool(false)).unwrap(), Value::Text(String::new()));
        assert_eq!(
            scaled(t.clone(), &Value::Bool(true)).unwrap(),
            Value::Translatable(t.clone())
        );
        let err = scaled(t, &Value::Float(1.5)).unwrap_err();
        assert_eq!(err.class(), crate::ErrorClass::Type);
    }
}
