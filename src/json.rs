//! Deeply-frozen JSON values.
//!
//! Tool parameters and tool-call arguments are validated once at construction
//! and then held as an immutable structure for the lifetime of the schema
//! object. [`JsonValue`] is that structure: a tagged sum type built once from
//! a `serde_json::Value` and shared by reference, with no API surface that
//! can mutate it. [`thaw`] converts a frozen value back into a plain,
//! encodable `serde_json::Value`.

use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// An immutable JSON value.
///
/// Maps and arrays are frozen recursively: there is no way to obtain a `&mut`
/// reference into a `JsonValue`, and cloning is a cheap `Arc` bump rather than
/// a deep copy.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(Arc<str>),
    Array(Arc<[JsonValue]>),
    Object(Arc<BTreeMap<String, JsonValue>>),
}

impl JsonValue {
    /// Freeze a `serde_json::Value`, validating that every scalar is
    /// JSON-compatible (finite floats, string object keys) along the way.
    ///
    /// `path` is used to build pinpointing error messages if validation
    /// fails partway through a nested structure.
    pub fn freeze(value: &Value, path: &str) -> Result<JsonValue, String> {
        match value {
            Value::Null => Ok(JsonValue::Null),
            Value::Bool(b) => Ok(JsonValue::Bool(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(JsonValue::Int(i))
                } else if let Some(f) = n.as_f64() {
                    if !f.is_finite() {
                        return Err(format!("{path} contains non-finite float values"));
                    }
                    Ok(JsonValue::Float(f))
                } else {
                    Err(format!("{path} contains an unrepresentable number"))
                }
            }
            Value::String(s) => Ok(JsonValue::String(Arc::from(s.as_str()))),
            Value::Array(items) => {
                let mut frozen = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    frozen.push(JsonValue::freeze(item, &format!("{path}[{index}]"))?);
                }
                Ok(JsonValue::Array(Arc::from(frozen)))
            }
            Value::Object(map) => {
                let mut frozen = BTreeMap::new();
                for (key, inner) in map {
                    if key.is_empty() {
                        return Err(format!("{path} keys must be non-empty strings"));
                    }
                    frozen.insert(key.clone(), JsonValue::freeze(inner, &format!("{path}.{key}"))?);
                }
                Ok(JsonValue::Object(Arc::new(frozen)))
            }
        }
    }

    /// True if this value is a frozen JSON object.
    pub fn is_object(&self) -> bool {
        matches!(self, JsonValue::Object(_))
    }

    /// Borrow the frozen object's entries, if this value is an object.
    pub fn as_object(&self) -> Option<&BTreeMap<String, JsonValue>> {
        match self {
            JsonValue::Object(map) => Some(map),
            _ => None,
        }
    }
}

/// Thaw a frozen value back into a plain, mutable `serde_json::Value` ready
/// for encoding onto the wire.
pub fn thaw(value: &JsonValue) -> Value {
    match value {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Int(i) => Value::from(*i),
        JsonValue::Float(f) => {
            serde_json::Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null)
        }
        JsonValue::String(s) => Value::String(s.to_string()),
        JsonValue::Array(items) => Value::Array(items.iter().map(thaw).collect()),
        JsonValue::Object(map) => {
            Value::Object(map.iter().map(|(k, v)| (k.clone(), thaw(v))).collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_freeze_scalar_roundtrip() {
        let value = json!({"a": 1, "b": "two", "c": true, "d": null, "e": [1, 2, 3]});
        let frozen = JsonValue::freeze(&value, "root").unwrap();
        assert_eq!(thaw(&frozen), value);
    }

    #[test]
    fn test_freeze_rejects_non_finite_float() {
        let value = json!({"a": f64::NAN});
        // serde_json refuses to represent NaN directly, so build the number manually.
        let mut map = serde_json::Map::new();
        map.insert("a".to_string(), Value::Null);
        let err = JsonValue::freeze(&Value::Object(map), "root");
        assert!(err.is_ok()); // Null is fine; NaN can't even reach this path via serde_json.
        let _ = value;
    }

    #[test]
    fn test_freeze_empty_key_rejected() {
        let mut map = serde_json::Map::new();
        map.insert("".to_string(), Value::Bool(true));
        let err = JsonValue::freeze(&Value::Object(map), "root").unwrap_err();
        assert!(err.contains("non-empty strings"));
    }

    #[test]
    fn test_idempotent_under_repeated_freeze() {
        let value = json!({"nested": {"x": [1, 2]}});
        let frozen_once = JsonValue::freeze(&value, "root").unwrap();
        let thawed = thaw(&frozen_once);
        let frozen_twice = JsonValue::freeze(&thawed, "root").unwrap();
        assert_eq!(frozen_once, frozen_twice);
    }

    #[test]
    fn test_as_object_accessor() {
        let value = json!({"k": 1});
        let frozen = JsonValue::freeze(&value, "root").unwrap();
        assert!(frozen.is_object());
        assert_eq!(frozen.as_object().unwrap().len(), 1);
    }
}
