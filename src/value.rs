//! Canonical values shared by row decoding, request binding and response formatting.

use chrono::{DateTime, FixedOffset};
use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// Ordered object; keeps field declaration order in responses.
pub type Record = IndexMap<String, Value>;

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Timestamp(DateTime<FixedOffset>),
    /// Only produced for columns whose native type is a UUID.
    Uuid(uuid::Uuid),
    Object(Record),
    Array(Vec<Value>),
}

/// Largest integer an f64 represents exactly.
const MAX_EXACT_FLOAT: f64 = 9_007_199_254_740_992.0;

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// String form expected by the workflow client for ids, names and text.
    /// Null stays null; objects and arrays are stringified element-wise.
    pub fn stringify(&self) -> Value {
        match self {
            Value::Null => Value::Null,
            Value::Bool(b) => Value::String(b.to_string()),
            Value::Integer(n) => Value::String(n.to_string()),
            Value::Float(f) => Value::String(format!("{:.6}", f)),
            Value::String(s) => Value::String(s.clone()),
            Value::Timestamp(t) => Value::String(t.format("%Y-%m-%d %H:%M:%S%.f %z").to_string()),
            Value::Uuid(u) => Value::String(u.to_string()),
            Value::Object(map) => Value::Object(map.iter().map(|(k, v)| (k.clone(), v.stringify())).collect()),
            Value::Array(items) => Value::Array(items.iter().map(Value::stringify).collect()),
        }
    }

    /// Plain text form, used as a grouping key when assembling joined rows.
    pub fn to_text(&self) -> Option<String> {
        match self.stringify() {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn from_json(v: serde_json::Value) -> Value {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Integer(i)
                } else {
                    n.as_f64().map(Value::Float).unwrap_or(Value::Null)
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => Value::Array(items.into_iter().map(Value::from_json).collect()),
            serde_json::Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from_json(v))).collect())
            }
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        // Serialize for Value is infallible
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Integer(n) => serializer.serialize_i64(*n),
            Value::Float(f) => {
                if f.is_finite() && f.fract() == 0.0 && f.abs() <= MAX_EXACT_FLOAT {
                    serializer.serialize_i64(*f as i64)
                } else {
                    serializer.serialize_f64(*f)
                }
            }
            Value::String(s) => serializer.serialize_str(s),
            Value::Timestamp(t) => serializer.serialize_str(&t.to_rfc3339()),
            Value::Uuid(u) => serializer.collect_str(u),
            Value::Object(map) => {
                let mut m = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    m.serialize_entry(k, v)?;
                }
                m.end()
            }
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(t: DateTime<FixedOffset>) -> Self {
        Value::Timestamp(t)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}
