use std::collections::BTreeMap;
use std::fmt::{self, Display};

use contrail_error::{ContrailResult, contrail_bail};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// A command argument value.
///
/// This is the closed set of types the command codec round-trips exactly:
/// null, booleans, 64-bit integers and floats, strings, and sequences or
/// string-keyed mappings composed only of these.
///
/// Maps are backed by a [`BTreeMap`] so that serializing the same logical
/// value always produces the same bytes, which is what makes command-key
/// deduplication on the server reliable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Non-negative integer, as used for offsets, lengths and indices.
    pub fn as_usize(&self) -> Option<usize> {
        match self {
            Value::Int(i) if *i >= 0 => usize::try_from(*i).ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The JSON field payloads cannot represent NaN or infinities, so the
    /// codec refuses to encode them rather than degrade them to null.
    pub(crate) fn ensure_finite(&self) -> ContrailResult<()> {
        match self {
            Value::Float(f) if !f.is_finite() => {
                contrail_bail!(InvalidArguments: "non-finite float {} is not encodable", f)
            }
            Value::List(items) => items.iter().try_for_each(Value::ensure_finite),
            Value::Map(map) => map.values().try_for_each(Value::ensure_finite),
            _ => Ok(()),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::List(items) => write!(f, "[{}]", items.iter().join(", ")),
            Value::Map(map) => {
                write!(
                    f,
                    "{{{}}}",
                    map.iter().map(|(k, v)| format!("{:?}: {}", k, v)).join(", ")
                )
            }
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value.into())
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::Int(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl<V: Into<Value>> From<Vec<V>> for Value {
    fn from(value: Vec<V>) -> Self {
        Value::List(value.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(value: BTreeMap<String, Value>) -> Self {
        Value::Map(value)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn json_round_trip_keeps_int_and_float_apart() {
        let json = serde_json::to_string(&Value::Int(1)).unwrap();
        assert_eq!(json, "1");
        assert_eq!(serde_json::from_str::<Value>(&json).unwrap(), Value::Int(1));

        let json = serde_json::to_string(&Value::Float(1.0)).unwrap();
        assert_eq!(json, "1.0");
        assert_eq!(
            serde_json::from_str::<Value>(&json).unwrap(),
            Value::Float(1.0)
        );
    }

    #[test]
    fn nested_round_trip() {
        let value = Value::from(vec![
            Value::Null,
            Value::from(true),
            Value::from("a $$$ string"),
            Value::from(vec![Value::from(1), Value::from(2.5)]),
        ]);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(serde_json::from_str::<Value>(&json).unwrap(), value);
    }

    #[test]
    fn non_finite_floats_are_rejected() {
        assert!(Value::Float(f64::NAN).ensure_finite().is_err());
        assert!(
            Value::List(vec![Value::Float(f64::INFINITY)])
                .ensure_finite()
                .is_err()
        );
        assert!(Value::Float(1.5).ensure_finite().is_ok());
    }

    #[test]
    fn display_renders_call_style() {
        let mut map = BTreeMap::new();
        map.insert("k".to_string(), Value::from(1));
        assert_eq!(Value::from("x").to_string(), "\"x\"");
        assert_eq!(Value::from(vec![1i64, 2]).to_string(), "[1, 2]");
        assert_eq!(Value::Map(map).to_string(), "{\"k\": 1}");
    }
}
