//! Structured values carried in request data.
//!
//! `Value` is the tagged variant produced by the gateway's text transcoder and
//! forwarded verbatim to the record store. On the backend wire it serializes
//! as plain JSON.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Key-ordered mapping of names to values.
pub type Map = BTreeMap<String, Value>;

/// A structured value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Decimal(f64),
    String(String),
    Sequence(Vec<Value>),
    Mapping(Map),
}

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

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the value as an integer. Decimals with no fractional part are
    /// accepted.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            Value::Decimal(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Map> {
        match self {
            Value::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Short name of the variant, used in validation messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "string",
            Value::Sequence(_) => "sequence",
            Value::Mapping(_) => "mapping",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Integer(n) => write!(f, "{}", n),
            Value::Decimal(d) => write!(f, "{:?}", d),
            Value::String(s) => write!(f, "{}", s),
            Value::Sequence(items) => write!(f, "[{} items]", items.len()),
            Value::Mapping(map) => write!(f, "{{{} fields}}", map.len()),
        }
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

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Decimal(d)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Mapping(map)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Sequence(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_shape() {
        let mut data = Map::new();
        data.insert("studentId".to_string(), "S001".into());
        data.insert("credits".to_string(), 4i64.into());
        data.insert("ratio".to_string(), 0.5f64.into());
        data.insert("active".to_string(), true.into());
        data.insert("note".to_string(), Value::Null);
        data.insert(
            "tags".to_string(),
            Value::Sequence(vec!["a".into(), 1i64.into()]),
        );

        let json = serde_json::to_string(&Value::Mapping(data.clone())).unwrap();
        assert_eq!(
            json,
            r#"{"active":true,"credits":4,"note":null,"ratio":0.5,"studentId":"S001","tags":["a",1]}"#
        );

        let parsed: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, Value::Mapping(data));
    }

    #[test]
    fn test_integer_and_decimal_are_distinct() {
        let int: Value = serde_json::from_str("3").unwrap();
        let dec: Value = serde_json::from_str("3.25").unwrap();
        assert_eq!(int, Value::Integer(3));
        assert_eq!(dec, Value::Decimal(3.25));
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Value::from("x").as_str(), Some("x"));
        assert_eq!(Value::Integer(7).as_i64(), Some(7));
        assert_eq!(Value::Decimal(4.0).as_i64(), Some(4));
        assert_eq!(Value::Decimal(4.5).as_i64(), None);
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert!(Value::Null.is_null());
        assert!(Value::from("x").as_mapping().is_none());
        assert_eq!(Value::Sequence(vec![]).kind(), "sequence");
    }
}
