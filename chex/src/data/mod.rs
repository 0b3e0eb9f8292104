//! Host-side value representation
//!
//! Values crossing the host boundary are carried at wide width:
//! unsigned/signed 64-bit integers, doubles, strings, booleans and
//! nested sequences.

mod row;

pub use row::Row;

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::{ChexError, Result};

/// Dynamically-typed host value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    UInt64(u64),
    Int64(i64),
    Float64(f64),
    String(String),
    Array(Vec<Value>),
    Tuple(Vec<Value>),
    /// Ordered key/value pairs
    Map(Vec<(Value, Value)>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt64(v) => Some(*v),
            Value::Int64(v) => Some(*v as u64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(v) => Some(*v),
            Value::UInt64(v) => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float64(v) => Some(*v),
            Value::Int64(v) => Some(*v as f64),
            Value::UInt64(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Name of the host-side kind, for error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::UInt64(_) => "unsigned integer",
            Value::Int64(_) => "integer",
            Value::Float64(_) => "float",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Tuple(_) => "tuple",
            Value::Map(_) => "map",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::UInt64(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Tuple(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str(")")
            }
            Value::Map(pairs) => {
                f.write_str("{")?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt64(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// 128-bit UUID carried as two 64-bit halves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Uuid {
    pub high: u64,
    pub low: u64,
}

impl Uuid {
    pub fn new(high: u64, low: u64) -> Self {
        Self { high, low }
    }
}

impl fmt::Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:04x}-{:012x}",
            (self.high >> 32) & 0xFFFF_FFFF,
            (self.high >> 16) & 0xFFFF,
            self.high & 0xFFFF,
            (self.low >> 48) & 0xFFFF,
            self.low & 0xFFFF_FFFF_FFFF,
        )
    }
}

impl FromStr for Uuid {
    type Err = ChexError;

    /// Parse the canonical 8-4-4-4-12 hyphenated form
    fn from_str(s: &str) -> Result<Self> {
        let groups: Vec<&str> = s.split('-').collect();
        let widths = [8, 4, 4, 4, 12];
        let well_formed = groups.len() == widths.len()
            && groups
                .iter()
                .zip(widths)
                .all(|(g, w)| g.len() == w && g.chars().all(|c| c.is_ascii_hexdigit()));
        if !well_formed {
            return Err(ChexError::type_mismatch("UUID in 8-4-4-4-12 form", s));
        }
        let hex: String = groups.concat();
        let high = u64::from_str_radix(&hex[..16], 16)
            .map_err(|_| ChexError::type_mismatch("UUID", s))?;
        let low = u64::from_str_radix(&hex[16..], 16)
            .map_err(|_| ChexError::type_mismatch("UUID", s))?;
        Ok(Uuid { high, low })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_canonical_form() {
        let uuid = Uuid::new(0x0123456789abcdef, 0xfedcba9876543210);
        assert_eq!(uuid.to_string(), "01234567-89ab-cdef-fedc-ba9876543210");
    }

    #[test]
    fn test_uuid_parse() {
        let uuid: Uuid = "01234567-89ab-cdef-fedc-ba9876543210".parse().unwrap();
        assert_eq!(uuid, Uuid::new(0x0123456789abcdef, 0xfedcba9876543210));
        assert!("0123456789abcdef".parse::<Uuid>().is_err());
        assert!("0123456z-89ab-cdef-fedc-ba9876543210".parse::<Uuid>().is_err());
    }

    #[test]
    fn test_value_display() {
        let v = Value::Array(vec![Value::UInt64(1), Value::Null, Value::from("x")]);
        assert_eq!(v.to_string(), "[1, NULL, \"x\"]");
    }

    #[test]
    fn test_value_serialize() {
        let v = Value::Map(vec![(Value::from("a"), Value::Int64(-1))]);
        assert_eq!(serde_json::to_string(&v).unwrap(), r#"[["a",-1]]"#);
        assert_eq!(serde_json::to_string(&Value::Null).unwrap(), "null");
    }
}
