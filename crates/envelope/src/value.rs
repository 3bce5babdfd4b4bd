//! Runtime value model for decoded applications.
//!
//! A typed value tree maps field names to [`FieldValue`]s. Repeatable
//! composite groups ("other compensations received", board officials, ...)
//! are a `List` of `Record`s, order-preserving. All decimal values use
//! `rust_decimal::Decimal` -- never `f64`.

use rust_decimal::Decimal;
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One record inside a repeatable composite group.
pub type FieldRecord = BTreeMap<String, FieldValue>;

/// The in-memory tree produced by decode and consumed by encode:
/// field name -> value.
pub type TypedTree = BTreeMap<String, FieldValue>;

/// A JSON number that does not fit the decimal value model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberOutOfRange {
    pub repr: String,
}

impl fmt::Display for NumberOutOfRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "number out of range for decimal value: {}", self.repr)
    }
}

impl std::error::Error for NumberOutOfRange {}

/// A single typed value in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Decimal(Decimal),
    Text(String),
    /// ISO-8601 timestamp, kept as the source string.
    DateTime(String),
    Record(FieldRecord),
    List(Vec<FieldValue>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Convert a raw document value without a declared kind.
    ///
    /// Integral numbers become `Int`, all other numbers `Decimal`. The
    /// conversion goes through the serde_json shortest representation, so a
    /// stored `187.21` stays exactly `187.21`.
    pub fn from_json(value: &Value) -> Result<FieldValue, NumberOutOfRange> {
        match value {
            Value::Null => Ok(FieldValue::Null),
            Value::Bool(b) => Ok(FieldValue::Bool(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    return Ok(FieldValue::Int(i));
                }
                let repr = n.to_string();
                Decimal::from_str(&repr)
                    .or_else(|_| Decimal::from_scientific(&repr))
                    .map(FieldValue::Decimal)
                    .map_err(|_| NumberOutOfRange { repr })
            }
            Value::String(s) => Ok(FieldValue::Text(s.clone())),
            Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(FieldValue::from_json(item)?);
                }
                Ok(FieldValue::List(out))
            }
            Value::Object(map) => {
                let mut out = FieldRecord::new();
                for (k, v) in map {
                    out.insert(k.clone(), FieldValue::from_json(v)?);
                }
                Ok(FieldValue::Record(out))
            }
        }
    }

    /// Convert back to a document value.
    ///
    /// Decimals beyond f64 precision are emitted as their exact string form
    /// rather than a rounded number.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Int(i) => Value::Number(Number::from(*i)),
            FieldValue::Decimal(d) => {
                use rust_decimal::prelude::ToPrimitive;
                match d.to_f64().and_then(Number::from_f64) {
                    Some(n) => Value::Number(n),
                    None => Value::String(d.to_string()),
                }
            }
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::DateTime(s) => Value::String(s.clone()),
            FieldValue::Record(map) => {
                let mut out = Map::new();
                for (k, v) in map {
                    out.insert(k.clone(), v.to_json());
                }
                Value::Object(out)
            }
            FieldValue::List(items) => Value::Array(items.iter().map(FieldValue::to_json).collect()),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Int(i)
    }
}

impl From<Decimal> for FieldValue {
    fn from(d: Decimal) -> Self {
        FieldValue::Decimal(d)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}
