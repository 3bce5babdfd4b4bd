//! The tagged-entry leaf encoding.
//!
//! When several fields share a parent group, the envelope stores each of
//! them as an `{ID, value, valueType, label}` object collected into a
//! sequence under the group key. Plain leaves (bare key -> scalar) are the
//! other leaf form and need no type here.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Wire type tag carried by every tagged entry.
///
/// `Float` appears in stored documents but is never produced by the encoder:
/// the case-processing system expects decimal values tagged as `string`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Int,
    String,
    Bool,
    Datetime,
    Float,
}

impl ValueType {
    pub fn as_str(self) -> &'static str {
        match self {
            ValueType::Int => "int",
            ValueType::String => "string",
            ValueType::Bool => "bool",
            ValueType::Datetime => "datetime",
            ValueType::Float => "float",
        }
    }

    /// Parse a wire tag. Unknown tags map to `None`.
    pub fn parse(tag: &str) -> Option<ValueType> {
        match tag {
            "int" => Some(ValueType::Int),
            "string" => Some(ValueType::String),
            "bool" => Some(ValueType::Bool),
            "datetime" => Some(ValueType::Datetime),
            "float" => Some(ValueType::Float),
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One tagged entry as stored inside a group sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedEntry {
    #[serde(rename = "ID")]
    pub id: String,
    pub value: Value,
    #[serde(rename = "valueType")]
    pub value_type: ValueType,
    pub label: String,
}

impl TaggedEntry {
    pub fn new(
        id: impl Into<String>,
        value: Value,
        value_type: ValueType,
        label: impl Into<String>,
    ) -> Self {
        TaggedEntry {
            id: id.into(),
            value,
            value_type,
            label: label.into(),
        }
    }

    /// Build the wire object for this entry.
    pub fn into_json(self) -> Value {
        let mut m = Map::new();
        m.insert("ID".to_owned(), Value::String(self.id));
        m.insert("label".to_owned(), Value::String(self.label));
        m.insert("value".to_owned(), self.value);
        m.insert(
            "valueType".to_owned(),
            Value::String(self.value_type.as_str().to_owned()),
        );
        Value::Object(m)
    }
}
