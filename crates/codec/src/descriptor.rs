//! Field descriptors -- the static metadata locating each typed-tree field
//! inside the envelope document.
//!
//! A document type declares its shape once as an ordered table of
//! descriptors. The table is validated on construction: a descriptor that
//! cannot be encoded (unsupported path depth, record list without item
//! fields) is a configuration error and is rejected before any document is
//! touched.

use grantdoc_envelope::FieldValue;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Declared kind of a field's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    Integer,
    Decimal,
    Boolean,
    /// ISO-8601 timestamp.
    DateTime,
    /// Repeatable composite group: an ordered list of records.
    RecordList,
}

/// Sub-descriptor for one inner field of a depth-2 record list.
///
/// Record lists addressed by a two-segment path take their item shape from
/// these caller-declared fields rather than from the schema, because the
/// outer field itself is the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemField {
    pub name: String,
    pub value_kind: ValueKind,
    pub label: String,
}

impl ItemField {
    pub fn new(
        name: impl Into<String>,
        value_kind: ValueKind,
        label: impl Into<String>,
    ) -> Self {
        ItemField {
            name: name.into(),
            value_kind,
            label: label.into(),
        }
    }
}

/// Injected conversion applied to a raw document value before kind coercion.
///
/// Any conversion a field needs (locale currency strings to plain numbers,
/// legacy enum remaps, ...) is passed in with the descriptor instead of
/// being resolved through an ambient service registry.
#[derive(Clone)]
pub struct ValueTransform(Arc<dyn Fn(&Value) -> Result<Value, String> + Send + Sync>);

impl ValueTransform {
    pub fn new(f: impl Fn(&Value) -> Result<Value, String> + Send + Sync + 'static) -> Self {
        ValueTransform(Arc::new(f))
    }

    pub fn apply(&self, raw: &Value) -> Result<Value, String> {
        (self.0)(raw)
    }
}

impl fmt::Debug for ValueTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ValueTransform(..)")
    }
}

/// Static metadata for one field of a document type.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: String,
    pub value_kind: ValueKind,
    /// Segments from the document root to the terminal group. The last
    /// segment is the field id inside that group, except for record-list
    /// fields, where it names the list itself.
    pub path: Vec<String>,
    /// Human-readable label carried on tagged entries.
    pub label: String,
    /// Substituted for a missing value at encode time. Decode never
    /// applies it.
    pub default_value: Option<FieldValue>,
    /// Emit an empty sequence for an empty list instead of omitting the key.
    pub required_in_json: bool,
    pub value_transform: Option<ValueTransform>,
    /// Per-item sub-descriptors, consulted for record lists at depth 2.
    pub item_fields: Vec<ItemField>,
}

impl FieldDescriptor {
    pub fn new(
        name: impl Into<String>,
        value_kind: ValueKind,
        path: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let name = name.into();
        FieldDescriptor {
            label: name.clone(),
            name,
            value_kind,
            path: path.into_iter().map(Into::into).collect(),
            default_value: None,
            required_in_json: false,
            value_transform: None,
            item_fields: Vec::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_default(mut self, default: FieldValue) -> Self {
        self.default_value = Some(default);
        self
    }

    pub fn required(mut self) -> Self {
        self.required_in_json = true;
        self
    }

    pub fn with_transform(mut self, transform: ValueTransform) -> Self {
        self.value_transform = Some(transform);
        self
    }

    pub fn with_item_fields(mut self, item_fields: Vec<ItemField>) -> Self {
        self.item_fields = item_fields;
        self
    }

    /// Number of path segments; selects the encode/decode branch.
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    /// The field id inside its terminal group (the last path segment).
    pub fn element_name(&self) -> &str {
        self.path.last().map(String::as_str).unwrap_or("")
    }

    /// All path segments except the last.
    pub fn parent_segments(&self) -> &[String] {
        match self.path.split_last() {
            Some((_, parents)) => parents,
            None => &[],
        }
    }
}

/// Configuration errors rejected when a descriptor table is built.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("field '{name}': unsupported path depth {depth}, supported depths are 2, 3 and 4")]
    UnsupportedDepth { name: String, depth: usize },

    #[error("duplicate field name '{name}'")]
    DuplicateField { name: String },

    #[error("record list field '{name}' cannot use a depth-4 path")]
    RecordListDepth { name: String },

    #[error("record list field '{name}' at depth 2 declares no item fields")]
    MissingItemFields { name: String },
}

/// An ordered, validated collection of field descriptors. Immutable once
/// built; defined once per document type.
#[derive(Debug, Clone)]
pub struct DescriptorTable {
    fields: Vec<FieldDescriptor>,
}

impl DescriptorTable {
    pub fn new(fields: Vec<FieldDescriptor>) -> Result<Self, TableError> {
        let mut seen = HashSet::new();
        for desc in &fields {
            let depth = desc.depth();
            if !(2..=4).contains(&depth) {
                return Err(TableError::UnsupportedDepth {
                    name: desc.name.clone(),
                    depth,
                });
            }
            if desc.value_kind == ValueKind::RecordList {
                if depth == 4 {
                    return Err(TableError::RecordListDepth {
                        name: desc.name.clone(),
                    });
                }
                if depth == 2 && desc.item_fields.is_empty() {
                    return Err(TableError::MissingItemFields {
                        name: desc.name.clone(),
                    });
                }
            }
            if !seen.insert(desc.name.clone()) {
                return Err(TableError::DuplicateField {
                    name: desc.name.clone(),
                });
            }
        }
        Ok(DescriptorTable { fields })
    }

    /// Descriptors in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|d| d.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
