//! Encoder: typed value tree -> envelope document.
//!
//! The output document is built by deep-merging every descriptor's
//! contribution into nested maps keyed by its path segments. Map-level
//! merging is associative and conflict-checked; entries appended to the
//! same group sequence appear in descriptor-table order, which is part of
//! the document type's static definition.

use crate::descriptor::{DescriptorTable, FieldDescriptor, ValueKind};
use crate::error::CodecError;
use crate::schema::{SchemaIndex, Shape};
use grantdoc_envelope::{FieldRecord, FieldValue, TaggedEntry, TypedTree, ValueType};
use serde_json::{Map, Value};

/// Top-level key the case-processing integration always expects, present
/// or empty.
pub const ATTACHMENTS_INFO_KEY: &str = "attachmentsInfo";

/// Encode result: the document plus diagnostics for inner-record fields
/// that had no mapping and were left out of it.
#[derive(Debug, Clone, PartialEq)]
pub struct Encoded {
    pub document: Value,
    pub dropped: Vec<DroppedField>,
}

/// One inner-record field that could not be mapped into the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedField {
    /// The record-list field the record belongs to.
    pub field: String,
    /// Position of the record inside the list.
    pub record_index: usize,
    /// The unmapped inner field name.
    pub key: String,
}

/// Encode a typed value tree into an envelope document.
pub fn encode(
    tree: &TypedTree,
    table: &DescriptorTable,
    schema: &SchemaIndex,
) -> Result<Encoded, CodecError> {
    let mut root = Map::new();
    let mut dropped = Vec::new();

    for desc in table.fields() {
        let value = resolve_value(tree, desc);
        if desc.depth() == 4 {
            // Depth 4 is always one tagged entry inside the sequence
            // addressed by the first three segments.
            let seq = ensure_sequence(&mut root, desc.parent_segments(), &desc.name)?;
            seq.push(scalar_entry(desc, value).into_json());
        } else if desc.value_kind == ValueKind::RecordList {
            encode_record_list(&mut root, desc, value, schema, &mut dropped)?;
        } else {
            encode_scalar(&mut root, desc, value, schema)?;
        }
    }

    if !root.contains_key(ATTACHMENTS_INFO_KEY) {
        root.insert(ATTACHMENTS_INFO_KEY.to_owned(), Value::Object(Map::new()));
    }

    Ok(Encoded {
        document: Value::Object(root),
        dropped,
    })
}

/// Sentinel for fields with neither a tree value nor a default.
static NULL_FIELD: FieldValue = FieldValue::Null;

/// The field's value from the tree, or its declared default.
fn resolve_value<'t>(tree: &'t TypedTree, desc: &'t FieldDescriptor) -> &'t FieldValue {
    match tree.get(&desc.name) {
        Some(v) if !v.is_null() => v,
        _ => desc.default_value.as_ref().unwrap_or(&NULL_FIELD),
    }
}

fn encode_scalar(
    root: &mut Map<String, Value>,
    desc: &FieldDescriptor,
    value: &FieldValue,
    schema: &SchemaIndex,
) -> Result<(), CodecError> {
    let bare = schema
        .lookup(desc.element_name())
        .map_or(false, Shape::emits_bare);
    if bare {
        let parent = ensure_object(root, desc.parent_segments(), &desc.name)?;
        insert_leaf(parent, desc.element_name(), value.to_json(), &desc.name)
    } else {
        // A schema miss lands here too: tagged-entry encoding is the
        // safest default for a scalar.
        let seq = ensure_sequence(root, desc.parent_segments(), &desc.name)?;
        seq.push(scalar_entry(desc, value).into_json());
        Ok(())
    }
}

fn encode_record_list(
    root: &mut Map<String, Value>,
    desc: &FieldDescriptor,
    value: &FieldValue,
    schema: &SchemaIndex,
    dropped: &mut Vec<DroppedField>,
) -> Result<(), CodecError> {
    let records: &[FieldValue] = match value {
        FieldValue::List(records) => records,
        // A missing list is an empty list; required_in_json decides below.
        FieldValue::Null => &[],
        other => {
            return Err(CodecError::Coercion {
                field: desc.name.clone(),
                expected: "list of records",
                got: format!("{:?}", other),
            })
        }
    };

    if records.is_empty() && !desc.required_in_json {
        return Ok(());
    }

    let mut groups = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let record = match record {
            FieldValue::Record(map) => map,
            other => {
                return Err(CodecError::Coercion {
                    field: desc.name.clone(),
                    expected: "record",
                    got: format!("{:?}", other),
                })
            }
        };
        let entries = if desc.depth() == 2 {
            item_record_entries(desc, index, record, dropped)
        } else {
            schema_record_entries(desc, index, record, schema, dropped)
        };
        groups.push(Value::Array(entries));
    }

    // The terminal path segment names the list itself.
    let parent = ensure_object(root, desc.parent_segments(), &desc.name)?;
    insert_leaf(parent, desc.element_name(), Value::Array(groups), &desc.name)
}

/// Depth-2 record lists take their item shape from the descriptor's own
/// item fields -- the outer field is the list, so the schema has nothing
/// to say about the items.
fn item_record_entries(
    desc: &FieldDescriptor,
    index: usize,
    record: &FieldRecord,
    dropped: &mut Vec<DroppedField>,
) -> Vec<Value> {
    let mut entries = Vec::new();
    for item in &desc.item_fields {
        if let Some(value) = record.get(&item.name) {
            entries.push(
                TaggedEntry::new(
                    item.name.clone(),
                    value.to_json(),
                    wire_tag(item.value_kind),
                    item.label.clone(),
                )
                .into_json(),
            );
        }
    }
    for key in record.keys() {
        if !desc.item_fields.iter().any(|item| item.name == *key) {
            dropped.push(DroppedField {
                field: desc.name.clone(),
                record_index: index,
                key: key.clone(),
            });
        }
    }
    entries
}

/// Depth-3 record lists match inner field names against the schema's
/// enumerated id set for the group; unmapped names are diagnosed instead
/// of silently discarded.
fn schema_record_entries(
    desc: &FieldDescriptor,
    index: usize,
    record: &FieldRecord,
    schema: &SchemaIndex,
    dropped: &mut Vec<DroppedField>,
) -> Vec<Value> {
    let ids = match schema.lookup(desc.element_name()) {
        Some(Shape::RecordArray { ids }) => Some(ids),
        _ => None,
    };
    let mut entries = Vec::new();
    for (key, value) in record {
        if ids.map_or(false, |ids| ids.contains(key)) {
            entries.push(
                TaggedEntry::new(
                    key.clone(),
                    value.to_json(),
                    wire_tag_for_value(value),
                    key.clone(),
                )
                .into_json(),
            );
        } else {
            dropped.push(DroppedField {
                field: desc.name.clone(),
                record_index: index,
                key: key.clone(),
            });
        }
    }
    entries
}

fn scalar_entry(desc: &FieldDescriptor, value: &FieldValue) -> TaggedEntry {
    TaggedEntry::new(
        desc.element_name(),
        value.to_json(),
        wire_tag(desc.value_kind),
        desc.label.clone(),
    )
}

/// Wire tag for a declared kind. Decimal maps to `string`: the
/// case-processing system stores float-valued fields as strings.
fn wire_tag(kind: ValueKind) -> ValueType {
    match kind {
        ValueKind::Integer => ValueType::Int,
        ValueKind::Boolean => ValueType::Bool,
        ValueKind::DateTime => ValueType::Datetime,
        ValueKind::Text | ValueKind::Decimal | ValueKind::RecordList => ValueType::String,
    }
}

/// Wire tag for an undeclared inner-record value, derived from its
/// runtime type. Decimals map to `string`, matching the declared-kind
/// mapping.
fn wire_tag_for_value(value: &FieldValue) -> ValueType {
    match value {
        FieldValue::Int(_) => ValueType::Int,
        FieldValue::Bool(_) => ValueType::Bool,
        FieldValue::DateTime(_) => ValueType::Datetime,
        _ => ValueType::String,
    }
}

/// Walk (and create) nested objects along `segments`.
fn ensure_object<'a>(
    root: &'a mut Map<String, Value>,
    segments: &[String],
    field: &str,
) -> Result<&'a mut Map<String, Value>, CodecError> {
    let mut current = root;
    for segment in segments {
        let slot = current
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        current = match slot {
            Value::Object(map) => map,
            _ => {
                return Err(CodecError::PathConflict {
                    field: field.to_owned(),
                    segment: segment.clone(),
                })
            }
        };
    }
    Ok(current)
}

/// Walk (and create) nested objects up to the last segment, which holds
/// the group sequence.
fn ensure_sequence<'a>(
    root: &'a mut Map<String, Value>,
    segments: &[String],
    field: &str,
) -> Result<&'a mut Vec<Value>, CodecError> {
    let (seq_key, object_path) = match segments.split_last() {
        Some(split) => split,
        // Validated tables guarantee at least one parent segment.
        None => {
            return Err(CodecError::PathConflict {
                field: field.to_owned(),
                segment: String::new(),
            })
        }
    };
    let parent = ensure_object(root, object_path, field)?;
    let slot = parent
        .entry(seq_key.clone())
        .or_insert_with(|| Value::Array(Vec::new()));
    match slot {
        Value::Array(items) => Ok(items),
        _ => Err(CodecError::PathConflict {
            field: field.to_owned(),
            segment: seq_key.clone(),
        }),
    }
}

/// Insert a leaf under its own key, refusing to clobber an existing node.
fn insert_leaf(
    parent: &mut Map<String, Value>,
    key: &str,
    value: Value,
    field: &str,
) -> Result<(), CodecError> {
    if parent.contains_key(key) {
        return Err(CodecError::PathConflict {
            field: field.to_owned(),
            segment: key.to_owned(),
        });
    }
    parent.insert(key.to_owned(), value);
    Ok(())
}
