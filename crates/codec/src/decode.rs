//! Decoder: envelope document -> typed value tree.
//!
//! Each descriptor's path is followed through the document with an explicit
//! recursive match; whatever is found is coerced to the declared kind.
//! Missing data is recovered locally as null -- the decoder reflects
//! exactly what the document contains and never applies defaults.

use crate::descriptor::{DescriptorTable, FieldDescriptor, ValueKind};
use crate::error::CodecError;
use grantdoc_envelope::{
    child, is_record_list, sequence_elements, FieldRecord, FieldValue, PathStep, TypedTree,
};
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use time::format_description::well_known::Iso8601;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

/// Decode an envelope document into a typed value tree.
///
/// Never fails on missing data; only a value that contradicts its declared
/// kind or a rejected transform is an error.
pub fn decode(document: &Value, table: &DescriptorTable) -> Result<TypedTree, CodecError> {
    let mut tree = TypedTree::new();
    for desc in table.fields() {
        let value = decode_field(document, desc)?;
        tree.insert(desc.name.clone(), value);
    }
    Ok(tree)
}

fn decode_field(document: &Value, desc: &FieldDescriptor) -> Result<FieldValue, CodecError> {
    match extract(document, desc.parent_segments(), desc.element_name()) {
        Extracted::Missing => Ok(FieldValue::Null),
        Extracted::Groups(groups) => flatten_groups(&desc.name, &groups),
        Extracted::Raw(raw) => {
            let transformed;
            let raw = match &desc.value_transform {
                Some(transform) => {
                    transformed = transform.apply(raw).map_err(|message| {
                        CodecError::Transform {
                            field: desc.name.clone(),
                            message,
                        }
                    })?;
                    &transformed
                }
                None => raw,
            };
            coerce(&desc.name, desc.value_kind, raw)
        }
    }
}

/// Sentinel for tagged entries whose `value` key is absent.
static NULL_VALUE: Value = Value::Null;

/// What following a descriptor path found.
enum Extracted<'v> {
    /// No step matched; the field is absent.
    Missing,
    /// A position-to-group collection: each group flattens to one record.
    Groups(Vec<&'v Value>),
    /// A leaf value, returned unchanged.
    Raw(&'v Value),
}

/// Follow the descriptor path through the document.
///
/// At each node, in order: descend into the next parent segment when it is
/// present; otherwise take the element name as a direct key; otherwise scan
/// a numeric-keyed sequence for a matching tagged entry (or a collapsed
/// single-value group); otherwise the field is missing.
fn extract<'v>(node: &'v Value, parents: &[String], element: &str) -> Extracted<'v> {
    if let Some((head, rest)) = parents.split_first() {
        if let Some(next) = child(node, PathStep::Key(head)) {
            return extract(next, rest, element);
        }
    }

    if let Some(direct) = child(node, PathStep::Key(element)) {
        if let Some(groups) = composite_groups(direct) {
            return Extracted::Groups(groups);
        }
        return Extracted::Raw(direct);
    }

    if let Some(elements) = sequence_elements(node) {
        for elem in elements {
            if !elem.is_object() && !elem.is_array() {
                // Collapsed single-value group: the store flattened a
                // one-entry group down to its scalar.
                return Extracted::Raw(elem);
            }
            if elem.get("ID").and_then(Value::as_str) == Some(element) {
                return Extracted::Raw(elem.get("value").unwrap_or(&NULL_VALUE));
            }
        }
    }

    Extracted::Missing
}

/// A numeric-keyed collection whose every element is itself a sequence
/// reads as position -> group. A sequence of tagged entries does not: its
/// elements are objects with named keys.
fn composite_groups(value: &Value) -> Option<Vec<&Value>> {
    let groups = sequence_elements(value)?;
    if groups.iter().all(|g| is_record_list(g)) {
        Some(groups)
    } else {
        None
    }
}

/// Flatten each group's tagged entries into a record, preserving group
/// order. Entries without an `ID` are skipped; missing inner fields are
/// simply absent keys.
fn flatten_groups(field: &str, groups: &[&Value]) -> Result<FieldValue, CodecError> {
    let mut records = Vec::with_capacity(groups.len());
    for group in groups {
        let mut record = FieldRecord::new();
        for entry in sequence_elements(group).unwrap_or_default() {
            let id = match entry.get("ID").and_then(Value::as_str) {
                Some(id) => id,
                None => continue,
            };
            let raw = entry.get("value").unwrap_or(&NULL_VALUE);
            let value = FieldValue::from_json(raw).map_err(|e| CodecError::Coercion {
                field: field.to_owned(),
                expected: "decimal",
                got: e.repr,
            })?;
            record.insert(id.to_owned(), value);
        }
        records.push(FieldValue::Record(record));
    }
    Ok(FieldValue::List(records))
}

fn coerce(field: &str, kind: ValueKind, raw: &Value) -> Result<FieldValue, CodecError> {
    if raw.is_null() {
        return Ok(FieldValue::Null);
    }
    match kind {
        ValueKind::Text => match raw {
            Value::String(s) => Ok(FieldValue::Text(s.clone())),
            other => Err(coercion(field, "string", other)),
        },
        ValueKind::Integer => match raw {
            Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(FieldValue::Int(i)),
                None => Err(coercion(field, "integer", raw)),
            },
            // The store round-trips numbers through strings.
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(FieldValue::Int)
                .map_err(|_| coercion(field, "integer", raw)),
            other => Err(coercion(field, "integer", other)),
        },
        ValueKind::Decimal => match raw {
            Value::Number(n) => {
                let repr = n.to_string();
                Decimal::from_str(&repr)
                    .or_else(|_| Decimal::from_scientific(&repr))
                    .map(FieldValue::Decimal)
                    .map_err(|_| coercion(field, "decimal", raw))
            }
            Value::String(s) => Decimal::from_str(s.trim())
                .map(FieldValue::Decimal)
                .map_err(|_| coercion(field, "decimal", raw)),
            other => Err(coercion(field, "decimal", other)),
        },
        ValueKind::Boolean => match raw {
            Value::Bool(b) => Ok(FieldValue::Bool(*b)),
            Value::String(s) => match s.trim() {
                t if t.eq_ignore_ascii_case("true") || t == "1" => Ok(FieldValue::Bool(true)),
                t if t.eq_ignore_ascii_case("false") || t == "0" => Ok(FieldValue::Bool(false)),
                _ => Err(coercion(field, "boolean", raw)),
            },
            Value::Number(n) => match n.as_i64() {
                Some(0) => Ok(FieldValue::Bool(false)),
                Some(1) => Ok(FieldValue::Bool(true)),
                _ => Err(coercion(field, "boolean", raw)),
            },
            other => Err(coercion(field, "boolean", other)),
        },
        ValueKind::DateTime => match raw {
            Value::String(s) if is_iso8601(s) => Ok(FieldValue::DateTime(s.clone())),
            other => Err(coercion(field, "ISO-8601 timestamp", other)),
        },
        // Reaching here means the stored value was not a position-to-group
        // collection.
        ValueKind::RecordList => Err(coercion(field, "list of records", raw)),
    }
}

fn is_iso8601(s: &str) -> bool {
    OffsetDateTime::parse(s, &Iso8601::DEFAULT).is_ok()
        || PrimitiveDateTime::parse(s, &Iso8601::DEFAULT).is_ok()
        || Date::parse(s, &Iso8601::DEFAULT).is_ok()
}

fn coercion(field: &str, expected: &'static str, got: &Value) -> CodecError {
    CodecError::Coercion {
        field: field.to_owned(),
        expected,
        got: describe(got),
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_owned(),
        Value::Bool(b) => format!("bool {}", b),
        Value::Number(n) => format!("number {}", n),
        Value::String(s) => format!("string '{}'", s),
        Value::Array(_) => "array".to_owned(),
        Value::Object(_) => "object".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{FieldDescriptor, ItemField, ValueTransform};
    use serde_json::json;

    fn table(fields: Vec<FieldDescriptor>) -> DescriptorTable {
        DescriptorTable::new(fields).unwrap()
    }

    #[test]
    fn descends_parent_segments_to_a_bare_leaf() {
        let t = table(vec![FieldDescriptor::new(
            "companyNameShort",
            ValueKind::Text,
            ["grantsProfile", "profileInfoArray", "companyNameShort"],
        )]);
        let doc = json!({
            "grantsProfile": {"profileInfoArray": {"companyNameShort": "ACME"}}
        });
        let tree = decode(&doc, &t).unwrap();
        assert_eq!(tree["companyNameShort"], FieldValue::Text("ACME".to_owned()));
    }

    #[test]
    fn missing_segments_decode_to_null() {
        let t = table(vec![FieldDescriptor::new(
            "companyNameShort",
            ValueKind::Text,
            ["grantsProfile", "profileInfoArray", "companyNameShort"],
        )]);
        let tree = decode(&json!({}), &t).unwrap();
        assert_eq!(tree["companyNameShort"], FieldValue::Null);

        // A partially present path is just as absent.
        let tree = decode(&json!({"grantsProfile": {}}), &t).unwrap();
        assert_eq!(tree["companyNameShort"], FieldValue::Null);
    }

    #[test]
    fn defaults_are_not_applied_during_decode() {
        let t = table(vec![FieldDescriptor::new(
            "applicantType",
            ValueKind::Integer,
            ["application", "applicantType"],
        )
        .with_default(FieldValue::Int(2))]);
        let tree = decode(&json!({}), &t).unwrap();
        assert_eq!(tree["applicantType"], FieldValue::Null);
    }

    #[test]
    fn scans_a_tagged_entry_sequence_for_the_element() {
        let t = table(vec![FieldDescriptor::new(
            "applicantType",
            ValueKind::Integer,
            ["application", "applicationInfoArray", "applicantType"],
        )]);
        let doc = json!({
            "application": {
                "applicationInfoArray": [
                    {"ID": "handlerEmail", "value": "x@y.fi", "valueType": "string", "label": ""},
                    {"ID": "applicantType", "value": "2", "valueType": "int", "label": ""}
                ]
            }
        });
        let tree = decode(&doc, &t).unwrap();
        assert_eq!(tree["applicantType"], FieldValue::Int(2));
    }

    #[test]
    fn depth_four_paths_scan_the_innermost_sequence() {
        let t = table(vec![FieldDescriptor::new(
            "amount",
            ValueKind::Decimal,
            ["application", "compensationInfo", "generalInfoArray", "amount"],
        )]);
        let doc = json!({
            "application": {"compensationInfo": {"generalInfoArray": [
                {"ID": "amount", "value": 187.21, "valueType": "string", "label": "Amount"}
            ]}}
        });
        let tree = decode(&doc, &t).unwrap();
        assert_eq!(
            tree["amount"],
            FieldValue::Decimal(Decimal::from_str("187.21").unwrap())
        );
    }

    #[test]
    fn collapsed_single_value_group_returns_the_scalar() {
        let t = table(vec![FieldDescriptor::new(
            "acceptTerms",
            ValueKind::Boolean,
            ["formMeta", "acceptTerms"],
        )]);
        let doc = json!({"formMeta": ["true"]});
        let tree = decode(&doc, &t).unwrap();
        assert_eq!(tree["acceptTerms"], FieldValue::Bool(true));
    }

    #[test]
    fn record_list_flattens_groups_in_order() {
        let t = table(vec![FieldDescriptor::new(
            "officials",
            ValueKind::RecordList,
            ["grantsProfile", "officialsArray"],
        )
        .with_item_fields(vec![
            ItemField::new("name", ValueKind::Text, "Name"),
            ItemField::new("role", ValueKind::Integer, "Role"),
        ])]);
        let doc = json!({
            "grantsProfile": {"officialsArray": [
                [
                    {"ID": "name", "value": "A", "valueType": "string", "label": "Name"},
                    {"ID": "role", "value": 1, "valueType": "int", "label": "Role"}
                ],
                [
                    {"ID": "name", "value": "B", "valueType": "string", "label": "Name"},
                    {"ID": "role", "value": 2, "valueType": "int", "label": "Role"}
                ]
            ]}
        });
        let tree = decode(&doc, &t).unwrap();
        match &tree["officials"] {
            FieldValue::List(records) => {
                assert_eq!(records.len(), 2);
                match (&records[0], &records[1]) {
                    (FieldValue::Record(a), FieldValue::Record(b)) => {
                        assert_eq!(a["name"], FieldValue::Text("A".to_owned()));
                        assert_eq!(a["role"], FieldValue::Int(1));
                        assert_eq!(b["name"], FieldValue::Text("B".to_owned()));
                        assert_eq!(b["role"], FieldValue::Int(2));
                    }
                    other => panic!("expected records, got {:?}", other),
                }
            }
            other => panic!("expected List, got {:?}", other),
        }
    }

    #[test]
    fn record_list_accepts_position_keyed_objects() {
        // The store sometimes materializes sequences as {"0": ..., "1": ...}.
        let t = table(vec![FieldDescriptor::new(
            "officials",
            ValueKind::RecordList,
            ["grantsProfile", "officialsArray"],
        )
        .with_item_fields(vec![ItemField::new("name", ValueKind::Text, "Name")])]);
        let doc = json!({
            "grantsProfile": {"officialsArray": {
                "1": [{"ID": "name", "value": "B", "valueType": "string", "label": ""}],
                "0": [{"ID": "name", "value": "A", "valueType": "string", "label": ""}]
            }}
        });
        let tree = decode(&doc, &t).unwrap();
        match &tree["officials"] {
            FieldValue::List(records) => match (&records[0], &records[1]) {
                (FieldValue::Record(a), FieldValue::Record(b)) => {
                    assert_eq!(a["name"], FieldValue::Text("A".to_owned()));
                    assert_eq!(b["name"], FieldValue::Text("B".to_owned()));
                }
                other => panic!("expected records, got {:?}", other),
            },
            other => panic!("expected List, got {:?}", other),
        }
    }

    #[test]
    fn missing_inner_fields_are_absent_keys() {
        let t = table(vec![FieldDescriptor::new(
            "officials",
            ValueKind::RecordList,
            ["grantsProfile", "officialsArray"],
        )
        .with_item_fields(vec![
            ItemField::new("name", ValueKind::Text, "Name"),
            ItemField::new("role", ValueKind::Integer, "Role"),
        ])]);
        let doc = json!({
            "grantsProfile": {"officialsArray": [
                [{"ID": "name", "value": "A", "valueType": "string", "label": ""}]
            ]}
        });
        let tree = decode(&doc, &t).unwrap();
        match &tree["officials"] {
            FieldValue::List(records) => match &records[0] {
                FieldValue::Record(a) => {
                    assert_eq!(a.len(), 1);
                    assert!(!a.contains_key("role"));
                }
                other => panic!("expected Record, got {:?}", other),
            },
            other => panic!("expected List, got {:?}", other),
        }
    }

    #[test]
    fn transform_runs_before_coercion() {
        let t = table(vec![FieldDescriptor::new(
            "netIncome",
            ValueKind::Decimal,
            ["metadata", "netIncome"],
        )
        .with_transform(ValueTransform::new(|raw| match raw {
            Value::String(s) => Ok(Value::String(s.replace(' ', "").replace(',', "."))),
            other => Ok(other.clone()),
        }))]);
        let doc = json!({"metadata": {"netIncome": "1 234,56"}});
        let tree = decode(&doc, &t).unwrap();
        assert_eq!(
            tree["netIncome"],
            FieldValue::Decimal(Decimal::from_str("1234.56").unwrap())
        );
    }

    #[test]
    fn transform_failure_is_surfaced() {
        let t = table(vec![FieldDescriptor::new(
            "netIncome",
            ValueKind::Decimal,
            ["metadata", "netIncome"],
        )
        .with_transform(ValueTransform::new(|_| {
            Err("unparseable currency".to_owned())
        }))]);
        let doc = json!({"metadata": {"netIncome": "garbage"}});
        match decode(&doc, &t) {
            Err(CodecError::Transform { field, message }) => {
                assert_eq!(field, "netIncome");
                assert_eq!(message, "unparseable currency");
            }
            other => panic!("expected Transform error, got {:?}", other),
        }
    }

    #[test]
    fn non_numeric_string_for_integer_is_a_coercion_error() {
        let t = table(vec![FieldDescriptor::new(
            "applicantType",
            ValueKind::Integer,
            ["application", "applicantType"],
        )]);
        let doc = json!({"application": {"applicantType": "not a number"}});
        match decode(&doc, &t) {
            Err(CodecError::Coercion { field, expected, .. }) => {
                assert_eq!(field, "applicantType");
                assert_eq!(expected, "integer");
            }
            other => panic!("expected Coercion error, got {:?}", other),
        }
    }

    #[test]
    fn loose_scalar_representations_are_accepted() {
        let t = table(vec![
            FieldDescriptor::new("a", ValueKind::Integer, ["m", "a"]),
            FieldDescriptor::new("b", ValueKind::Boolean, ["m", "b"]),
            FieldDescriptor::new("c", ValueKind::Boolean, ["m", "c"]),
            FieldDescriptor::new("d", ValueKind::DateTime, ["m", "d"]),
        ]);
        let doc = json!({"m": {"a": "42", "b": "1", "c": 0, "d": "2026-03-01T12:00:00Z"}});
        let tree = decode(&doc, &t).unwrap();
        assert_eq!(tree["a"], FieldValue::Int(42));
        assert_eq!(tree["b"], FieldValue::Bool(true));
        assert_eq!(tree["c"], FieldValue::Bool(false));
        assert_eq!(
            tree["d"],
            FieldValue::DateTime("2026-03-01T12:00:00Z".to_owned())
        );
    }

    #[test]
    fn invalid_timestamp_is_rejected() {
        let t = table(vec![FieldDescriptor::new(
            "submitDate",
            ValueKind::DateTime,
            ["m", "submitDate"],
        )]);
        let doc = json!({"m": {"submitDate": "01.03.2026"}});
        assert!(matches!(
            decode(&doc, &t),
            Err(CodecError::Coercion { expected: "ISO-8601 timestamp", .. })
        ));
    }

    #[test]
    fn scalar_array_values_come_back_unchanged() {
        // An array of scalars is not a position-to-group collection; the
        // raw value is returned and coerced, so a Text field rejects it.
        let t = table(vec![FieldDescriptor::new(
            "tags",
            ValueKind::Text,
            ["m", "tags"],
        )]);
        let doc = json!({"m": {"tags": ["a", "b"]}});
        assert!(matches!(
            decode(&doc, &t),
            Err(CodecError::Coercion { expected: "string", .. })
        ));
    }
}
