//! Structural helpers shared by the decoder and the encoder.
//!
//! The envelope format inherits a loose object/sequence distinction from the
//! document store: a repeated group may arrive as a JSON array or as an
//! object whose keys are stringified positions ("0", "1", ...). Both coders
//! must agree on which collections count as sequences -- divergent answers
//! here corrupt round trips, so the heuristic lives in exactly one place.

use serde_json::Value;

/// One step of a document path: a named key or a sequence position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStep<'a> {
    Key(&'a str),
    Index(usize),
}

/// Follow one path step from `node`, if the step exists.
///
/// Positions address array elements directly and numeric-keyed objects by
/// their stringified index.
pub fn child<'v>(node: &'v Value, step: PathStep<'_>) -> Option<&'v Value> {
    match (node, step) {
        (Value::Object(map), PathStep::Key(key)) => map.get(key),
        (Value::Object(map), PathStep::Index(i)) => map.get(&i.to_string()),
        (Value::Array(items), PathStep::Index(i)) => items.get(i),
        _ => None,
    }
}

/// Numeric-key heuristic: does this collection read as a list of records?
///
/// True for any array, and for an object iff every key parses as a
/// non-negative integer. The empty object has no non-numeric key, so it
/// counts as a list.
pub fn is_record_list(value: &Value) -> bool {
    match value {
        Value::Array(_) => true,
        Value::Object(map) => map.keys().all(|k| k.parse::<usize>().is_ok()),
        _ => false,
    }
}

/// The elements of a sequence in positional order, or `None` when the value
/// is not a sequence. Indices are positions, not names: numeric-keyed
/// objects are ordered by index regardless of key order in the source.
pub fn sequence_elements(value: &Value) -> Option<Vec<&Value>> {
    match value {
        Value::Array(items) => Some(items.iter().collect()),
        Value::Object(map) => {
            let mut indexed = Vec::with_capacity(map.len());
            for (key, child) in map {
                indexed.push((key.parse::<usize>().ok()?, child));
            }
            indexed.sort_by_key(|(i, _)| *i);
            Some(indexed.into_iter().map(|(_, v)| v).collect())
        }
        _ => None,
    }
}
