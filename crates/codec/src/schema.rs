//! Schema index -- read-only lookup from field/group name to declared shape.
//!
//! The envelope schema for a document type is a JSON-Schema-like document
//! (`properties`, nested `object`/`array`, `items`, an `enum` on the `ID`
//! property of tagged records). The index is built once by walking that
//! document and pre-indexing every reachable name, so each lookup is a map
//! access instead of a schema search, and a name declared in several places
//! resolves deterministically to its first declaration.

use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

/// Errors from building a schema index.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("failed to read schema file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse schema file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid schema document: {0}")]
    InvalidSchema(String),
}

/// Declared shape of a named element in the envelope schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    /// Object with named sub-keys.
    Object,
    /// Sequence of tagged records; `ids` enumerates the member field ids.
    RecordArray { ids: BTreeSet<String> },
    /// A member field found through a record array's `ID` enumeration.
    RecordMember { group: String },
    /// Sequence of plain scalars.
    ScalarArray,
    /// Bare string leaf.
    String,
    /// Bare numeric leaf.
    Number,
}

impl Shape {
    /// Whether a value of this shape is written as a bare key/value pair.
    /// Record shapes -- and a lookup miss -- take the tagged-entry form.
    pub fn emits_bare(&self) -> bool {
        matches!(
            self,
            Shape::Object | Shape::ScalarArray | Shape::String | Shape::Number
        )
    }
}

/// Pre-built name-to-shape index over one envelope schema. Built once,
/// immutable and shareable across concurrent decode/encode calls.
#[derive(Debug, Clone)]
pub struct SchemaIndex {
    shapes: HashMap<String, Shape>,
}

impl SchemaIndex {
    /// Load and index a schema from a configured file path.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let src = std::fs::read_to_string(path)?;
        let doc: Value = serde_json::from_str(&src)?;
        SchemaIndex::from_value(&doc)
    }

    /// Index an already-parsed schema document.
    pub fn from_value(schema: &Value) -> Result<Self, SchemaError> {
        let props = schema
            .get("properties")
            .and_then(Value::as_object)
            .ok_or_else(|| {
                SchemaError::InvalidSchema(
                    "root must be an object schema with 'properties'".to_owned(),
                )
            })?;

        let mut shapes = HashMap::new();
        for (name, prop) in props {
            index_property(name, prop, &mut shapes);
        }
        Ok(SchemaIndex { shapes })
    }

    /// Declared shape for a name. `None` means the name is unknown to the
    /// schema; callers fall back to tagged-entry scalar encoding.
    pub fn lookup(&self, element_name: &str) -> Option<&Shape> {
        self.shapes.get(element_name)
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}

fn schema_type(prop: &Value) -> Option<&str> {
    prop.get("type").and_then(Value::as_str)
}

/// The enumerated `ID` set of a tagged-record item schema, if it has one.
fn record_item_ids(items: &Value) -> Option<BTreeSet<String>> {
    let id_values = items
        .get("properties")?
        .get("ID")?
        .get("enum")?
        .as_array()?;
    Some(
        id_values
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_owned)
            .collect(),
    )
}

fn index_property(name: &str, prop: &Value, shapes: &mut HashMap<String, Shape>) {
    match schema_type(prop) {
        Some("object") => {
            insert_first(shapes, name, Shape::Object);
            if let Some(children) = prop.get("properties").and_then(Value::as_object) {
                for (child_name, child) in children {
                    index_property(child_name, child, shapes);
                }
            }
        }
        Some("array") => {
            // Record groups nest either one or two array levels deep:
            // items may be the tagged-record object directly, or an array
            // whose items are.
            let mut items = prop.get("items");
            if let Some(inner) = items {
                if schema_type(inner) == Some("array") {
                    items = inner.get("items");
                }
            }
            match items.and_then(record_item_ids) {
                Some(ids) => {
                    for id in &ids {
                        insert_first(
                            shapes,
                            id,
                            Shape::RecordMember {
                                group: name.to_owned(),
                            },
                        );
                    }
                    insert_first(shapes, name, Shape::RecordArray { ids });
                }
                None => insert_first(shapes, name, Shape::ScalarArray),
            }
        }
        Some("number") | Some("integer") => insert_first(shapes, name, Shape::Number),
        // Untyped and unknown leaves read as strings, the safest scalar.
        _ => insert_first(shapes, name, Shape::String),
    }
}

/// First declaration wins; later duplicates never shadow it.
fn insert_first(shapes: &mut HashMap<String, Shape>, name: &str, shape: Shape) {
    shapes.entry(name.to_owned()).or_insert(shape);
}
