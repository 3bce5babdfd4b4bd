//! grantdoc-codec: schema-driven codec between envelope documents and
//! typed value trees.
//!
//! A grant application lives in two representations: the "envelope" JSON
//! document exchanged with the document store and case-processing system,
//! and an in-memory typed value tree whose shape is declared once as a
//! table of field descriptors. This crate implements the bidirectional
//! mapping between them.
//!
//! # Public API
//!
//! Key types are re-exported at the crate root for convenience:
//!
//! - [`decode()`] -- envelope document to typed value tree
//! - [`encode()`] -- typed value tree to envelope document
//! - [`DescriptorTable`] / [`FieldDescriptor`] -- the per-document-type
//!   field table, validated on construction
//! - [`SchemaIndex`] -- read-only name-to-shape lookup built once from the
//!   envelope schema
//! - [`CodecError`] -- decode/encode error type
//!
//! The caller builds a [`DescriptorTable`] and a [`SchemaIndex`] once per
//! document type, then calls [`decode()`] / [`encode()`] per request. Both
//! are pure functions; the table and index are shareable across threads.

pub mod decode;
pub mod descriptor;
pub mod encode;
pub mod error;
pub mod schema;

// ── Convenience re-exports: key types ────────────────────────────────

pub use descriptor::{
    DescriptorTable, FieldDescriptor, ItemField, TableError, ValueKind, ValueTransform,
};
pub use error::CodecError;
pub use grantdoc_envelope::{FieldRecord, FieldValue, TaggedEntry, TypedTree, ValueType};
pub use schema::{SchemaError, SchemaIndex, Shape};

// ── Convenience re-exports: codec entry points ───────────────────────

pub use decode::decode;
pub use encode::{encode, DroppedField, Encoded, ATTACHMENTS_INFO_KEY};
