//! grantdoc-envelope: shared envelope document types for the grantdoc codec.
//!
//! The envelope format is the nested map/sequence JSON structure used to
//! persist and exchange grant applications with the document store and the
//! case-processing system. This crate holds the types both codec directions
//! share: the tagged-entry leaf encoding, the runtime value model, and the
//! structural helpers for telling sequences apart from keyed objects.

pub mod entry;
pub mod seq;
pub mod value;

pub use entry::{TaggedEntry, ValueType};
pub use seq::{child, is_record_list, sequence_elements, PathStep};
pub use value::{FieldRecord, FieldValue, NumberOutOfRange, TypedTree};
