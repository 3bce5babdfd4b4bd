use std::fmt;

/// Errors surfaced by decode and encode.
///
/// Missing data is never an error: absent path segments decode to null and
/// encode substitutes declared defaults. Errors are reserved for values
/// that contradict their declared kind, failed injected transforms, and
/// document paths that collide structurally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A value's runtime type does not match the descriptor's kind.
    Coercion {
        field: String,
        expected: &'static str,
        got: String,
    },
    /// An injected value transform rejected the raw value.
    Transform { field: String, message: String },
    /// Two descriptors address the same document node as different
    /// collection kinds.
    PathConflict { field: String, segment: String },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Coercion {
                field,
                expected,
                got,
            } => {
                write!(f, "field '{}': expected {}, got {}", field, expected, got)
            }
            CodecError::Transform { field, message } => {
                write!(f, "field '{}': value transform failed: {}", field, message)
            }
            CodecError::PathConflict { field, segment } => {
                write!(
                    f,
                    "field '{}': segment '{}' is already used with a different collection kind",
                    field, segment
                )
            }
        }
    }
}

impl std::error::Error for CodecError {}
