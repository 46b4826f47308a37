use thiserror::Error;

use crate::field::FieldKind;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("unknown field kind: {0}")]
    UnknownFieldKind(String),

    #[error("value kind mismatch: expected {expected}, got {actual}")]
    KindMismatch { expected: FieldKind, actual: String },

    #[error("invalid object id: {0}")]
    InvalidObjectId(String),
}
