//! Error types for catalog operations.

use lexo_types::ClassId;
use thiserror::Error;

/// Errors that can occur while defining or querying metadata.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// No class with this name is defined.
    #[error("unknown class: {0}")]
    UnknownClass(String),

    /// No class with this id is defined.
    #[error("unknown class id: {0}")]
    UnknownClassId(ClassId),

    /// A class with this id or name already exists.
    #[error("class already defined: {name}")]
    DuplicateClass { name: String },

    /// The class already has a field with this name.
    #[error("field already defined: {class}.{field}")]
    DuplicateField { class: String, field: String },

    /// The class has used up its block of field tags.
    #[error("no field tags left on class {0}")]
    TagSpaceExhausted(String),
}

/// Convenience type alias for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;
