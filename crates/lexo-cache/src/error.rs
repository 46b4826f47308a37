use lexo_store::StoreError;
use lexo_types::{FieldKind, FieldTag, ObjectId};

/// Errors from materialization and vector views.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// A vector index was past the end of the vector.
    #[error("index {index} out of range for vector of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// The field is not known to the catalog.
    #[error("unknown field: {0}")]
    UnknownField(FieldTag),

    /// A view was opened over a field of a different kind.
    #[error("{tag} is a {actual} field, not {expected}")]
    FieldKindMismatch {
        tag: FieldTag,
        expected: FieldKind,
        actual: FieldKind,
    },

    /// A reference insert of an unowned object whose class needs an owner.
    #[error("{item} is unowned but {class} objects require an owner")]
    OwnerRequired { item: ObjectId, class: String },

    /// The store no longer knows an id the view holds.
    #[error("object missing from store: {0}")]
    Missing(ObjectId),

    /// The property store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Result alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;
