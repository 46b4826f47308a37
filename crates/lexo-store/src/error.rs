use lexo_meta::CatalogError;
use lexo_types::{FieldKind, FieldTag, ObjectId, TypeError};

/// Errors from property store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested object does not exist.
    #[error("object not found: {0}")]
    NotFound(ObjectId),

    /// The field tag is not known to the catalog.
    #[error("unknown field: {0}")]
    UnknownField(FieldTag),

    /// The operation does not apply to fields of this kind.
    #[error("{tag} is a {kind} field, expected {expected}")]
    WrongFieldKind {
        tag: FieldTag,
        kind: FieldKind,
        expected: &'static str,
    },

    /// A vector index was past the end of the vector.
    #[error("index {index} out of range for vector of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// A replace range was malformed or past the end of the vector.
    #[error("range {start}..{end} out of bounds for vector of length {len}")]
    RangeOutOfBounds { start: usize, end: usize, len: usize },

    /// Moving the object would make it (indirectly) own itself.
    #[error("{item} cannot be owned by {owner}: ownership cycle")]
    OwnershipCycle { item: ObjectId, owner: ObjectId },

    /// Abstract classes cannot be instantiated.
    #[error("cannot create an instance of abstract class {0}")]
    AbstractClass(String),

    /// The operation needs an owned object.
    #[error("{0} has no owner")]
    Unowned(ObjectId),

    /// The object already appears in this owning vector.
    #[error("{item} already owned by this vector")]
    DuplicateOwnership { item: ObjectId },

    /// A value did not fit the field it was stored into.
    #[error(transparent)]
    Type(#[from] TypeError),

    /// The metadata catalog rejected an operation.
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// `end_task`/`continue_task` called without an open task.
    #[error("no open task")]
    NoOpenTask,

    /// The store has been torn down.
    #[error("store has been disposed")]
    Disposed,

    /// The query layer behind the store failed.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
