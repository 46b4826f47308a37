use lexo_store::StoreError;
use lexo_types::{FieldTag, ObjectId};

/// Errors from virtual-property installation and evaluation.
#[derive(Debug, thiserror::Error)]
pub enum VirtualError {
    /// A configured class is not in the catalog.
    #[error("unknown class: {0}")]
    UnknownClass(String),

    /// A configured field is not on the class or its ancestors.
    #[error("unknown field {class}.{field}")]
    UnknownField { class: String, field: String },

    /// No factory is registered under this implementation name.
    #[error("unknown virtual property implementation: {0}")]
    UnknownImplementation(String),

    /// The configured class/field differ from what the implementation serves.
    #[error("{implementation} implements {expected} but was configured as {declared}")]
    NameMismatch {
        implementation: String,
        expected: String,
        declared: String,
    },

    /// Implementation parameters were missing or malformed.
    #[error("invalid parameters for {implementation}: {reason}")]
    InvalidParams {
        implementation: String,
        reason: String,
    },

    /// The name is already taken by a stored field of the class.
    #[error("{class}.{field} is a stored field; a virtual property cannot replace it")]
    StoredField { class: String, field: String },

    /// No virtual property is installed under this tag.
    #[error("no virtual property installed as {0}")]
    NotInstalled(FieldTag),

    /// Writes to a read-only virtual property.
    #[error("virtual property {class}.{field} is not writable")]
    ReadOnly { class: String, field: String },

    /// The object is not an instance of the class the handler serves.
    #[error("{id} is not an instance of {expected}")]
    WrongOwnerClass { id: ObjectId, expected: String },

    /// A dependency path named something the catalog cannot resolve.
    #[error("cannot resolve '{name}' on {class} in dependency path '{path}'")]
    Unresolved {
        path: String,
        name: String,
        class: String,
    },

    /// The property store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Result alias for virtual-property operations.
pub type VirtualResult<T> = Result<T, VirtualError>;
