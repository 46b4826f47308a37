use std::sync::Arc;

use lexo_meta::MetadataCatalog;
use lexo_types::{ClassId, FieldKind, FieldTag, ObjectId, PropValue, TypeError, WsId};

use crate::error::{StoreError, StoreResult};
use crate::notify::{ChangeListener, SubscriptionId};
use crate::types::{LoadScope, ObjectRecord, Ownership, PropChange};

/// Keyed store of typed properties, vectors and object lifecycle.
///
/// All implementations must satisfy these invariants:
/// - The store is the sole source of truth; nothing above it caches data it
///   cannot rebuild from here.
/// - Mutations do not broadcast. Callers invoke [`prop_changed`] after each
///   completed change.
/// - An owning vector only ever holds objects whose owner is the vector's
///   holder.
/// - Errors are propagated, never retried or repaired.
///
/// [`prop_changed`]: PropertyStore::prop_changed
pub trait PropertyStore: Send + Sync {
    // ---------------------------------------------------------------
    // Query layer
    // ---------------------------------------------------------------

    /// Runtime class of an object, or `None` if the store does not know it.
    fn class_of(&self, id: ObjectId) -> StoreResult<Option<ClassId>>;

    /// Every id whose runtime class is exactly `class`, ascending.
    fn ids_of_class(&self, class: ClassId) -> StoreResult<Vec<ObjectId>>;

    /// Number of instances whose runtime class is exactly `class`.
    fn instance_count(&self, class: ClassId) -> StoreResult<usize>;

    /// Fetch object records of one class.
    fn fetch_records(&self, class: ClassId, scope: LoadScope<'_>) -> StoreResult<Vec<ObjectRecord>>;

    /// Returns `true` if the object exists.
    fn exists(&self, id: ObjectId) -> StoreResult<bool>;

    /// Owner and owning field of an object; `None` for unowned objects.
    fn owner_of(&self, id: ObjectId) -> StoreResult<Option<Ownership>>;

    // ---------------------------------------------------------------
    // Properties
    // ---------------------------------------------------------------

    /// The cached value of a property, if any.
    fn value(&self, id: ObjectId, tag: FieldTag) -> StoreResult<Option<PropValue>>;

    /// Store a property value.
    fn set_value(&self, id: ObjectId, tag: FieldTag, value: PropValue) -> StoreResult<()>;

    /// One alternative of a multilingual string.
    fn multi_string(&self, id: ObjectId, tag: FieldTag, ws: WsId) -> StoreResult<Option<String>>;

    /// Set one alternative of a multilingual string.
    fn set_multi_string(&self, id: ObjectId, tag: FieldTag, ws: WsId, text: &str) -> StoreResult<()>;

    /// Returns `true` if a value is present for (object, field).
    fn is_cached(&self, id: ObjectId, tag: FieldTag) -> StoreResult<bool>;

    /// Drop the cached value for (object, field).
    fn evict(&self, id: ObjectId, tag: FieldTag) -> StoreResult<()>;

    /// Integer property; missing values read as zero.
    fn int(&self, id: ObjectId, tag: FieldTag) -> StoreResult<i64> {
        match self.value(id, tag)? {
            None => Ok(0),
            Some(PropValue::Integer(v)) => Ok(v),
            Some(other) => Err(mismatch(FieldKind::Integer, &other)),
        }
    }

    fn set_int(&self, id: ObjectId, tag: FieldTag, v: i64) -> StoreResult<()> {
        self.set_value(id, tag, PropValue::Integer(v))
    }

    /// Boolean property; missing values read as `false`.
    fn boolean(&self, id: ObjectId, tag: FieldTag) -> StoreResult<bool> {
        match self.value(id, tag)? {
            None => Ok(false),
            Some(PropValue::Boolean(b)) => Ok(b),
            Some(other) => Err(mismatch(FieldKind::Boolean, &other)),
        }
    }

    fn set_boolean(&self, id: ObjectId, tag: FieldTag, v: bool) -> StoreResult<()> {
        self.set_value(id, tag, PropValue::Boolean(v))
    }

    fn string(&self, id: ObjectId, tag: FieldTag) -> StoreResult<Option<String>> {
        match self.value(id, tag)? {
            None => Ok(None),
            Some(PropValue::String(s)) => Ok(Some(s)),
            Some(other) => Err(mismatch(FieldKind::String, &other)),
        }
    }

    fn set_string(&self, id: ObjectId, tag: FieldTag, text: &str) -> StoreResult<()> {
        self.set_value(id, tag, PropValue::String(text.to_string()))
    }

    /// Atomic object property; missing or null values read as `None`.
    fn object(&self, id: ObjectId, tag: FieldTag) -> StoreResult<Option<ObjectId>> {
        match self.value(id, tag)? {
            None => Ok(None),
            Some(PropValue::Object(o)) => Ok((!o.is_null()).then_some(o)),
            Some(other) => Err(mismatch(FieldKind::ReferenceAtomic, &other)),
        }
    }

    // ---------------------------------------------------------------
    // Vectors
    // ---------------------------------------------------------------

    /// The full vector; a missing vector reads as empty.
    fn vector(&self, id: ObjectId, tag: FieldTag) -> StoreResult<Vec<ObjectId>>;

    /// Replace the items in `start..end` with `items`.
    ///
    /// On owning vectors inserted items are re-parented here and removed
    /// items that are not re-inserted are deleted along with everything they
    /// own.
    fn replace_range(
        &self,
        id: ObjectId,
        tag: FieldTag,
        start: usize,
        end: usize,
        items: &[ObjectId],
    ) -> StoreResult<()>;

    fn vector_size(&self, id: ObjectId, tag: FieldTag) -> StoreResult<usize> {
        Ok(self.vector(id, tag)?.len())
    }

    fn vector_item(&self, id: ObjectId, tag: FieldTag, index: usize) -> StoreResult<ObjectId> {
        let items = self.vector(id, tag)?;
        items.get(index).copied().ok_or(StoreError::IndexOutOfRange {
            index,
            len: items.len(),
        })
    }

    fn vector_index_of(&self, id: ObjectId, tag: FieldTag, item: ObjectId) -> StoreResult<Option<usize>> {
        Ok(self.vector(id, tag)?.iter().position(|x| *x == item))
    }

    // ---------------------------------------------------------------
    // Object lifecycle
    // ---------------------------------------------------------------

    /// Create an unowned object.
    fn create_object(&self, class: ClassId) -> StoreResult<ObjectId>;

    /// Create an object owned by `owner` in `field`, at `index` for
    /// sequences (`None` appends).
    fn create_owned(
        &self,
        class: ClassId,
        owner: ObjectId,
        field: FieldTag,
        index: Option<usize>,
    ) -> StoreResult<ObjectId>;

    /// Delete an object and everything it owns. The owner's property is left
    /// untouched.
    fn delete_object(&self, id: ObjectId) -> StoreResult<()>;

    /// Delete an object and everything it owns, and remove it from its
    /// owner's property.
    fn delete_with_owner_cleanup(&self, id: ObjectId) -> StoreResult<()>;

    /// Move an object into `field` of `new_owner`.
    fn change_owner(
        &self,
        id: ObjectId,
        new_owner: ObjectId,
        field: FieldTag,
        index: Option<usize>,
    ) -> StoreResult<()>;

    /// Create an object of the same class as `after` and insert it directly
    /// after `after` in the owning sequence that holds it.
    fn insert_new_after(&self, after: ObjectId) -> StoreResult<ObjectId>;

    // ---------------------------------------------------------------
    // Notifications
    // ---------------------------------------------------------------

    fn subscribe(&self, listener: Arc<dyn ChangeListener>) -> SubscriptionId;

    fn unsubscribe(&self, id: SubscriptionId) -> bool;

    /// Broadcast a completed change to every subscriber.
    fn prop_changed(&self, change: &PropChange);

    // ---------------------------------------------------------------
    // Metadata
    // ---------------------------------------------------------------

    /// The catalog describing the data in this store.
    fn metadata(&self) -> Arc<dyn MetadataCatalog>;

    /// Register a computed field and return its stable tag.
    fn install_virtual(
        &self,
        class_name: &str,
        field_name: &str,
        kind: FieldKind,
        signature: Option<ClassId>,
    ) -> StoreResult<FieldTag>;

    // ---------------------------------------------------------------
    // Task brackets and teardown
    // ---------------------------------------------------------------

    fn begin_task(&self, label: &str) -> StoreResult<()>;

    fn end_task(&self) -> StoreResult<()>;

    fn continue_task(&self, label: &str) -> StoreResult<()>;

    fn break_task(&self) -> StoreResult<()>;

    fn task_depth(&self) -> usize;

    /// Returns `true` once the store has been torn down.
    fn is_disposed(&self) -> bool;

    /// Tear the store down. Later operations may fail with
    /// [`StoreError::Disposed`].
    fn dispose(&self);
}

fn mismatch(expected: FieldKind, actual: &PropValue) -> StoreError {
    StoreError::Type(TypeError::KindMismatch {
        expected,
        actual: actual.kind_name().to_string(),
    })
}
