//! A decorator that keeps selected fields out of the wrapped store.
//!
//! Fields named at construction are read from and written to a private map
//! held by the decorator. The wrapped store never sees those fields; every
//! other operation is forwarded untouched.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use lexo_types::{FieldKind, FieldTag, ObjectId, PropValue, TypeError};
use tracing::debug;

use crate::decorator::StoreDecorator;
use crate::error::{StoreError, StoreResult};
use crate::traits::PropertyStore;

/// Serves a fixed set of field tags from an in-decorator overlay.
pub struct OverlayStore {
    inner: Arc<dyn PropertyStore>,
    fields: HashSet<FieldTag>,
    overlay: RwLock<HashMap<(ObjectId, FieldTag), PropValue>>,
}

impl OverlayStore {
    pub fn new(inner: Arc<dyn PropertyStore>, fields: impl IntoIterator<Item = FieldTag>) -> Self {
        Self {
            inner,
            fields: fields.into_iter().collect(),
            overlay: RwLock::new(HashMap::new()),
        }
    }

    /// Returns `true` if `tag` is served by the overlay.
    pub fn intercepts(&self, tag: FieldTag) -> bool {
        self.fields.contains(&tag)
    }

    /// Number of (object, field) values currently held in the overlay.
    pub fn overlay_len(&self) -> usize {
        self.overlay.read().expect("overlay lock poisoned").len()
    }

    /// Drop every overlay value.
    pub fn clear_overlay(&self) {
        let mut overlay = self.overlay.write().expect("overlay lock poisoned");
        debug!(count = overlay.len(), "overlay cleared");
        overlay.clear();
    }

    fn get(&self, id: ObjectId, tag: FieldTag) -> Option<PropValue> {
        self.overlay
            .read()
            .expect("overlay lock poisoned")
            .get(&(id, tag))
            .cloned()
    }

    fn put(&self, id: ObjectId, tag: FieldTag, value: PropValue) {
        self.overlay
            .write()
            .expect("overlay lock poisoned")
            .insert((id, tag), value);
    }

    fn overlay_vector(&self, id: ObjectId, tag: FieldTag) -> StoreResult<Vec<ObjectId>> {
        match self.get(id, tag) {
            None => Ok(Vec::new()),
            Some(PropValue::Vector(items)) => Ok(items),
            Some(other) => Err(StoreError::Type(TypeError::KindMismatch {
                expected: FieldKind::ReferenceSequence,
                actual: other.kind_name().to_string(),
            })),
        }
    }
}

impl StoreDecorator for OverlayStore {
    fn inner(&self) -> &dyn PropertyStore {
        self.inner.as_ref()
    }

    fn value(&self, id: ObjectId, tag: FieldTag) -> StoreResult<Option<PropValue>> {
        if self.intercepts(tag) {
            return Ok(self.get(id, tag));
        }
        self.inner.value(id, tag)
    }

    fn set_value(&self, id: ObjectId, tag: FieldTag, value: PropValue) -> StoreResult<()> {
        if self.intercepts(tag) {
            self.put(id, tag, value);
            return Ok(());
        }
        self.inner.set_value(id, tag, value)
    }

    fn is_cached(&self, id: ObjectId, tag: FieldTag) -> StoreResult<bool> {
        if self.intercepts(tag) {
            return Ok(self.get(id, tag).is_some());
        }
        self.inner.is_cached(id, tag)
    }

    fn evict(&self, id: ObjectId, tag: FieldTag) -> StoreResult<()> {
        if self.intercepts(tag) {
            self.overlay
                .write()
                .expect("overlay lock poisoned")
                .remove(&(id, tag));
            return Ok(());
        }
        self.inner.evict(id, tag)
    }

    fn int(&self, id: ObjectId, tag: FieldTag) -> StoreResult<i64> {
        if self.intercepts(tag) {
            return match self.get(id, tag) {
                None => Ok(0),
                Some(PropValue::Integer(v)) => Ok(v),
                Some(other) => Err(TypeError::KindMismatch {
                    expected: FieldKind::Integer,
                    actual: other.kind_name().to_string(),
                }
                .into()),
            };
        }
        self.inner.int(id, tag)
    }

    fn set_int(&self, id: ObjectId, tag: FieldTag, v: i64) -> StoreResult<()> {
        StoreDecorator::set_value(self, id, tag, PropValue::Integer(v))
    }

    fn boolean(&self, id: ObjectId, tag: FieldTag) -> StoreResult<bool> {
        if self.intercepts(tag) {
            return match self.get(id, tag) {
                None => Ok(false),
                Some(PropValue::Boolean(b)) => Ok(b),
                Some(other) => Err(TypeError::KindMismatch {
                    expected: FieldKind::Boolean,
                    actual: other.kind_name().to_string(),
                }
                .into()),
            };
        }
        self.inner.boolean(id, tag)
    }

    fn set_boolean(&self, id: ObjectId, tag: FieldTag, v: bool) -> StoreResult<()> {
        StoreDecorator::set_value(self, id, tag, PropValue::Boolean(v))
    }

    fn string(&self, id: ObjectId, tag: FieldTag) -> StoreResult<Option<String>> {
        if self.intercepts(tag) {
            return match self.get(id, tag) {
                None => Ok(None),
                Some(PropValue::String(s)) => Ok(Some(s)),
                Some(other) => Err(TypeError::KindMismatch {
                    expected: FieldKind::String,
                    actual: other.kind_name().to_string(),
                }
                .into()),
            };
        }
        self.inner.string(id, tag)
    }

    fn set_string(&self, id: ObjectId, tag: FieldTag, text: &str) -> StoreResult<()> {
        StoreDecorator::set_value(self, id, tag, PropValue::String(text.to_string()))
    }

    fn object(&self, id: ObjectId, tag: FieldTag) -> StoreResult<Option<ObjectId>> {
        if self.intercepts(tag) {
            return match self.get(id, tag) {
                None => Ok(None),
                Some(PropValue::Object(o)) => Ok((!o.is_null()).then_some(o)),
                Some(other) => Err(TypeError::KindMismatch {
                    expected: FieldKind::ReferenceAtomic,
                    actual: other.kind_name().to_string(),
                }
                .into()),
            };
        }
        self.inner.object(id, tag)
    }

    fn vector(&self, id: ObjectId, tag: FieldTag) -> StoreResult<Vec<ObjectId>> {
        if self.intercepts(tag) {
            return self.overlay_vector(id, tag);
        }
        self.inner.vector(id, tag)
    }

    fn replace_range(
        &self,
        id: ObjectId,
        tag: FieldTag,
        start: usize,
        end: usize,
        items: &[ObjectId],
    ) -> StoreResult<()> {
        if !self.intercepts(tag) {
            return self.inner.replace_range(id, tag, start, end, items);
        }
        let mut current = self.overlay_vector(id, tag)?;
        if start > end || end > current.len() {
            return Err(StoreError::RangeOutOfBounds {
                start,
                end,
                len: current.len(),
            });
        }
        current.splice(start..end, items.iter().copied());
        self.put(id, tag, PropValue::Vector(current));
        Ok(())
    }

    fn vector_size(&self, id: ObjectId, tag: FieldTag) -> StoreResult<usize> {
        Ok(StoreDecorator::vector(self, id, tag)?.len())
    }

    fn vector_item(&self, id: ObjectId, tag: FieldTag, index: usize) -> StoreResult<ObjectId> {
        if !self.intercepts(tag) {
            return self.inner.vector_item(id, tag, index);
        }
        let items = self.overlay_vector(id, tag)?;
        items.get(index).copied().ok_or(StoreError::IndexOutOfRange {
            index,
            len: items.len(),
        })
    }

    fn vector_index_of(&self, id: ObjectId, tag: FieldTag, item: ObjectId) -> StoreResult<Option<usize>> {
        if !self.intercepts(tag) {
            return self.inner.vector_index_of(id, tag, item);
        }
        Ok(self.overlay_vector(id, tag)?.iter().position(|x| *x == item))
    }
}
