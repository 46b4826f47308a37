//! Typed views over vector-valued properties.
//!
//! A [`VectorView`] wraps one (owner, field) vector. The kind marker fixes
//! the mutation semantics at compile time:
//!
//! | Marker                  | Order | Insert                      | Remove            |
//! |-------------------------|-------|-----------------------------|-------------------|
//! | [`OwningSequence`]      | yes   | takes ownership             | deletes the item  |
//! | [`OwningCollection`]    | no    | takes ownership             | deletes the item  |
//! | [`ReferenceSequence`]   | yes   | links                       | drops the link    |
//! | [`ReferenceCollection`] | no    | links, duplicates ignored   | drops the link    |
//!
//! Positional insertion and range replacement exist only on sequences.
//! Every mutation broadcasts a [`PropChange`] through the store once it is
//! complete.

use std::collections::HashSet;
use std::marker::PhantomData;
use std::ops::Range;
use std::sync::Arc;

use lexo_store::{Ownership, PropChange, PropertyStore, StoreError};
use lexo_types::{ClassId, FieldKind, FieldTag, ObjectId};
use tracing::debug;

use crate::error::{CacheError, CacheResult};
use crate::loader::BatchLoader;
use crate::object::DomainObject;

mod sealed {
    pub trait Sealed {}
}

/// The closed set of vector property kinds.
pub trait VectorKind: sealed::Sealed + Send + Sync + 'static {
    const KIND: FieldKind;
}

/// Kinds whose order is meaningful.
pub trait SequenceKind: VectorKind {}

/// Kinds that own their items.
pub trait OwningKind: VectorKind {}

#[derive(Clone, Copy, Debug)]
pub struct OwningSequence;

#[derive(Clone, Copy, Debug)]
pub struct OwningCollection;

#[derive(Clone, Copy, Debug)]
pub struct ReferenceSequence;

#[derive(Clone, Copy, Debug)]
pub struct ReferenceCollection;

impl sealed::Sealed for OwningSequence {}
impl sealed::Sealed for OwningCollection {}
impl sealed::Sealed for ReferenceSequence {}
impl sealed::Sealed for ReferenceCollection {}

impl VectorKind for OwningSequence {
    const KIND: FieldKind = FieldKind::OwningSequence;
}

impl VectorKind for OwningCollection {
    const KIND: FieldKind = FieldKind::OwningCollection;
}

impl VectorKind for ReferenceSequence {
    const KIND: FieldKind = FieldKind::ReferenceSequence;
}

impl VectorKind for ReferenceCollection {
    const KIND: FieldKind = FieldKind::ReferenceCollection;
}

impl SequenceKind for OwningSequence {}
impl SequenceKind for ReferenceSequence {}
impl OwningKind for OwningSequence {}
impl OwningKind for OwningCollection {}

/// A typed, lazily materialized view of one vector property.
///
/// Views hold no data of their own; every call reads the store. They are
/// cheap to create and meant to be short-lived.
pub struct VectorView<'a, K: VectorKind> {
    loader: BatchLoader<'a>,
    owner: ObjectId,
    tag: FieldTag,
    _kind: PhantomData<K>,
}

impl<'a, K: VectorKind> VectorView<'a, K> {
    /// Open a view, checking that `tag` really is a `K` field.
    pub fn open(loader: BatchLoader<'a>, owner: ObjectId, tag: FieldTag) -> CacheResult<Self> {
        let actual = loader
            .store()
            .metadata()
            .field_kind(tag)
            .ok_or(CacheError::UnknownField(tag))?;
        if actual != K::KIND {
            return Err(CacheError::FieldKindMismatch {
                tag,
                expected: K::KIND,
                actual,
            });
        }
        Ok(Self {
            loader,
            owner,
            tag,
            _kind: PhantomData,
        })
    }

    pub fn owner(&self) -> ObjectId {
        self.owner
    }

    pub fn tag(&self) -> FieldTag {
        self.tag
    }

    pub fn kind(&self) -> FieldKind {
        K::KIND
    }

    fn store(&self) -> &'a dyn PropertyStore {
        self.loader.store()
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// The backing id array.
    pub fn ids(&self) -> CacheResult<Vec<ObjectId>> {
        Ok(self.store().vector(self.owner, self.tag)?)
    }

    pub fn len(&self) -> CacheResult<usize> {
        Ok(self.store().vector_size(self.owner, self.tag)?)
    }

    pub fn is_empty(&self) -> CacheResult<bool> {
        Ok(self.len()? == 0)
    }

    pub fn contains(&self, item: ObjectId) -> CacheResult<bool> {
        Ok(self.index_of(item)?.is_some())
    }

    pub fn index_of(&self, item: ObjectId) -> CacheResult<Option<usize>> {
        Ok(self.store().vector_index_of(self.owner, self.tag, item)?)
    }

    pub fn id_at(&self, index: usize) -> CacheResult<ObjectId> {
        let ids = self.ids()?;
        ids.get(index).copied().ok_or(CacheError::IndexOutOfRange {
            index,
            len: ids.len(),
        })
    }

    /// The materialized object at `index`.
    pub fn item(&self, index: usize) -> CacheResult<Arc<dyn DomainObject>> {
        let id = self.id_at(index)?;
        self.loader
            .materialize_one(id)?
            .ok_or(CacheError::Missing(id))
    }

    /// Every item, in vector order, materialized in a single batch.
    pub fn to_vec(&self) -> CacheResult<Vec<Arc<dyn DomainObject>>> {
        let ids = self.ids()?;
        let objects = self.loader.materialize(&ids)?;
        Ok(ids.iter().filter_map(|id| objects.get(id).cloned()).collect())
    }

    pub fn iter(&self) -> CacheResult<std::vec::IntoIter<Arc<dyn DomainObject>>> {
        Ok(self.to_vec()?.into_iter())
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Add `item` at the end.
    pub fn append(&self, item: ObjectId) -> CacheResult<()> {
        let len = self.len()?;
        self.insert(len, item)
    }

    /// Remove the item at `index` and return its id.
    ///
    /// Owning views delete the item and everything it owns.
    pub fn remove_at(&self, index: usize) -> CacheResult<ObjectId> {
        let id = self.id_at(index)?;
        let store = self.store();
        if K::KIND.is_owning() {
            let doomed = self.owned_subtree(&[id])?;
            store.delete_with_owner_cleanup(id)?;
            self.forget_deleted(&doomed)?;
        } else {
            store.replace_range(self.owner, self.tag, index, index + 1, &[])?;
        }
        store.prop_changed(&PropChange::splice(self.owner, self.tag, index, 0, 1));
        Ok(id)
    }

    /// Remove `item` if present; returns whether anything was removed.
    pub fn remove(&self, item: ObjectId) -> CacheResult<bool> {
        match self.index_of(item)? {
            Some(index) => {
                self.remove_at(index)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Remove every item.
    pub fn clear(&self) -> CacheResult<()> {
        let ids = self.ids()?;
        if ids.is_empty() {
            return Ok(());
        }
        let store = self.store();
        let doomed = if K::KIND.is_owning() {
            self.owned_subtree(&ids)?
        } else {
            Vec::new()
        };
        store.replace_range(self.owner, self.tag, 0, ids.len(), &[])?;
        self.forget_deleted(&doomed)?;
        store.prop_changed(&PropChange::splice(self.owner, self.tag, 0, 0, ids.len()));
        Ok(())
    }

    /// `roots` and every object they own, through stored owning fields.
    fn owned_subtree(&self, roots: &[ObjectId]) -> CacheResult<Vec<ObjectId>> {
        let store = self.store();
        let catalog = store.metadata();
        let mut found = Vec::new();
        let mut pending = roots.to_vec();
        while let Some(id) = pending.pop() {
            found.push(id);
            let mut class = store.class_of(id)?;
            while let Some(c) = class {
                for field in catalog.declared_fields(c) {
                    if field.is_virtual || !field.kind.is_owning() {
                        continue;
                    }
                    if field.kind.is_vector() {
                        pending.extend(store.vector(id, field.tag)?);
                    } else if let Some(child) = store.object(id, field.tag)? {
                        pending.push(child);
                    }
                }
                class = catalog.base_class(c);
            }
        }
        Ok(found)
    }

    /// Drop the cached objects among `candidates` that the store deleted.
    /// Items re-parented out of a removed subtree survive.
    fn forget_deleted(&self, candidates: &[ObjectId]) -> CacheResult<()> {
        let store = self.store();
        let mut forgotten = 0;
        for id in candidates {
            if !store.exists(*id)? && self.loader.cache().forget(*id) {
                forgotten += 1;
            }
        }
        if forgotten > 0 {
            debug!(owner = %self.owner, tag = %self.tag, forgotten, "dropped deleted objects from identity cache");
        }
        Ok(())
    }

    fn check_insert_index(&self, index: usize) -> CacheResult<()> {
        let len = self.len()?;
        if index > len {
            return Err(CacheError::IndexOutOfRange { index, len });
        }
        Ok(())
    }

    fn insert(&self, index: usize, item: ObjectId) -> CacheResult<()> {
        self.check_insert_index(index)?;
        if K::KIND.is_owning() {
            self.insert_owned(index, item)
        } else {
            self.insert_link(index, item)
        }
    }

    fn insert_link(&self, index: usize, item: ObjectId) -> CacheResult<()> {
        let store = self.store();
        if K::KIND.is_collection() && self.contains(item)? {
            debug!(owner = %self.owner, tag = %self.tag, %item, "duplicate reference ignored");
            return Ok(());
        }
        self.check_linkable(item)?;
        store.replace_range(self.owner, self.tag, index, index, &[item])?;
        store.prop_changed(&PropChange::splice(self.owner, self.tag, index, 1, 0));
        Ok(())
    }

    fn insert_owned(&self, index: usize, item: ObjectId) -> CacheResult<()> {
        let store = self.store();
        let here = Ownership {
            owner: self.owner,
            field: self.tag,
        };
        if store.owner_of(item)? == Some(here) {
            return self.move_within(index, item);
        }
        let vacated = self.vacated_slot(item)?;
        store.change_owner(item, self.owner, self.tag, Some(index))?;
        if let Some(change) = vacated {
            store.prop_changed(&change);
        }
        store.prop_changed(&PropChange::splice(self.owner, self.tag, index, 1, 0));
        Ok(())
    }

    /// Reposition an item this vector already owns. No-op on collections.
    fn move_within(&self, index: usize, item: ObjectId) -> CacheResult<()> {
        if K::KIND.is_collection() {
            return Ok(());
        }
        let old = self.index_of(item)?.ok_or(CacheError::Missing(item))?;
        let target = if index > old { index - 1 } else { index };
        if target == old {
            return Ok(());
        }
        self.store()
            .change_owner(item, self.owner, self.tag, Some(target))?;
        let (lo, hi) = (old.min(target), old.max(target));
        let span = hi - lo + 1;
        self.store()
            .prop_changed(&PropChange::splice(self.owner, self.tag, lo, span, span));
        Ok(())
    }

    /// The notification owed to an item's previous owner once it moves here.
    fn vacated_slot(&self, item: ObjectId) -> CacheResult<Option<PropChange>> {
        let store = self.store();
        let Some(previous) = store.owner_of(item)? else {
            return Ok(None);
        };
        let is_vector = store
            .metadata()
            .field_kind(previous.field)
            .is_some_and(|k| k.is_vector());
        if !is_vector {
            return Ok(Some(PropChange::scalar(previous.owner, previous.field)));
        }
        let position = store.vector_index_of(previous.owner, previous.field, item)?;
        Ok(position.map(|i| PropChange::splice(previous.owner, previous.field, i, 0, 1)))
    }

    /// Reference targets of owner-requiring classes must already be owned.
    fn check_linkable(&self, item: ObjectId) -> CacheResult<()> {
        let store = self.store();
        let class: ClassId = store.class_of(item)?.ok_or(StoreError::NotFound(item))?;
        let catalog = store.metadata();
        if catalog.requires_owner(class) && store.owner_of(item)?.is_none() {
            return Err(CacheError::OwnerRequired {
                item,
                class: catalog
                    .class_name(class)
                    .unwrap_or_else(|| class.to_string()),
            });
        }
        Ok(())
    }
}

impl<'a, K: SequenceKind> VectorView<'a, K> {
    /// Insert `item` before position `index` (`index == len` appends).
    pub fn insert_at(&self, index: usize, item: ObjectId) -> CacheResult<()> {
        self.insert(index, item)
    }

    /// Replace the items in `range` with `items`.
    pub fn replace(&self, range: Range<usize>, items: &[ObjectId]) -> CacheResult<()> {
        let store = self.store();
        let current = self.ids()?;
        if range.start > range.end || range.end > current.len() {
            return Err(StoreError::RangeOutOfBounds {
                start: range.start,
                end: range.end,
                len: current.len(),
            }
            .into());
        }

        let mut vacated = Vec::new();
        if K::KIND.is_owning() {
            let here = Ownership {
                owner: self.owner,
                field: self.tag,
            };
            for item in items {
                if store.owner_of(*item)? != Some(here) {
                    vacated.extend(self.vacated_slot(*item)?);
                }
            }
        } else {
            for item in items {
                self.check_linkable(*item)?;
            }
        }

        let doomed = if K::KIND.is_owning() {
            let kept: HashSet<ObjectId> = items.iter().copied().collect();
            let dropped: Vec<ObjectId> = current[range.clone()]
                .iter()
                .copied()
                .filter(|id| !kept.contains(id))
                .collect();
            self.owned_subtree(&dropped)?
        } else {
            Vec::new()
        };
        store.replace_range(self.owner, self.tag, range.start, range.end, items)?;
        self.forget_deleted(&doomed)?;
        for change in &vacated {
            store.prop_changed(change);
        }
        store.prop_changed(&PropChange::splice(
            self.owner,
            self.tag,
            range.start,
            items.len(),
            range.end - range.start,
        ));
        Ok(())
    }
}

impl<'a, K: OwningKind> VectorView<'a, K> {
    /// Create a new object of `class` owned by this vector, at the end.
    pub fn append_new(&self, class: ClassId) -> CacheResult<ObjectId> {
        let store = self.store();
        let id = store.create_owned(class, self.owner, self.tag, None)?;
        let index = store.vector_size(self.owner, self.tag)?.saturating_sub(1);
        store.prop_changed(&PropChange::splice(self.owner, self.tag, index, 1, 0));
        Ok(id)
    }
}

impl<K: VectorKind> std::fmt::Debug for VectorView<'_, K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorView")
            .field("owner", &self.owner)
            .field("tag", &self.tag)
            .field("kind", &K::KIND)
            .finish()
    }
}
