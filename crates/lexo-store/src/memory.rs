use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use lexo_meta::{CatalogError, FieldDef, MetadataCatalog};
use lexo_types::{ClassId, FieldKind, FieldTag, ObjectId, PropValue, WsId};

use crate::error::{StoreError, StoreResult};
use crate::notify::{ChangeListener, ListenerSet, SubscriptionId};
use crate::task::TaskTracker;
use crate::traits::PropertyStore;
use crate::types::{LoadScope, ObjectRecord, Ownership, PropChange};

#[derive(Clone, Debug)]
struct ObjectEntry {
    class: ClassId,
    owner: Option<Ownership>,
}

#[derive(Debug)]
struct StoreState {
    objects: BTreeMap<ObjectId, ObjectEntry>,
    values: HashMap<(ObjectId, FieldTag), PropValue>,
    strings: HashMap<(ObjectId, FieldTag, WsId), String>,
    next_id: i64,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            objects: BTreeMap::new(),
            values: HashMap::new(),
            strings: HashMap::new(),
            next_id: 1,
        }
    }
}

impl StoreState {
    fn entry(&self, id: ObjectId) -> StoreResult<&ObjectEntry> {
        self.objects.get(&id).ok_or(StoreError::NotFound(id))
    }

    fn allocate(&mut self, class: ClassId) -> ObjectId {
        let id = ObjectId::new(self.next_id);
        self.next_id += 1;
        self.objects.insert(id, ObjectEntry { class, owner: None });
        id
    }

    /// Returns `true` if `candidate` is `id` or owns it, directly or not.
    fn owns_or_is(&self, candidate: ObjectId, id: ObjectId) -> bool {
        let mut current = Some(id);
        while let Some(c) = current {
            if c == candidate {
                return true;
            }
            current = self
                .objects
                .get(&c)
                .and_then(|e| e.owner)
                .map(|o| o.owner);
        }
        false
    }

    fn vector(&self, id: ObjectId, tag: FieldTag) -> Vec<ObjectId> {
        self.values
            .get(&(id, tag))
            .and_then(|v| v.as_vector())
            .map(<[ObjectId]>::to_vec)
            .unwrap_or_default()
    }

    /// Remove `item` from the property that currently owns it.
    fn detach(&mut self, item: ObjectId) {
        let Some(ownership) = self.objects.get(&item).and_then(|e| e.owner) else {
            return;
        };
        let key = (ownership.owner, ownership.field);
        match self.values.get_mut(&key) {
            Some(PropValue::Vector(ids)) => ids.retain(|x| *x != item),
            Some(PropValue::Object(o)) if *o == item => {
                self.values.remove(&key);
            }
            _ => {}
        }
        if let Some(entry) = self.objects.get_mut(&item) {
            entry.owner = None;
        }
    }

    /// Delete an object and its owned subtree. Returns the deleted ids.
    fn delete_subtree(&mut self, root: ObjectId) -> Vec<ObjectId> {
        let mut doomed = vec![root];
        let mut i = 0;
        while i < doomed.len() {
            let parent = doomed[i];
            doomed.extend(
                self.objects
                    .iter()
                    .filter(|(_, e)| e.owner.is_some_and(|o| o.owner == parent))
                    .map(|(id, _)| *id),
            );
            i += 1;
        }
        let set: HashSet<ObjectId> = doomed.iter().copied().collect();
        for id in &doomed {
            self.objects.remove(id);
        }
        self.values.retain(|(id, _), _| !set.contains(id));
        self.strings.retain(|(id, _, _), _| !set.contains(id));
        doomed
    }
}

/// In-memory, map-based property store.
///
/// Intended for tests, fixtures and embedding. Field kinds are checked
/// against the catalog on every write. Ids are allocated sequentially from 1;
/// fixtures may seed objects with explicit ids.
pub struct InMemoryPropertyStore {
    catalog: Arc<dyn MetadataCatalog>,
    state: RwLock<StoreState>,
    listeners: ListenerSet,
    tasks: TaskTracker,
    disposed: AtomicBool,
}

impl InMemoryPropertyStore {
    /// Create an empty store described by `catalog`.
    pub fn new(catalog: Arc<dyn MetadataCatalog>) -> Self {
        Self {
            catalog,
            state: RwLock::new(StoreState::default()),
            listeners: ListenerSet::new(),
            tasks: TaskTracker::new(),
            disposed: AtomicBool::new(false),
        }
    }

    /// Insert an unowned object with a fixed id.
    pub fn seed_object(&self, id: ObjectId, class: ClassId) -> StoreResult<()> {
        self.check_live()?;
        self.check_instantiable(class)?;
        let mut state = self.state.write().expect("store lock poisoned");
        state.objects.insert(id, ObjectEntry { class, owner: None });
        state.next_id = state.next_id.max(id.raw() + 1);
        Ok(())
    }

    /// Insert an object with a fixed id at the end of an owning property.
    pub fn seed_owned(
        &self,
        id: ObjectId,
        class: ClassId,
        owner: ObjectId,
        field: FieldTag,
    ) -> StoreResult<()> {
        self.seed_object(id, class)?;
        self.change_owner(id, owner, field, None)
    }

    /// Number of live objects.
    pub fn object_count(&self) -> usize {
        self.state.read().expect("store lock poisoned").objects.len()
    }

    /// Labels of completed undo tasks, oldest first.
    pub fn completed_tasks(&self) -> Vec<String> {
        self.tasks.completed()
    }

    fn check_live(&self) -> StoreResult<()> {
        if self.disposed.load(Ordering::Acquire) {
            Err(StoreError::Disposed)
        } else {
            Ok(())
        }
    }

    fn field_def(&self, tag: FieldTag) -> StoreResult<FieldDef> {
        self.catalog.field(tag).ok_or(StoreError::UnknownField(tag))
    }

    fn vector_field(&self, tag: FieldTag) -> StoreResult<FieldDef> {
        let def = self.field_def(tag)?;
        if def.kind.is_vector() {
            Ok(def)
        } else {
            Err(StoreError::WrongFieldKind {
                tag,
                kind: def.kind,
                expected: "a vector field",
            })
        }
    }

    fn check_instantiable(&self, class: ClassId) -> StoreResult<()> {
        let def = self
            .catalog
            .class_def(class)
            .ok_or(CatalogError::UnknownClassId(class))?;
        if def.is_abstract {
            return Err(StoreError::AbstractClass(def.name));
        }
        Ok(())
    }
}

impl PropertyStore for InMemoryPropertyStore {
    fn class_of(&self, id: ObjectId) -> StoreResult<Option<ClassId>> {
        self.check_live()?;
        let state = self.state.read().expect("store lock poisoned");
        Ok(state.objects.get(&id).map(|e| e.class))
    }

    fn ids_of_class(&self, class: ClassId) -> StoreResult<Vec<ObjectId>> {
        self.check_live()?;
        let state = self.state.read().expect("store lock poisoned");
        Ok(state
            .objects
            .iter()
            .filter(|(_, e)| e.class == class)
            .map(|(id, _)| *id)
            .collect())
    }

    fn instance_count(&self, class: ClassId) -> StoreResult<usize> {
        self.check_live()?;
        let state = self.state.read().expect("store lock poisoned");
        Ok(state.objects.values().filter(|e| e.class == class).count())
    }

    fn fetch_records(&self, class: ClassId, scope: LoadScope<'_>) -> StoreResult<Vec<ObjectRecord>> {
        self.check_live()?;
        let state = self.state.read().expect("store lock poisoned");
        let record = |id: ObjectId, e: &ObjectEntry| ObjectRecord {
            id,
            class: e.class,
            owner: e.owner,
        };
        let records = match scope {
            LoadScope::All => state
                .objects
                .iter()
                .filter(|(_, e)| e.class == class)
                .map(|(id, e)| record(*id, e))
                .collect(),
            LoadScope::Exact(ids) => ids
                .iter()
                .filter_map(|id| state.objects.get(id).map(|e| (*id, e)))
                .filter(|(_, e)| e.class == class)
                .map(|(id, e)| record(id, e))
                .collect(),
        };
        Ok(records)
    }

    fn exists(&self, id: ObjectId) -> StoreResult<bool> {
        self.check_live()?;
        Ok(self
            .state
            .read()
            .expect("store lock poisoned")
            .objects
            .contains_key(&id))
    }

    fn owner_of(&self, id: ObjectId) -> StoreResult<Option<Ownership>> {
        self.check_live()?;
        let state = self.state.read().expect("store lock poisoned");
        Ok(state.entry(id)?.owner)
    }

    fn value(&self, id: ObjectId, tag: FieldTag) -> StoreResult<Option<PropValue>> {
        self.check_live()?;
        let state = self.state.read().expect("store lock poisoned");
        state.entry(id)?;
        Ok(state.values.get(&(id, tag)).cloned())
    }

    fn set_value(&self, id: ObjectId, tag: FieldTag, value: PropValue) -> StoreResult<()> {
        self.check_live()?;
        let def = self.field_def(tag)?;
        value.expect_kind(def.kind)?;
        if def.kind.is_owning() && !def.is_virtual {
            return Err(StoreError::WrongFieldKind {
                tag,
                kind: def.kind,
                expected: "a non-owning field",
            });
        }
        let mut state = self.state.write().expect("store lock poisoned");
        state.entry(id)?;
        state.values.insert((id, tag), value);
        Ok(())
    }

    fn multi_string(&self, id: ObjectId, tag: FieldTag, ws: WsId) -> StoreResult<Option<String>> {
        self.check_live()?;
        let state = self.state.read().expect("store lock poisoned");
        state.entry(id)?;
        Ok(state.strings.get(&(id, tag, ws)).cloned())
    }

    fn set_multi_string(&self, id: ObjectId, tag: FieldTag, ws: WsId, text: &str) -> StoreResult<()> {
        self.check_live()?;
        let def = self.field_def(tag)?;
        if def.kind != FieldKind::MultiString {
            return Err(StoreError::WrongFieldKind {
                tag,
                kind: def.kind,
                expected: "a multi_string field",
            });
        }
        let mut state = self.state.write().expect("store lock poisoned");
        state.entry(id)?;
        state.strings.insert((id, tag, ws), text.to_string());
        Ok(())
    }

    fn is_cached(&self, id: ObjectId, tag: FieldTag) -> StoreResult<bool> {
        self.check_live()?;
        let state = self.state.read().expect("store lock poisoned");
        Ok(state.values.contains_key(&(id, tag)))
    }

    fn evict(&self, id: ObjectId, tag: FieldTag) -> StoreResult<()> {
        self.check_live()?;
        self.state
            .write()
            .expect("store lock poisoned")
            .values
            .remove(&(id, tag));
        Ok(())
    }

    fn vector(&self, id: ObjectId, tag: FieldTag) -> StoreResult<Vec<ObjectId>> {
        self.check_live()?;
        self.vector_field(tag)?;
        let state = self.state.read().expect("store lock poisoned");
        state.entry(id)?;
        Ok(state.vector(id, tag))
    }

    fn replace_range(
        &self,
        id: ObjectId,
        tag: FieldTag,
        start: usize,
        end: usize,
        items: &[ObjectId],
    ) -> StoreResult<()> {
        self.check_live()?;
        let def = self.vector_field(tag)?;
        let mut state = self.state.write().expect("store lock poisoned");
        state.entry(id)?;
        let mut current = state.vector(id, tag);
        if start > end || end > current.len() {
            return Err(StoreError::RangeOutOfBounds {
                start,
                end,
                len: current.len(),
            });
        }
        for item in items {
            state.entry(*item)?;
        }

        if !def.kind.is_owning() || def.is_virtual {
            current.splice(start..end, items.iter().copied());
            state.values.insert((id, tag), PropValue::Vector(current));
            return Ok(());
        }

        let mut seen = HashSet::new();
        for item in items {
            if !seen.insert(*item) {
                return Err(StoreError::DuplicateOwnership { item: *item });
            }
            if state.owns_or_is(*item, id) {
                return Err(StoreError::OwnershipCycle { item: *item, owner: id });
            }
            let outside = current[..start].contains(item) || current[end..].contains(item);
            if outside {
                return Err(StoreError::DuplicateOwnership { item: *item });
            }
        }

        let removed: Vec<ObjectId> = current[start..end]
            .iter()
            .copied()
            .filter(|x| !seen.contains(x))
            .collect();
        let here = Ownership { owner: id, field: tag };
        for item in items {
            let owned_here = state.objects.get(item).and_then(|e| e.owner) == Some(here);
            if !owned_here {
                state.detach(*item);
            }
        }
        current.splice(start..end, items.iter().copied());
        state.values.insert((id, tag), PropValue::Vector(current));
        for item in items {
            if let Some(entry) = state.objects.get_mut(item) {
                entry.owner = Some(here);
            }
        }
        for doomed in removed {
            let gone = state.delete_subtree(doomed);
            debug!(root = %doomed, count = gone.len(), "owning replace deleted objects");
        }
        Ok(())
    }

    fn create_object(&self, class: ClassId) -> StoreResult<ObjectId> {
        self.check_live()?;
        self.check_instantiable(class)?;
        let id = self
            .state
            .write()
            .expect("store lock poisoned")
            .allocate(class);
        debug!(%id, %class, "created object");
        Ok(id)
    }

    fn create_owned(
        &self,
        class: ClassId,
        owner: ObjectId,
        field: FieldTag,
        index: Option<usize>,
    ) -> StoreResult<ObjectId> {
        self.check_live()?;
        self.check_instantiable(class)?;
        if !self.exists(owner)? {
            return Err(StoreError::NotFound(owner));
        }
        let id = self
            .state
            .write()
            .expect("store lock poisoned")
            .allocate(class);
        if let Err(e) = self.change_owner(id, owner, field, index) {
            self.state
                .write()
                .expect("store lock poisoned")
                .delete_subtree(id);
            return Err(e);
        }
        Ok(id)
    }

    fn delete_object(&self, id: ObjectId) -> StoreResult<()> {
        self.check_live()?;
        let mut state = self.state.write().expect("store lock poisoned");
        state.entry(id)?;
        let gone = state.delete_subtree(id);
        debug!(%id, count = gone.len(), "deleted object");
        Ok(())
    }

    fn delete_with_owner_cleanup(&self, id: ObjectId) -> StoreResult<()> {
        self.check_live()?;
        let mut state = self.state.write().expect("store lock poisoned");
        state.entry(id)?;
        state.detach(id);
        let gone = state.delete_subtree(id);
        debug!(%id, count = gone.len(), "deleted object and cleaned owner");
        Ok(())
    }

    fn change_owner(
        &self,
        id: ObjectId,
        new_owner: ObjectId,
        field: FieldTag,
        index: Option<usize>,
    ) -> StoreResult<()> {
        self.check_live()?;
        let def = self.field_def(field)?;
        if !def.kind.is_owning() {
            return Err(StoreError::WrongFieldKind {
                tag: field,
                kind: def.kind,
                expected: "an owning field",
            });
        }
        let mut state = self.state.write().expect("store lock poisoned");
        state.entry(id)?;
        state.entry(new_owner)?;
        if state.owns_or_is(id, new_owner) {
            return Err(StoreError::OwnershipCycle { item: id, owner: new_owner });
        }
        let here = Ownership { owner: new_owner, field };

        if def.kind.is_vector() {
            let mut items = state.vector(new_owner, field);
            items.retain(|x| *x != id);
            let at = index.unwrap_or(items.len());
            if at > items.len() {
                return Err(StoreError::IndexOutOfRange { index: at, len: items.len() });
            }
            state.detach(id);
            items.insert(at, id);
            state.values.insert((new_owner, field), PropValue::Vector(items));
        } else {
            let previous = state
                .values
                .get(&(new_owner, field))
                .and_then(PropValue::as_object)
                .filter(|p| *p != id);
            state.detach(id);
            if let Some(previous) = previous {
                state.delete_subtree(previous);
            }
            state.values.insert((new_owner, field), PropValue::Object(id));
        }
        if let Some(entry) = state.objects.get_mut(&id) {
            entry.owner = Some(here);
        }
        Ok(())
    }

    fn insert_new_after(&self, after: ObjectId) -> StoreResult<ObjectId> {
        self.check_live()?;
        let (class, ownership) = {
            let state = self.state.read().expect("store lock poisoned");
            let entry = state.entry(after)?;
            (entry.class, entry.owner.ok_or(StoreError::Unowned(after))?)
        };
        let position = self
            .vector_index_of(ownership.owner, ownership.field, after)?
            .ok_or(StoreError::Unowned(after))?;
        self.create_owned(class, ownership.owner, ownership.field, Some(position + 1))
    }

    fn subscribe(&self, listener: Arc<dyn ChangeListener>) -> SubscriptionId {
        self.listeners.subscribe(listener)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    fn prop_changed(&self, change: &PropChange) {
        self.listeners.broadcast(change);
    }

    fn metadata(&self) -> Arc<dyn MetadataCatalog> {
        Arc::clone(&self.catalog)
    }

    fn install_virtual(
        &self,
        class_name: &str,
        field_name: &str,
        kind: FieldKind,
        signature: Option<ClassId>,
    ) -> StoreResult<FieldTag> {
        self.check_live()?;
        Ok(self
            .catalog
            .install_virtual(class_name, field_name, kind, signature)?)
    }

    fn begin_task(&self, label: &str) -> StoreResult<()> {
        self.check_live()?;
        self.tasks.begin(label);
        Ok(())
    }

    fn end_task(&self) -> StoreResult<()> {
        self.tasks.end()
    }

    fn continue_task(&self, label: &str) -> StoreResult<()> {
        self.tasks.continue_with(label)
    }

    fn break_task(&self) -> StoreResult<()> {
        self.tasks.break_task();
        Ok(())
    }

    fn task_depth(&self) -> usize {
        self.tasks.depth()
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::AcqRel) {
            self.listeners.clear();
            info!(objects = self.object_count(), "property store disposed");
        }
    }
}

impl std::fmt::Debug for InMemoryPropertyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryPropertyStore")
            .field("object_count", &self.object_count())
            .field("listeners", &self.listeners.len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
