use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use lexo_types::{ClassId, ObjectId};
use tracing::debug;

use crate::object::DomainObject;

#[derive(Default)]
struct IdentityInner {
    objects: HashMap<ObjectId, Arc<dyn DomainObject>>,
    classes: HashMap<ObjectId, ClassId>,
    populations: HashMap<ClassId, usize>,
    loaded: HashSet<ClassId>,
}

/// Identity map from id to its single in-memory object.
///
/// Besides materialized objects the cache remembers the runtime class of ids
/// it has seen, the instance count of classes it has enumerated, and which
/// classes were loaded whole. Entries live until [`clear`] on store teardown.
///
/// [`clear`]: IdentityCache::clear
#[derive(Default)]
pub struct IdentityCache {
    inner: RwLock<IdentityInner>,
}

impl IdentityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: ObjectId) -> Option<Arc<dyn DomainObject>> {
        self.inner
            .read()
            .expect("identity lock poisoned")
            .objects
            .get(&id)
            .cloned()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.inner
            .read()
            .expect("identity lock poisoned")
            .objects
            .contains_key(&id)
    }

    /// Insert `object` unless its id is already mapped; returns the mapped
    /// instance either way.
    pub fn get_or_insert(&self, object: Arc<dyn DomainObject>) -> Arc<dyn DomainObject> {
        let mut inner = self.inner.write().expect("identity lock poisoned");
        let id = object.id();
        inner.classes.insert(id, object.class());
        inner.objects.entry(id).or_insert(object).clone()
    }

    /// Drop one object, e.g. after it was deleted.
    pub fn forget(&self, id: ObjectId) -> bool {
        let mut inner = self.inner.write().expect("identity lock poisoned");
        if let Some(class) = inner.classes.remove(&id) {
            if let Some(n) = inner.populations.get_mut(&class) {
                *n = n.saturating_sub(1);
            }
        }
        inner.objects.remove(&id).is_some()
    }

    pub fn class_of(&self, id: ObjectId) -> Option<ClassId> {
        self.inner
            .read()
            .expect("identity lock poisoned")
            .classes
            .get(&id)
            .copied()
    }

    pub fn remember_class(&self, id: ObjectId, class: ClassId) {
        self.inner
            .write()
            .expect("identity lock poisoned")
            .classes
            .insert(id, class);
    }

    /// Record the complete id list of a class; also fixes its population.
    pub fn remember_class_ids(&self, class: ClassId, ids: &[ObjectId]) {
        let mut inner = self.inner.write().expect("identity lock poisoned");
        for id in ids {
            inner.classes.insert(*id, class);
        }
        inner.populations.insert(class, ids.len());
    }

    pub fn population(&self, class: ClassId) -> Option<usize> {
        self.inner
            .read()
            .expect("identity lock poisoned")
            .populations
            .get(&class)
            .copied()
    }

    pub fn remember_population(&self, class: ClassId, count: usize) {
        self.inner
            .write()
            .expect("identity lock poisoned")
            .populations
            .insert(class, count);
    }

    pub fn mark_class_loaded(&self, class: ClassId) {
        self.inner
            .write()
            .expect("identity lock poisoned")
            .loaded
            .insert(class);
    }

    pub fn is_class_loaded(&self, class: ClassId) -> bool {
        self.inner
            .read()
            .expect("identity lock poisoned")
            .loaded
            .contains(&class)
    }

    /// Number of materialized objects.
    pub fn len(&self) -> usize {
        self.inner.read().expect("identity lock poisoned").objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invalidate everything.
    pub fn clear(&self) {
        let mut inner = self.inner.write().expect("identity lock poisoned");
        debug!(objects = inner.objects.len(), "identity cache cleared");
        *inner = IdentityInner::default();
    }
}

impl std::fmt::Debug for IdentityCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read().expect("identity lock poisoned");
        f.debug_struct("IdentityCache")
            .field("objects", &inner.objects.len())
            .field("known_classes", &inner.classes.len())
            .field("loaded_classes", &inner.loaded.len())
            .finish()
    }
}
