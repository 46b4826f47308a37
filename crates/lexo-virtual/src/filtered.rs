//! Filtered views of real vector properties.
//!
//! [`DerivedFilteredSequence`] computes, per owner, the members of a real
//! vector that pass a filter, in their original order. The result is cached
//! in the store under the handler's tag; the surviving original indices are
//! cached locally so positions can be mapped between the two sequences. A
//! watcher subscribed to the store drops both caches for an owner whenever
//! items are inserted into or deleted from its real vector.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock, Weak};

use lexo_store::{ChangeListener, PropChange, PropertyStore, SubscriptionId};
use lexo_types::{ClassId, FieldTag, ObjectId, PropValue, WsId};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{VirtualError, VirtualResult};
use crate::handler::{HandlerBase, VirtualPropertyHandler};

/// Decides which members of the real vector survive.
pub trait ObjectFilter: Send + Sync {
    fn matches(&self, store: &dyn PropertyStore, id: ObjectId) -> VirtualResult<bool>;

    /// Re-derive the filter criteria from whatever settings back them.
    fn refresh_criteria(&self) {}

    /// Returns `true` if the filter reads `field` of member objects.
    fn reads_field(&self, _field: FieldTag) -> bool {
        false
    }
}

/// Keeps objects whose integer field is strictly greater than a threshold.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IntAboveFilter {
    pub field: FieldTag,
    pub threshold: i64,
}

impl ObjectFilter for IntAboveFilter {
    fn matches(&self, store: &dyn PropertyStore, id: ObjectId) -> VirtualResult<bool> {
        Ok(store.int(id, self.field)? > self.threshold)
    }

    fn reads_field(&self, field: FieldTag) -> bool {
        field == self.field
    }
}

/// A filter backed by a closure.
pub struct FnFilter<F> {
    predicate: F,
}

impl<F> FnFilter<F>
where
    F: Fn(&dyn PropertyStore, ObjectId) -> VirtualResult<bool> + Send + Sync,
{
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

impl<F> ObjectFilter for FnFilter<F>
where
    F: Fn(&dyn PropertyStore, ObjectId) -> VirtualResult<bool> + Send + Sync,
{
    fn matches(&self, store: &dyn PropertyStore, id: ObjectId) -> VirtualResult<bool> {
        (self.predicate)(store, id)
    }
}

/// Requested ordering of the filtered sequence. Recorded, not applied:
/// results keep the real vector's order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub keys: Vec<String>,
}

/// Maps an owner to the real vector field its sequence is derived from.
pub type FlidProvider = Arc<dyn Fn(ObjectId) -> FieldTag + Send + Sync>;

struct Survivors {
    source: FieldTag,
    indices: Vec<usize>,
}

#[derive(Default)]
struct FilterState {
    owners: RwLock<HashMap<ObjectId, Survivors>>,
}

impl FilterState {
    fn drop_owner(&self, owner: ObjectId) -> bool {
        self.owners
            .write()
            .expect("filter cache lock poisoned")
            .remove(&owner)
            .is_some()
    }

    fn cached_owners(&self) -> Vec<ObjectId> {
        self.owners
            .read()
            .expect("filter cache lock poisoned")
            .keys()
            .copied()
            .collect()
    }
}

/// Invalidates an owner's cached sequence when its real vector is spliced.
struct SourceWatcher {
    state: Arc<FilterState>,
    store: Weak<dyn PropertyStore>,
    tag: FieldTag,
}

impl ChangeListener for SourceWatcher {
    fn prop_changed(&self, change: &PropChange) {
        if !change.is_splice() {
            return;
        }
        let watched = self
            .state
            .owners
            .read()
            .expect("filter cache lock poisoned")
            .get(&change.object)
            .is_some_and(|s| s.source == change.tag);
        if !watched {
            return;
        }
        self.state.drop_owner(change.object);
        if let Some(store) = self.store.upgrade() {
            if let Err(e) = store.evict(change.object, self.tag) {
                warn!(owner = %change.object, tag = %self.tag, error = %e, "failed to evict filtered sequence");
            }
        }
        debug!(owner = %change.object, tag = %self.tag, "filtered sequence invalidated");
    }
}

/// A virtual sequence holding the members of a real vector that pass a
/// filter.
pub struct DerivedFilteredSequence {
    base: HandlerBase,
    owner_class: ClassId,
    filter: Option<Box<dyn ObjectFilter>>,
    sort: Option<SortSpec>,
    flid: FlidProvider,
    state: Arc<FilterState>,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl DerivedFilteredSequence {
    /// A pass-all sequence over `source` on owners of `owner_class`.
    pub fn new(base: HandlerBase, owner_class: ClassId, source: FieldTag) -> Self {
        Self {
            base,
            owner_class,
            filter: None,
            sort: None,
            flid: Arc::new(move |_| source),
            state: Arc::default(),
            subscription: Mutex::new(None),
        }
    }

    pub fn with_filter(mut self, filter: impl ObjectFilter + 'static) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        debug!(keys = ?sort.keys, "sort spec recorded; results keep source order");
        self.sort = Some(sort);
        self
    }

    pub fn with_flid_provider(mut self, provider: FlidProvider) -> Self {
        self.flid = provider;
        self
    }

    pub fn owner_class(&self) -> ClassId {
        self.owner_class
    }

    pub fn sort(&self) -> Option<&SortSpec> {
        self.sort.as_ref()
    }

    /// The real vector field for `owner`.
    pub fn source_field(&self, owner: ObjectId) -> FieldTag {
        (self.flid)(owner)
    }

    /// Number of owners with a locally cached result.
    pub fn cached_owner_count(&self) -> usize {
        self.state
            .owners
            .read()
            .expect("filter cache lock poisoned")
            .len()
    }

    /// Position in the filtered sequence of the item at `original` in the
    /// real vector, or `None` if the filter excludes it.
    pub fn get_virtual_index(&self, owner: ObjectId, original: usize) -> VirtualResult<Option<usize>> {
        if self.filter.is_none() {
            return Ok(Some(original));
        }
        let cached = self
            .state
            .owners
            .read()
            .expect("filter cache lock poisoned")
            .contains_key(&owner);
        if !cached {
            self.load(owner)?;
        }
        let owners = self.state.owners.read().expect("filter cache lock poisoned");
        Ok(owners
            .get(&owner)
            .and_then(|s| s.indices.binary_search(&original).ok()))
    }

    /// Drop every cached owner. Unless `use_existing_criteria` is set the
    /// filter re-derives its criteria first.
    pub fn reinitialize(&self, use_existing_criteria: bool) -> VirtualResult<()> {
        if !use_existing_criteria {
            if let Some(filter) = &self.filter {
                filter.refresh_criteria();
            }
        }
        let store = self.store();
        let owners = self.state.cached_owners();
        for owner in &owners {
            store.evict(*owner, self.tag())?;
            self.state.drop_owner(*owner);
        }
        debug!(tag = %self.tag(), owners = owners.len(), "filtered sequence reinitialized");
        Ok(())
    }

    fn subscribe(&self, store: &Arc<dyn PropertyStore>) {
        let watcher = Arc::new(SourceWatcher {
            state: Arc::clone(&self.state),
            store: Arc::downgrade(store),
            tag: self.tag(),
        });
        let id = store.subscribe(watcher);
        *self.subscription.lock().expect("subscription lock poisoned") = Some(id);
    }
}

impl VirtualPropertyHandler for DerivedFilteredSequence {
    fn base(&self) -> &HandlerBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut HandlerBase {
        &mut self.base
    }

    fn attach(&self) -> VirtualResult<()> {
        self.subscribe(&self.store());
        Ok(())
    }

    fn set_store(&self, store: Arc<dyn PropertyStore>) -> VirtualResult<()> {
        let old = self.base.replace_store(Arc::clone(&store));
        if let Some(id) = self
            .subscription
            .lock()
            .expect("subscription lock poisoned")
            .take()
        {
            old.unsubscribe(id);
        }
        self.state
            .owners
            .write()
            .expect("filter cache lock poisoned")
            .clear();
        self.subscribe(&store);
        Ok(())
    }

    fn load(&self, owner: ObjectId) -> VirtualResult<()> {
        let store = self.store();
        let catalog = store.metadata();
        let class = store.class_of(owner)?;
        if !class.is_some_and(|c| catalog.is_same_or_subclass(c, self.owner_class)) {
            return Err(VirtualError::WrongOwnerClass {
                id: owner,
                expected: catalog
                    .class_name(self.owner_class)
                    .unwrap_or_else(|| self.owner_class.to_string()),
            });
        }

        let source = self.source_field(owner);
        let members = store.vector(owner, source)?;
        let mut kept = Vec::with_capacity(members.len());
        let mut indices = Vec::with_capacity(members.len());
        for (i, id) in members.iter().enumerate() {
            let keep = match &self.filter {
                Some(filter) => filter.matches(store.as_ref(), *id)?,
                None => true,
            };
            if keep {
                kept.push(*id);
                indices.push(i);
            }
        }
        debug!(
            %owner,
            tag = %self.tag(),
            total = members.len(),
            kept = kept.len(),
            "filtered sequence loaded"
        );
        store.set_value(owner, self.tag(), PropValue::Vector(kept))?;
        self.state
            .owners
            .write()
            .expect("filter cache lock poisoned")
            .insert(owner, Survivors { source, indices });
        Ok(())
    }

    fn does_result_depend_on_prop(
        &self,
        obj: ObjectId,
        changed: ObjectId,
        field: FieldTag,
        _ws: Option<WsId>,
    ) -> bool {
        let source = self.source_field(obj);
        if obj == changed && field == source {
            return true;
        }
        match &self.filter {
            Some(filter) if filter.reads_field(field) => self
                .store()
                .vector_index_of(obj, source, changed)
                .is_ok_and(|i| i.is_some()),
            _ => false,
        }
    }
}
