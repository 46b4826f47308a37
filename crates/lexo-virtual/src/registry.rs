//! The registry of installed virtual properties.
//!
//! Installation gives each (class, field) pair a tag exactly once; a second
//! install of the same pair returns the existing tag and leaves the handler
//! alone. Reads go through [`VirtualPropertyRegistry::read`], which computes
//! on a cache miss and evicts again afterwards for compute-every-time
//! properties.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use lexo_store::{PropChange, PropertyStore};
use lexo_types::{FieldTag, ObjectId, PropValue};
use tracing::{debug, info};

use crate::bulk::BulkLoadSession;
use crate::config::VirtualPropertyConfig;
use crate::error::{VirtualError, VirtualResult};
use crate::factory::HandlerFactories;
use crate::handler::VirtualPropertyHandler;
use crate::resolver::resolve_dependencies;

#[derive(Default)]
struct RegistryInner {
    /// Declaration order.
    handlers: Vec<Arc<dyn VirtualPropertyHandler>>,
    by_name: HashMap<(String, String), usize>,
    by_tag: HashMap<FieldTag, usize>,
}

/// Installed virtual properties, keyed by tag and by (class, field).
pub struct VirtualPropertyRegistry {
    store: RwLock<Arc<dyn PropertyStore>>,
    factories: HandlerFactories,
    inner: RwLock<RegistryInner>,
    session: Arc<BulkLoadSession>,
}

impl VirtualPropertyRegistry {
    /// A registry over `store` with the built-in handler factories.
    pub fn new(store: Arc<dyn PropertyStore>) -> Self {
        Self::with_factories(store, HandlerFactories::default())
    }

    pub fn with_factories(store: Arc<dyn PropertyStore>, factories: HandlerFactories) -> Self {
        Self {
            store: RwLock::new(store),
            factories,
            inner: RwLock::new(RegistryInner::default()),
            session: Arc::new(BulkLoadSession::new()),
        }
    }

    /// Share `session` instead of the registry's own.
    pub fn with_session(mut self, session: Arc<BulkLoadSession>) -> Self {
        self.session = session;
        self
    }

    pub fn store(&self) -> Arc<dyn PropertyStore> {
        Arc::clone(&self.store.read().expect("registry store lock poisoned"))
    }

    pub fn factories(&self) -> &HandlerFactories {
        &self.factories
    }

    pub fn factories_mut(&mut self) -> &mut HandlerFactories {
        &mut self.factories
    }

    pub fn session(&self) -> &Arc<BulkLoadSession> {
        &self.session
    }

    // ---------------------------------------------------------------
    // Installation
    // ---------------------------------------------------------------

    /// Install the virtual property `config` declares and return its tag.
    pub fn install(&self, config: &VirtualPropertyConfig) -> VirtualResult<FieldTag> {
        if let Some(tag) = self.reuse(&config.class, &config.field)? {
            return Ok(tag);
        }
        let handler = self.factories.build(config, self.store())?;
        self.install_handler(handler, config.signature.as_deref())
    }

    /// Install every entry in declaration order, stopping at the first
    /// failure.
    pub fn install_all<'a>(
        &self,
        configs: impl IntoIterator<Item = &'a VirtualPropertyConfig>,
    ) -> VirtualResult<Vec<FieldTag>> {
        configs.into_iter().map(|c| self.install(c)).collect()
    }

    /// Install an already-built handler. `signature` names the class of
    /// object values, for object-valued kinds.
    pub fn install_handler(
        &self,
        mut handler: Box<dyn VirtualPropertyHandler>,
        signature: Option<&str>,
    ) -> VirtualResult<FieldTag> {
        let class_name = handler.descriptor().class_name().to_string();
        let field_name = handler.descriptor().field_name().to_string();
        if let Some(tag) = self.reuse(&class_name, &field_name)? {
            return Ok(tag);
        }
        if let Some((class, field)) = handler.expected_names() {
            if class != class_name || field != field_name {
                return Err(VirtualError::NameMismatch {
                    implementation: handler.type_name().to_string(),
                    expected: format!("{class}.{field}"),
                    declared: format!("{class_name}.{field_name}"),
                });
            }
        }

        let store = self.store();
        let catalog = store.metadata();
        let class = catalog
            .class_id(&class_name)
            .ok_or_else(|| VirtualError::UnknownClass(class_name.clone()))?;
        if let Some(existing) = catalog.field_tag(class, &field_name) {
            if catalog.field(existing).is_some_and(|f| !f.is_virtual) {
                return Err(VirtualError::StoredField {
                    class: class_name,
                    field: field_name,
                });
            }
        }
        let signature = signature
            .map(|s| {
                catalog
                    .class_id(s)
                    .ok_or_else(|| VirtualError::UnknownClass(s.to_string()))
            })
            .transpose()?;
        let tag = store.install_virtual(&class_name, &field_name, handler.descriptor().kind(), signature)?;

        let paths = resolve_dependencies(catalog.as_ref(), class, handler.descriptor().depends_on());
        let descriptor = handler.base_mut().descriptor_mut();
        descriptor.set_tag(tag);
        descriptor.set_dependencies(paths);

        let handler: Arc<dyn VirtualPropertyHandler> = Arc::from(handler);
        handler.attach()?;

        let mut inner = self.inner.write().expect("registry lock poisoned");
        let index = inner.handlers.len();
        inner.handlers.push(Arc::clone(&handler));
        inner.by_name.insert((class_name.clone(), field_name.clone()), index);
        inner.by_tag.insert(tag, index);
        info!(
            class = %class_name,
            field = %field_name,
            %tag,
            handler = handler.type_name(),
            dependencies = handler.descriptor().dependencies().len(),
            "virtual property installed"
        );
        Ok(tag)
    }

    /// The tag of an already-installed (class, field), refreshing the
    /// handler's store if it was torn down underneath it.
    fn reuse(&self, class: &str, field: &str) -> VirtualResult<Option<FieldTag>> {
        let Some(existing) = self.lookup(class, field) else {
            return Ok(None);
        };
        if existing.store().is_disposed() {
            existing.set_store(self.store())?;
            info!(%class, %field, tag = %existing.tag(), "refreshed store of installed virtual property");
        } else {
            debug!(%class, %field, tag = %existing.tag(), "virtual property already installed");
        }
        Ok(Some(existing.tag()))
    }

    fn lookup(&self, class: &str, field: &str) -> Option<Arc<dyn VirtualPropertyHandler>> {
        let inner = self.inner.read().expect("registry lock poisoned");
        inner
            .by_name
            .get(&(class.to_string(), field.to_string()))
            .map(|i| Arc::clone(&inner.handlers[*i]))
    }

    // ---------------------------------------------------------------
    // Lookup
    // ---------------------------------------------------------------

    pub fn handler(&self, tag: FieldTag) -> Option<Arc<dyn VirtualPropertyHandler>> {
        let inner = self.inner.read().expect("registry lock poisoned");
        inner.by_tag.get(&tag).map(|i| Arc::clone(&inner.handlers[*i]))
    }

    pub fn tag_of(&self, class: &str, field: &str) -> Option<FieldTag> {
        self.lookup(class, field).map(|h| h.tag())
    }

    pub fn is_virtual(&self, tag: FieldTag) -> bool {
        self.inner
            .read()
            .expect("registry lock poisoned")
            .by_tag
            .contains_key(&tag)
    }

    /// Every handler, in declaration order.
    pub fn handlers(&self) -> Vec<Arc<dyn VirtualPropertyHandler>> {
        self.inner
            .read()
            .expect("registry lock poisoned")
            .handlers
            .clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("registry lock poisoned").handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ---------------------------------------------------------------
    // Read and write paths
    // ---------------------------------------------------------------

    /// The value of virtual property `tag` for `id`, computing it if it is
    /// not cached.
    pub fn read(&self, id: ObjectId, tag: FieldTag) -> VirtualResult<Option<PropValue>> {
        let handler = self.handler(tag).ok_or(VirtualError::NotInstalled(tag))?;
        let store = self.store();
        if !store.is_cached(id, tag)? {
            self.compute(&handler, store.as_ref(), id)?;
        }
        let value = store.value(id, tag)?;
        if handler.descriptor().compute_every_time() {
            store.evict(id, tag)?;
        }
        Ok(value)
    }

    fn compute(
        &self,
        handler: &Arc<dyn VirtualPropertyHandler>,
        store: &dyn PropertyStore,
        id: ObjectId,
    ) -> VirtualResult<()> {
        if self.session.is_active() {
            if let Some(retainer) = handler.as_bulk_retainer() {
                if !self.session.is_registered(handler) {
                    handler.set_load_for_all_of_class(true)?;
                    self.session.register(Arc::clone(handler));
                }
                if let Some(value) = retainer.retained(id) {
                    store.set_value(id, handler.tag(), value)?;
                    return Ok(());
                }
            }
        }
        handler.load(id)
    }

    /// Write a caller-supplied value to a writable virtual property and
    /// broadcast the change.
    pub fn write(&self, id: ObjectId, tag: FieldTag, value: PropValue) -> VirtualResult<()> {
        let handler = self.handler(tag).ok_or(VirtualError::NotInstalled(tag))?;
        let descriptor = handler.descriptor();
        if !descriptor.writable() {
            return Err(VirtualError::ReadOnly {
                class: descriptor.class_name().to_string(),
                field: descriptor.field_name().to_string(),
            });
        }
        let store = self.store();
        let change = match &value {
            PropValue::Vector(items) => {
                let before = match store.value(id, tag)? {
                    Some(PropValue::Vector(old)) => old.len(),
                    _ => 0,
                };
                PropChange::splice(id, tag, 0, items.len(), before)
            }
            _ => PropChange::scalar(id, tag),
        };
        handler.write(id, value)?;
        store.prop_changed(&change);
        Ok(())
    }

    /// Tags of the virtual properties whose values may be stale after
    /// `change`: those with a dependency path through the changed field,
    /// and those whose handler says so.
    ///
    /// Handlers are asked about the changed object itself and about each of
    /// its owners, so a value held by an owner sees changes to its members.
    pub fn affected_by(&self, change: &PropChange) -> Vec<FieldTag> {
        let candidates = owner_chain(self.store().as_ref(), change.object);
        self.handlers()
            .iter()
            .filter(|h| {
                h.descriptor()
                    .dependencies()
                    .iter()
                    .any(|p| p.touches(change.tag))
                    || candidates
                        .iter()
                        .any(|obj| h.does_result_depend_on_prop(*obj, change.object, change.tag, None))
            })
            .map(|h| h.tag())
            .collect()
    }

    // ---------------------------------------------------------------
    // Store swaps and bulk loading
    // ---------------------------------------------------------------

    /// Point the registry and every handler at `store`.
    pub fn refresh_store(&self, store: Arc<dyn PropertyStore>) -> VirtualResult<()> {
        *self.store.write().expect("registry store lock poisoned") = Arc::clone(&store);
        let handlers = self.handlers();
        for handler in &handlers {
            handler.set_store(Arc::clone(&store))?;
        }
        info!(handlers = handlers.len(), "virtual property handlers moved to new store");
        Ok(())
    }

    pub fn begin_bulk_load(&self) {
        self.session.activate();
    }

    pub fn end_bulk_load(&self) -> VirtualResult<()> {
        self.session.deactivate()
    }
}

impl std::fmt::Debug for VirtualPropertyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualPropertyRegistry")
            .field("installed", &self.len())
            .field("factories", &self.factories)
            .field("session", &self.session)
            .finish()
    }
}

/// `changed` followed by its owners, nearest first.
fn owner_chain(store: &dyn PropertyStore, changed: ObjectId) -> Vec<ObjectId> {
    let mut chain = vec![changed];
    let mut current = changed;
    while let Ok(Some(link)) = store.owner_of(current) {
        if chain.contains(&link.owner) {
            break;
        }
        chain.push(link.owner);
        current = link.owner;
    }
    chain
}
