use std::collections::HashMap;
use std::sync::Arc;

use lexo_cache::{
    BatchLoadConfig, BatchLoader, DomainObject, GenericFactory, IdentityCache, ObjectFactory, VectorKind, VectorView,
};
use lexo_store::{PropChange, PropertyStore};
use lexo_types::{FieldTag, ObjectId, PropValue};
use lexo_virtual::{BulkLoadSession, HandlerFactories, VirtualPropertyConfig, VirtualPropertyRegistry};
use tracing::info;

use crate::config::CacheConfig;
use crate::error::{SdkError, SdkResult};
use crate::fixture::LoadedFixture;

/// The root of one object cache: a property store plus everything layered
/// on it.
///
/// Loaders and vector views borrow the cache, so [`reload`](Self::reload)
/// (which needs `&mut self`) cannot run while any are alive.
pub struct ObjectCache {
    store: Arc<dyn PropertyStore>,
    identity: IdentityCache,
    factory: Box<dyn ObjectFactory>,
    batch: BatchLoadConfig,
    registry: VirtualPropertyRegistry,
}

impl ObjectCache {
    /// A cache over `store` with default settings and no virtual properties.
    pub fn new(store: Arc<dyn PropertyStore>) -> Self {
        Self {
            registry: VirtualPropertyRegistry::new(Arc::clone(&store)),
            store,
            identity: IdentityCache::new(),
            factory: Box::new(GenericFactory),
            batch: BatchLoadConfig::default(),
        }
    }

    /// A cache configured by `config`, with its virtual properties installed.
    pub fn with_config(store: Arc<dyn PropertyStore>, config: &CacheConfig) -> SdkResult<Self> {
        Self::with_factories(store, config, HandlerFactories::default())
    }

    /// Like [`with_config`](Self::with_config), building handlers from
    /// `factories`.
    pub fn with_factories(
        store: Arc<dyn PropertyStore>,
        config: &CacheConfig,
        factories: HandlerFactories,
    ) -> SdkResult<Self> {
        let cache = Self {
            registry: VirtualPropertyRegistry::with_factories(Arc::clone(&store), factories),
            store,
            identity: IdentityCache::new(),
            factory: Box::new(GenericFactory),
            batch: config.batch,
        };
        cache.registry.install_all(&config.virtual_properties)?;
        Ok(cache)
    }

    /// A cache over a fixture's store, configured by the fixture.
    pub fn from_fixture(fixture: &LoadedFixture) -> SdkResult<Self> {
        Self::with_config(fixture.shared_store(), &fixture.cache)
    }

    /// Build domain objects with `factory` instead of [`GenericFactory`].
    pub fn with_object_factory(mut self, factory: impl ObjectFactory + 'static) -> Self {
        self.factory = Box::new(factory);
        self
    }

    pub fn store(&self) -> &Arc<dyn PropertyStore> {
        &self.store
    }

    pub fn identity(&self) -> &IdentityCache {
        &self.identity
    }

    pub fn registry(&self) -> &VirtualPropertyRegistry {
        &self.registry
    }

    pub fn session(&self) -> &Arc<BulkLoadSession> {
        self.registry.session()
    }

    pub fn batch_config(&self) -> BatchLoadConfig {
        self.batch
    }

    // ---- Objects ----

    pub fn loader(&self) -> BatchLoader<'_> {
        BatchLoader::new(self.store.as_ref(), &self.identity)
            .with_factory(self.factory.as_ref())
            .with_config(self.batch)
    }

    pub fn materialize(&self, ids: &[ObjectId]) -> SdkResult<HashMap<ObjectId, Arc<dyn DomainObject>>> {
        Ok(self.loader().materialize(ids)?)
    }

    pub fn object(&self, id: ObjectId) -> SdkResult<Option<Arc<dyn DomainObject>>> {
        Ok(self.loader().materialize_one(id)?)
    }

    /// A typed view of vector field `tag` on `owner`.
    pub fn view<K: VectorKind>(&self, owner: ObjectId, tag: FieldTag) -> SdkResult<VectorView<'_, K>> {
        Ok(VectorView::open(self.loader(), owner, tag)?)
    }

    // ---- Virtual properties ----

    pub fn install_virtual(&self, config: &VirtualPropertyConfig) -> SdkResult<FieldTag> {
        Ok(self.registry.install(config)?)
    }

    pub fn read_virtual(&self, id: ObjectId, tag: FieldTag) -> SdkResult<Option<PropValue>> {
        Ok(self.registry.read(id, tag)?)
    }

    /// Read a virtual property by class and field name.
    pub fn read_named(&self, id: ObjectId, class: &str, field: &str) -> SdkResult<Option<PropValue>> {
        let tag = self
            .registry
            .tag_of(class, field)
            .ok_or_else(|| SdkError::UnknownVirtual {
                class: class.to_string(),
                field: field.to_string(),
            })?;
        self.read_virtual(id, tag)
    }

    pub fn affected_by(&self, change: &PropChange) -> Vec<FieldTag> {
        self.registry.affected_by(change)
    }

    pub fn begin_bulk_load(&self) {
        self.registry.begin_bulk_load();
    }

    pub fn end_bulk_load(&self) -> SdkResult<()> {
        Ok(self.registry.end_bulk_load()?)
    }

    // ---- Lifecycle ----

    /// Replace the store: the old one is disposed, cached objects are
    /// forgotten and every handler is moved to `store`.
    pub fn reload(&mut self, store: Arc<dyn PropertyStore>) -> SdkResult<()> {
        let objects = self.identity.len();
        self.store.dispose();
        self.store = Arc::clone(&store);
        self.identity.clear();
        self.registry.refresh_store(store)?;
        info!(forgotten = objects, "object cache reloaded");
        Ok(())
    }
}

impl std::fmt::Debug for ObjectCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectCache")
            .field("identity", &self.identity)
            .field("batch", &self.batch)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use lexo_cache::{OwningSequence, ReferenceCollection};
    use lexo_meta::MetadataCatalog;
    use lexo_store::InMemoryPropertyStore;

    use super::*;
    use crate::fixture::{Fixture, LEXICON};

    fn sample() -> (LoadedFixture, ObjectCache) {
        let loaded = Fixture::from_toml_str(LEXICON).unwrap().build().unwrap();
        let cache = ObjectCache::from_fixture(&loaded).unwrap();
        (loaded, cache)
    }

    fn field(loaded: &LoadedFixture, class: &str, name: &str) -> FieldTag {
        let class = loaded.catalog.class_id(class).unwrap();
        loaded.catalog.field_tag(class, name).unwrap()
    }

    fn ids(loaded: &LoadedFixture, keys: &[i64]) -> Vec<ObjectId> {
        keys.iter().map(|k| loaded.id(*k).unwrap()).collect()
    }

    // -----------------------------------------------------------------------
    // Objects
    // -----------------------------------------------------------------------

    #[test]
    fn materializes_and_remembers() {
        let (loaded, cache) = sample();
        let wanted = ids(&loaded, &[1, 2, 10]);
        let objects = cache.materialize(&wanted).unwrap();
        assert_eq!(objects.len(), 3);
        // Two of three entries is past the class fraction: every entry loads.
        assert_eq!(cache.identity().len(), 4);
        let again = cache.object(wanted[0]).unwrap().unwrap();
        assert!(Arc::ptr_eq(&again, &objects[&wanted[0]]));
    }

    #[test]
    fn views_read_through_the_cache() {
        let (loaded, cache) = sample();
        let run = loaded.id(1).unwrap();
        let senses = cache
            .view::<OwningSequence>(run, field(&loaded, "LexEntry", "Senses"))
            .unwrap();
        assert_eq!(senses.ids().unwrap(), ids(&loaded, &[10, 11, 12]));

        let related = cache
            .view::<ReferenceCollection>(run, field(&loaded, "LexEntry", "Related"))
            .unwrap();
        assert!(related.contains(loaded.id(3).unwrap()).unwrap());
    }

    // -----------------------------------------------------------------------
    // Virtual properties
    // -----------------------------------------------------------------------

    #[test]
    fn configured_virtuals_are_installed() {
        let (loaded, cache) = sample();
        assert_eq!(cache.registry().len(), 2);
        let run = loaded.id(1).unwrap();
        assert_eq!(
            cache.read_named(run, "LexEntry", "GoodSenses").unwrap(),
            Some(PropValue::Vector(ids(&loaded, &[11, 12])))
        );
        assert_eq!(
            cache.read_named(run, "LexEntry", "RelatedFrom").unwrap(),
            Some(PropValue::Vector(ids(&loaded, &[3])))
        );
        assert!(matches!(
            cache.read_named(run, "LexEntry", "Missing"),
            Err(SdkError::UnknownVirtual { .. })
        ));
    }

    #[test]
    fn order_change_affects_filtered_senses() {
        let (loaded, cache) = sample();
        let good = cache.registry().tag_of("LexEntry", "GoodSenses").unwrap();
        let change = PropChange::scalar(loaded.id(10).unwrap(), field(&loaded, "LexSense", "Order"));
        assert_eq!(cache.affected_by(&change), vec![good]);
    }

    #[test]
    fn bulk_load_round_trip() {
        let (loaded, cache) = sample();
        cache.begin_bulk_load();
        let walk = loaded.id(2).unwrap();
        assert_eq!(
            cache.read_named(walk, "LexEntry", "RelatedFrom").unwrap(),
            Some(PropValue::Vector(ids(&loaded, &[1])))
        );
        assert_eq!(cache.session().participant_count(), 1);
        cache.end_bulk_load().unwrap();
        assert!(!cache.session().is_active());
    }

    // -----------------------------------------------------------------------
    // Reload
    // -----------------------------------------------------------------------

    #[test]
    fn reload_swaps_everything() {
        let (loaded, mut cache) = sample();
        cache.materialize(&ids(&loaded, &[1, 2])).unwrap();
        let fresh: Arc<dyn PropertyStore> = Arc::new(InMemoryPropertyStore::new(loaded.catalog.clone()));

        cache.reload(Arc::clone(&fresh)).unwrap();
        assert!(loaded.store.is_disposed());
        assert!(cache.identity().is_empty());
        assert!(Arc::ptr_eq(cache.store(), &fresh));
        for handler in cache.registry().handlers() {
            assert!(Arc::ptr_eq(&handler.store(), &fresh));
        }
    }

    #[test]
    fn default_cache_has_no_virtuals() {
        let loaded = Fixture::from_toml_str(LEXICON).unwrap().build().unwrap();
        let cache = ObjectCache::new(loaded.shared_store());
        assert!(cache.registry().is_empty());
        assert_eq!(cache.batch_config(), BatchLoadConfig::default());
    }
}
