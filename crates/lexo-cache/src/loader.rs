//! Class-grouped batch materialization.
//!
//! [`BatchLoader::materialize`] partitions the requested ids by runtime
//! class and issues one record fetch per class group. Per group it picks
//! between fetching exactly the requested ids and loading every instance of
//! the class, using [`BatchLoadConfig::should_load_all`].

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use lexo_store::{LoadScope, PropertyStore};
use lexo_types::{ClassId, ObjectId};
use tracing::debug;

use crate::config::BatchLoadConfig;
use crate::error::CacheResult;
use crate::identity::IdentityCache;
use crate::object::{DomainObject, GenericFactory, ObjectFactory};

/// Materializes ids into the identity cache.
///
/// A loader borrows its collaborators and is cheap to build per call site.
#[derive(Clone, Copy)]
pub struct BatchLoader<'a> {
    store: &'a dyn PropertyStore,
    cache: &'a IdentityCache,
    factory: &'a dyn ObjectFactory,
    config: BatchLoadConfig,
}

impl<'a> BatchLoader<'a> {
    pub fn new(store: &'a dyn PropertyStore, cache: &'a IdentityCache) -> Self {
        Self {
            store,
            cache,
            factory: &GenericFactory,
            config: BatchLoadConfig::default(),
        }
    }

    pub fn with_config(mut self, config: BatchLoadConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_factory(mut self, factory: &'a dyn ObjectFactory) -> Self {
        self.factory = factory;
        self
    }

    pub fn store(&self) -> &'a dyn PropertyStore {
        self.store
    }

    pub fn cache(&self) -> &'a IdentityCache {
        self.cache
    }

    pub fn config(&self) -> &BatchLoadConfig {
        &self.config
    }

    /// Materialize `ids` and return the objects keyed by id.
    ///
    /// Null ids, duplicates and ids unknown to the store are skipped. Ids
    /// already in the identity cache are served without touching the store.
    /// Every object loaded here is in the identity cache when this returns.
    pub fn materialize(&self, ids: &[ObjectId]) -> CacheResult<HashMap<ObjectId, Arc<dyn DomainObject>>> {
        let mut found = HashMap::new();
        let mut seen = HashSet::new();
        let mut groups: BTreeMap<ClassId, Vec<ObjectId>> = BTreeMap::new();

        for &id in ids {
            if id.is_null() || !seen.insert(id) {
                continue;
            }
            if let Some(obj) = self.cache.get(id) {
                found.insert(id, obj);
                continue;
            }
            match self.resolve_class(id)? {
                Some(class) => groups.entry(class).or_default().push(id),
                None => debug!(%id, "skipping id unknown to the store"),
            }
        }

        for (class, wanted) in groups {
            self.load_group(class, &wanted, &mut found)?;
        }
        Ok(found)
    }

    /// Materialize a single id.
    pub fn materialize_one(&self, id: ObjectId) -> CacheResult<Option<Arc<dyn DomainObject>>> {
        Ok(self.materialize(&[id])?.remove(&id))
    }

    /// Runtime class of `id`, learning the whole class roster on a miss.
    fn resolve_class(&self, id: ObjectId) -> CacheResult<Option<ClassId>> {
        if let Some(class) = self.cache.class_of(id) {
            return Ok(Some(class));
        }
        let Some(class) = self.store.class_of(id)? else {
            return Ok(None);
        };
        let roster = self.store.ids_of_class(class)?;
        debug!(%id, %class, instances = roster.len(), "learned class roster");
        self.cache.remember_class_ids(class, &roster);
        Ok(Some(class))
    }

    fn population(&self, class: ClassId) -> CacheResult<usize> {
        if let Some(n) = self.cache.population(class) {
            return Ok(n);
        }
        let n = self.store.instance_count(class)?;
        self.cache.remember_population(class, n);
        Ok(n)
    }

    fn load_group(
        &self,
        class: ClassId,
        wanted: &[ObjectId],
        found: &mut HashMap<ObjectId, Arc<dyn DomainObject>>,
    ) -> CacheResult<()> {
        let population = self.population(class)?;
        let load_all = self.config.should_load_all(wanted.len(), population)
            && !self.cache.is_class_loaded(class);
        let scope = if load_all {
            LoadScope::All
        } else {
            LoadScope::Exact(wanted)
        };
        debug!(
            %class,
            requested = wanted.len(),
            population,
            load_all,
            "loading class group"
        );

        let records = self.store.fetch_records(class, scope)?;
        let catalog = self.store.metadata();
        let wanted: HashSet<ObjectId> = wanted.iter().copied().collect();
        for record in &records {
            let obj = self
                .cache
                .get_or_insert(self.factory.build(record, catalog.as_ref()));
            if wanted.contains(&record.id) {
                found.insert(record.id, obj);
            }
        }
        if load_all {
            self.cache.remember_population(class, records.len());
            self.cache.mark_class_loaded(class);
        }
        for id in wanted.iter().filter(|id| !found.contains_key(id)) {
            debug!(%id, %class, "requested id absent from fetched records");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::fixture::{lexicon, CountingStore};

    fn entries(store: &dyn PropertyStore, class: ClassId, n: usize) -> Vec<ObjectId> {
        (0..n).map(|_| store.create_object(class).unwrap()).collect()
    }

    // -----------------------------------------------------------------------
    // Strategy
    // -----------------------------------------------------------------------

    #[test]
    fn large_share_loads_whole_class() {
        let lex = lexicon();
        let ids = entries(lex.store.as_ref(), lex.entry, 1000);
        let counting = CountingStore::new(lex.store.clone());
        let cache = IdentityCache::new();
        let loader = BatchLoader::new(&counting, &cache);

        let got = loader.materialize(&ids[..700]).unwrap();
        assert_eq!(got.len(), 700);
        assert_eq!(counting.fetches(), vec![(lex.entry, None)]);
        assert_eq!(cache.len(), 1000);
        assert!(cache.is_class_loaded(lex.entry));
    }

    #[test]
    fn small_share_loads_exact_ids() {
        let lex = lexicon();
        let ids = entries(lex.store.as_ref(), lex.entry, 5000);
        let counting = CountingStore::new(lex.store.clone());
        let cache = IdentityCache::new();
        let loader = BatchLoader::new(&counting, &cache);

        let got = loader.materialize(&ids[1000..1300]).unwrap();
        assert_eq!(got.len(), 300);
        assert_eq!(counting.fetches(), vec![(lex.entry, Some(300))]);
        assert_eq!(cache.len(), 300);
    }

    #[test]
    fn cap_forces_whole_class_load() {
        let lex = lexicon();
        let ids = entries(lex.store.as_ref(), lex.entry, 2000);
        let counting = CountingStore::new(lex.store.clone());
        let cache = IdentityCache::new();
        BatchLoader::new(&counting, &cache)
            .materialize(&ids[..401])
            .unwrap();
        assert_eq!(counting.fetches(), vec![(lex.entry, None)]);
    }

    #[test]
    fn configured_thresholds_apply() {
        let lex = lexicon();
        let ids = entries(lex.store.as_ref(), lex.entry, 100);
        let counting = CountingStore::new(lex.store.clone());
        let cache = IdentityCache::new();
        let config = BatchLoadConfig {
            max_exact_ids: 5,
            class_fraction: 1.0,
        };
        BatchLoader::new(&counting, &cache)
            .with_config(config)
            .materialize(&ids[..6])
            .unwrap();
        assert_eq!(counting.fetches(), vec![(lex.entry, None)]);
    }

    // -----------------------------------------------------------------------
    // Class discovery and caching
    // -----------------------------------------------------------------------

    #[test]
    fn unknown_class_is_learned_once_per_class() {
        let lex = lexicon();
        let ids = entries(lex.store.as_ref(), lex.entry, 10);
        let counting = CountingStore::new(lex.store.clone());
        let cache = IdentityCache::new();
        BatchLoader::new(&counting, &cache)
            .materialize(&ids[..2])
            .unwrap();
        assert_eq!(counting.class_queries(), 1);
        assert_eq!(cache.population(lex.entry), Some(10));
        assert_eq!(cache.class_of(ids[9]), Some(lex.entry));
    }

    #[test]
    fn cached_ids_need_no_query() {
        let lex = lexicon();
        let ids = entries(lex.store.as_ref(), lex.entry, 10);
        let counting = CountingStore::new(lex.store.clone());
        let cache = IdentityCache::new();
        let loader = BatchLoader::new(&counting, &cache);
        let first = loader.materialize(&ids[..2]).unwrap();
        let second = loader.materialize(&ids[..2]).unwrap();
        assert_eq!(counting.fetches().len(), 1);
        assert!(Arc::ptr_eq(&first[&ids[0]], &second[&ids[0]]));
    }

    #[test]
    fn groups_by_class() {
        let lex = lexicon();
        let entry = lex.store.create_object(lex.entry).unwrap();
        let sense = lex
            .store
            .create_owned(lex.sense, entry, lex.senses, None)
            .unwrap();
        let counting = CountingStore::new(lex.store.clone());
        let cache = IdentityCache::new();
        let got = BatchLoader::new(&counting, &cache)
            .materialize(&[sense, entry])
            .unwrap();
        assert_eq!(got[&sense].class(), lex.sense);
        assert_eq!(got[&sense].owner().map(|o| o.owner), Some(entry));
        assert_eq!(counting.fetches().len(), 2);
    }

    #[test]
    fn null_duplicate_and_unknown_ids_are_skipped() {
        let lex = lexicon();
        let ids = entries(lex.store.as_ref(), lex.entry, 3);
        let cache = IdentityCache::new();
        let loader = BatchLoader::new(lex.store.as_ref(), &cache);
        let got = loader
            .materialize(&[ObjectId::NULL, ids[0], ids[0], ObjectId::new(9999)])
            .unwrap();
        assert_eq!(got.len(), 1);
        assert!(loader.materialize(&[]).unwrap().is_empty());
    }

    #[test]
    fn store_failure_propagates() {
        let lex = lexicon();
        let ids = entries(lex.store.as_ref(), lex.entry, 3);
        lex.store.dispose();
        let cache = IdentityCache::new();
        let err = BatchLoader::new(lex.store.as_ref(), &cache)
            .materialize(&ids)
            .unwrap_err();
        assert!(err.to_string().contains("disposed"));
    }

    #[test]
    fn fully_loaded_class_falls_back_to_exact() {
        let lex = lexicon();
        let ids = entries(lex.store.as_ref(), lex.entry, 4);
        let counting = CountingStore::new(lex.store.clone());
        let cache = IdentityCache::new();
        let loader = BatchLoader::new(&counting, &cache).with_config(BatchLoadConfig {
            max_exact_ids: 400,
            class_fraction: 0.0,
        });
        loader.materialize(&ids[..3]).unwrap();

        let late = entries(lex.store.as_ref(), lex.entry, 1);
        cache.remember_class(late[0], lex.entry);
        loader.materialize(&late).unwrap();
        assert_eq!(
            counting.fetches(),
            vec![(lex.entry, None), (lex.entry, Some(1))]
        );
    }

    // -----------------------------------------------------------------------
    // Properties
    // -----------------------------------------------------------------------

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn materialize_returns_every_live_requested_id(
            picks in proptest::collection::vec(0usize..60, 0..80)
        ) {
            let lex = lexicon();
            let ids = entries(lex.store.as_ref(), lex.entry, 60);
            let cache = IdentityCache::new();
            let loader = BatchLoader::new(lex.store.as_ref(), &cache);
            let requested: Vec<ObjectId> = picks.iter().map(|i| ids[*i]).collect();
            let got = loader.materialize(&requested).unwrap();
            let distinct: HashSet<ObjectId> = requested.iter().copied().collect();
            prop_assert_eq!(got.len(), distinct.len());
            for id in distinct {
                prop_assert_eq!(got[&id].id(), id);
                prop_assert!(cache.contains(id));
            }
        }
    }
}
