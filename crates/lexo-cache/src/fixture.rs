//! Shared test fixtures: a small lexicon schema, a query-counting decorator
//! and a change recorder.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use lexo_meta::{ClassDef, InMemoryCatalog};
use lexo_store::{
    ChangeListener, InMemoryPropertyStore, LoadScope, ObjectRecord, PropChange, PropertyStore,
    StoreDecorator, StoreResult,
};
use lexo_types::{ClassId, FieldKind, FieldTag, ObjectId};

pub(crate) struct Lexicon {
    pub store: Arc<InMemoryPropertyStore>,
    pub entry: ClassId,
    pub sense: ClassId,
    pub senses: FieldTag,
    pub variants: FieldTag,
    pub related: FieldTag,
    pub sense_refs: FieldTag,
    pub main_sense: FieldTag,
    pub subsenses: FieldTag,
}

pub(crate) fn lexicon() -> Lexicon {
    let catalog = InMemoryCatalog::new();
    catalog
        .define_class(ClassDef::new(ClassId(1), "CmObject").abstract_class())
        .unwrap();
    let entry = catalog
        .define_class(ClassDef::new(ClassId(2), "LexEntry").with_base(ClassId(1)))
        .unwrap();
    let sense = catalog
        .define_class(ClassDef::new(ClassId(3), "LexSense").with_base(ClassId(1)).owned())
        .unwrap();
    let senses = catalog
        .define_field("LexEntry", "Senses", FieldKind::OwningSequence, Some("LexSense"))
        .unwrap();
    let variants = catalog
        .define_field("LexEntry", "Variants", FieldKind::OwningCollection, Some("LexSense"))
        .unwrap();
    let related = catalog
        .define_field("LexEntry", "Related", FieldKind::ReferenceCollection, Some("LexEntry"))
        .unwrap();
    let sense_refs = catalog
        .define_field("LexEntry", "SenseRefs", FieldKind::ReferenceSequence, Some("LexSense"))
        .unwrap();
    let main_sense = catalog
        .define_field("LexEntry", "MainSense", FieldKind::OwningAtomic, Some("LexSense"))
        .unwrap();
    let subsenses = catalog
        .define_field("LexSense", "Senses", FieldKind::OwningSequence, Some("LexSense"))
        .unwrap();
    Lexicon {
        store: Arc::new(InMemoryPropertyStore::new(Arc::new(catalog))),
        entry,
        sense,
        senses,
        variants,
        related,
        sense_refs,
        main_sense,
        subsenses,
    }
}

/// Counts query-layer traffic on the way to the wrapped store.
pub(crate) struct CountingStore {
    inner: Arc<dyn PropertyStore>,
    /// (class, `None` for a whole-class load or `Some(n)` for n exact ids)
    pub fetches: Mutex<Vec<(ClassId, Option<usize>)>>,
    pub class_queries: AtomicUsize,
}

impl CountingStore {
    pub fn new(inner: Arc<dyn PropertyStore>) -> Self {
        Self {
            inner,
            fetches: Mutex::new(Vec::new()),
            class_queries: AtomicUsize::new(0),
        }
    }

    pub fn fetches(&self) -> Vec<(ClassId, Option<usize>)> {
        self.fetches.lock().unwrap().clone()
    }

    pub fn class_queries(&self) -> usize {
        self.class_queries.load(Ordering::SeqCst)
    }
}

impl StoreDecorator for CountingStore {
    fn inner(&self) -> &dyn PropertyStore {
        self.inner.as_ref()
    }

    fn class_of(&self, id: ObjectId) -> StoreResult<Option<ClassId>> {
        self.class_queries.fetch_add(1, Ordering::SeqCst);
        self.inner.class_of(id)
    }

    fn fetch_records(&self, class: ClassId, scope: LoadScope<'_>) -> StoreResult<Vec<ObjectRecord>> {
        let shape = match scope {
            LoadScope::All => None,
            LoadScope::Exact(ids) => Some(ids.len()),
        };
        self.fetches.lock().unwrap().push((class, shape));
        self.inner.fetch_records(class, scope)
    }
}

#[derive(Default)]
pub(crate) struct Recorder {
    pub changes: Mutex<Vec<PropChange>>,
}

impl Recorder {
    pub fn take(&self) -> Vec<PropChange> {
        std::mem::take(&mut *self.changes.lock().unwrap())
    }
}

impl ChangeListener for Recorder {
    fn prop_changed(&self, change: &PropChange) {
        self.changes.lock().unwrap().push(*change);
    }
}
