//! Shared test fixtures.

use std::sync::{Arc, Mutex};

use lexo_meta::{ClassDef, InMemoryCatalog};
use lexo_store::{ChangeListener, InMemoryPropertyStore, PropChange, PropertyStore};
use lexo_types::{ClassId, FieldKind, FieldTag, ObjectId};

pub(crate) fn empty_store() -> Arc<dyn PropertyStore> {
    Arc::new(InMemoryPropertyStore::new(Arc::new(InMemoryCatalog::new())))
}

pub(crate) struct Lexicon {
    pub store: Arc<InMemoryPropertyStore>,
    pub entry: ClassId,
    pub sense: ClassId,
    pub senses: FieldTag,
    pub related: FieldTag,
    pub headword: FieldTag,
    pub order: FieldTag,
}

impl Lexicon {
    pub fn shared(&self) -> Arc<dyn PropertyStore> {
        self.store.clone()
    }

    /// An entry owning one sense per value, each with `Order` set.
    pub fn entry_with_orders(&self, orders: &[i64]) -> (ObjectId, Vec<ObjectId>) {
        let entry = self.store.create_object(self.entry).unwrap();
        let senses = orders
            .iter()
            .map(|order| {
                let sense = self
                    .store
                    .create_owned(self.sense, entry, self.senses, None)
                    .unwrap();
                self.store.set_int(sense, self.order, *order).unwrap();
                sense
            })
            .collect();
        (entry, senses)
    }
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
    let related = catalog
        .define_field("LexEntry", "Related", FieldKind::ReferenceCollection, Some("LexEntry"))
        .unwrap();
    let headword = catalog
        .define_field("LexEntry", "HeadWord", FieldKind::String, None)
        .unwrap();
    let order = catalog
        .define_field("LexSense", "Order", FieldKind::Integer, None)
        .unwrap();
    Lexicon {
        store: Arc::new(InMemoryPropertyStore::new(Arc::new(catalog))),
        entry,
        sense,
        senses,
        related,
        headword,
        order,
    }
}

/// Collects every change broadcast to it.
#[derive(Default)]
pub(crate) struct Recorder(Mutex<Vec<PropChange>>);

impl Recorder {
    pub fn take(&self) -> Vec<PropChange> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

impl ChangeListener for Recorder {
    fn prop_changed(&self, change: &PropChange) {
        self.0.lock().unwrap().push(*change);
    }
}
