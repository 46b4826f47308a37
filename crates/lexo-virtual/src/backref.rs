//! Back references: the objects of a source class whose reference field
//! points at the target.

use std::collections::HashMap;
use std::sync::RwLock;

use lexo_store::PropertyStore;
use lexo_types::{ClassId, FieldTag, ObjectId, PropValue, WsId};
use tracing::debug;

use crate::error::VirtualResult;
use crate::handler::{HandlerBase, RetainsBulkData, VirtualPropertyHandler};

/// Lists, for each target, the instances of `source_class` whose
/// `source_field` contains it.
///
/// Always recomputed on read. While a bulk-load session is active one scan
/// of the source class builds a target-to-sources map that serves every
/// read until the session ends.
pub struct BackReferenceHandler {
    base: HandlerBase,
    source_class: ClassId,
    source_field: FieldTag,
    shadow: RwLock<Option<HashMap<ObjectId, Vec<ObjectId>>>>,
}

impl BackReferenceHandler {
    pub fn new(mut base: HandlerBase, source_class: ClassId, source_field: FieldTag) -> Self {
        base.descriptor_mut().set_compute_every_time(true);
        Self {
            base,
            source_class,
            source_field,
            shadow: RwLock::new(None),
        }
    }

    pub fn source_class(&self) -> ClassId {
        self.source_class
    }

    pub fn source_field(&self) -> FieldTag {
        self.source_field
    }

    pub fn has_shadow(&self) -> bool {
        self.shadow.read().expect("shadow lock poisoned").is_some()
    }

    /// Everything `source` references through the source field.
    fn targets_of(&self, store: &dyn PropertyStore, source: ObjectId) -> VirtualResult<Vec<ObjectId>> {
        let vector = store
            .metadata()
            .field_kind(self.source_field)
            .is_some_and(|k| k.is_vector());
        Ok(if vector {
            store.vector(source, self.source_field)?
        } else {
            store.object(source, self.source_field)?.into_iter().collect()
        })
    }

    fn scan(&self, store: &dyn PropertyStore, target: ObjectId) -> VirtualResult<Vec<ObjectId>> {
        let mut found = Vec::new();
        for source in store.ids_of_class(self.source_class)? {
            if self.targets_of(store, source)?.contains(&target) {
                found.push(source);
            }
        }
        Ok(found)
    }

    fn build_shadow(&self, store: &dyn PropertyStore) -> VirtualResult<HashMap<ObjectId, Vec<ObjectId>>> {
        let mut map: HashMap<ObjectId, Vec<ObjectId>> = HashMap::new();
        for source in store.ids_of_class(self.source_class)? {
            for target in self.targets_of(store, source)? {
                let sources = map.entry(target).or_default();
                if !sources.contains(&source) {
                    sources.push(source);
                }
            }
        }
        Ok(map)
    }
}

impl VirtualPropertyHandler for BackReferenceHandler {
    fn base(&self) -> &HandlerBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut HandlerBase {
        &mut self.base
    }

    fn set_store(&self, store: std::sync::Arc<dyn PropertyStore>) -> VirtualResult<()> {
        self.base.replace_store(store);
        self.discard_retained();
        Ok(())
    }

    fn load(&self, target: ObjectId) -> VirtualResult<()> {
        let store = self.store();
        let sources = match self.retained(target) {
            Some(PropValue::Vector(ids)) => ids,
            _ => self.scan(store.as_ref(), target)?,
        };
        store.set_value(target, self.tag(), PropValue::Vector(sources))?;
        Ok(())
    }

    fn set_load_for_all_of_class(&self, all: bool) -> VirtualResult<()> {
        if !all {
            self.discard_retained();
            return Ok(());
        }
        let map = self.build_shadow(self.store().as_ref())?;
        debug!(tag = %self.tag(), targets = map.len(), "back references loaded for whole class");
        *self.shadow.write().expect("shadow lock poisoned") = Some(map);
        Ok(())
    }

    fn does_result_depend_on_prop(
        &self,
        _obj: ObjectId,
        _changed: ObjectId,
        field: FieldTag,
        _ws: Option<WsId>,
    ) -> bool {
        field == self.source_field
    }

    fn as_bulk_retainer(&self) -> Option<&dyn RetainsBulkData> {
        Some(self)
    }
}

impl RetainsBulkData for BackReferenceHandler {
    fn retained(&self, id: ObjectId) -> Option<PropValue> {
        self.shadow
            .read()
            .expect("shadow lock poisoned")
            .as_ref()
            .map(|map| PropValue::Vector(map.get(&id).cloned().unwrap_or_default()))
    }

    fn discard_retained(&self) {
        self.shadow.write().expect("shadow lock poisoned").take();
    }
}

#[cfg(test)]
mod tests {
    use lexo_types::FieldKind;

    use super::*;
    use crate::descriptor::VirtualPropertyDescriptor;
    use crate::fixture::{lexicon, Lexicon};

    fn handler(lex: &Lexicon) -> BackReferenceHandler {
        let tag = lex
            .store
            .install_virtual("LexEntry", "RelatedFrom", FieldKind::ReferenceCollection, Some(lex.entry))
            .unwrap();
        let d = VirtualPropertyDescriptor::new("LexEntry", "RelatedFrom", FieldKind::ReferenceCollection);
        let mut h = BackReferenceHandler::new(HandlerBase::new(d, lex.shared()), lex.entry, lex.related);
        h.base_mut().descriptor_mut().set_tag(tag);
        h
    }

    fn link(lex: &Lexicon, from: ObjectId, to: &[ObjectId]) {
        lex.store
            .set_value(from, lex.related, PropValue::Vector(to.to_vec()))
            .unwrap();
    }

    fn read(lex: &Lexicon, h: &BackReferenceHandler, id: ObjectId) -> Vec<ObjectId> {
        h.load(id).unwrap();
        lex.store.vector(id, h.tag()).unwrap()
    }

    #[test]
    fn always_computed_on_read() {
        let lex = lexicon();
        assert!(handler(&lex).descriptor().compute_every_time());
    }

    #[test]
    fn lists_sources_pointing_at_target() {
        let lex = lexicon();
        let [a, b, c] = [(); 3].map(|_| lex.store.create_object(lex.entry).unwrap());
        link(&lex, a, &[c]);
        link(&lex, b, &[a, c]);
        let h = handler(&lex);
        assert_eq!(read(&lex, &h, c), vec![a, b]);
        assert_eq!(read(&lex, &h, a), vec![b]);
        assert!(read(&lex, &h, b).is_empty());
    }

    #[test]
    fn bulk_mode_serves_from_shadow() {
        let lex = lexicon();
        let [a, b] = [(); 2].map(|_| lex.store.create_object(lex.entry).unwrap());
        link(&lex, a, &[b]);
        let h = handler(&lex);
        h.set_load_for_all_of_class(true).unwrap();
        assert_eq!(h.retained(b), Some(PropValue::Vector(vec![a])));
        assert_eq!(h.retained(a), Some(PropValue::Vector(vec![])));

        // The shadow is a snapshot; changes after the scan are not seen.
        link(&lex, b, &[b]);
        assert_eq!(read(&lex, &h, b), vec![a]);

        h.set_load_for_all_of_class(false).unwrap();
        assert!(!h.has_shadow());
        assert_eq!(h.retained(b), None);
        assert_eq!(read(&lex, &h, b), vec![a, b]);
    }

    #[test]
    fn depends_only_on_source_field() {
        let lex = lexicon();
        let h = handler(&lex);
        let id = lex.store.create_object(lex.entry).unwrap();
        assert!(h.does_result_depend_on_prop(id, id, lex.related, None));
        assert!(!h.does_result_depend_on_prop(id, id, lex.headword, None));
        assert!(!h.does_result_depend_on_prop(id, id, lex.senses, None));
    }

    #[test]
    fn store_swap_discards_shadow() {
        let lex = lexicon();
        let h = handler(&lex);
        h.set_load_for_all_of_class(true).unwrap();
        h.set_store(lexicon().shared()).unwrap();
        assert!(!h.has_shadow());
    }
}
