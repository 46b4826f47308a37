//! In-memory metadata catalog for tests, fixtures and embedding.
//!
//! [`InMemoryCatalog`] keeps class and field definitions in ordered maps
//! behind a `RwLock`. Field tags follow the block convention of generated
//! models: every class owns the tag range `class_id * 1000 .. class_id * 1000
//! + 999`. Real fields are numbered from `+1`, computed fields from `+500`.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use tracing::debug;

use lexo_types::{ClassId, FieldKind, FieldTag};

use crate::error::{CatalogError, Result};
use crate::traits::MetadataCatalog;
use crate::types::{ClassDef, FieldDef};

const TAG_BLOCK: u32 = 1000;
const VIRTUAL_OFFSET: u32 = 500;

#[derive(Debug, Default)]
struct CatalogInner {
    classes: BTreeMap<ClassId, ClassDef>,
    by_name: HashMap<String, ClassId>,
    fields: BTreeMap<FieldTag, FieldDef>,
    /// Last real / virtual slot handed out per class.
    real_slots: HashMap<ClassId, u32>,
    virtual_slots: HashMap<ClassId, u32>,
}

impl CatalogInner {
    fn class_by_name(&self, name: &str) -> Result<ClassId> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| CatalogError::UnknownClass(name.to_string()))
    }

    fn declared(&self, class: ClassId, name: &str) -> Option<&FieldDef> {
        self.fields
            .values()
            .find(|f| f.owner_class == class && f.name == name)
    }

    fn next_tag(&mut self, class: ClassId, is_virtual: bool) -> Result<FieldTag> {
        let (offset, limit) = if is_virtual {
            (VIRTUAL_OFFSET, TAG_BLOCK - 1)
        } else {
            (0, VIRTUAL_OFFSET - 1)
        };
        let slots = if is_virtual { &self.virtual_slots } else { &self.real_slots };
        let slot = slots.get(&class).copied().unwrap_or(0);
        if slot >= limit - offset {
            return Err(CatalogError::TagSpaceExhausted(self.name_of(class)));
        }
        let tag = class
            .0
            .checked_mul(TAG_BLOCK)
            .and_then(|base| base.checked_add(offset + slot + 1))
            .ok_or_else(|| CatalogError::TagSpaceExhausted(self.name_of(class)))?;
        let slots = if is_virtual { &mut self.virtual_slots } else { &mut self.real_slots };
        slots.insert(class, slot + 1);
        Ok(FieldTag(tag))
    }

    fn name_of(&self, class: ClassId) -> String {
        self.classes
            .get(&class)
            .map(|c| c.name.clone())
            .unwrap_or_default()
    }
}

/// An in-memory implementation of [`MetadataCatalog`].
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    inner: RwLock<CatalogInner>,
}

impl InMemoryCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a class. The base class, if any, must already be defined.
    pub fn define_class(&self, def: ClassDef) -> Result<ClassId> {
        let mut inner = self.inner.write().expect("catalog lock poisoned");
        if inner.classes.contains_key(&def.id) || inner.by_name.contains_key(&def.name) {
            return Err(CatalogError::DuplicateClass { name: def.name });
        }
        if let Some(base) = def.base {
            if !inner.classes.contains_key(&base) {
                return Err(CatalogError::UnknownClassId(base));
            }
        }
        let id = def.id;
        inner.by_name.insert(def.name.clone(), id);
        inner.classes.insert(id, def);
        Ok(id)
    }

    /// Define a real (stored) field on a class and return its tag.
    pub fn define_field(
        &self,
        class_name: &str,
        field_name: &str,
        kind: FieldKind,
        signature: Option<&str>,
    ) -> Result<FieldTag> {
        let mut inner = self.inner.write().expect("catalog lock poisoned");
        let class = inner.class_by_name(class_name)?;
        let signature = signature.map(|s| inner.class_by_name(s)).transpose()?;
        if inner.declared(class, field_name).is_some() {
            return Err(CatalogError::DuplicateField {
                class: class_name.to_string(),
                field: field_name.to_string(),
            });
        }
        let tag = inner.next_tag(class, false)?;
        inner.fields.insert(
            tag,
            FieldDef {
                tag,
                name: field_name.to_string(),
                owner_class: class,
                kind,
                signature,
                is_virtual: false,
            },
        );
        Ok(tag)
    }

    /// Number of defined classes.
    pub fn class_count(&self) -> usize {
        self.inner.read().expect("catalog lock poisoned").classes.len()
    }

    /// All class definitions, in ascending id order.
    pub fn classes(&self) -> Vec<ClassDef> {
        self.inner
            .read()
            .expect("catalog lock poisoned")
            .classes
            .values()
            .cloned()
            .collect()
    }
}

impl MetadataCatalog for InMemoryCatalog {
    fn class_id(&self, name: &str) -> Option<ClassId> {
        self.inner
            .read()
            .expect("catalog lock poisoned")
            .by_name
            .get(name)
            .copied()
    }

    fn class_def(&self, class: ClassId) -> Option<ClassDef> {
        self.inner
            .read()
            .expect("catalog lock poisoned")
            .classes
            .get(&class)
            .cloned()
    }

    fn direct_subclasses(&self, class: ClassId) -> Vec<ClassId> {
        self.inner
            .read()
            .expect("catalog lock poisoned")
            .classes
            .values()
            .filter(|c| c.base == Some(class))
            .map(|c| c.id)
            .collect()
    }

    fn field(&self, tag: FieldTag) -> Option<FieldDef> {
        self.inner
            .read()
            .expect("catalog lock poisoned")
            .fields
            .get(&tag)
            .cloned()
    }

    fn all_fields(&self) -> Vec<FieldDef> {
        self.inner
            .read()
            .expect("catalog lock poisoned")
            .fields
            .values()
            .cloned()
            .collect()
    }

    fn install_virtual(
        &self,
        class_name: &str,
        field_name: &str,
        kind: FieldKind,
        signature: Option<ClassId>,
    ) -> Result<FieldTag> {
        let mut inner = self.inner.write().expect("catalog lock poisoned");
        let class = inner.class_by_name(class_name)?;
        if let Some(existing) = inner.declared(class, field_name) {
            if !existing.is_virtual {
                return Err(CatalogError::DuplicateField {
                    class: class_name.to_string(),
                    field: field_name.to_string(),
                });
            }
            return Ok(existing.tag);
        }
        let tag = inner.next_tag(class, true)?;
        inner.fields.insert(
            tag,
            FieldDef {
                tag,
                name: field_name.to_string(),
                owner_class: class,
                kind,
                signature,
                is_virtual: true,
            },
        );
        debug!(class = class_name, field = field_name, %tag, "installed virtual field");
        Ok(tag)
    }

    fn declared_fields(&self, class: ClassId) -> Vec<FieldDef> {
        self.inner
            .read()
            .expect("catalog lock poisoned")
            .fields
            .values()
            .filter(|f| f.owner_class == class)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// CmObject <- LexEntry, CmObject <- LexSense.
    fn lexicon() -> InMemoryCatalog {
        let cat = InMemoryCatalog::new();
        cat.define_class(ClassDef::new(ClassId(0), "CmObject").abstract_class())
            .unwrap();
        cat.define_class(ClassDef::new(ClassId(5002), "LexEntry").with_base(ClassId(0)))
            .unwrap();
        cat.define_class(
            ClassDef::new(ClassId(5016), "LexSense")
                .with_base(ClassId(0))
                .owned(),
        )
        .unwrap();
        cat
    }

    // ---- Class definitions ----

    #[test]
    fn define_and_lookup_classes() {
        let cat = lexicon();
        assert_eq!(cat.class_count(), 3);
        assert_eq!(cat.class_id("LexEntry"), Some(ClassId(5002)));
        assert_eq!(cat.class_name(ClassId(5016)).as_deref(), Some("LexSense"));
        assert!(cat.is_abstract(ClassId(0)));
        assert!(!cat.is_abstract(ClassId(5002)));
        assert!(cat.requires_owner(ClassId(5016)));
        assert_eq!(cat.direct_subclasses(ClassId(0)), vec![ClassId(5002), ClassId(5016)]);
    }

    #[test]
    fn duplicate_class_rejected() {
        let cat = lexicon();
        let err = cat
            .define_class(ClassDef::new(ClassId(77), "LexEntry"))
            .unwrap_err();
        assert_eq!(err, CatalogError::DuplicateClass { name: "LexEntry".into() });
    }

    #[test]
    fn unknown_base_rejected() {
        let cat = InMemoryCatalog::new();
        let err = cat
            .define_class(ClassDef::new(ClassId(2), "Orphan").with_base(ClassId(1)))
            .unwrap_err();
        assert_eq!(err, CatalogError::UnknownClassId(ClassId(1)));
    }

    #[test]
    fn subclass_relation() {
        let cat = lexicon();
        assert!(cat.is_same_or_subclass(ClassId(5002), ClassId(0)));
        assert!(cat.is_same_or_subclass(ClassId(5002), ClassId(5002)));
        assert!(!cat.is_same_or_subclass(ClassId(0), ClassId(5002)));
    }

    // ---- Field definitions ----

    #[test]
    fn field_tags_follow_class_blocks() {
        let cat = lexicon();
        let senses = cat
            .define_field("LexEntry", "Senses", FieldKind::OwningSequence, Some("LexSense"))
            .unwrap();
        let gloss = cat
            .define_field("LexSense", "Gloss", FieldKind::MultiString, None)
            .unwrap();
        assert_eq!(senses, FieldTag(5_002_001));
        assert_eq!(gloss, FieldTag(5_016_001));
        assert_eq!(cat.signature_class(senses), Some(ClassId(5016)));
        assert_eq!(cat.owner_class(gloss), Some(ClassId(5016)));
        assert_eq!(cat.field_kind(senses), Some(FieldKind::OwningSequence));
    }

    #[test]
    fn inherited_fields_resolve_through_base() {
        let cat = lexicon();
        let guid = cat
            .define_field("CmObject", "DateCreated", FieldKind::Integer, None)
            .unwrap();
        assert_eq!(cat.field_tag(ClassId(5002), "DateCreated"), Some(guid));
        assert_eq!(cat.field_tag(ClassId(5002), "Nope"), None);
    }

    #[test]
    fn duplicate_field_rejected() {
        let cat = lexicon();
        cat.define_field("LexEntry", "Comment", FieldKind::String, None)
            .unwrap();
        let err = cat
            .define_field("LexEntry", "Comment", FieldKind::String, None)
            .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateField { .. }));
    }

    #[test]
    fn unknown_signature_rejected() {
        let cat = lexicon();
        let err = cat
            .define_field("LexEntry", "Pics", FieldKind::OwningCollection, Some("CmPicture"))
            .unwrap_err();
        assert_eq!(err, CatalogError::UnknownClass("CmPicture".into()));
    }

    #[test]
    fn class_ids_past_the_tag_range_are_rejected() {
        let cat = InMemoryCatalog::new();
        cat.define_class(ClassDef::new(ClassId(5_000_000), "Big")).unwrap();
        let err = cat
            .define_field("Big", "X", FieldKind::Integer, None)
            .unwrap_err();
        assert_eq!(err, CatalogError::TagSpaceExhausted("Big".into()));
        let err = cat
            .install_virtual("Big", "Y", FieldKind::Integer, None)
            .unwrap_err();
        assert_eq!(err, CatalogError::TagSpaceExhausted("Big".into()));
        assert!(cat.all_fields().is_empty());
    }

    #[test]
    fn last_class_block_still_fits() {
        let cat = InMemoryCatalog::new();
        let top = u32::MAX / TAG_BLOCK - 1;
        cat.define_class(ClassDef::new(ClassId(top), "Top")).unwrap();
        let tag = cat.define_field("Top", "X", FieldKind::Integer, None).unwrap();
        assert_eq!(tag, FieldTag(top * TAG_BLOCK + 1));
    }

    // ---- Virtual fields ----

    #[test]
    fn virtual_install_is_stable() {
        let cat = lexicon();
        let t1 = cat
            .install_virtual("LexEntry", "VisibleSenses", FieldKind::ReferenceSequence, None)
            .unwrap();
        let t2 = cat
            .install_virtual("LexEntry", "VisibleSenses", FieldKind::ReferenceSequence, None)
            .unwrap();
        assert_eq!(t1, t2);
        assert_eq!(t1, FieldTag(5_002_501));
        assert!(cat.field(t1).unwrap().is_virtual);
    }

    #[test]
    fn virtual_install_never_claims_a_stored_field() {
        let cat = lexicon();
        let related = cat
            .define_field("LexEntry", "Related", FieldKind::ReferenceCollection, Some("LexEntry"))
            .unwrap();
        let err = cat
            .install_virtual("LexEntry", "Related", FieldKind::ReferenceCollection, None)
            .unwrap_err();
        assert_eq!(
            err,
            CatalogError::DuplicateField {
                class: "LexEntry".into(),
                field: "Related".into(),
            }
        );
        assert!(!cat.field(related).unwrap().is_virtual);
        assert_eq!(cat.all_fields().len(), 1);
    }

    #[test]
    fn virtual_install_on_unknown_class_fails() {
        let cat = lexicon();
        assert!(cat
            .install_virtual("Nope", "X", FieldKind::Integer, None)
            .is_err());
    }

    #[test]
    fn all_fields_in_tag_order() {
        let cat = lexicon();
        cat.define_field("LexSense", "Gloss", FieldKind::MultiString, None)
            .unwrap();
        cat.define_field("LexEntry", "Senses", FieldKind::OwningSequence, Some("LexSense"))
            .unwrap();
        let tags: Vec<FieldTag> = cat.all_fields().iter().map(|f| f.tag).collect();
        let mut sorted = tags.clone();
        sorted.sort();
        assert_eq!(tags, sorted);
    }
}
