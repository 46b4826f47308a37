//! Declarative test data.
//!
//! A fixture file describes a catalog (classes and fields), objects with
//! their property values and, optionally, the cache configuration to use
//! with them. Objects are named by fixture-local integer keys; the store
//! allocates the real ids and [`LoadedFixture`] maps between the two.
//!
//! Owned objects name their owner and owning field and must come after the
//! owner in the file; they are added to the owning field in file order.
//! Reference values may point at any key in the file.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use lexo_meta::{ClassDef, InMemoryCatalog, MetadataCatalog};
use lexo_store::{InMemoryPropertyStore, PropertyStore};
use lexo_types::{ClassId, FieldKind, FieldTag, ObjectId, PropValue, WsId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::CacheConfig;
use crate::error::{SdkError, SdkResult};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSpec {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    #[serde(default)]
    pub owned: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub class: String,
    pub name: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub signature: Option<String>,
}

/// A property value as written in a fixture. Its meaning depends on the
/// kind of the field it is assigned to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FixtureValue {
    Bool(bool),
    /// An integer, or the key of a referenced object.
    Int(i64),
    Text(String),
    /// Keys of referenced objects.
    Keys(Vec<i64>),
    /// Multilingual text keyed by writing-system number.
    Strings(BTreeMap<String, String>),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSpec {
    pub key: i64,
    pub class: String,
    #[serde(default)]
    pub owner: Option<i64>,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub values: BTreeMap<String, FixtureValue>,
}

/// A parsed fixture file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fixture {
    pub classes: Vec<ClassSpec>,
    pub fields: Vec<FieldSpec>,
    pub objects: Vec<ObjectSpec>,
    pub cache: CacheConfig,
}

impl Fixture {
    pub fn from_toml_str(text: &str) -> SdkResult<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> SdkResult<Self> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    /// Build the catalog and store the fixture describes.
    pub fn build(&self) -> SdkResult<LoadedFixture> {
        let catalog = Arc::new(InMemoryCatalog::new());
        for class in &self.classes {
            catalog.define_class(self.class_def(&catalog, class)?)?;
        }
        for field in &self.fields {
            catalog.define_field(&field.class, &field.name, field.kind, field.signature.as_deref())?;
        }

        let store = Arc::new(InMemoryPropertyStore::new(catalog.clone()));
        let mut keys = BTreeMap::new();
        for object in &self.objects {
            if keys.contains_key(&object.key) {
                return Err(SdkError::Fixture(format!("duplicate object key {}", object.key)));
            }
            let id = self.create(&catalog, store.as_ref(), &keys, object)?;
            keys.insert(object.key, id);
        }

        let loaded = LoadedFixture {
            catalog,
            store,
            keys,
            cache: self.cache.clone(),
        };
        for object in &self.objects {
            loaded.apply_values(object)?;
        }
        debug!(
            classes = self.classes.len(),
            fields = self.fields.len(),
            objects = self.objects.len(),
            "fixture built"
        );
        Ok(loaded)
    }

    fn class_def(&self, catalog: &InMemoryCatalog, spec: &ClassSpec) -> SdkResult<ClassDef> {
        let mut def = ClassDef::new(ClassId(spec.id), spec.name.clone());
        if let Some(base) = &spec.base {
            let base = catalog
                .class_id(base)
                .ok_or_else(|| SdkError::Fixture(format!("base class {base} of {} is not defined before it", spec.name)))?;
            def = def.with_base(base);
        }
        if spec.is_abstract {
            def = def.abstract_class();
        }
        if spec.owned {
            def = def.owned();
        }
        Ok(def)
    }

    fn create(
        &self,
        catalog: &InMemoryCatalog,
        store: &dyn PropertyStore,
        keys: &BTreeMap<i64, ObjectId>,
        spec: &ObjectSpec,
    ) -> SdkResult<ObjectId> {
        let class = catalog
            .class_id(&spec.class)
            .ok_or_else(|| SdkError::Fixture(format!("object {} has unknown class {}", spec.key, spec.class)))?;
        match (spec.owner, &spec.field) {
            (None, None) => Ok(store.create_object(class)?),
            (Some(owner_key), Some(field)) => {
                let owner = keys.get(&owner_key).copied().ok_or_else(|| {
                    SdkError::Fixture(format!("owner {owner_key} of object {} must come before it", spec.key))
                })?;
                let owner_class = store
                    .class_of(owner)?
                    .ok_or(SdkError::UnknownObject(owner_key))?;
                let tag = field_tag(catalog, owner_class, field)?;
                Ok(store.create_owned(class, owner, tag, None)?)
            }
            _ => Err(SdkError::Fixture(format!(
                "object {} needs both owner and field, or neither",
                spec.key
            ))),
        }
    }
}

fn field_tag(catalog: &dyn MetadataCatalog, class: ClassId, name: &str) -> SdkResult<FieldTag> {
    catalog.field_tag(class, name).ok_or_else(|| {
        SdkError::Fixture(format!(
            "{} has no field {name}",
            catalog.class_name(class).unwrap_or_else(|| class.to_string())
        ))
    })
}

/// A built fixture: its catalog, its populated store and the key-to-id map.
#[derive(Debug)]
pub struct LoadedFixture {
    pub catalog: Arc<InMemoryCatalog>,
    pub store: Arc<InMemoryPropertyStore>,
    keys: BTreeMap<i64, ObjectId>,
    /// Cache configuration carried by the fixture file.
    pub cache: CacheConfig,
}

impl LoadedFixture {
    pub fn shared_store(&self) -> Arc<dyn PropertyStore> {
        self.store.clone()
    }

    /// Store id of the object with fixture key `key`.
    pub fn id(&self, key: i64) -> SdkResult<ObjectId> {
        self.keys.get(&key).copied().ok_or(SdkError::UnknownObject(key))
    }

    /// Fixture key of store id `id`.
    pub fn key_of(&self, id: ObjectId) -> Option<i64> {
        self.keys.iter().find(|(_, v)| **v == id).map(|(k, _)| *k)
    }

    /// (key, id) pairs in key order.
    pub fn keys(&self) -> impl Iterator<Item = (i64, ObjectId)> + '_ {
        self.keys.iter().map(|(k, v)| (*k, *v))
    }

    fn apply_values(&self, spec: &ObjectSpec) -> SdkResult<()> {
        let id = self.id(spec.key)?;
        let class = self
            .store
            .class_of(id)?
            .ok_or(SdkError::UnknownObject(spec.key))?;
        for (name, value) in &spec.values {
            let tag = field_tag(self.catalog.as_ref(), class, name)?;
            let kind = self
                .catalog
                .field_kind(tag)
                .ok_or_else(|| SdkError::Fixture(format!("{name} has no kind")))?;
            self.apply(id, tag, kind, name, value)?;
        }
        Ok(())
    }

    fn apply(&self, id: ObjectId, tag: FieldTag, kind: FieldKind, name: &str, value: &FixtureValue) -> SdkResult<()> {
        let store = self.store.as_ref();
        match (kind, value) {
            (FieldKind::Boolean, FixtureValue::Bool(b)) => store.set_boolean(id, tag, *b)?,
            (FieldKind::Integer, FixtureValue::Int(n)) => store.set_int(id, tag, *n)?,
            (FieldKind::String, FixtureValue::Text(s)) => store.set_string(id, tag, s)?,
            (FieldKind::MultiString, FixtureValue::Strings(texts)) => {
                for (ws, text) in texts {
                    let ws: i32 = ws
                        .parse()
                        .map_err(|_| SdkError::Fixture(format!("{name}: writing system {ws} is not a number")))?;
                    store.set_multi_string(id, tag, WsId(ws), text)?;
                }
            }
            (FieldKind::ReferenceAtomic, FixtureValue::Int(key)) => {
                store.set_value(id, tag, PropValue::Object(self.id(*key)?))?
            }
            (FieldKind::ReferenceSequence | FieldKind::ReferenceCollection, FixtureValue::Keys(keys)) => {
                let ids = keys.iter().map(|k| self.id(*k)).collect::<SdkResult<Vec<_>>>()?;
                store.set_value(id, tag, PropValue::Vector(ids))?
            }
            (kind, _) if kind.is_owning() => {
                return Err(SdkError::Fixture(format!(
                    "owning field {name} is filled by giving objects an owner"
                )))
            }
            (kind, value) => {
                return Err(SdkError::Fixture(format!("{name} is a {kind} field, got {value:?}")));
            }
        }
        Ok(())
    }
}

/// The lexicon fixture shipped with the repository.
#[cfg(test)]
pub(crate) const LEXICON: &str = include_str!("../../../fixtures/lexicon.toml");
