use std::any::Any;
use std::fmt;
use std::sync::Arc;

use lexo_meta::MetadataCatalog;
use lexo_store::{ObjectRecord, Ownership};
use lexo_types::{ClassId, ObjectId};

/// An in-memory domain object produced from a store record.
///
/// Objects are shared through `Arc`; the identity cache guarantees at most
/// one live instance per id.
pub trait DomainObject: Send + Sync + fmt::Debug {
    fn id(&self) -> ObjectId;

    fn class(&self) -> ClassId;

    /// Owner at the time the object was materialized.
    fn owner(&self) -> Option<Ownership>;

    /// Downcast support for application object types.
    fn as_any(&self) -> &dyn Any;
}

/// Builds typed objects from raw records.
pub trait ObjectFactory: Send + Sync {
    fn build(&self, record: &ObjectRecord, catalog: &dyn MetadataCatalog) -> Arc<dyn DomainObject>;
}

/// The object used when no application type is registered for a class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenericObject {
    pub id: ObjectId,
    pub class: ClassId,
    pub class_name: String,
    pub owner: Option<Ownership>,
}

impl DomainObject for GenericObject {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn class(&self) -> ClassId {
        self.class
    }

    fn owner(&self) -> Option<Ownership> {
        self.owner
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Factory producing [`GenericObject`]s for every class.
#[derive(Clone, Copy, Debug, Default)]
pub struct GenericFactory;

impl ObjectFactory for GenericFactory {
    fn build(&self, record: &ObjectRecord, catalog: &dyn MetadataCatalog) -> Arc<dyn DomainObject> {
        Arc::new(GenericObject {
            id: record.id,
            class: record.class,
            class_name: catalog
                .class_name(record.class)
                .unwrap_or_else(|| record.class.to_string()),
            owner: record.owner,
        })
    }
}
