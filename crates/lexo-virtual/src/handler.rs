use std::sync::{Arc, RwLock};

use lexo_store::PropertyStore;
use lexo_types::{FieldTag, ObjectId, PropValue, WsId};

use crate::descriptor::VirtualPropertyDescriptor;
use crate::error::VirtualResult;

/// State every handler carries: its descriptor and the store it computes
/// against. The store pointer is swapped when the store is reloaded.
pub struct HandlerBase {
    descriptor: VirtualPropertyDescriptor,
    store: RwLock<Arc<dyn PropertyStore>>,
}

impl HandlerBase {
    pub fn new(descriptor: VirtualPropertyDescriptor, store: Arc<dyn PropertyStore>) -> Self {
        Self {
            descriptor,
            store: RwLock::new(store),
        }
    }

    pub fn descriptor(&self) -> &VirtualPropertyDescriptor {
        &self.descriptor
    }

    pub fn descriptor_mut(&mut self) -> &mut VirtualPropertyDescriptor {
        &mut self.descriptor
    }

    pub fn store(&self) -> Arc<dyn PropertyStore> {
        Arc::clone(&self.store.read().expect("handler store lock poisoned"))
    }

    /// Install `store` and return the previous one.
    pub fn replace_store(&self, store: Arc<dyn PropertyStore>) -> Arc<dyn PropertyStore> {
        let mut slot = self.store.write().expect("handler store lock poisoned");
        std::mem::replace(&mut *slot, store)
    }
}

impl std::fmt::Debug for HandlerBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerBase")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// Computes the values of one virtual property.
///
/// Implementations supply [`load`](Self::load), which computes the value for
/// one object and caches it in the store under the handler's tag. Everything
/// else has a default.
pub trait VirtualPropertyHandler: Send + Sync {
    fn base(&self) -> &HandlerBase;

    fn base_mut(&mut self) -> &mut HandlerBase;

    fn descriptor(&self) -> &VirtualPropertyDescriptor {
        self.base().descriptor()
    }

    fn tag(&self) -> FieldTag {
        self.descriptor().tag()
    }

    fn store(&self) -> Arc<dyn PropertyStore> {
        self.base().store()
    }

    /// Point the handler at a new store.
    fn set_store(&self, store: Arc<dyn PropertyStore>) -> VirtualResult<()> {
        self.base().replace_store(store);
        Ok(())
    }

    /// Name used in configuration error messages.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// The (class, field) this implementation is written for, if fixed.
    fn expected_names(&self) -> Option<(&str, &str)> {
        None
    }

    /// Called once the tag is assigned and dependencies are resolved.
    fn attach(&self) -> VirtualResult<()> {
        Ok(())
    }

    /// Compute the value for `id` and cache it in the store.
    fn load(&self, id: ObjectId) -> VirtualResult<()>;

    /// Switch between whole-class and per-object computation.
    fn set_load_for_all_of_class(&self, _all: bool) -> VirtualResult<()> {
        Ok(())
    }

    /// Returns `true` if the value for `obj` may change when `field` of
    /// `changed` changes (in writing system `ws`, for multilingual strings).
    fn does_result_depend_on_prop(
        &self,
        _obj: ObjectId,
        _changed: ObjectId,
        _field: FieldTag,
        _ws: Option<WsId>,
    ) -> bool {
        false
    }

    /// Store a value written by a caller. Only reached for writable
    /// descriptors.
    fn write(&self, id: ObjectId, value: PropValue) -> VirtualResult<()> {
        self.store().set_value(id, self.tag(), value)?;
        Ok(())
    }

    /// Bulk-retention capability, if the handler keeps shadow data.
    fn as_bulk_retainer(&self) -> Option<&dyn RetainsBulkData> {
        None
    }
}

/// Handlers that keep their own copy of computed values while a bulk-load
/// session is active.
pub trait RetainsBulkData: Send + Sync {
    /// The retained value for `id`, if the shadow copy covers it.
    fn retained(&self, id: ObjectId) -> Option<PropValue>;

    /// Drop the shadow copy.
    fn discard_retained(&self);
}
