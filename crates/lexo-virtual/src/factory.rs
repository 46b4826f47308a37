//! Implementation names to handler constructors.
//!
//! Configuration names a handler implementation by string. Two are built
//! in:
//!
//! | Name               | Params                                                   |
//! |--------------------|----------------------------------------------------------|
//! | `FilteredSequence` | `source`, optional `int_field` / `above`, optional `sort` |
//! | `BackReference`    | `source_class`, `field`                                  |
//!
//! Applications register further constructors under their own names.

use std::collections::HashMap;
use std::sync::Arc;

use lexo_meta::MetadataCatalog;
use lexo_store::PropertyStore;
use lexo_types::{ClassId, FieldTag};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::backref::BackReferenceHandler;
use crate::config::VirtualPropertyConfig;
use crate::descriptor::VirtualPropertyDescriptor;
use crate::error::{VirtualError, VirtualResult};
use crate::filtered::{DerivedFilteredSequence, IntAboveFilter, SortSpec};
use crate::handler::{HandlerBase, VirtualPropertyHandler};

/// Builds a handler from its (untagged) descriptor, its configuration entry
/// and the store it will compute against.
pub type HandlerConstructor = Box<
    dyn Fn(VirtualPropertyDescriptor, &VirtualPropertyConfig, Arc<dyn PropertyStore>) -> VirtualResult<Box<dyn VirtualPropertyHandler>>
        + Send
        + Sync,
>;

pub const FILTERED_SEQUENCE: &str = "FilteredSequence";
pub const BACK_REFERENCE: &str = "BackReference";

/// Registry of handler constructors keyed by implementation name.
pub struct HandlerFactories {
    constructors: HashMap<String, HandlerConstructor>,
}

impl HandlerFactories {
    /// An empty set, without the built-in implementations.
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    pub fn with_builtins() -> Self {
        let mut factories = Self::new();
        factories.register(FILTERED_SEQUENCE, filtered_sequence);
        factories.register(BACK_REFERENCE, back_reference);
        factories
    }

    /// Register `constructor` under `name`, replacing any previous one.
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: Fn(VirtualPropertyDescriptor, &VirtualPropertyConfig, Arc<dyn PropertyStore>) -> VirtualResult<Box<dyn VirtualPropertyHandler>>
            + Send
            + Sync
            + 'static,
    {
        self.constructors.insert(name.into(), Box::new(constructor));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.constructors.keys().cloned().collect();
        names.sort();
        names
    }

    /// Build the handler `config` asks for.
    pub fn build(
        &self,
        config: &VirtualPropertyConfig,
        store: Arc<dyn PropertyStore>,
    ) -> VirtualResult<Box<dyn VirtualPropertyHandler>> {
        let constructor = self
            .constructors
            .get(&config.implementation)
            .ok_or_else(|| VirtualError::UnknownImplementation(config.implementation.clone()))?;
        constructor(VirtualPropertyDescriptor::from_config(config), config, store)
    }
}

impl Default for HandlerFactories {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl std::fmt::Debug for HandlerFactories {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerFactories")
            .field("names", &self.names())
            .finish()
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FilteredParams {
    source: String,
    #[serde(default)]
    int_field: Option<String>,
    #[serde(default)]
    above: i64,
    #[serde(default)]
    sort: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BackReferenceParams {
    source_class: String,
    field: String,
}

fn params<T: DeserializeOwned>(config: &VirtualPropertyConfig) -> VirtualResult<T> {
    serde_json::from_value(config.params.clone()).map_err(|e| VirtualError::InvalidParams {
        implementation: config.implementation.clone(),
        reason: e.to_string(),
    })
}

fn class(catalog: &dyn MetadataCatalog, name: &str) -> VirtualResult<ClassId> {
    catalog
        .class_id(name)
        .ok_or_else(|| VirtualError::UnknownClass(name.to_string()))
}

fn field(catalog: &dyn MetadataCatalog, class: ClassId, name: &str) -> VirtualResult<FieldTag> {
    catalog
        .field_tag(class, name)
        .ok_or_else(|| VirtualError::UnknownField {
            class: catalog.class_name(class).unwrap_or_else(|| class.to_string()),
            field: name.to_string(),
        })
}

fn invalid(config: &VirtualPropertyConfig, reason: impl Into<String>) -> VirtualError {
    VirtualError::InvalidParams {
        implementation: config.implementation.clone(),
        reason: reason.into(),
    }
}

fn filtered_sequence(
    descriptor: VirtualPropertyDescriptor,
    config: &VirtualPropertyConfig,
    store: Arc<dyn PropertyStore>,
) -> VirtualResult<Box<dyn VirtualPropertyHandler>> {
    let p: FilteredParams = params(config)?;
    if !config.kind.is_sequence() {
        return Err(invalid(config, format!("declared kind {} is not a sequence", config.kind)));
    }
    let catalog = store.metadata();
    let owner = class(catalog.as_ref(), &config.class)?;
    let source = field(catalog.as_ref(), owner, &p.source)?;
    if !catalog.field_kind(source).is_some_and(|k| k.is_vector()) {
        return Err(invalid(config, format!("source {} is not a vector field", p.source)));
    }

    let mut handler = DerivedFilteredSequence::new(HandlerBase::new(descriptor, store.clone()), owner, source);
    if let Some(name) = &p.int_field {
        let member = catalog
            .signature_class(source)
            .ok_or_else(|| invalid(config, format!("source {} has no member class", p.source)))?;
        handler = handler.with_filter(IntAboveFilter {
            field: field(catalog.as_ref(), member, name)?,
            threshold: p.above,
        });
    }
    if !p.sort.is_empty() {
        handler = handler.with_sort(SortSpec { keys: p.sort });
    }
    Ok(Box::new(handler))
}

fn back_reference(
    descriptor: VirtualPropertyDescriptor,
    config: &VirtualPropertyConfig,
    store: Arc<dyn PropertyStore>,
) -> VirtualResult<Box<dyn VirtualPropertyHandler>> {
    let p: BackReferenceParams = params(config)?;
    if !config.kind.is_vector() || config.kind.is_owning() {
        return Err(invalid(config, format!("declared kind {} is not a reference vector", config.kind)));
    }
    let catalog = store.metadata();
    let source_class = class(catalog.as_ref(), &p.source_class)?;
    let source_field = field(catalog.as_ref(), source_class, &p.field)?;
    if !catalog.field_kind(source_field).is_some_and(|k| k.is_reference()) {
        return Err(invalid(config, format!("{} is not a reference field", p.field)));
    }
    Ok(Box::new(BackReferenceHandler::new(
        HandlerBase::new(descriptor, store),
        source_class,
        source_field,
    )))
}
