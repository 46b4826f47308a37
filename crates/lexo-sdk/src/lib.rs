//! High-level entry point for the Lexo object cache.
//!
//! [`ObjectCache`] owns a property store together with the identity cache,
//! batch-loading settings and virtual-property registry layered on it.
//! [`CacheConfig`] is its TOML configuration and [`Fixture`] builds small
//! in-memory catalogs and stores from TOML for tests and the CLI.

pub mod cache;
pub mod config;
pub mod error;
pub mod fixture;

pub use cache::ObjectCache;
pub use config::CacheConfig;
pub use error::{SdkError, SdkResult};
pub use fixture::{ClassSpec, FieldSpec, Fixture, FixtureValue, LoadedFixture, ObjectSpec};

// Re-export key types
pub use lexo_cache::{
    BatchLoadConfig, DomainObject, OwningCollection, OwningSequence, ReferenceCollection, ReferenceSequence,
};
pub use lexo_store::{PropChange, PropertyStore};
pub use lexo_types::{ClassId, FieldKind, FieldTag, ObjectId, PropValue};
pub use lexo_virtual::{VirtualPropertyConfig, VirtualPropertyRegistry};
