//! Virtual (computed) properties for the Lexo object cache.
//!
//! A virtual property looks like any other field to callers: it has a tag,
//! a kind and values cached in the property store. Its values are computed
//! by a [`VirtualPropertyHandler`] on demand, and its declared dependency
//! paths tell the cache which real-field changes may invalidate it.
//!
//! # Lifecycle
//!
//! Handlers are built from [`VirtualPropertyConfig`] entries by named
//! [`HandlerFactories`], installed once through the
//! [`VirtualPropertyRegistry`] (which assigns their immutable tag and
//! resolves their dependency paths), then consulted on every read. A
//! [`BulkLoadSession`] lets handlers that implement [`RetainsBulkData`]
//! compute a whole class in one pass while the session is active.
//!
//! # Modules
//!
//! - [`backref`] -- [`BackReferenceHandler`], objects whose reference field points here
//! - [`bulk`] -- [`BulkLoadSession`]
//! - [`config`] -- [`VirtualPropertyConfig`]
//! - [`descriptor`] -- [`VirtualPropertyDescriptor`] and [`DependencyPath`]
//! - [`error`] -- Error types for virtual-property operations
//! - [`factory`] -- [`HandlerFactories`], implementation names to constructors
//! - [`filtered`] -- [`DerivedFilteredSequence`] and object filters
//! - [`handler`] -- The [`VirtualPropertyHandler`] trait and [`HandlerBase`]
//! - [`registry`] -- [`VirtualPropertyRegistry`]
//! - [`resolver`] -- Dotted dependency-path resolution

pub mod backref;
pub mod bulk;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod factory;
pub mod filtered;
pub mod handler;
pub mod registry;
pub mod resolver;

#[cfg(test)]
mod fixture;

pub use backref::BackReferenceHandler;
pub use bulk::BulkLoadSession;
pub use config::VirtualPropertyConfig;
pub use descriptor::{DependencyPath, VirtualPropertyDescriptor};
pub use error::{VirtualError, VirtualResult};
pub use factory::{HandlerConstructor, HandlerFactories};
pub use filtered::{DerivedFilteredSequence, FlidProvider, FnFilter, IntAboveFilter, ObjectFilter, SortSpec};
pub use handler::{HandlerBase, RetainsBulkData, VirtualPropertyHandler};
pub use registry::VirtualPropertyRegistry;
pub use resolver::{resolve_dependencies, resolve_path, OWNER_STEP};
