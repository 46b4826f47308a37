//! Object materialization for the Lexo object cache.
//!
//! This crate turns raw [`ObjectId`]s into shared, identity-mapped domain
//! objects and exposes vector-valued properties as typed views.
//!
//! # Modules
//!
//! - [`config`] -- [`BatchLoadConfig`], the exact-vs-whole-class heuristic
//! - [`error`] -- Error types for cache operations
//! - [`identity`] -- [`IdentityCache`], one in-memory object per id
//! - [`loader`] -- [`BatchLoader`], class-grouped batch materialization
//! - [`object`] -- [`DomainObject`] and [`ObjectFactory`]
//! - [`vector`] -- [`VectorView`] over owning/reference sequences and collections
//!
//! [`ObjectId`]: lexo_types::ObjectId

pub mod config;
pub mod error;
pub mod identity;
pub mod loader;
pub mod object;
pub mod vector;

#[cfg(test)]
mod fixture;

pub use config::BatchLoadConfig;
pub use error::{CacheError, CacheResult};
pub use identity::IdentityCache;
pub use loader::BatchLoader;
pub use object::{DomainObject, GenericFactory, GenericObject, ObjectFactory};
pub use vector::{
    OwningCollection, OwningKind, OwningSequence, ReferenceCollection, ReferenceSequence,
    SequenceKind, VectorKind, VectorView,
};
