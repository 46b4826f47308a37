//! Class and field metadata for the Lexo object cache.
//!
//! The catalog answers structural questions about the domain model: which
//! tag a named field has on a class, what kind of value it holds, which class
//! its object values belong to, and how classes relate by inheritance. The
//! cache and the virtual-property framework only consume this information;
//! the model itself is defined elsewhere.
//!
//! # Modules
//!
//! - [`error`] -- Error types for catalog operations
//! - [`types`] -- [`ClassDef`] and [`FieldDef`]
//! - [`traits`] -- The [`MetadataCatalog`] trait
//! - [`memory`] -- [`InMemoryCatalog`], a reference catalog for tests and fixtures

pub mod error;
pub mod memory;
pub mod traits;
pub mod types;

pub use error::{CatalogError, Result};
pub use memory::InMemoryCatalog;
pub use traits::MetadataCatalog;
pub use types::{ClassDef, FieldDef};
