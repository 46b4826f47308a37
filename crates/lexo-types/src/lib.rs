//! Foundation types for the Lexo object cache.
//!
//! This crate provides the identity and property-shape types used throughout
//! the Lexo workspace. Every other Lexo crate depends on `lexo-types`.
//!
//! # Key Types
//!
//! - [`ObjectId`] -- Opaque, session-stable handle to one domain object
//! - [`ClassId`] -- Numeric identifier of a domain class
//! - [`FieldTag`] -- Numeric identifier of a property on a class
//! - [`WsId`] -- Writing-system selector for multilingual strings
//! - [`FieldKind`] -- Shape of a property (scalar, string, owning/reference vector)
//! - [`PropValue`] -- A cached property value

pub mod error;
pub mod field;
pub mod id;
pub mod value;

pub use error::TypeError;
pub use field::FieldKind;
pub use id::{ClassId, FieldTag, ObjectId, WsId};
pub use value::PropValue;
