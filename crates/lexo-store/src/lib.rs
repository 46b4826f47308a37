//! Property storage for the Lexo object cache.
//!
//! The property store is the sole source of truth for domain data: typed
//! scalar and string properties keyed by (object, field), vector properties,
//! object lifecycle, and a synchronous change-notification channel. The
//! cache layers above it never hold authoritative data of their own.
//!
//! # Storage Backends
//!
//! All backends implement the [`PropertyStore`] trait:
//!
//! - [`InMemoryPropertyStore`] -- map-based store for tests, fixtures and embedding
//!
//! # Decoration
//!
//! [`StoreDecorator`] wraps another store and forwards every operation to it
//! unless the implementor overrides that operation. Every decorator is itself
//! a [`PropertyStore`]. [`PassThroughStore`] overrides nothing;
//! [`OverlayStore`] serves selected fields from a private overlay.
//!
//! # Design Rules
//!
//! 1. Mutations never broadcast on their own. Whoever mutates calls
//!    [`PropertyStore::prop_changed`] once the change is complete.
//! 2. Owning vectors cascade deletion; reference vectors only hold links.
//! 3. All backend errors are propagated, never silently ignored.

pub mod decorator;
pub mod error;
pub mod memory;
pub mod notify;
pub mod overlay;
pub mod task;
pub mod traits;
pub mod types;

pub use decorator::{PassThroughStore, StoreDecorator};
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryPropertyStore;
pub use notify::{ChangeListener, ListenerSet, SubscriptionId};
pub use overlay::OverlayStore;
pub use task::TaskTracker;
pub use traits::PropertyStore;
pub use types::{LoadScope, ObjectRecord, Ownership, PropChange};
