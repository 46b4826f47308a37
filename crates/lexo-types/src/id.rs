use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Opaque handle to a domain object.
///
/// Object ids are assigned by the backing store and stay stable for the
/// lifetime of a session. Non-positive raw values never name an object: they
/// are the "null" handles a store may hand back for an empty atomic field, and
/// every loader in this workspace skips them.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(i64);

impl ObjectId {
    /// The null handle.
    pub const NULL: ObjectId = ObjectId(0);

    /// Wrap a raw store identifier.
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// The raw store identifier.
    pub const fn raw(&self) -> i64 {
        self.0
    }

    /// Returns `true` for zero and negative handles.
    pub const fn is_null(&self) -> bool {
        self.0 <= 0
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<i64> for ObjectId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

impl FromStr for ObjectId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix('#').unwrap_or(s);
        s.parse::<i64>()
            .map(Self)
            .map_err(|e| TypeError::InvalidObjectId(format!("{s}: {e}")))
    }
}

/// Numeric identifier of a domain class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassId(pub u32);

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class:{}", self.0)
    }
}

/// Numeric identifier of a property on a class.
///
/// A tag of zero means "not assigned yet"; virtual property descriptors use it
/// to tell an installed descriptor from a fresh one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldTag(pub u32);

impl FieldTag {
    /// The unassigned tag.
    pub const NONE: FieldTag = FieldTag(0);

    /// Returns `true` if this is the unassigned tag.
    pub const fn is_none(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for FieldTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "flid:{}", self.0)
    }
}

/// Writing-system selector for multilingual string properties.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WsId(pub i32);

impl fmt::Display for WsId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ws:{}", self.0)
    }
}
