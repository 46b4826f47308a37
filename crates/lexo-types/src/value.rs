use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::field::FieldKind;
use crate::id::ObjectId;

/// A property value as held in a property store cache.
///
/// Multilingual strings are stored one [`PropValue::String`] per writing
/// system; the writing system is part of the cache key, not of the value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PropValue {
    Boolean(bool),
    Integer(i64),
    String(String),
    Object(ObjectId),
    Vector(Vec<ObjectId>),
}

impl PropValue {
    /// Short name of the variant, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Boolean(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::String(_) => "string",
            Self::Object(_) => "object",
            Self::Vector(_) => "vector",
        }
    }

    /// Returns `true` if this value can be stored in a field of `kind`.
    pub fn fits(&self, kind: FieldKind) -> bool {
        match self {
            Self::Boolean(_) => kind == FieldKind::Boolean,
            Self::Integer(_) => kind == FieldKind::Integer,
            Self::String(_) => matches!(kind, FieldKind::String | FieldKind::MultiString),
            Self::Object(_) => matches!(kind, FieldKind::OwningAtomic | FieldKind::ReferenceAtomic),
            Self::Vector(_) => kind.is_vector(),
        }
    }

    /// Check that this value fits `kind`.
    pub fn expect_kind(&self, kind: FieldKind) -> Result<(), TypeError> {
        if self.fits(kind) {
            Ok(())
        } else {
            Err(TypeError::KindMismatch {
                expected: kind,
                actual: self.kind_name().to_string(),
            })
        }
    }

    pub fn as_vector(&self) -> Option<&[ObjectId]> {
        match self {
            Self::Vector(ids) => Some(ids),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<ObjectId> {
        match self {
            Self::Object(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<Vec<ObjectId>> for PropValue {
    fn from(ids: Vec<ObjectId>) -> Self {
        Self::Vector(ids)
    }
}
