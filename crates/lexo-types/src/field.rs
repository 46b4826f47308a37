use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Shape of a property.
///
/// Object-valued kinds combine ownership (owning or reference) with
/// cardinality (atomic, sequence, collection). Owning properties cascade
/// deletion to their members; reference properties only hold links.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Boolean,
    Integer,
    String,
    MultiString,
    OwningAtomic,
    ReferenceAtomic,
    OwningSequence,
    ReferenceSequence,
    OwningCollection,
    ReferenceCollection,
}

impl FieldKind {
    /// Returns `true` for every kind whose value is one or more object ids.
    pub fn is_object(&self) -> bool {
        !matches!(
            self,
            Self::Boolean | Self::Integer | Self::String | Self::MultiString
        )
    }

    /// Returns `true` for sequence and collection kinds.
    pub fn is_vector(&self) -> bool {
        self.is_sequence() || self.is_collection()
    }

    /// Returns `true` for ordered vectors.
    pub fn is_sequence(&self) -> bool {
        matches!(self, Self::OwningSequence | Self::ReferenceSequence)
    }

    /// Returns `true` for unordered vectors.
    pub fn is_collection(&self) -> bool {
        matches!(self, Self::OwningCollection | Self::ReferenceCollection)
    }

    /// Returns `true` for kinds whose members are owned by the holder.
    pub fn is_owning(&self) -> bool {
        matches!(
            self,
            Self::OwningAtomic | Self::OwningSequence | Self::OwningCollection
        )
    }

    /// Returns `true` for non-owning object kinds.
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            Self::ReferenceAtomic | Self::ReferenceSequence | Self::ReferenceCollection
        )
    }

    /// Canonical snake_case name, as used in configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::String => "string",
            Self::MultiString => "multi_string",
            Self::OwningAtomic => "owning_atomic",
            Self::ReferenceAtomic => "reference_atomic",
            Self::OwningSequence => "owning_sequence",
            Self::ReferenceSequence => "reference_sequence",
            Self::OwningCollection => "owning_collection",
            Self::ReferenceCollection => "reference_collection",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s {
            "boolean" => Self::Boolean,
            "integer" => Self::Integer,
            "string" => Self::String,
            "multi_string" => Self::MultiString,
            "owning_atomic" => Self::OwningAtomic,
            "reference_atomic" => Self::ReferenceAtomic,
            "owning_sequence" => Self::OwningSequence,
            "reference_sequence" => Self::ReferenceSequence,
            "owning_collection" => Self::OwningCollection,
            "reference_collection" => Self::ReferenceCollection,
            other => return Err(TypeError::UnknownFieldKind(other.to_string())),
        };
        Ok(kind)
    }
}
