//! Class and field definitions.

use serde::{Deserialize, Serialize};

use lexo_types::{ClassId, FieldKind, FieldTag};

/// Definition of one domain class.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDef {
    pub id: ClassId,
    pub name: String,
    /// Direct base class; `None` only for the root of the hierarchy.
    pub base: Option<ClassId>,
    /// Abstract classes never have instances of their own.
    pub is_abstract: bool,
    /// Instances of this class must live inside an owning property.
    pub requires_owner: bool,
}

impl ClassDef {
    pub fn new(id: ClassId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            base: None,
            is_abstract: false,
            requires_owner: false,
        }
    }

    pub fn with_base(mut self, base: ClassId) -> Self {
        self.base = Some(base);
        self
    }

    pub fn abstract_class(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn owned(mut self) -> Self {
        self.requires_owner = true;
        self
    }
}

/// Definition of one property on a class.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub tag: FieldTag,
    pub name: String,
    /// Class that declares the field.
    pub owner_class: ClassId,
    pub kind: FieldKind,
    /// Class of the objects an object-valued field holds.
    pub signature: Option<ClassId>,
    /// Computed fields are installed at runtime by the virtual-property registry.
    pub is_virtual: bool,
}

impl FieldDef {
    /// Returns `true` if the field holds owned objects.
    pub fn is_owning(&self) -> bool {
        self.kind.is_owning()
    }
}
