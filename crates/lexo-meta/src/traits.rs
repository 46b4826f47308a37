//! The [`MetadataCatalog`] trait defining the metadata lookup interface.
//!
//! The catalog is an external collaborator of the cache: any backend (a
//! generated model table, a database schema reader, the in-memory fixture
//! catalog) implements this trait.

use lexo_types::{ClassId, FieldKind, FieldTag};

use crate::error::Result;
use crate::types::{ClassDef, FieldDef};

/// Read access to class and field metadata, plus registration of computed
/// fields.
///
/// Enumeration methods return their results in a stable order (ascending
/// class id / field tag). Callers that pick "the first match" among several
/// candidates rely on that order.
pub trait MetadataCatalog: Send + Sync {
    /// Look up a class by name.
    fn class_id(&self, name: &str) -> Option<ClassId>;

    /// The full definition of a class.
    fn class_def(&self, class: ClassId) -> Option<ClassDef>;

    /// Classes whose direct base is `class`, in ascending id order.
    fn direct_subclasses(&self, class: ClassId) -> Vec<ClassId>;

    /// The definition of a field.
    fn field(&self, tag: FieldTag) -> Option<FieldDef>;

    /// Every field of every class, real and virtual, in ascending tag order.
    fn all_fields(&self) -> Vec<FieldDef>;

    /// Register a computed field and return its tag.
    ///
    /// Installing the same (class, field) twice returns the tag handed out
    /// the first time.
    fn install_virtual(
        &self,
        class_name: &str,
        field_name: &str,
        kind: FieldKind,
        signature: Option<ClassId>,
    ) -> Result<FieldTag>;

    /// Name of a class.
    fn class_name(&self, class: ClassId) -> Option<String> {
        self.class_def(class).map(|c| c.name)
    }

    /// Direct base class.
    fn base_class(&self, class: ClassId) -> Option<ClassId> {
        self.class_def(class).and_then(|c| c.base)
    }

    /// Returns `true` for abstract classes. Unknown classes are not abstract.
    fn is_abstract(&self, class: ClassId) -> bool {
        self.class_def(class).is_some_and(|c| c.is_abstract)
    }

    /// Returns `true` if instances of `class` must have an owner.
    fn requires_owner(&self, class: ClassId) -> bool {
        self.class_def(class).is_some_and(|c| c.requires_owner)
    }

    /// Returns `true` if `class` is `ancestor` or derives from it.
    fn is_same_or_subclass(&self, class: ClassId, ancestor: ClassId) -> bool {
        let mut current = Some(class);
        while let Some(c) = current {
            if c == ancestor {
                return true;
            }
            current = self.base_class(c);
        }
        false
    }

    /// Fields declared directly on `class` (inherited fields excluded).
    fn declared_fields(&self, class: ClassId) -> Vec<FieldDef> {
        self.all_fields()
            .into_iter()
            .filter(|f| f.owner_class == class)
            .collect()
    }

    /// Resolve a field name on `class`, searching base classes as well.
    fn field_tag(&self, class: ClassId, name: &str) -> Option<FieldTag> {
        let mut current = Some(class);
        while let Some(c) = current {
            if let Some(f) = self.declared_fields(c).into_iter().find(|f| f.name == name) {
                return Some(f.tag);
            }
            current = self.base_class(c);
        }
        None
    }

    /// Kind of a field.
    fn field_kind(&self, tag: FieldTag) -> Option<FieldKind> {
        self.field(tag).map(|f| f.kind)
    }

    /// Class of the objects held by an object-valued field.
    fn signature_class(&self, tag: FieldTag) -> Option<ClassId> {
        self.field(tag).and_then(|f| f.signature)
    }

    /// Class declaring a field.
    fn owner_class(&self, tag: FieldTag) -> Option<ClassId> {
        self.field(tag).map(|f| f.owner_class)
    }
}
