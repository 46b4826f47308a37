//! Dependency-path resolution.
//!
//! A dependency specification is a comma-separated list of dotted paths,
//! each walked from the virtual property's class:
//!
//! ```text
//! Senses.Gloss, OwnerHVO.HeadWord
//! ```
//!
//! Each name is looked up on the current class (ancestors included). When
//! the current class lacks the name and is abstract, its direct subclasses
//! are tried in order and the first that has it wins. After an object-valued
//! field the walk continues from that field's signature class.
//!
//! [`OWNER_STEP`] steps to the class that owns objects of the current class:
//! the first owning field (in tag order) whose signature accepts the current
//! class and whose declaring class has the next named field. The owning
//! field's tag is recorded and the walk continues from its declaring class.
//!
//! A path that fails to resolve is dropped with a warning; the other paths
//! in the same `depends_on` string are unaffected.

use lexo_meta::MetadataCatalog;
use lexo_types::{ClassId, FieldTag};
use tracing::warn;

use crate::descriptor::DependencyPath;
use crate::error::{VirtualError, VirtualResult};

/// The path step naming the owner of the current object.
pub const OWNER_STEP: &str = "OwnerHVO";

/// Resolve every path of `spec`, dropping (and logging) those that fail.
pub fn resolve_dependencies(catalog: &dyn MetadataCatalog, class: ClassId, spec: &str) -> Vec<DependencyPath> {
    spec.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .filter_map(|path| match resolve_path(catalog, class, path) {
            Ok(resolved) => Some(resolved),
            Err(e) => {
                warn!(%class, path, error = %e, "dropping unresolvable dependency path");
                None
            }
        })
        .collect()
}

/// Resolve one dotted path.
pub fn resolve_path(catalog: &dyn MetadataCatalog, class: ClassId, path: &str) -> VirtualResult<DependencyPath> {
    let names: Vec<&str> = path.split('.').map(str::trim).collect();
    let unresolved = |name: &str, at: ClassId| VirtualError::Unresolved {
        path: path.to_string(),
        name: name.to_string(),
        class: catalog.class_name(at).unwrap_or_else(|| at.to_string()),
    };

    let mut tags = Vec::with_capacity(names.len());
    let mut current = class;
    let mut i = 0;
    while i < names.len() {
        let name = names[i];
        if name.is_empty() {
            return Err(unresolved(name, current));
        }
        let is_last = i + 1 == names.len();

        if name == OWNER_STEP {
            let next = names
                .get(i + 1)
                .copied()
                .ok_or_else(|| unresolved(name, current))?;
            let (owning, owner_class) =
                owning_field(catalog, current, next).ok_or_else(|| unresolved(name, current))?;
            tags.push(owning);
            current = owner_class;
            i += 1;
            continue;
        }

        let tag = find_field(catalog, current, name).ok_or_else(|| unresolved(name, current))?;
        tags.push(tag);
        if !is_last {
            current = catalog
                .signature_class(tag)
                .ok_or_else(|| unresolved(names[i + 1], current))?;
        }
        i += 1;
    }
    Ok(DependencyPath(tags))
}

/// `name` on `class` or its ancestors, else on the first direct subclass of
/// an abstract `class` that has it.
fn find_field(catalog: &dyn MetadataCatalog, class: ClassId, name: &str) -> Option<FieldTag> {
    if let Some(tag) = catalog.field_tag(class, name) {
        return Some(tag);
    }
    if !catalog.is_abstract(class) {
        return None;
    }
    catalog
        .direct_subclasses(class)
        .into_iter()
        .find_map(|sub| catalog.field_tag(sub, name))
}

/// The first owning field that can hold `class` and whose declaring class
/// has a field called `next`.
fn owning_field(catalog: &dyn MetadataCatalog, class: ClassId, next: &str) -> Option<(FieldTag, ClassId)> {
    catalog
        .all_fields()
        .into_iter()
        .filter(|f| f.is_owning())
        .filter(|f| {
            f.signature
                .is_some_and(|sig| catalog.is_same_or_subclass(class, sig))
        })
        .find(|f| find_field(catalog, f.owner_class, next).is_some())
        .map(|f| (f.tag, f.owner_class))
}

#[cfg(test)]
mod tests {
    use lexo_meta::{ClassDef, InMemoryCatalog};
    use lexo_types::FieldKind;

    use super::*;

    /// Abstract A with subclasses B and C; only C declares X. D owns A
    /// objects and has a name field.
    fn hierarchy() -> InMemoryCatalog {
        let cat = InMemoryCatalog::new();
        cat.define_class(ClassDef::new(ClassId(1), "A").abstract_class())
            .unwrap();
        cat.define_class(ClassDef::new(ClassId(2), "B").with_base(ClassId(1)))
            .unwrap();
        cat.define_class(ClassDef::new(ClassId(3), "C").with_base(ClassId(1)))
            .unwrap();
        cat.define_class(ClassDef::new(ClassId(4), "D")).unwrap();
        cat.define_class(ClassDef::new(ClassId(5), "Word")).unwrap();
        cat.define_field("C", "X", FieldKind::ReferenceAtomic, Some("Word"))
            .unwrap();
        cat.define_field("Word", "Form", FieldKind::String, None)
            .unwrap();
        cat.define_field("D", "Items", FieldKind::OwningSequence, Some("A"))
            .unwrap();
        cat.define_field("D", "Name", FieldKind::String, None)
            .unwrap();
        cat
    }

    fn tag(cat: &InMemoryCatalog, class: &str, field: &str) -> FieldTag {
        cat.field_tag(cat.class_id(class).unwrap(), field).unwrap()
    }

    #[test]
    fn abstract_class_delegates_to_subclass() {
        let cat = hierarchy();
        let path = resolve_path(&cat, ClassId(1), "X.Form").unwrap();
        assert_eq!(path.tags(), &[tag(&cat, "C", "X"), tag(&cat, "Word", "Form")]);
    }

    #[test]
    fn first_matching_subclass_wins() {
        let cat = hierarchy();
        cat.define_field("B", "X", FieldKind::Integer, None).unwrap();
        let path = resolve_path(&cat, ClassId(1), "X").unwrap();
        assert_eq!(path.tags(), &[tag(&cat, "B", "X")]);
    }

    #[test]
    fn concrete_class_does_not_delegate() {
        let cat = hierarchy();
        cat.define_class(ClassDef::new(ClassId(6), "E").with_base(ClassId(2)))
            .unwrap();
        cat.define_field("E", "Y", FieldKind::Integer, None).unwrap();
        assert!(resolve_path(&cat, ClassId(2), "Y").is_err());
    }

    #[test]
    fn owner_step_walks_to_owning_class() {
        let cat = hierarchy();
        let path = resolve_path(&cat, ClassId(3), "OwnerHVO.Name").unwrap();
        assert_eq!(path.tags(), &[tag(&cat, "D", "Items"), tag(&cat, "D", "Name")]);
    }

    #[test]
    fn owner_step_requires_next_field_on_owner() {
        let cat = hierarchy();
        let err = resolve_path(&cat, ClassId(3), "OwnerHVO.Missing").unwrap_err();
        assert!(matches!(err, VirtualError::Unresolved { ref name, .. } if name == OWNER_STEP));
        assert!(resolve_path(&cat, ClassId(3), "OwnerHVO").is_err());
    }

    #[test]
    fn owner_step_skips_owners_without_next_field() {
        let cat = hierarchy();
        cat.define_class(ClassDef::new(ClassId(0), "Box")).unwrap();
        cat.define_field("Box", "Contents", FieldKind::OwningCollection, Some("A"))
            .unwrap();
        let path = resolve_path(&cat, ClassId(2), "OwnerHVO.Name").unwrap();
        assert_eq!(path.tags()[0], tag(&cat, "D", "Items"));
    }

    #[test]
    fn scalar_in_the_middle_fails() {
        let cat = hierarchy();
        let err = resolve_path(&cat, ClassId(4), "Name.Form").unwrap_err();
        assert!(matches!(err, VirtualError::Unresolved { ref name, .. } if name == "Form"));
    }

    #[test]
    fn bad_paths_are_dropped_individually() {
        let cat = hierarchy();
        let paths = resolve_dependencies(&cat, ClassId(4), "Name, Bogus.Path ,Items.X.Form,,");
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0].tags(), &[tag(&cat, "D", "Name")]);
        assert_eq!(paths[1].len(), 3);
        assert!(resolve_dependencies(&cat, ClassId(4), "").is_empty());
    }
}
