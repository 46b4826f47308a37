use serde::{Deserialize, Serialize};

use lexo_types::{ClassId, FieldTag, ObjectId};

/// Where an object lives: the owning object and the field holding it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ownership {
    pub owner: ObjectId,
    pub field: FieldTag,
}

/// The row a query layer returns for one object.
///
/// This is the raw material the identity cache turns into typed objects.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub id: ObjectId,
    pub class: ClassId,
    pub owner: Option<Ownership>,
}

/// Which objects of a class a record fetch should return.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadScope<'a> {
    /// Every instance of the class.
    All,
    /// Exactly these ids (ids of other classes are ignored).
    Exact(&'a [ObjectId]),
}

/// A property-change notification.
///
/// For vector properties `index` is the first affected position and
/// `inserted` / `deleted` count the items added and removed there. Scalar and
/// string changes use `index = 0, inserted = 0, deleted = 0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropChange {
    pub object: ObjectId,
    pub tag: FieldTag,
    pub index: usize,
    pub inserted: usize,
    pub deleted: usize,
}

impl PropChange {
    /// A change to a scalar or string property.
    pub fn scalar(object: ObjectId, tag: FieldTag) -> Self {
        Self {
            object,
            tag,
            index: 0,
            inserted: 0,
            deleted: 0,
        }
    }

    /// A splice of a vector property.
    pub fn splice(
        object: ObjectId,
        tag: FieldTag,
        index: usize,
        inserted: usize,
        deleted: usize,
    ) -> Self {
        Self {
            object,
            tag,
            index,
            inserted,
            deleted,
        }
    }

    /// Returns `true` if items were inserted into or deleted from a vector.
    pub fn is_splice(&self) -> bool {
        self.inserted > 0 || self.deleted > 0
    }
}
