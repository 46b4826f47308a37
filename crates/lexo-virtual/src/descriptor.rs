use std::fmt;

use lexo_types::{FieldKind, FieldTag};
use tracing::debug;

use crate::config::VirtualPropertyConfig;

/// A resolved dependency path: the field tags walked from the descriptor's
/// class to the field the computed value depends on.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct DependencyPath(pub Vec<FieldTag>);

impl DependencyPath {
    pub fn tags(&self) -> &[FieldTag] {
        &self.0
    }

    /// The field at the far end of the path.
    pub fn last(&self) -> Option<FieldTag> {
        self.0.last().copied()
    }

    /// Returns `true` if the path passes through or ends at `tag`.
    pub fn touches(&self, tag: FieldTag) -> bool {
        self.0.contains(&tag)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for DependencyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|t| t.0.to_string()).collect();
        write!(f, "[{}]", parts.join(" -> "))
    }
}

/// Static description of a virtual property.
///
/// The identity fields (class, field, kind, compute-every-time) and the tag
/// are frozen once a non-zero tag has been assigned: later setter calls are
/// ignored and logged, never reported as errors.
#[derive(Clone, Debug, PartialEq)]
pub struct VirtualPropertyDescriptor {
    class_name: String,
    field_name: String,
    kind: FieldKind,
    tag: FieldTag,
    writable: bool,
    compute_every_time: bool,
    depends_on: String,
    dependencies: Vec<DependencyPath>,
}

impl VirtualPropertyDescriptor {
    pub fn new(class_name: impl Into<String>, field_name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            class_name: class_name.into(),
            field_name: field_name.into(),
            kind,
            tag: FieldTag::NONE,
            writable: false,
            compute_every_time: false,
            depends_on: String::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn from_config(config: &VirtualPropertyConfig) -> Self {
        Self {
            class_name: config.class.clone(),
            field_name: config.field.clone(),
            kind: config.kind,
            tag: FieldTag::NONE,
            writable: config.writable,
            compute_every_time: config.compute_every_time,
            depends_on: config.depends_on.clone(),
            dependencies: Vec::new(),
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// The assigned tag; [`FieldTag::NONE`] until installed.
    pub fn tag(&self) -> FieldTag {
        self.tag
    }

    pub fn is_installed(&self) -> bool {
        !self.tag.is_none()
    }

    pub fn writable(&self) -> bool {
        self.writable
    }

    pub fn compute_every_time(&self) -> bool {
        self.compute_every_time
    }

    /// The textual dependency specification.
    pub fn depends_on(&self) -> &str {
        &self.depends_on
    }

    pub fn dependencies(&self) -> &[DependencyPath] {
        &self.dependencies
    }

    fn frozen(&self, what: &str) -> bool {
        if self.is_installed() {
            debug!(
                class = %self.class_name,
                field = %self.field_name,
                tag = %self.tag,
                what,
                "ignoring change to installed virtual property"
            );
            return true;
        }
        false
    }

    pub fn set_class_name(&mut self, name: impl Into<String>) {
        if !self.frozen("class_name") {
            self.class_name = name.into();
        }
    }

    pub fn set_field_name(&mut self, name: impl Into<String>) {
        if !self.frozen("field_name") {
            self.field_name = name.into();
        }
    }

    pub fn set_kind(&mut self, kind: FieldKind) {
        if !self.frozen("kind") {
            self.kind = kind;
        }
    }

    pub fn set_compute_every_time(&mut self, on: bool) {
        if !self.frozen("compute_every_time") {
            self.compute_every_time = on;
        }
    }

    /// Assign the tag. Only the first non-zero assignment takes effect.
    pub fn set_tag(&mut self, tag: FieldTag) {
        if !self.frozen("tag") {
            self.tag = tag;
        }
    }

    pub fn set_writable(&mut self, on: bool) {
        self.writable = on;
    }

    pub fn set_depends_on(&mut self, spec: impl Into<String>) {
        self.depends_on = spec.into();
    }

    pub fn set_dependencies(&mut self, paths: Vec<DependencyPath>) {
        self.dependencies = paths;
    }
}
