use lexo_types::FieldKind;
use serde::{Deserialize, Serialize};

/// Declaration of one virtual property.
///
/// Lists of these are processed in declaration order at startup. `params`
/// is handed to the factory registered under `implementation` and its shape
/// is defined by that implementation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VirtualPropertyConfig {
    pub class: String,
    pub field: String,
    pub kind: FieldKind,
    /// Class of object values, for object-valued kinds.
    #[serde(default)]
    pub signature: Option<String>,
    /// Comma-separated dotted paths relative to `class`.
    #[serde(default)]
    pub depends_on: String,
    #[serde(default)]
    pub compute_every_time: bool,
    #[serde(default)]
    pub writable: bool,
    pub implementation: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

impl VirtualPropertyConfig {
    pub fn new(
        class: impl Into<String>,
        field: impl Into<String>,
        kind: FieldKind,
        implementation: impl Into<String>,
    ) -> Self {
        Self {
            class: class.into(),
            field: field.into(),
            kind,
            signature: None,
            depends_on: String::new(),
            compute_every_time: false,
            writable: false,
            implementation: implementation.into(),
            params: serde_json::Value::Null,
        }
    }

    pub fn with_signature(mut self, class: impl Into<String>) -> Self {
        self.signature = Some(class.into());
        self
    }

    pub fn depends_on(mut self, paths: impl Into<String>) -> Self {
        self.depends_on = paths.into();
        self
    }

    pub fn compute_every_time(mut self) -> Self {
        self.compute_every_time = true;
        self
    }

    pub fn writable(mut self) -> Self {
        self.writable = true;
        self
    }

    pub fn with_params(mut self, params: serde_json::Value) -> Self {
        self.params = params;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_json_uses_defaults() {
        let config: VirtualPropertyConfig = serde_json::from_str(
            r#"{"class":"LexEntry","field":"Senses2","kind":"reference_sequence","implementation":"FilteredSequence"}"#,
        )
        .unwrap();
        assert_eq!(config.kind, FieldKind::ReferenceSequence);
        assert!(config.depends_on.is_empty());
        assert!(!config.writable);
        assert!(config.params.is_null());
    }

    #[test]
    fn builder_sets_flags() {
        let config = VirtualPropertyConfig::new("A", "B", FieldKind::Integer, "X")
            .depends_on("C.D")
            .compute_every_time()
            .writable();
        assert_eq!(config.depends_on, "C.D");
        assert!(config.compute_every_time && config.writable);
    }
}
