use std::path::Path;

use lexo_cache::BatchLoadConfig;
use lexo_virtual::VirtualPropertyConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SdkResult;

/// Everything the cache root needs besides its store.
///
/// ```toml
/// [batch]
/// max_exact_ids = 400
/// class_fraction = 0.5
///
/// [[virtual_properties]]
/// class = "LexEntry"
/// field = "GoodSenses"
/// kind = "reference_sequence"
/// implementation = "FilteredSequence"
/// params = { source = "Senses", int_field = "Order", above = 15 }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub batch: BatchLoadConfig,
    /// Installed in declaration order.
    pub virtual_properties: Vec<VirtualPropertyConfig>,
}

impl CacheConfig {
    pub fn from_toml_str(text: &str) -> SdkResult<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> SdkResult<Self> {
        let path = path.as_ref();
        let config = Self::from_toml_str(&std::fs::read_to_string(path)?)?;
        debug!(
            path = %path.display(),
            virtual_properties = config.virtual_properties.len(),
            "loaded cache config"
        );
        Ok(config)
    }
}
