use demuxprims_registry::{DiscoveryPolicy, RegistryConfig, DEFAULT_ID_PROPERTY_NAME};
use serde::{Deserialize, Serialize};

use crate::error::{DispatchError, Result};

/// Retry attempts allowed per source before leftover bytes are discarded.
pub const DEFAULT_UNPARSED_DATA_REUSE_LIMIT: u32 = 5;

/// Controls dispatcher and registry behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Identifier name used in discovery diagnostics.
    pub id_property_name: String,
    /// Selects the registry lookup strategy. Both are equally correct.
    pub optimize_parsing: bool,
    /// Maximum consecutive failed attempts per source before discarding.
    pub unparsed_data_reuse_limit: u32,
    /// Handling of frame candidates that fail discovery.
    pub discovery_policy: DiscoveryPolicy,
    /// Maximum images pulled per drain. `None` takes everything queued.
    pub max_batch_size: Option<usize>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            id_property_name: DEFAULT_ID_PROPERTY_NAME.to_string(),
            optimize_parsing: true,
            unparsed_data_reuse_limit: DEFAULT_UNPARSED_DATA_REUSE_LIMIT,
            discovery_policy: DiscoveryPolicy::BestEffort,
            max_batch_size: None,
        }
    }
}

impl ParserConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.id_property_name.trim().is_empty() {
            return Err(DispatchError::InvalidConfig(
                "id_property_name must not be empty".to_string(),
            ));
        }
        if self.max_batch_size == Some(0) {
            return Err(DispatchError::InvalidConfig(
                "max_batch_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Registry settings carried by this configuration.
    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            id_property_name: self.id_property_name.clone(),
            optimize_parsing: self.optimize_parsing,
            discovery_policy: self.discovery_policy,
        }
    }
}
