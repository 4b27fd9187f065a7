use serde::{Deserialize, Serialize};

/// Name reported for the identifier a candidate must expose.
pub const DEFAULT_ID_PROPERTY_NAME: &str = "ClassID";

/// What `start` does with a candidate that cannot be registered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryPolicy {
    /// Log and skip the candidate; startup continues.
    #[default]
    BestEffort,
    /// Fail `start` on the first rejected candidate.
    Strict,
}

/// Controls registry discovery and lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Identifier name used in discovery diagnostics.
    pub id_property_name: String,
    /// Hashed lookup when true, registration-order scan when false.
    pub optimize_parsing: bool,
    /// Handling of candidates that fail discovery.
    pub discovery_policy: DiscoveryPolicy,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            id_property_name: DEFAULT_ID_PROPERTY_NAME.to_string(),
            optimize_parsing: true,
            discovery_policy: DiscoveryPolicy::BestEffort,
        }
    }
}
