//! Steering context configuration.

use serde::{Deserialize, Serialize};

use crate::error::{HwsError, HwsResult};

/// Configuration for a steering context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SteeringConfig {
    /// Row reduction (log2) of a collision matcher against its parent.
    pub assured_row_ratio: u8,
    /// Rule count (log2) above which a collision matcher is added.
    pub assured_rules_threshold: u8,
    /// Depth (log2) of a collision matcher and cap for small rule tables.
    pub assured_col_tbl_depth: u8,
    /// Depth (log2) of a main table backed by a collision matcher.
    pub assured_main_tbl_depth: u8,
    /// Largest row count (log2) of a linear lookup table.
    pub linear_lookup_tbl_log_max: u8,
    /// Match templates allowed on a root table matcher.
    pub max_mt_root: usize,
    /// Length of the access key used to alias shared objects.
    pub access_key_len: usize,
    /// Protection domain number written into lookup resources.
    pub pd: u32,
    /// Reparse mode written into lookup resources.
    pub reparse_mode: u8,
    /// Base of the default action contexts for the primary direction.
    pub stc_base: u32,
    /// Base of the default action contexts for the mirror direction.
    pub stc_base_mirror: u32,
    /// Objects are owned by another hardware instance and aliased locally.
    pub shared: bool,
}

impl Default for SteeringConfig {
    fn default() -> Self {
        Self {
            assured_row_ratio: 5,
            assured_rules_threshold: 10,
            assured_col_tbl_depth: 4,
            assured_main_tbl_depth: 2,
            linear_lookup_tbl_log_max: 16,
            max_mt_root: 1,
            access_key_len: 32,
            pd: 0,
            reparse_mode: 0,
            stc_base: 0,
            stc_base_mirror: 0,
            shared: false,
        }
    }
}

impl SteeringConfig {
    /// Parses a configuration from JSON. Missing fields take defaults.
    pub fn from_json(json: &str) -> HwsResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| HwsError::invalid_argument(format!("steering config: {}", e)))
    }

    /// Creates a configuration for a shared multi-instance domain.
    pub fn shared() -> Self {
        Self {
            shared: true,
            ..Self::default()
        }
    }
}
