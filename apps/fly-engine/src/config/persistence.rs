//! State persistence configuration.

use serde::{Deserialize, Serialize};

/// Snapshot persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Enable state persistence.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Path of the snapshot file.
    #[serde(default = "default_state_path")]
    pub state_path: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            state_path: default_state_path(),
        }
    }
}

const fn default_enabled() -> bool {
    true
}

fn default_state_path() -> String {
    "data/state.json".to_string()
}
