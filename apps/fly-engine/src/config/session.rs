//! Session schedule configuration.

use serde::{Deserialize, Serialize};

/// Session schedule and underlying configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Underlying symbol.
    #[serde(default = "default_underlying")]
    pub underlying: String,
    /// Entry hour (session clock, 0-23).
    #[serde(default = "default_entry_hour")]
    pub entry_hour: u32,
    /// Entry minute (0-59).
    #[serde(default = "default_entry_minute")]
    pub entry_minute: u32,
    /// Seconds between mark-to-market cycles.
    #[serde(default = "default_cycle_interval")]
    pub cycle_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            underlying: default_underlying(),
            entry_hour: default_entry_hour(),
            entry_minute: default_entry_minute(),
            cycle_interval_secs: default_cycle_interval(),
        }
    }
}

fn default_underlying() -> String {
    "SPX".to_string()
}

const fn default_entry_hour() -> u32 {
    8
}

const fn default_entry_minute() -> u32 {
    33
}

const fn default_cycle_interval() -> u64 {
    2
}
