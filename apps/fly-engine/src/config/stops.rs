//! Stop-loss configuration.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Stop-loss thresholds, in the underlying's point units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopsConfig {
    /// Loss on a single fly that triggers closing it.
    #[serde(default = "default_per_fly_stop")]
    pub per_fly_stop: Decimal,
    /// Total loss across the session that closes everything.
    #[serde(default = "default_portfolio_stop")]
    pub portfolio_stop: Decimal,
}

impl Default for StopsConfig {
    fn default() -> Self {
        Self {
            per_fly_stop: default_per_fly_stop(),
            portfolio_stop: default_portfolio_stop(),
        }
    }
}

const fn default_per_fly_stop() -> Decimal {
    dec!(500)
}

const fn default_portfolio_stop() -> Decimal {
    dec!(4000)
}
