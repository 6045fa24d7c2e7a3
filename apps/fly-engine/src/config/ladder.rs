//! Ladder geometry configuration.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Iron-fly ladder geometry.
///
/// The default is the standard 9-fly ladder: the ATM body plus four bodies
/// above and four below, spaced by the 5-point strike grid, with 60-point
/// wings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LadderConfig {
    /// Number of fly bodies above ATM.
    #[serde(default = "default_n")]
    pub n_above: u32,
    /// Number of fly bodies below ATM.
    #[serde(default = "default_n")]
    pub n_below: u32,
    /// Distance between successive bodies (the strike grid).
    #[serde(default = "default_step")]
    pub step: Decimal,
    /// Wing distance from the body.
    #[serde(default = "default_width")]
    pub width: Decimal,
    /// Structures per fly.
    #[serde(default = "default_quantity")]
    pub quantity: Decimal,
}

impl Default for LadderConfig {
    fn default() -> Self {
        Self {
            n_above: default_n(),
            n_below: default_n(),
            step: default_step(),
            width: default_width(),
            quantity: default_quantity(),
        }
    }
}

const fn default_n() -> u32 {
    4
}

const fn default_step() -> Decimal {
    dec!(5)
}

const fn default_width() -> Decimal {
    dec!(60)
}

const fn default_quantity() -> Decimal {
    Decimal::ONE
}
