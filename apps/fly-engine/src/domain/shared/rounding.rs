//! Price rounding conventions.
//!
//! SPX-style index options trade on a 5-point strike grid with a $0.05
//! minimum price increment; PnL is reported to the cent. All rounding is
//! half-up (midpoint away from zero) to match exchange convention.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

/// Minimum price increment for structure credits/debits.
const NICKEL: Decimal = dec!(0.05);

/// Round a price to the nearest $0.05 increment.
#[must_use]
pub fn round_to_nickel(value: Decimal) -> Decimal {
    let ticks = (value / NICKEL).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    (ticks * NICKEL).round_dp(2)
}

/// Round a spot price to the nearest strike-grid multiple.
#[must_use]
pub fn round_to_grid(value: Decimal, step: Decimal) -> Decimal {
    let ticks = (value / step).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    ticks * step
}

/// Round a PnL value to the cent.
#[must_use]
pub fn round_to_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
