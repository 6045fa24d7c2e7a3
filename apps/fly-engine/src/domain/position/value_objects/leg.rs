//! Fly Leg Value Object

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::OptionReference;
use crate::domain::position::PositionError;

/// Position side (long or short).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    /// Long position (bought).
    Long,
    /// Short position (sold/written).
    Short,
}

impl PositionSide {
    /// Get the sign multiplier for this side.
    #[must_use]
    pub const fn sign(&self) -> i32 {
        match self {
            Self::Long => 1,
            Self::Short => -1,
        }
    }

    /// Check if this is a long position.
    #[must_use]
    pub const fn is_long(&self) -> bool {
        matches!(self, Self::Long)
    }

    /// Check if this is a short position.
    #[must_use]
    pub const fn is_short(&self) -> bool {
        matches!(self, Self::Short)
    }
}

/// A single leg of a fly structure.
///
/// Owned exclusively by its parent fly; membership never changes after the
/// structure is activated. The entry price is the per-contract premium at
/// which the leg was entered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leg {
    /// The option contract this leg trades.
    reference: OptionReference,
    /// Position side.
    side: PositionSide,
    /// Number of contracts (always positive; sign derives from side).
    quantity: Decimal,
    /// Premium at which the leg was entered.
    entry_price: Decimal,
}

impl Leg {
    /// Create a new leg.
    ///
    /// # Errors
    ///
    /// Returns an error if quantity is zero or negative; a signed quantity
    /// is expressed through `side`, never through the count itself.
    pub fn new(
        reference: OptionReference,
        side: PositionSide,
        quantity: Decimal,
        entry_price: Decimal,
    ) -> Result<Self, PositionError> {
        if quantity <= Decimal::ZERO {
            return Err(PositionError::InvalidLeg {
                message: format!("quantity must be positive, got {quantity}"),
            });
        }
        Ok(Self {
            reference,
            side,
            quantity,
            entry_price,
        })
    }

    /// Create a long leg.
    ///
    /// # Errors
    ///
    /// Returns an error if quantity is not positive.
    pub fn long(
        reference: OptionReference,
        quantity: Decimal,
        entry_price: Decimal,
    ) -> Result<Self, PositionError> {
        Self::new(reference, PositionSide::Long, quantity, entry_price)
    }

    /// Create a short leg.
    ///
    /// # Errors
    ///
    /// Returns an error if quantity is not positive.
    pub fn short(
        reference: OptionReference,
        quantity: Decimal,
        entry_price: Decimal,
    ) -> Result<Self, PositionError> {
        Self::new(reference, PositionSide::Short, quantity, entry_price)
    }

    /// Get the option reference.
    #[must_use]
    pub const fn reference(&self) -> &OptionReference {
        &self.reference
    }

    /// Get the position side.
    #[must_use]
    pub const fn side(&self) -> PositionSide {
        self.side
    }

    /// Get the contract count.
    #[must_use]
    pub const fn quantity(&self) -> Decimal {
        self.quantity
    }

    /// Get the entry premium.
    #[must_use]
    pub const fn entry_price(&self) -> Decimal {
        self.entry_price
    }

    /// Get signed quantity (positive for long, negative for short).
    #[must_use]
    pub fn signed_quantity(&self) -> Decimal {
        self.quantity * Decimal::from(self.side.sign())
    }

    /// PnL contribution of this leg against a current mark.
    ///
    /// Reference calculation from first principles:
    /// `signed_quantity × (current − entry)`.
    #[must_use]
    pub fn pnl_against(&self, current: Decimal) -> Decimal {
        self.signed_quantity() * (current - self.entry_price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn test_reference() -> OptionReference {
        OptionReference::call(
            "SPX",
            dec!(6000),
            NaiveDate::from_ymd_opt(2025, 8, 15).unwrap(),
            "",
        )
    }

    #[test]
    fn position_side_sign() {
        assert_eq!(PositionSide::Long.sign(), 1);
        assert_eq!(PositionSide::Short.sign(), -1);
    }

    #[test]
    fn position_side_predicates() {
        assert!(PositionSide::Long.is_long());
        assert!(!PositionSide::Long.is_short());
        assert!(PositionSide::Short.is_short());
    }

    #[test]
    fn leg_new() {
        let leg = Leg::new(test_reference(), PositionSide::Short, dec!(1), dec!(42.10)).unwrap();
        assert_eq!(leg.side(), PositionSide::Short);
        assert_eq!(leg.quantity(), dec!(1));
        assert_eq!(leg.entry_price(), dec!(42.10));
    }

    #[test]
    fn leg_rejects_non_positive_quantity() {
        assert!(Leg::long(test_reference(), Decimal::ZERO, dec!(1)).is_err());
        assert!(Leg::long(test_reference(), dec!(-2), dec!(1)).is_err());
    }

    #[test]
    fn leg_signed_quantity() {
        let long = Leg::long(test_reference(), dec!(2), dec!(10)).unwrap();
        assert_eq!(long.signed_quantity(), dec!(2));

        let short = Leg::short(test_reference(), dec!(2), dec!(10)).unwrap();
        assert_eq!(short.signed_quantity(), dec!(-2));
    }

    #[test]
    fn leg_pnl_against_long() {
        // Bought at 10, now 12: +2 per contract.
        let leg = Leg::long(test_reference(), dec!(1), dec!(10)).unwrap();
        assert_eq!(leg.pnl_against(dec!(12)), dec!(2));
    }

    #[test]
    fn leg_pnl_against_short() {
        // Sold at 10, now 12: -2 per contract.
        let leg = Leg::short(test_reference(), dec!(1), dec!(10)).unwrap();
        assert_eq!(leg.pnl_against(dec!(12)), dec!(-2));

        // Sold at 10, now 7: +3 per contract.
        assert_eq!(leg.pnl_against(dec!(7)), dec!(3));
    }
}
