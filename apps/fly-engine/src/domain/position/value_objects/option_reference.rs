//! Option Reference Value Object

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

use crate::domain::shared::Symbol;

/// Option right (call or put).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OptionRight {
    /// Call option (right to buy).
    Call,
    /// Put option (right to sell).
    Put,
}

impl std::fmt::Display for OptionRight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "CALL"),
            Self::Put => write!(f, "PUT"),
        }
    }
}

/// Immutable descriptor of one tradable option contract.
///
/// Identity for equality, hashing, and deduplication is
/// `(underlying, strike, expiry, right)`. The broker-native identifier is
/// opaque metadata used only to re-look the contract up with the external
/// brokerage API; two references to the same contract compare equal even if
/// their broker identifiers differ. This makes `OptionReference` usable
/// directly as the mark-feed map key.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct OptionReference {
    /// Underlying symbol.
    underlying: Symbol,
    /// Strike price.
    strike: Decimal,
    /// Expiration date.
    expiry: NaiveDate,
    /// Call or put.
    right: OptionRight,
    /// Broker-native identifier (non-identity metadata).
    broker_id: String,
}

impl OptionReference {
    /// Create a new option reference.
    #[must_use]
    pub fn new(
        underlying: impl Into<Symbol>,
        strike: Decimal,
        expiry: NaiveDate,
        right: OptionRight,
        broker_id: impl Into<String>,
    ) -> Self {
        Self {
            underlying: underlying.into(),
            strike,
            expiry,
            right,
            broker_id: broker_id.into(),
        }
    }

    /// Create a call reference.
    #[must_use]
    pub fn call(
        underlying: impl Into<Symbol>,
        strike: Decimal,
        expiry: NaiveDate,
        broker_id: impl Into<String>,
    ) -> Self {
        Self::new(underlying, strike, expiry, OptionRight::Call, broker_id)
    }

    /// Create a put reference.
    #[must_use]
    pub fn put(
        underlying: impl Into<Symbol>,
        strike: Decimal,
        expiry: NaiveDate,
        broker_id: impl Into<String>,
    ) -> Self {
        Self::new(underlying, strike, expiry, OptionRight::Put, broker_id)
    }

    /// Get the underlying symbol.
    #[must_use]
    pub const fn underlying(&self) -> &Symbol {
        &self.underlying
    }

    /// Get the strike price.
    #[must_use]
    pub const fn strike(&self) -> Decimal {
        self.strike
    }

    /// Get the expiration date.
    #[must_use]
    pub const fn expiry(&self) -> NaiveDate {
        self.expiry
    }

    /// Get the option right.
    #[must_use]
    pub const fn right(&self) -> OptionRight {
        self.right
    }

    /// Get the broker-native identifier.
    #[must_use]
    pub fn broker_id(&self) -> &str {
        &self.broker_id
    }

    /// Check if this is a call.
    #[must_use]
    pub const fn is_call(&self) -> bool {
        matches!(self.right, OptionRight::Call)
    }

    /// Check if this is a put.
    #[must_use]
    pub const fn is_put(&self) -> bool {
        matches!(self.right, OptionRight::Put)
    }

    /// Check if the option has expired.
    #[must_use]
    pub fn is_expired(&self, as_of: NaiveDate) -> bool {
        self.expiry < as_of
    }
}

impl PartialEq for OptionReference {
    fn eq(&self, other: &Self) -> bool {
        self.underlying == other.underlying
            && self.strike == other.strike
            && self.expiry == other.expiry
            && self.right == other.right
    }
}

impl Hash for OptionReference {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.underlying.hash(state);
        self.strike.hash(state);
        self.expiry.hash(state);
        self.right.hash(state);
    }
}

impl std::fmt::Display for OptionReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.underlying, self.expiry, self.strike, self.right
        )
    }
}
