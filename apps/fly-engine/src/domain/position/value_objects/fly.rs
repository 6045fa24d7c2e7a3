//! Iron-Fly Structure Value Object
//!
//! A fly moves through three lifecycle states: a transient draft while legs
//! are being assembled (never persisted), ACTIVE once every leg has a
//! confirmed entry price, and a terminal CLOSED state once a close price is
//! recorded. The draft is a separate type so an unfinished structure cannot
//! reach the aggregate or the snapshot by construction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::Leg;
use crate::domain::position::PositionError;

/// A fly structure under construction (the transient PROPOSED state).
///
/// Legs are accumulated one at a time; [`FlyDraft::activate`] validates the
/// structure and produces an active [`Fly`]. Drafts are never persisted.
#[derive(Debug, Clone)]
pub struct FlyDraft {
    body: Decimal,
    legs: Vec<Leg>,
}

impl FlyDraft {
    /// Start a draft for the given body strike.
    #[must_use]
    pub const fn new(body: Decimal) -> Self {
        Self {
            body,
            legs: Vec::new(),
        }
    }

    /// Add a leg to the draft.
    #[must_use]
    pub fn with_leg(mut self, leg: Leg) -> Self {
        self.legs.push(leg);
        self
    }

    /// Get the body strike.
    #[must_use]
    pub const fn body(&self) -> Decimal {
        self.body
    }

    /// Legs accumulated so far.
    #[must_use]
    pub fn legs(&self) -> &[Leg] {
        &self.legs
    }

    /// Validate the structure and activate it.
    ///
    /// `entry_price` is the net credit received (debit negative) for one
    /// structure; `entry_time` is when the entry was confirmed.
    ///
    /// # Errors
    ///
    /// Returns an error if the draft has no legs or its legs span multiple
    /// expiries.
    pub fn activate(
        self,
        entry_price: Decimal,
        entry_time: DateTime<Utc>,
    ) -> Result<Fly, PositionError> {
        if self.legs.is_empty() {
            return Err(PositionError::InvalidStructure {
                body: self.body,
                message: "structure has no legs".to_string(),
            });
        }

        let expiry = self.legs[0].reference().expiry();
        if self.legs.iter().any(|l| l.reference().expiry() != expiry) {
            return Err(PositionError::InvalidStructure {
                body: self.body,
                message: "legs span multiple expiries".to_string(),
            });
        }

        Ok(Fly {
            body: self.body,
            legs: self.legs,
            entry_time,
            entry_price,
            mark: None,
            closed: false,
            close_time: None,
            close_price: None,
        })
    }
}

/// An active or closed iron-fly structure.
///
/// Leg membership is fixed at activation; only the current mark and the
/// closed status mutate afterwards. Prices at the structure level
/// (`entry_price`, `mark`, `close_price`) follow the credit convention:
/// the net premium received to open, and the debit to buy the structure
/// back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fly {
    body: Decimal,
    legs: Vec<Leg>,
    entry_time: DateTime<Utc>,
    entry_price: Decimal,
    mark: Option<Decimal>,
    closed: bool,
    close_time: Option<DateTime<Utc>>,
    close_price: Option<Decimal>,
}

impl Fly {
    /// Rebuild a fly from persisted parts.
    ///
    /// Used by the persistence layer when rehydrating a snapshot; applies
    /// the same structural validation as activation plus closed-state
    /// consistency.
    ///
    /// # Errors
    ///
    /// Returns an error if the structure is invalid or a closed fly is
    /// missing its close price.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        body: Decimal,
        legs: Vec<Leg>,
        entry_time: DateTime<Utc>,
        entry_price: Decimal,
        mark: Option<Decimal>,
        closed: bool,
        close_time: Option<DateTime<Utc>>,
        close_price: Option<Decimal>,
    ) -> Result<Self, PositionError> {
        let mut draft = FlyDraft::new(body);
        for leg in legs {
            draft = draft.with_leg(leg);
        }
        let mut fly = draft.activate(entry_price, entry_time)?;
        fly.mark = mark;
        if closed {
            let price = close_price.ok_or(PositionError::InvalidStructure {
                body,
                message: "closed fly has no close price".to_string(),
            })?;
            fly.closed = true;
            fly.close_price = Some(price);
            fly.close_time = close_time;
        }
        Ok(fly)
    }

    /// Get the body strike.
    #[must_use]
    pub const fn body(&self) -> Decimal {
        self.body
    }

    /// Get the legs.
    #[must_use]
    pub fn legs(&self) -> &[Leg] {
        &self.legs
    }

    /// Get the entry timestamp.
    #[must_use]
    pub const fn entry_time(&self) -> DateTime<Utc> {
        self.entry_time
    }

    /// Get the entry net credit.
    #[must_use]
    pub const fn entry_price(&self) -> Decimal {
        self.entry_price
    }

    /// Get the current mark, if one has been observed.
    #[must_use]
    pub const fn mark(&self) -> Option<Decimal> {
        self.mark
    }

    /// Check if the fly is closed.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Get the close timestamp, if closed.
    #[must_use]
    pub const fn close_time(&self) -> Option<DateTime<Utc>> {
        self.close_time
    }

    /// Get the close price, if closed.
    #[must_use]
    pub const fn close_price(&self) -> Option<Decimal> {
        self.close_price
    }

    /// Number of structures this fly represents: the smallest leg count.
    ///
    /// Structure-level prices are quoted per single structure; realized PnL
    /// scales by this multiplier.
    #[must_use]
    pub fn structure_quantity(&self) -> Decimal {
        self.legs
            .iter()
            .map(Leg::quantity)
            .min()
            .unwrap_or(Decimal::ONE)
    }

    /// Update the current mark.
    ///
    /// A refresh on a closed fly is a no-op so that late-arriving stale
    /// updates after close are tolerated rather than treated as errors.
    pub fn refresh_mark(&mut self, mark: Decimal) {
        if self.closed {
            return;
        }
        self.mark = Some(mark);
    }

    /// Close the fly at an explicit price.
    ///
    /// # Errors
    ///
    /// Returns an error if the fly is already closed; a second close is an
    /// invariant violation, not a stale update.
    pub fn close(&mut self, price: Decimal, time: DateTime<Utc>) -> Result<(), PositionError> {
        if self.closed {
            return Err(PositionError::AlreadyClosed { body: self.body });
        }
        self.closed = true;
        self.close_price = Some(price);
        self.close_time = Some(time);
        Ok(())
    }

    /// Force-close at a synthetic price derived from the last known mark.
    ///
    /// This is the documented fallback at expiry, not a failure path.
    ///
    /// # Errors
    ///
    /// Returns an error if the fly is already closed or never received a
    /// mark to close against.
    pub fn force_close(&mut self, time: DateTime<Utc>) -> Result<(), PositionError> {
        let mark = self.mark.ok_or(PositionError::NoMark { body: self.body })?;
        self.close(mark, time)
    }

    /// Realized PnL of a closed fly: `(entry credit − close debit) ×
    /// structure quantity`. Returns `None` while the fly is active.
    #[must_use]
    pub fn realized_pnl(&self) -> Option<Decimal> {
        let close = self.close_price?;
        Some((self.entry_price - close) * self.structure_quantity())
    }
}
