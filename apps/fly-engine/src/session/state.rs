//! Strategy State Aggregate
//!
//! The aggregate root for one trading session: every active and closed fly,
//! per-fly PnL, cumulative totals, and the running net-PnL extremes. The
//! state is created fresh at session start (or rehydrated from the last
//! snapshot), threaded explicitly through every engine call, and discarded
//! at session end; there is no hidden global.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::{error, info};

use crate::domain::position::value_objects::Fly;
use crate::domain::position::PositionError;
use crate::domain::shared::rounding::round_to_cents;

/// Outcome of a force-close sweep at expiry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForceCloseOutcome {
    /// Bodies closed at their last known mark.
    pub closed: Vec<Decimal>,
    /// Bodies that never received a mark and could not be closed.
    pub unmarked: Vec<Decimal>,
}

/// Aggregate of all fly structures and PnL counters for the session.
///
/// Invariants:
/// - a body key exists in at most one of `active_flies` / `closed_flies`;
/// - realized PnL accumulates monotonically as flies close and is never
///   recomputed afterwards;
/// - the extremes seed from the first observed net PnL, never from zero,
///   and thereafter satisfy `min ≤ net(t) ≤ max` for every update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StrategyState {
    entered_today: bool,
    expiry: Option<NaiveDate>,
    active_flies: BTreeMap<Decimal, Fly>,
    closed_flies: BTreeMap<Decimal, Fly>,
    per_fly_pnl: BTreeMap<Decimal, Decimal>,
    total_pnl: Decimal,
    realized_pnl: Decimal,
    min_net_pnl: Option<Decimal>,
    max_net_pnl: Option<Decimal>,
}

impl StrategyState {
    /// Create a fresh state for a new session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild state from persisted parts.
    ///
    /// Used by the persistence layer; flies must already be partitioned so
    /// that no body appears in both maps.
    ///
    /// # Errors
    ///
    /// Returns an error if a body appears in both the active and closed
    /// maps.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        entered_today: bool,
        expiry: Option<NaiveDate>,
        active_flies: BTreeMap<Decimal, Fly>,
        closed_flies: BTreeMap<Decimal, Fly>,
        per_fly_pnl: BTreeMap<Decimal, Decimal>,
        total_pnl: Decimal,
        realized_pnl: Decimal,
        min_net_pnl: Option<Decimal>,
        max_net_pnl: Option<Decimal>,
    ) -> Result<Self, PositionError> {
        if let Some(body) = active_flies.keys().find(|b| closed_flies.contains_key(*b)) {
            return Err(PositionError::DuplicateBody { body: *body });
        }
        Ok(Self {
            entered_today,
            expiry,
            active_flies,
            closed_flies,
            per_fly_pnl,
            total_pnl,
            realized_pnl,
            min_net_pnl,
            max_net_pnl,
        })
    }

    // ---- Entry bookkeeping -------------------------------------------------

    /// Whether an entry has already been attempted this session.
    #[must_use]
    pub const fn entered_today(&self) -> bool {
        self.entered_today
    }

    /// Record that the one entry attempt for this session has happened.
    pub fn mark_entered(&mut self) {
        self.entered_today = true;
    }

    /// The expiry the session's positions trade.
    #[must_use]
    pub const fn expiry(&self) -> Option<NaiveDate> {
        self.expiry
    }

    /// Set the session expiry.
    pub fn set_expiry(&mut self, expiry: NaiveDate) {
        self.expiry = Some(expiry);
    }

    // ---- Fly lifecycle -----------------------------------------------------

    /// Open a fly.
    ///
    /// # Errors
    ///
    /// Rejects a body already present among active or closed flies; a
    /// duplicate body is a programming defect, logged loudly, and the state
    /// is left unchanged.
    pub fn open_fly(&mut self, fly: Fly) -> Result<(), PositionError> {
        let body = fly.body();
        if self.active_flies.contains_key(&body) || self.closed_flies.contains_key(&body) {
            error!(%body, "Rejected duplicate fly body");
            return Err(PositionError::DuplicateBody { body });
        }
        self.active_flies.insert(body, fly);
        Ok(())
    }

    /// Close an active fly at an explicit price, moving it from the active
    /// to the closed map and folding its realized PnL into the running
    /// total. Atomic from the caller's perspective: on any error the state
    /// is unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if no active fly has this body.
    pub fn close_fly(
        &mut self,
        body: Decimal,
        price: Decimal,
        time: DateTime<Utc>,
    ) -> Result<Decimal, PositionError> {
        if self.closed_flies.contains_key(&body) {
            return Err(PositionError::AlreadyClosed { body });
        }
        let mut fly = self
            .active_flies
            .remove(&body)
            .ok_or(PositionError::UnknownBody { body })?;

        if let Err(e) = fly.close(price, time) {
            self.active_flies.insert(body, fly);
            return Err(e);
        }

        let realized = round_to_cents(fly.realized_pnl().unwrap_or_default());
        self.realized_pnl += realized;
        self.per_fly_pnl.remove(&body);
        self.closed_flies.insert(body, fly);
        info!(%body, %price, %realized, "Fly closed");
        Ok(realized)
    }

    /// Force-close every remaining active fly at its last known mark (the
    /// expiry fallback). Flies that never received a mark are reported in
    /// the outcome and remain active; they are not an abort.
    pub fn force_close_all(&mut self, time: DateTime<Utc>) -> ForceCloseOutcome {
        let mut outcome = ForceCloseOutcome::default();
        let bodies: Vec<Decimal> = self.active_flies.keys().copied().collect();
        for body in bodies {
            let mark = self.active_flies.get(&body).and_then(Fly::mark);
            match mark {
                Some(price) => match self.close_fly(body, price, time) {
                    Ok(_) => outcome.closed.push(body),
                    Err(e) => error!(%body, error = %e, "Force close failed"),
                },
                None => {
                    error!(%body, "Cannot force-close fly that never received a mark");
                    outcome.unmarked.push(body);
                }
            }
        }
        outcome
    }

    // ---- Accessors ---------------------------------------------------------

    /// Active flies, keyed by body.
    #[must_use]
    pub const fn active_flies(&self) -> &BTreeMap<Decimal, Fly> {
        &self.active_flies
    }

    /// Mutable access to active flies (mark refreshes).
    pub const fn active_flies_mut(&mut self) -> &mut BTreeMap<Decimal, Fly> {
        &mut self.active_flies
    }

    /// Closed flies, keyed by body.
    #[must_use]
    pub const fn closed_flies(&self) -> &BTreeMap<Decimal, Fly> {
        &self.closed_flies
    }

    /// Latest per-fly unrealized PnL, keyed by body.
    #[must_use]
    pub const fn per_fly_pnl(&self) -> &BTreeMap<Decimal, Decimal> {
        &self.per_fly_pnl
    }

    /// Net PnL at the last mark-to-market.
    #[must_use]
    pub const fn total_pnl(&self) -> Decimal {
        self.total_pnl
    }

    /// Cumulative realized PnL from closed flies.
    #[must_use]
    pub const fn realized_pnl(&self) -> Decimal {
        self.realized_pnl
    }

    /// Running minimum net PnL, once seeded.
    #[must_use]
    pub const fn min_net_pnl(&self) -> Option<Decimal> {
        self.min_net_pnl
    }

    /// Running maximum net PnL, once seeded.
    #[must_use]
    pub const fn max_net_pnl(&self) -> Option<Decimal> {
        self.max_net_pnl
    }

    // ---- PnL bookkeeping ---------------------------------------------------

    /// Store the per-fly and total PnL computed for this cycle.
    pub fn record_cycle_pnl(&mut self, per_fly: BTreeMap<Decimal, Decimal>, total: Decimal) {
        self.per_fly_pnl = per_fly;
        self.total_pnl = total;
    }

    /// Fold a net-PnL observation into the running extremes.
    ///
    /// The very first observation seeds both extremes, so a session whose
    /// PnL is immediately negative does not keep a spurious zero maximum.
    pub fn update_pnl_extremes(&mut self, net: Decimal) {
        match (self.min_net_pnl, self.max_net_pnl) {
            (Some(min), Some(max)) => {
                self.min_net_pnl = Some(min.min(net));
                self.max_net_pnl = Some(max.max(net));
            }
            _ => {
                self.min_net_pnl = Some(net);
                self.max_net_pnl = Some(net);
            }
        }
    }

    /// Net PnL derived from the state's own books: realized plus the sum of
    /// per-fly unrealized. Used to re-seed extremes when rehydrating a
    /// legacy snapshot that predates extreme tracking.
    #[must_use]
    pub fn net_pnl_from_books(&self) -> Decimal {
        self.realized_pnl + self.per_fly_pnl.values().copied().sum::<Decimal>()
    }
}
