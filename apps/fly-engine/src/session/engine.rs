//! Session Engine
//!
//! Drives one trading session as a sequence of synchronous cycles. Each
//! cycle applies fresh marks, recomputes PnL, evaluates exit rules, and
//! persists the state before returning; no two cycles overlap. The engine
//! owns the state and threads it explicitly through every step — there is
//! no global.

use chrono::{DateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::domain::position::value_objects::Fly;
use crate::domain::shared::rounding::round_to_grid;
use crate::export::{pnl_rows, PnlRow, QuoteRow, StrategyPnlRow};
use crate::feed::{MarkBook, MarkUpdate};
use crate::persistence::SnapshotStore;
use crate::pnl::{compute_net_pnl, PnlBreakdown};
use crate::session::ladder::{build_iron_fly, ladder_bodies, median_strike, ChainLookup};
use crate::session::state::{ForceCloseOutcome, StrategyState};

/// Everything one cycle produced: the PnL breakdown, the exit actions
/// taken, and the flat rows for external reporting.
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// Mark-to-market result.
    pub breakdown: PnlBreakdown,
    /// Bodies closed by exit rules this cycle.
    pub closed_bodies: Vec<Decimal>,
    /// Whether the portfolio stop fired.
    pub portfolio_stop_hit: bool,
    /// Per-fly PnL rows (pre-exit, one per active fly).
    pub pnl_rows: Vec<PnlRow>,
    /// Session-level PnL row.
    pub strategy_row: StrategyPnlRow,
    /// Raw mark observations applied this cycle.
    pub quote_rows: Vec<QuoteRow>,
}

/// The session engine: strategy state, mark book, and snapshot store under
/// one cycle driver.
#[derive(Debug)]
pub struct SessionEngine {
    config: Config,
    state: StrategyState,
    marks: MarkBook,
    store: SnapshotStore,
}

impl SessionEngine {
    /// Create an engine with a fresh state.
    #[must_use]
    pub fn new(config: Config, store: SnapshotStore) -> Self {
        Self::with_state(config, store, StrategyState::new())
    }

    /// Create an engine around an existing state (tests, rehydration).
    #[must_use]
    pub fn with_state(config: Config, store: SnapshotStore, state: StrategyState) -> Self {
        Self {
            config,
            state,
            marks: MarkBook::new(),
            store,
        }
    }

    /// Create an engine, restoring state from the last snapshot if one
    /// exists. Load failures are logged and fall back to a fresh state.
    #[must_use]
    pub fn rehydrate(config: Config, store: SnapshotStore) -> Self {
        let state = store.load_or_default();
        Self::with_state(config, store, state)
    }

    /// The current strategy state.
    #[must_use]
    pub const fn state(&self) -> &StrategyState {
        &self.state
    }

    /// The mark book.
    #[must_use]
    pub const fn marks(&self) -> &MarkBook {
        &self.marks
    }

    /// The engine configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Whether the entry window is open: at or past the configured entry
    /// time, no entry attempted yet, and no positions already on.
    #[must_use]
    pub fn entry_window_open(&self, now: DateTime<Utc>) -> bool {
        if self.state.entered_today() || !self.state.active_flies().is_empty() {
            return false;
        }
        let target = NaiveTime::from_hms_opt(
            self.config.session.entry_hour,
            self.config.session.entry_minute,
            0,
        )
        .unwrap_or(NaiveTime::MIN);
        now.time() >= target
    }

    /// Attempt the session entry: build the iron-fly ladder around the ATM
    /// body and open every fly that can be priced from current marks.
    ///
    /// `spot` is the underlying spot if the caller has one; otherwise the
    /// median listed strike stands in (the market-closed fallback). Returns
    /// the number of flies opened; bodies that cannot be priced are skipped
    /// with a warning, not an abort.
    pub fn try_enter(
        &mut self,
        chain: &dyn ChainLookup,
        spot: Option<Decimal>,
        now: DateTime<Utc>,
    ) -> usize {
        if !self.entry_window_open(now) {
            return 0;
        }

        let Some(spot) = spot.or_else(|| {
            let fallback = median_strike(chain);
            if let Some(s) = fallback {
                info!(%s, "No spot available; using median listed strike");
            }
            fallback
        }) else {
            warn!("Cannot derive an ATM body; entry deferred");
            return 0;
        };

        let atm = round_to_grid(spot, self.config.ladder.step);
        info!(%spot, %atm, "ATM body derived");

        let bodies = ladder_bodies(
            atm,
            self.config.ladder.n_below,
            self.config.ladder.n_above,
            self.config.ladder.step,
        );

        let mut opened = 0;
        for body in bodies {
            match build_iron_fly(
                chain,
                &self.marks,
                body,
                self.config.ladder.width,
                self.config.ladder.quantity,
                now,
            ) {
                Ok(fly) => {
                    let credit = fly.entry_price();
                    match self.state.open_fly(fly) {
                        Ok(()) => {
                            info!(%body, %credit, "Opened fly");
                            opened += 1;
                        }
                        Err(e) => error!(%body, error = %e, "Open rejected"),
                    }
                }
                Err(e) => warn!(%body, error = %e, "Could not price fly; skipping body"),
            }
        }

        if opened > 0 {
            self.state.mark_entered();
            self.state.set_expiry(chain.expiry());
            info!(opened, expiry = %chain.expiry(), "Ladder entry complete");
            self.persist(now);
        }
        opened
    }

    /// Run one cycle: apply marks, mark to market, evaluate exits, persist.
    pub fn run_cycle(&mut self, updates: &[MarkUpdate], now: DateTime<Utc>) -> CycleReport {
        self.marks.apply(updates);

        let breakdown = compute_net_pnl(&mut self.state, &self.marks);

        // Export rows reflect the pre-exit mark-to-market, one row per
        // active fly.
        let pnl_rows = pnl_rows(now, self.state.per_fly_pnl(), self.state.total_pnl());
        let strategy_row = StrategyPnlRow {
            ts: now.to_rfc3339(),
            strategy_total_pnl: self.state.total_pnl(),
        };
        let quote_rows = updates.iter().map(QuoteRow::from_update).collect();

        let (closed_bodies, portfolio_stop_hit) = self.apply_exit_rules(now);

        self.persist(now);

        CycleReport {
            breakdown,
            closed_bodies,
            portfolio_stop_hit,
            pnl_rows,
            strategy_row,
            quote_rows,
        }
    }

    /// Evaluate portfolio and per-fly stops, closing what breached.
    fn apply_exit_rules(&mut self, now: DateTime<Utc>) -> (Vec<Decimal>, bool) {
        if self.state.active_flies().is_empty() {
            return (Vec::new(), false);
        }

        let portfolio_loss = -self.state.total_pnl();
        if portfolio_loss >= self.config.stops.portfolio_stop {
            info!(
                %portfolio_loss,
                stop = %self.config.stops.portfolio_stop,
                "Portfolio stop hit; closing all flies"
            );
            let outcome = self.state.force_close_all(now);
            return (outcome.closed, true);
        }

        let breached: Vec<Decimal> = self
            .state
            .per_fly_pnl()
            .iter()
            .filter(|(_, pnl)| -**pnl >= self.config.stops.per_fly_stop)
            .map(|(body, _)| *body)
            .collect();

        let mut closed = Vec::new();
        for body in breached {
            let mark = self.state.active_flies().get(&body).and_then(Fly::mark);
            match mark {
                Some(price) => {
                    info!(%body, %price, "Per-fly stop hit; closing");
                    match self.state.close_fly(body, price, now) {
                        Ok(_) => closed.push(body),
                        Err(e) => error!(%body, error = %e, "Stop close failed"),
                    }
                }
                None => warn!(%body, "Per-fly stop hit but no structure mark to close at"),
            }
        }
        (closed, false)
    }

    /// Force-close everything still active at its last mark (expiry
    /// sweep) and persist.
    pub fn expire(&mut self, now: DateTime<Utc>) -> ForceCloseOutcome {
        let outcome = self.state.force_close_all(now);
        if !outcome.closed.is_empty() || !outcome.unmarked.is_empty() {
            info!(
                closed = outcome.closed.len(),
                unmarked = outcome.unmarked.len(),
                "Expiry force-close sweep"
            );
        }
        self.persist(now);
        outcome
    }

    /// One final best-effort save on shutdown. A failure is logged, not
    /// retried; exit must not hang.
    pub fn shutdown(&mut self, now: DateTime<Utc>) {
        info!("Session engine shutting down");
        if self.config.persistence.enabled {
            if let Err(e) = self.store.save(&self.state, now) {
                error!(error = %e, "Final snapshot save failed");
            }
        }
    }

    /// Persist the state; on failure the in-memory state is retained for
    /// the next attempt.
    fn persist(&mut self, now: DateTime<Utc>) {
        if !self.config.persistence.enabled {
            return;
        }
        if let Err(e) = self.store.save(&self.state, now) {
            error!(error = %e, "Snapshot save failed; keeping in-memory state");
        }
    }
}
