// Allow unwrap/expect in tests - tests should panic on unexpected errors
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! Fly Engine - Iron-Fly Session Core
//!
//! Tracks a multi-leg iron-fly options strategy across a trading session:
//! opens and monitors position structures, computes realized and unrealized
//! PnL with running extremes, and persists session state so the process can
//! restart without losing track of open positions.
//!
//! # Architecture
//!
//! - **Domain**: value objects for option references, legs, and fly
//!   structures with an explicit ACTIVE → CLOSED lifecycle
//!   (`domain::position`), plus shared primitives (`domain::shared`).
//! - **Session**: the `StrategyState` aggregate, ladder construction, and
//!   the cycle engine that ties marks → PnL → exits → persistence together.
//! - **PnL**: the mark-to-market computation over the aggregate.
//! - **Feed**: the synchronous mark-ingestion port and last-known mark book.
//! - **Persistence**: flat snapshot records and the atomic snapshot store.
//! - **Export**: flat tabular rows for external reporting consumers.
//!
//! Market-data transport, order routing, and the dashboard are external
//! collaborators; this crate only consumes marks and produces state, PnL,
//! and flat export rows.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

/// Runtime configuration loading and validation.
pub mod config;

/// Domain layer - value objects and lifecycle rules.
pub mod domain;

/// Export layer - flat tabular rows for external reporting.
pub mod export;

/// Feed layer - mark ingestion port and mark book.
pub mod feed;

/// PnL engine - realized/unrealized computation and extremes.
pub mod pnl;

/// Persistence layer - snapshot records and the atomic store.
pub mod persistence;

/// Session layer - strategy state, ladder construction, cycle engine.
pub mod session;

/// Tracing initialization.
pub mod telemetry;

// Domain re-exports
pub use domain::position::value_objects::{
    Fly, FlyDraft, Leg, OptionReference, OptionRight, PositionSide,
};
pub use domain::position::PositionError;
pub use domain::shared::Symbol;

// Core re-exports
pub use feed::{MarkBook, MarkFeed, MarkUpdate, MockMarkFeed};
pub use persistence::{PersistenceError, SnapshotStore, StateSnapshot};
pub use pnl::{compute_net_pnl, PnlBreakdown};
pub use session::engine::{CycleReport, SessionEngine};
pub use session::state::StrategyState;
