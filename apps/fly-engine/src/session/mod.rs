//! Session layer - the strategy aggregate and its cycle driver.

/// Cycle engine: marks → PnL → exits → persistence.
pub mod engine;

/// Ladder construction and chain lookup.
pub mod ladder;

/// The `StrategyState` aggregate root.
pub mod state;
