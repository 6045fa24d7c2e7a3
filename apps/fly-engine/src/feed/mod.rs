//! Mark Feed Port
//!
//! The engine consumes market data through the [`MarkFeed`] port: once per
//! cycle it polls a batch of [`MarkUpdate`]s and applies them to the
//! [`MarkBook`], which retains the last known mid per contract. Transport
//! (streaming, websockets, broker SDKs) is an external collaborator; this
//! crate ships a scripted [`MockMarkFeed`] and a JSON-lines replay feed.

mod replay;

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::position::value_objects::OptionReference;
use crate::domain::shared::rounding::round_to_nickel;

pub use replay::JsonlMarkFeed;

/// One observed quote for one option contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkUpdate {
    /// The contract this update is for.
    pub reference: OptionReference,
    /// Best bid, if quoted.
    pub bid: Option<Decimal>,
    /// Best ask, if quoted.
    pub ask: Option<Decimal>,
    /// Mid price, nickel-rounded, present only when both sides are quoted.
    pub mid: Option<Decimal>,
    /// Observation timestamp.
    pub ts: DateTime<Utc>,
}

impl MarkUpdate {
    /// Build an update from a raw bid/ask pair.
    ///
    /// The mid is computed and nickel-rounded only when both sides are
    /// present; a one-sided quote carries no usable mark.
    #[must_use]
    pub fn from_quote(
        reference: OptionReference,
        bid: Option<Decimal>,
        ask: Option<Decimal>,
        ts: DateTime<Utc>,
    ) -> Self {
        let mid = match (bid, ask) {
            (Some(b), Some(a)) => Some(round_to_nickel((b + a) / Decimal::TWO)),
            _ => None,
        };
        Self {
            reference,
            bid,
            ask,
            mid,
            ts,
        }
    }
}

/// Port for per-cycle mark ingestion.
///
/// `poll_marks` returns the updates observed since the previous cycle; an
/// empty batch means no fresh data (the book keeps its last known marks).
/// `None` means the feed is exhausted and the session should wind down.
pub trait MarkFeed {
    /// Poll the next batch of mark updates.
    fn poll_marks(&mut self) -> Option<Vec<MarkUpdate>>;
}

/// Last-known mark per option contract.
///
/// A contract that has ever been quoted keeps its most recent mid until a
/// fresh one arrives; a contract never quoted has no mark and its
/// contribution is excluded (and flagged) downstream rather than crashing
/// the cycle.
#[derive(Debug, Clone, Default)]
pub struct MarkBook {
    marks: HashMap<OptionReference, Decimal>,
}

impl MarkBook {
    /// Create an empty book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a batch of updates, retaining the last known mid per contract.
    pub fn apply(&mut self, updates: &[MarkUpdate]) {
        for update in updates {
            if let Some(mid) = update.mid {
                self.marks.insert(update.reference.clone(), mid);
            }
        }
    }

    /// Freshest available mark for a contract, if one was ever observed.
    #[must_use]
    pub fn mark_for(&self, reference: &OptionReference) -> Option<Decimal> {
        self.marks.get(reference).copied()
    }

    /// Contracts the book has ever seen a mark for.
    pub fn references(&self) -> impl Iterator<Item = &OptionReference> {
        self.marks.keys()
    }

    /// Number of contracts with a known mark.
    #[must_use]
    pub fn len(&self) -> usize {
        self.marks.len()
    }

    /// Check whether no marks have been observed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }
}

/// Scripted feed for tests and dry runs: yields pre-built batches in order,
/// then reports exhaustion.
#[derive(Debug, Default)]
pub struct MockMarkFeed {
    batches: VecDeque<Vec<MarkUpdate>>,
}

impl MockMarkFeed {
    /// Create a feed that will yield the given batches in order.
    #[must_use]
    pub fn from_batches(batches: Vec<Vec<MarkUpdate>>) -> Self {
        Self {
            batches: batches.into(),
        }
    }
}

impl MarkFeed for MockMarkFeed {
    fn poll_marks(&mut self) -> Option<Vec<MarkUpdate>> {
        self.batches.pop_front()
    }
}

/// Feed for monitor mode: always an empty batch, never exhausted. The
/// engine keeps valuing positions at their last known marks and keeps
/// persisting.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdleMarkFeed;

impl MarkFeed for IdleMarkFeed {
    fn poll_marks(&mut self) -> Option<Vec<MarkUpdate>> {
        Some(Vec::new())
    }
}
