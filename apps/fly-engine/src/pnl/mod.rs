//! PnL Engine
//!
//! Marks the strategy state to market: realized PnL accumulates as flies
//! close and is never recomputed; unrealized PnL is recomputed every cycle
//! from the freshest available mark per leg; net PnL feeds the running
//! extremes.
//!
//! Sign convention, pinned from first principles: each leg contributes
//! `signed_quantity × (current − entry)`. For a net-credit structure with
//! uniform leg counts this collapses to `entry_credit − current_mid`, the
//! familiar "credit received minus debit to close".

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::domain::position::value_objects::{Fly, OptionReference, PositionSide};
use crate::domain::shared::rounding::{round_to_cents, round_to_nickel};
use crate::feed::MarkBook;
use crate::session::state::StrategyState;

/// Result of one mark-to-market pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PnlBreakdown {
    /// Cumulative realized PnL from closed flies.
    pub realized: Decimal,
    /// Unrealized PnL across active flies at current marks.
    pub unrealized: Decimal,
    /// `realized + unrealized`.
    pub net: Decimal,
    /// Legs excluded from this pass because no mark was ever observed.
    pub stale_legs: Vec<OptionReference>,
    /// Bodies excluded entirely (no leg marks and no structure mark).
    pub stale_bodies: Vec<Decimal>,
}

/// Valuation of a single fly against the book.
enum FlyValuation {
    /// Valued from leg marks; unmarked legs are excluded and listed.
    FromLegs {
        unrealized: Decimal,
        structure_mid: Option<Decimal>,
        missing: Vec<OptionReference>,
    },
    /// No leg has ever been marked; fell back to the structure's last mark.
    FromStructureMark { unrealized: Decimal },
    /// Nothing to value against; the fly is excluded this cycle.
    Stale,
}

fn value_fly(fly: &Fly, marks: &MarkBook) -> FlyValuation {
    let mut unrealized = Decimal::ZERO;
    let mut short_mids = Decimal::ZERO;
    let mut long_mids = Decimal::ZERO;
    let mut marked = 0usize;
    let mut missing = Vec::new();

    for leg in fly.legs() {
        match marks.mark_for(leg.reference()) {
            Some(mark) => {
                unrealized += leg.pnl_against(mark);
                match leg.side() {
                    PositionSide::Short => short_mids += mark,
                    PositionSide::Long => long_mids += mark,
                }
                marked += 1;
            }
            None => missing.push(leg.reference().clone()),
        }
    }

    if marked == 0 {
        // The book knows nothing about this structure (e.g. first cycle
        // after a restart). Fall back to the last structure mark carried in
        // the snapshot, if any.
        return fly.mark().map_or(FlyValuation::Stale, |mid| {
            FlyValuation::FromStructureMark {
                unrealized: (fly.entry_price() - mid) * fly.structure_quantity(),
            }
        });
    }

    let structure_mid = if missing.is_empty() {
        Some(round_to_nickel(short_mids - long_mids))
    } else {
        None
    };

    FlyValuation::FromLegs {
        unrealized,
        structure_mid,
        missing,
    }
}

/// Compute realized, unrealized, and net PnL for the current marks, and
/// update the state's per-fly PnL, total, and running extremes.
///
/// Missing marks degrade gracefully: the book already retains last-known
/// values, a leg that was never quoted is excluded and flagged, and a fly
/// with no usable data at all is skipped for the cycle. The cycle never
/// aborts on missing data.
pub fn compute_net_pnl(state: &mut StrategyState, marks: &MarkBook) -> PnlBreakdown {
    let mut per_fly: BTreeMap<Decimal, Decimal> = BTreeMap::new();
    let mut unrealized_total = Decimal::ZERO;
    let mut stale_legs = Vec::new();
    let mut stale_bodies = Vec::new();
    let mut structure_mids: BTreeMap<Decimal, Decimal> = BTreeMap::new();

    for (body, fly) in state.active_flies() {
        match value_fly(fly, marks) {
            FlyValuation::FromLegs {
                unrealized,
                structure_mid,
                missing,
            } => {
                if !missing.is_empty() {
                    warn!(
                        %body,
                        missing = missing.len(),
                        "Valuing fly with unmarked legs excluded"
                    );
                    stale_legs.extend(missing);
                }
                let unrealized = round_to_cents(unrealized);
                per_fly.insert(*body, unrealized);
                unrealized_total += unrealized;
                if let Some(mid) = structure_mid {
                    structure_mids.insert(*body, mid);
                }
            }
            FlyValuation::FromStructureMark { unrealized } => {
                let unrealized = round_to_cents(unrealized);
                per_fly.insert(*body, unrealized);
                unrealized_total += unrealized;
            }
            FlyValuation::Stale => {
                warn!(%body, "No marks for fly; excluded from this cycle");
                stale_bodies.push(*body);
            }
        }
    }

    // Refresh structure marks after valuation; closed flies ignore late
    // updates on their own.
    for (body, mid) in structure_mids {
        if let Some(fly) = state.active_flies_mut().get_mut(&body) {
            fly.refresh_mark(mid);
        }
    }

    let realized = state.realized_pnl();
    let unrealized = round_to_cents(unrealized_total);
    let net = round_to_cents(realized + unrealized);

    state.record_cycle_pnl(per_fly, net);
    state.update_pnl_extremes(net);

    debug!(%realized, %unrealized, %net, "Mark-to-market complete");

    PnlBreakdown {
        realized,
        unrealized,
        net,
        stale_legs,
        stale_bodies,
    }
}
