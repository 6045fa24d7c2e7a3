//! Property Tests
//!
//! The extremes law and the snapshot round-trip law over generated inputs.

#![allow(clippy::unwrap_used)]

use chrono::{DateTime, NaiveDate, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use fly_engine::persistence::StateSnapshot;
use fly_engine::{FlyDraft, Leg, OptionReference, StrategyState};

fn expiry() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 8, 15).unwrap()
}

fn time() -> DateTime<Utc> {
    "2025-08-15T15:00:00Z".parse().unwrap()
}

/// An iron fly with generated premiums (cents).
fn fly_with(body: Decimal, short_cents: i64, wing_cents: i64, credit: Decimal) -> fly_engine::Fly {
    let short = Decimal::new(short_cents, 2);
    let wing = Decimal::new(wing_cents, 2);
    FlyDraft::new(body)
        .with_leg(
            Leg::short(OptionReference::call("SPX", body, expiry(), ""), dec!(1), short).unwrap(),
        )
        .with_leg(
            Leg::short(OptionReference::put("SPX", body, expiry(), ""), dec!(1), short).unwrap(),
        )
        .with_leg(
            Leg::long(
                OptionReference::call("SPX", body + dec!(60), expiry(), ""),
                dec!(1),
                wing,
            )
            .unwrap(),
        )
        .with_leg(
            Leg::long(
                OptionReference::put("SPX", body - dec!(60), expiry(), ""),
                dec!(1),
                wing,
            )
            .unwrap(),
        )
        .activate(credit, time())
        .unwrap()
}

proptest! {
    /// After feeding v1..vn through the extremes tracker, min and max equal
    /// the sequence min and max — and both were seeded from v1, not zero.
    #[test]
    fn extremes_equal_sequence_min_max(
        cents in prop::collection::vec(-1_000_000i64..1_000_000, 1..64)
    ) {
        let values: Vec<Decimal> = cents.iter().map(|c| Decimal::new(*c, 2)).collect();

        let mut state = StrategyState::new();
        for v in &values {
            state.update_pnl_extremes(*v);
        }

        let min = values.iter().copied().min().unwrap();
        let max = values.iter().copied().max().unwrap();
        prop_assert_eq!(state.min_net_pnl(), Some(min));
        prop_assert_eq!(state.max_net_pnl(), Some(max));
    }

    /// The first observation seeds both extremes to itself, even when it is
    /// negative (no spurious zero maximum).
    #[test]
    fn first_observation_seeds_both_extremes(cents in -1_000_000i64..1_000_000) {
        let v = Decimal::new(cents, 2);
        let mut state = StrategyState::new();
        state.update_pnl_extremes(v);
        prop_assert_eq!(state.min_net_pnl(), Some(v));
        prop_assert_eq!(state.max_net_pnl(), Some(v));
    }

    /// Extremes only widen: an observation inside the current band leaves
    /// it untouched.
    #[test]
    fn extremes_are_monotone(
        cents in prop::collection::vec(-1_000_000i64..1_000_000, 2..64)
    ) {
        let mut state = StrategyState::new();
        let mut band: Option<(Decimal, Decimal)> = None;
        for c in cents {
            let v = Decimal::new(c, 2);
            state.update_pnl_extremes(v);
            let (min, max) = (state.min_net_pnl().unwrap(), state.max_net_pnl().unwrap());
            if let Some((prev_min, prev_max)) = band {
                prop_assert!(min <= prev_min);
                prop_assert!(max >= prev_max);
            }
            prop_assert!(min <= v && v <= max);
            band = Some((min, max));
        }
    }

    /// `load(save(S))` reconstructs a state equal to S in every field,
    /// including nested fly and leg structures.
    #[test]
    fn snapshot_roundtrip_law(
        short_cents in 1i64..5_000,
        wing_cents in 1i64..500,
        mark_cents in 1i64..10_000,
        close_cents in 1i64..10_000,
        total_cents in -1_000_000i64..1_000_000,
        realized_cents in -1_000_000i64..1_000_000,
        entered in any::<bool>(),
    ) {
        let credit = Decimal::new(2 * short_cents - 2 * wing_cents, 2);

        let mut state = StrategyState::new();
        if entered {
            state.mark_entered();
        }
        state.set_expiry(expiry());

        state.open_fly(fly_with(dec!(6000), short_cents, wing_cents, credit)).unwrap();
        state.open_fly(fly_with(dec!(6005), short_cents, wing_cents, credit)).unwrap();

        if let Some(f) = state.active_flies_mut().get_mut(&dec!(6000)) {
            f.refresh_mark(Decimal::new(mark_cents, 2));
        }
        state.close_fly(dec!(6005), Decimal::new(close_cents, 2), time()).unwrap();

        let mut per_fly = std::collections::BTreeMap::new();
        per_fly.insert(dec!(6000), Decimal::new(total_cents, 2));
        state.record_cycle_pnl(per_fly, Decimal::new(total_cents, 2));
        state.update_pnl_extremes(Decimal::new(realized_cents, 2));
        state.update_pnl_extremes(Decimal::new(total_cents, 2));

        let snapshot = StateSnapshot::from_state(&state, time());
        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: StateSnapshot = serde_json::from_str(&json).unwrap();
        let restored = parsed.into_state().unwrap();

        prop_assert_eq!(restored, state);
    }
}
