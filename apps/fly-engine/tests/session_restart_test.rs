//! Restart-Safety Integration Tests
//!
//! Exercises the full snapshot cycle through real files: a session enters
//! its ladder, marks to market, persists, and a second process picks up
//! exactly where the first left off.

#![allow(clippy::unwrap_used)]

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use fly_engine::config::Config;
use fly_engine::feed::MarkUpdate;
use fly_engine::session::ladder::StaticChain;
use fly_engine::{
    Fly, FlyDraft, Leg, OptionReference, OptionRight, SessionEngine, SnapshotStore, StrategyState,
};

fn expiry() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 8, 15).unwrap()
}

fn cycle_time() -> DateTime<Utc> {
    "2025-08-15T14:33:00Z".parse().unwrap()
}

fn chain() -> StaticChain {
    let mut options = Vec::new();
    let mut strike = 5800;
    while strike <= 6200 {
        let s = Decimal::from(strike);
        options.push(OptionReference::call("SPX", s, expiry(), format!(".C{strike}")));
        options.push(OptionReference::put("SPX", s, expiry(), format!(".P{strike}")));
        strike += 5;
    }
    StaticChain::new(expiry(), options)
}

/// Quote the ladder's short strikes at `body_mid` and everything else at
/// `wing_mid`.
fn marks(chain: &StaticChain, body_mid: Decimal, wing_mid: Decimal) -> Vec<MarkUpdate> {
    use fly_engine::session::ladder::ChainLookup;
    let mut updates = Vec::new();
    for strike in chain.strikes() {
        for right in [OptionRight::Call, OptionRight::Put] {
            let reference = chain.option_at(strike, right).unwrap();
            let mid = if (dec!(5980)..=dec!(6020)).contains(&strike) {
                body_mid
            } else {
                wing_mid
            };
            updates.push(MarkUpdate::from_quote(reference, Some(mid), Some(mid), cycle_time()));
        }
    }
    updates
}

fn iron_fly(body: Decimal, credit: Decimal) -> Fly {
    FlyDraft::new(body)
        .with_leg(
            Leg::short(
                OptionReference::call("SPX", body, expiry(), ""),
                dec!(1),
                dec!(1.50),
            )
            .unwrap(),
        )
        .with_leg(
            Leg::short(
                OptionReference::put("SPX", body, expiry(), ""),
                dec!(1),
                dec!(1.50),
            )
            .unwrap(),
        )
        .with_leg(
            Leg::long(
                OptionReference::call("SPX", body + dec!(60), expiry(), ""),
                dec!(1),
                dec!(0.25),
            )
            .unwrap(),
        )
        .with_leg(
            Leg::long(
                OptionReference::put("SPX", body - dec!(60), expiry(), ""),
                dec!(1),
                dec!(0.25),
            )
            .unwrap(),
        )
        .activate(credit, cycle_time())
        .unwrap()
}

#[test]
fn session_survives_restart_without_losing_positions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let chain = chain();

    // --- First process: enter, mark, stop.
    {
        let mut engine = SessionEngine::new(Config::default(), SnapshotStore::new(&path));
        engine.run_cycle(&marks(&chain, dec!(20.00), dec!(0.25)), cycle_time());
        let opened = engine.try_enter(&chain, Some(dec!(6001)), cycle_time());
        assert_eq!(opened, 9);

        // Adverse move, then a partial recovery.
        engine.run_cycle(&marks(&chain, dec!(21.00), dec!(0.25)), cycle_time());
        engine.run_cycle(&marks(&chain, dec!(20.50), dec!(0.25)), cycle_time());
        engine.shutdown(cycle_time());
    }

    // --- Second process: rehydrate and verify every field survived.
    let engine = SessionEngine::rehydrate(Config::default(), SnapshotStore::new(&path));
    let state = engine.state();

    assert!(state.entered_today());
    assert_eq!(state.expiry(), Some(expiry()));
    assert_eq!(state.active_flies().len(), 9);
    assert_eq!(state.closed_flies().len(), 0);

    // 9 flies at -2.00, then -1.00 each.
    assert_eq!(state.total_pnl(), dec!(-9.00));
    assert_eq!(state.realized_pnl(), dec!(0));
    assert_eq!(state.min_net_pnl(), Some(dec!(-18.00)));
    assert_eq!(state.max_net_pnl(), Some(dec!(0.00)));

    // The rehydrated flies carry their marks, legs, and entry prices.
    let fly = &state.active_flies()[&dec!(6000)];
    assert_eq!(fly.entry_price(), dec!(39.50));
    assert_eq!(fly.mark(), Some(dec!(40.50)));
    assert_eq!(fly.legs().len(), 4);
    assert_eq!(fly.legs()[0].entry_price(), dec!(20.00));

    // And the session does not re-enter.
    assert!(!engine.entry_window_open(cycle_time()));
}

#[test]
fn extremes_survive_restart_and_keep_tracking() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let store = SnapshotStore::new(&path);

    let mut state = StrategyState::new();
    for v in [dec!(-5.0), dec!(-2.0), dec!(1.0)] {
        state.update_pnl_extremes(v);
    }
    store.save(&state, cycle_time()).unwrap();

    // Restart: extremes restored, further updates extend them without
    // resetting.
    let mut restored = store.load().unwrap().unwrap();
    assert_eq!(restored.min_net_pnl(), Some(dec!(-5.0)));
    assert_eq!(restored.max_net_pnl(), Some(dec!(1.0)));

    restored.update_pnl_extremes(dec!(-3.0));
    store.save(&restored, cycle_time()).unwrap();

    let after = store.load().unwrap().unwrap();
    assert_eq!(after.min_net_pnl(), Some(dec!(-5.0)));
    assert_eq!(after.max_net_pnl(), Some(dec!(1.0)));
}

#[test]
fn roundtrip_preserves_closed_flies_and_realized() {
    let dir = tempfile::tempdir().unwrap();
    let store = SnapshotStore::new(dir.path().join("state.json"));

    let mut state = StrategyState::new();
    state.set_expiry(expiry());
    state.mark_entered();
    state.open_fly(iron_fly(dec!(6000), dec!(2.50))).unwrap();
    state.open_fly(iron_fly(dec!(6005), dec!(2.00))).unwrap();
    state.close_fly(dec!(6000), dec!(1.00), cycle_time()).unwrap();

    store.save(&state, cycle_time()).unwrap();
    let restored = store.load().unwrap().unwrap();

    assert_eq!(restored, state);
    assert_eq!(restored.realized_pnl(), dec!(1.50));
    let closed = &restored.closed_flies()[&dec!(6000)];
    assert!(closed.is_closed());
    assert_eq!(closed.close_price(), Some(dec!(1.00)));
    assert_eq!(closed.realized_pnl(), Some(dec!(1.50)));
}

#[test]
fn legacy_snapshot_without_extremes_seeds_from_own_net() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");

    std::fs::write(
        &path,
        r#"{
            "schema_version": 1,
            "saved_at": "2025-08-15T15:00:00Z",
            "entered_today": true,
            "expiry": "2025-08-15",
            "active_flies": {},
            "closed_flies": {},
            "per_if_pnl": {"6000": "-0.50"},
            "total_pnl": "-1.50",
            "realized_pnl": "-1.00"
        }"#,
    )
    .unwrap();

    let state = SnapshotStore::new(&path).load().unwrap().unwrap();
    // Seeded from realized + per-fly sums, never from zero.
    assert_eq!(state.min_net_pnl(), Some(dec!(-1.50)));
    assert_eq!(state.max_net_pnl(), Some(dec!(-1.50)));
}

#[test]
fn snapshot_with_unreadable_fly_still_loads_the_rest() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let store = SnapshotStore::new(&path);

    let mut state = StrategyState::new();
    state.open_fly(iron_fly(dec!(6000), dec!(2.50))).unwrap();
    state.open_fly(iron_fly(dec!(6005), dec!(2.00))).unwrap();
    store.save(&state, cycle_time()).unwrap();

    // Corrupt one fly's strike in place; broker_id removal elsewhere must
    // stay harmless.
    let mut doc: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let fly = doc["active_flies"]["6005"]["legs"][0].as_object_mut().unwrap();
    fly.remove("strike");
    let good = doc["active_flies"]["6000"]["legs"][0].as_object_mut().unwrap();
    good.remove("broker_id");
    std::fs::write(&path, serde_json::to_string_pretty(&doc).unwrap()).unwrap();

    let restored = store.load().unwrap().unwrap();
    assert_eq!(restored.active_flies().len(), 1);
    assert!(restored.active_flies().contains_key(&dec!(6000)));
    assert_eq!(
        restored.active_flies()[&dec!(6000)].legs()[0]
            .reference()
            .broker_id(),
        ""
    );
}

#[test]
fn first_run_without_snapshot_starts_fresh() {
    let dir = tempfile::tempdir().unwrap();
    let store = SnapshotStore::new(dir.path().join("state.json"));
    let engine = SessionEngine::rehydrate(Config::default(), store);

    assert_eq!(engine.state(), &StrategyState::new());
    assert!(engine.entry_window_open(cycle_time()));
}

#[test]
fn stop_closes_persist_across_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let chain = chain();

    let mut config = Config::default();
    config.stops.per_fly_stop = dec!(3.00);

    {
        let mut engine = SessionEngine::new(config.clone(), SnapshotStore::new(&path));
        engine.run_cycle(&marks(&chain, dec!(20.00), dec!(0.25)), cycle_time());
        assert_eq!(engine.try_enter(&chain, Some(dec!(6000)), cycle_time()), 9);

        // Every fly to -4.00: stops close all nine.
        let report = engine.run_cycle(&marks(&chain, dec!(22.00), dec!(0.25)), cycle_time());
        assert_eq!(report.closed_bodies.len(), 9);
    }

    let engine = SessionEngine::rehydrate(config, SnapshotStore::new(&path));
    assert!(engine.state().active_flies().is_empty());
    assert_eq!(engine.state().closed_flies().len(), 9);
    assert_eq!(engine.state().realized_pnl(), dec!(-36.00));

    // Realized PnL of closed flies never moves again, whatever arrives.
    let mut engine = engine;
    engine.run_cycle(&marks(&chain, dec!(5.00), dec!(0.05)), cycle_time());
    assert_eq!(engine.state().realized_pnl(), dec!(-36.00));
}
