//! State Persistence
//!
//! Serializes the strategy state to a flat JSON snapshot and restores it on
//! startup, so a process restart never loses track of open positions.
//!
//! Writers write-then-atomically-replace (temp file + rename in the same
//! directory), so a concurrent reader such as a dashboard never observes a
//! partially written snapshot. A missing snapshot is the expected first-run
//! condition, not an error; a corrupt snapshot is logged and the caller
//! falls back to a fresh default state, trading a recoverable loss of
//! in-session state for continued availability.

mod snapshot;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::session::state::StrategyState;

pub use snapshot::{FlySnapshot, LegSnapshot, StateSnapshot, SCHEMA_VERSION};

/// Errors from snapshot persistence.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Filesystem error.
    #[error("Snapshot io error at '{path}': {source}")]
    Io {
        /// Path being read or written.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to encode the snapshot.
    #[error("Snapshot encode error: {0}")]
    Encode(#[from] serde_json::Error),

    /// Failed to decode or reconstruct the snapshot.
    #[error("Snapshot decode error: {0}")]
    Decode(String),

    /// A required field was absent.
    #[error("Missing field: {0}")]
    MissingField(String),

    /// A field was present but unparseable.
    #[error("Invalid field {field}: {message}")]
    InvalidField {
        /// Name of the offending field.
        field: String,
        /// Why it failed to parse.
        message: String,
    },
}

/// Reads and writes strategy-state snapshots at a fixed path.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    /// Create a store for the given snapshot path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The snapshot path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist the state.
    ///
    /// The snapshot is written to a temp file in the same directory and
    /// renamed over the target, so readers never see a torn file.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or any filesystem step fails; the
    /// caller keeps its in-memory state and retries on the next cycle.
    pub fn save(&self, state: &StrategyState, now: DateTime<Utc>) -> Result<(), PersistenceError> {
        let snapshot = StateSnapshot::from_state(state, now);
        let json = serde_json::to_string_pretty(&snapshot)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| PersistenceError::Io {
                    path: parent.display().to_string(),
                    source: e,
                })?;
            }
        }

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json).map_err(|e| PersistenceError::Io {
            path: tmp.display().to_string(),
            source: e,
        })?;
        fs::rename(&tmp, &self.path).map_err(|e| PersistenceError::Io {
            path: self.path.display().to_string(),
            source: e,
        })?;

        debug!(path = %self.path.display(), "State snapshot saved");
        Ok(())
    }

    /// Load the persisted state.
    ///
    /// Returns `Ok(None)` when no snapshot exists yet (the expected
    /// first-run condition).
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or decoded.
    pub fn load(&self) -> Result<Option<StrategyState>, PersistenceError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(PersistenceError::Io {
                    path: self.path.display().to_string(),
                    source: e,
                });
            }
        };

        let snapshot: StateSnapshot =
            serde_json::from_str(&contents).map_err(|e| PersistenceError::Decode(e.to_string()))?;
        let state = snapshot.into_state()?;
        Ok(Some(state))
    }

    /// Load the persisted state, falling back to a fresh default on any
    /// failure. The failure is logged with the snapshot path for
    /// diagnosis; the session continues rather than halting.
    #[must_use]
    pub fn load_or_default(&self) -> StrategyState {
        match self.load() {
            Ok(Some(state)) => {
                info!(
                    path = %self.path.display(),
                    active = state.active_flies().len(),
                    closed = state.closed_flies().len(),
                    "State rehydrated from snapshot"
                );
                state
            }
            Ok(None) => {
                info!(path = %self.path.display(), "No snapshot found; starting fresh");
                StrategyState::new()
            }
            Err(e) => {
                error!(
                    path = %self.path.display(),
                    error = %e,
                    "Snapshot load failed; starting from a fresh default state"
                );
                StrategyState::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::value_objects::{FlyDraft, Leg, OptionReference};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn expiry() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, 15).unwrap()
    }

    fn time() -> DateTime<Utc> {
        "2025-08-15T15:00:00Z".parse().unwrap()
    }

    fn fly(body: Decimal) -> crate::domain::position::value_objects::Fly {
        FlyDraft::new(body)
            .with_leg(
                Leg::short(
                    OptionReference::call("SPX", body, expiry(), ".C"),
                    dec!(1),
                    dec!(1.50),
                )
                .unwrap(),
            )
            .with_leg(
                Leg::short(
                    OptionReference::put("SPX", body, expiry(), ".P"),
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
            .activate(dec!(2.50), time())
            .unwrap()
    }

    fn populated_state() -> StrategyState {
        let mut state = StrategyState::new();
        state.set_expiry(expiry());
        state.mark_entered();
        state.open_fly(fly(dec!(6000))).unwrap();
        state.open_fly(fly(dec!(6005))).unwrap();
        if let Some(f) = state.active_flies_mut().get_mut(&dec!(6000)) {
            f.refresh_mark(dec!(3.50));
        }
        state.close_fly(dec!(6005), dec!(1.00), time()).unwrap();

        let mut per_fly = std::collections::BTreeMap::new();
        per_fly.insert(dec!(6000), dec!(-1.00));
        state.record_cycle_pnl(per_fly, dec!(0.50));
        state.update_pnl_extremes(dec!(-1.00));
        state.update_pnl_extremes(dec!(0.50));
        state
    }

    #[test]
    fn save_load_roundtrip_preserves_every_field() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("state.json"));

        let state = populated_state();
        store.save(&state, time()).unwrap();

        let restored = store.load().unwrap().unwrap();
        assert_eq!(restored, state);
    }

    #[test]
    fn load_missing_is_first_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("state.json"));
        assert!(store.load().unwrap().is_none());
        assert_eq!(store.load_or_default(), StrategyState::new());
    }

    #[test]
    fn corrupt_snapshot_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{ not json").unwrap();

        let store = SnapshotStore::new(&path);
        assert!(store.load().is_err());
        assert_eq!(store.load_or_default(), StrategyState::new());
    }

    #[test]
    fn save_creates_parent_directories_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/state.json");
        let store = SnapshotStore::new(&path);

        store.save(&populated_state(), time()).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn save_overwrites_previous_snapshot_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("state.json"));

        let mut state = StrategyState::new();
        store.save(&state, time()).unwrap();

        state.open_fly(fly(dec!(6000))).unwrap();
        store.save(&state, time()).unwrap();

        let restored = store.load().unwrap().unwrap();
        assert_eq!(restored.active_flies().len(), 1);
    }
}
