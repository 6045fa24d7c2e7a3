//! Snapshot Records
//!
//! Flat, dependency-free representations of the strategy state. Every
//! field is a JSON primitive, a string, or a map/list of those — the
//! textual encoder is never handed a domain type. Decimals and timestamps
//! encode as strings (canonical decimal form, ISO-8601) so the snapshot
//! round-trips without binary-float precision loss.
//!
//! Loading is forward-tolerant: a legacy snapshot (schema version 1)
//! missing the PnL extremes re-seeds them from the snapshot's own net PnL,
//! and a leg missing its broker identifier still loads. Identity fields
//! are strict: a leg missing its strike or expiry fails that fly's
//! reconstruction, which is logged and never silently defaulted.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use super::PersistenceError;
use crate::domain::position::value_objects::{Fly, Leg, OptionReference, OptionRight};
use crate::session::state::StrategyState;

/// Current snapshot schema version. Version 1 is the legacy shape without
/// `min_net_pnl`/`max_net_pnl`.
pub const SCHEMA_VERSION: u32 = 2;

/// Flat representation of one leg.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegSnapshot {
    /// Underlying symbol.
    pub underlying: Option<String>,
    /// Strike price, canonical decimal string.
    pub strike: Option<String>,
    /// Expiry date, ISO-8601.
    pub expiry: Option<String>,
    /// "CALL" or "PUT".
    pub option_type: Option<String>,
    /// Broker-native identifier; non-identity metadata, may be absent.
    #[serde(default)]
    pub broker_id: String,
    /// Signed contract count (positive = long, negative = short).
    pub quantity: Option<String>,
    /// Entry premium, canonical decimal string.
    pub entry_price: Option<String>,
}

impl LegSnapshot {
    /// Flatten a leg.
    #[must_use]
    pub fn from_leg(leg: &Leg) -> Self {
        let reference = leg.reference();
        Self {
            underlying: Some(reference.underlying().as_str().to_string()),
            strike: Some(reference.strike().to_string()),
            expiry: Some(reference.expiry().to_string()),
            option_type: Some(reference.right().to_string()),
            broker_id: reference.broker_id().to_string(),
            quantity: Some(leg.signed_quantity().to_string()),
            entry_price: Some(leg.entry_price().to_string()),
        }
    }

    /// Reconstruct the leg.
    ///
    /// # Errors
    ///
    /// Returns an error if an identity field is missing or unparseable.
    pub fn to_leg(&self) -> Result<Leg, PersistenceError> {
        let underlying = require("underlying", self.underlying.as_deref())?;
        let strike = parse_decimal("strike", require("strike", self.strike.as_deref())?)?;
        let expiry = parse_date("expiry", require("expiry", self.expiry.as_deref())?)?;
        let right = parse_right(require("option_type", self.option_type.as_deref())?)?;
        let quantity =
            parse_decimal("quantity", require("quantity", self.quantity.as_deref())?)?;
        let entry_price = parse_decimal(
            "entry_price",
            require("entry_price", self.entry_price.as_deref())?,
        )?;

        let reference = OptionReference::new(underlying, strike, expiry, right, &self.broker_id);
        let leg = if quantity > Decimal::ZERO {
            Leg::long(reference, quantity, entry_price)
        } else if quantity < Decimal::ZERO {
            Leg::short(reference, -quantity, entry_price)
        } else {
            return Err(PersistenceError::InvalidField {
                field: "quantity".to_string(),
                message: "signed quantity cannot be zero".to_string(),
            });
        };
        leg.map_err(|e| PersistenceError::Decode(e.to_string()))
    }
}

/// Flat representation of one fly structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlySnapshot {
    /// Ordered legs.
    #[serde(default)]
    pub legs: Vec<LegSnapshot>,
    /// Entry timestamp, RFC 3339.
    pub entry_time: Option<String>,
    /// Entry net credit, canonical decimal string.
    pub entry_price: Option<String>,
    /// Last structure mark, if any was observed.
    pub mark: Option<String>,
    /// Whether the fly is closed.
    #[serde(default)]
    pub closed: bool,
    /// Close timestamp, RFC 3339, once closed.
    pub close_time: Option<String>,
    /// Close price, once closed.
    pub close_price: Option<String>,
}

impl FlySnapshot {
    /// Flatten a fly.
    #[must_use]
    pub fn from_fly(fly: &Fly) -> Self {
        Self {
            legs: fly.legs().iter().map(LegSnapshot::from_leg).collect(),
            entry_time: Some(fly.entry_time().to_rfc3339()),
            entry_price: Some(fly.entry_price().to_string()),
            mark: fly.mark().map(|m| m.to_string()),
            closed: fly.is_closed(),
            close_time: fly.close_time().map(|t| t.to_rfc3339()),
            close_price: fly.close_price().map(|p| p.to_string()),
        }
    }

    /// Reconstruct the fly for the given body key.
    ///
    /// # Errors
    ///
    /// Returns an error if any leg fails to reconstruct or the fly-level
    /// fields are missing or inconsistent.
    pub fn to_fly(&self, body: Decimal) -> Result<Fly, PersistenceError> {
        let legs: Vec<Leg> = self
            .legs
            .iter()
            .map(LegSnapshot::to_leg)
            .collect::<Result<_, _>>()?;

        let entry_time = parse_timestamp(
            "entry_time",
            require("entry_time", self.entry_time.as_deref())?,
        )?;
        let entry_price = parse_decimal(
            "entry_price",
            require("entry_price", self.entry_price.as_deref())?,
        )?;
        let mark = parse_decimal_opt("mark", self.mark.as_deref())?;
        let close_price = parse_decimal_opt("close_price", self.close_price.as_deref())?;
        let close_time = match self.close_time.as_deref() {
            Some(s) => Some(parse_timestamp("close_time", s)?),
            None => None,
        };

        Fly::restore(
            body,
            legs,
            entry_time,
            entry_price,
            mark,
            self.closed,
            close_time,
            close_price,
        )
        .map_err(|e| PersistenceError::Decode(e.to_string()))
    }
}

/// Flat representation of the full strategy state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Snapshot schema version.
    #[serde(default = "legacy_schema_version")]
    pub schema_version: u32,
    /// When the snapshot was written, RFC 3339.
    pub saved_at: Option<String>,
    /// Whether the one entry attempt for the session has happened.
    #[serde(default)]
    pub entered_today: bool,
    /// Session expiry, ISO-8601 date, if chosen.
    pub expiry: Option<String>,
    /// Active flies keyed by body strike string.
    #[serde(default)]
    pub active_flies: BTreeMap<String, FlySnapshot>,
    /// Closed flies keyed by body strike string.
    #[serde(default)]
    pub closed_flies: BTreeMap<String, FlySnapshot>,
    /// Per-fly unrealized PnL keyed by body strike string.
    #[serde(default)]
    pub per_if_pnl: BTreeMap<String, String>,
    /// Net PnL at the last mark-to-market.
    pub total_pnl: Option<String>,
    /// Cumulative realized PnL.
    pub realized_pnl: Option<String>,
    /// Running minimum net PnL; absent in legacy snapshots.
    pub min_net_pnl: Option<String>,
    /// Running maximum net PnL; absent in legacy snapshots.
    pub max_net_pnl: Option<String>,
}

const fn legacy_schema_version() -> u32 {
    1
}

impl StateSnapshot {
    /// Flatten the state for encoding.
    #[must_use]
    pub fn from_state(state: &StrategyState, now: DateTime<Utc>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            saved_at: Some(now.to_rfc3339()),
            entered_today: state.entered_today(),
            expiry: state.expiry().map(|d| d.to_string()),
            active_flies: state
                .active_flies()
                .iter()
                .map(|(body, fly)| (body.to_string(), FlySnapshot::from_fly(fly)))
                .collect(),
            closed_flies: state
                .closed_flies()
                .iter()
                .map(|(body, fly)| (body.to_string(), FlySnapshot::from_fly(fly)))
                .collect(),
            per_if_pnl: state
                .per_fly_pnl()
                .iter()
                .map(|(body, pnl)| (body.to_string(), pnl.to_string()))
                .collect(),
            total_pnl: Some(state.total_pnl().to_string()),
            realized_pnl: Some(state.realized_pnl().to_string()),
            min_net_pnl: state.min_net_pnl().map(|v| v.to_string()),
            max_net_pnl: state.max_net_pnl().map(|v| v.to_string()),
        }
    }

    /// Reconstruct the strategy state.
    ///
    /// A fly that fails to reconstruct is logged with its body identity and
    /// dropped; the rest of the snapshot still loads. A legacy snapshot
    /// without PnL extremes re-seeds them from its own net PnL so the
    /// first-observation invariant is preserved across schema versions.
    ///
    /// # Errors
    ///
    /// Returns an error if top-level fields are unparseable or the
    /// active/closed partition is inconsistent.
    pub fn into_state(self) -> Result<StrategyState, PersistenceError> {
        if self.schema_version > SCHEMA_VERSION {
            warn!(
                schema_version = self.schema_version,
                supported = SCHEMA_VERSION,
                "Snapshot written by a newer schema; loading best-effort"
            );
        }

        let expiry = match self.expiry.as_deref() {
            Some(s) => Some(parse_date("expiry", s)?),
            None => None,
        };

        let mut active = BTreeMap::new();
        for (body_str, fly_snapshot) in &self.active_flies {
            match restore_fly(body_str, fly_snapshot) {
                Ok((body, fly)) => {
                    active.insert(body, fly);
                }
                Err(e) => error!(body = %body_str, error = %e, "Dropping unreadable active fly"),
            }
        }

        let mut closed = BTreeMap::new();
        for (body_str, fly_snapshot) in &self.closed_flies {
            match restore_fly(body_str, fly_snapshot) {
                Ok((body, fly)) if fly.is_closed() => {
                    closed.insert(body, fly);
                }
                Ok((body, _)) => {
                    error!(%body, "Dropping fly recorded as closed but missing close state");
                }
                Err(e) => error!(body = %body_str, error = %e, "Dropping unreadable closed fly"),
            }
        }

        let mut per_fly_pnl = BTreeMap::new();
        for (body_str, pnl_str) in &self.per_if_pnl {
            let body = parse_decimal("per_if_pnl body", body_str)?;
            let pnl = parse_decimal("per_if_pnl value", pnl_str)?;
            per_fly_pnl.insert(body, pnl);
        }

        let total_pnl = parse_decimal_opt("total_pnl", self.total_pnl.as_deref())?
            .unwrap_or(Decimal::ZERO);
        let realized_pnl = parse_decimal_opt("realized_pnl", self.realized_pnl.as_deref())?
            .unwrap_or(Decimal::ZERO);
        let min_net_pnl = parse_decimal_opt("min_net_pnl", self.min_net_pnl.as_deref())?;
        let max_net_pnl = parse_decimal_opt("max_net_pnl", self.max_net_pnl.as_deref())?;

        let mut state = StrategyState::restore(
            self.entered_today,
            expiry,
            active,
            closed,
            per_fly_pnl,
            total_pnl,
            realized_pnl,
            min_net_pnl,
            max_net_pnl,
        )
        .map_err(|e| PersistenceError::Decode(e.to_string()))?;

        if state.min_net_pnl().is_none() || state.max_net_pnl().is_none() {
            let net = state.net_pnl_from_books();
            warn!(%net, "Snapshot predates PnL extremes; seeding from its own net PnL");
            state.update_pnl_extremes(net);
        }

        Ok(state)
    }
}

fn restore_fly(
    body_str: &str,
    fly_snapshot: &FlySnapshot,
) -> Result<(Decimal, Fly), PersistenceError> {
    let body = parse_decimal("body", body_str)?;
    let fly = fly_snapshot.to_fly(body)?;
    Ok((body, fly))
}

// ============================================================================
// Field parsing helpers
// ============================================================================

fn require<'a>(field: &str, value: Option<&'a str>) -> Result<&'a str, PersistenceError> {
    value.ok_or_else(|| PersistenceError::MissingField(field.to_string()))
}

fn parse_decimal(field: &str, s: &str) -> Result<Decimal, PersistenceError> {
    s.parse::<Decimal>()
        .map_err(|e| PersistenceError::InvalidField {
            field: field.to_string(),
            message: e.to_string(),
        })
}

fn parse_decimal_opt(field: &str, s: Option<&str>) -> Result<Option<Decimal>, PersistenceError> {
    s.map(|s| parse_decimal(field, s)).transpose()
}

fn parse_date(field: &str, s: &str) -> Result<NaiveDate, PersistenceError> {
    s.parse::<NaiveDate>()
        .map_err(|e| PersistenceError::InvalidField {
            field: field.to_string(),
            message: e.to_string(),
        })
}

fn parse_timestamp(field: &str, s: &str) -> Result<DateTime<Utc>, PersistenceError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| PersistenceError::InvalidField {
            field: field.to_string(),
            message: e.to_string(),
        })
}

fn parse_right(s: &str) -> Result<OptionRight, PersistenceError> {
    match s.to_uppercase().as_str() {
        "CALL" | "C" => Ok(OptionRight::Call),
        "PUT" | "P" => Ok(OptionRight::Put),
        other => Err(PersistenceError::InvalidField {
            field: "option_type".to_string(),
            message: format!("expected CALL or PUT, got {other}"),
        }),
    }
}
