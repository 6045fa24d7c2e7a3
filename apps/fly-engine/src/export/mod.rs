//! Flat Export Rows
//!
//! Per-cycle tabular records for external reporting and charting
//! collaborators. Every row is flat — strings, decimals, and nothing
//! nested — so a consumer can append it straight to a table. File formats
//! and delivery are the consumer's concern.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::feed::MarkUpdate;

/// One fly's PnL at one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PnlRow {
    /// Cycle timestamp, RFC 3339.
    pub ts: String,
    /// Body strike of the fly.
    pub body: Decimal,
    /// The fly's unrealized PnL.
    pub pnl: Decimal,
    /// Session net PnL at the same instant.
    pub total_pnl: Decimal,
}

/// Session-level PnL at one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyPnlRow {
    /// Cycle timestamp, RFC 3339.
    pub ts: String,
    /// Session net PnL.
    pub strategy_total_pnl: Decimal,
}

/// One raw mark observation at one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRow {
    /// Observation timestamp, RFC 3339.
    pub ts: String,
    /// Contract identity, display form.
    pub symbol: String,
    /// Best bid, if quoted.
    pub bid: Option<Decimal>,
    /// Best ask, if quoted.
    pub ask: Option<Decimal>,
    /// Nickel-rounded mid, if both sides were quoted.
    pub mid: Option<Decimal>,
}

impl QuoteRow {
    /// Flatten a mark update into a quote row.
    #[must_use]
    pub fn from_update(update: &MarkUpdate) -> Self {
        Self {
            ts: update.ts.to_rfc3339(),
            symbol: update.reference.to_string(),
            bid: update.bid,
            ask: update.ask,
            mid: update.mid,
        }
    }
}

/// Build the per-fly PnL rows for one cycle.
#[must_use]
pub fn pnl_rows(
    ts: DateTime<Utc>,
    per_fly: &std::collections::BTreeMap<Decimal, Decimal>,
    total: Decimal,
) -> Vec<PnlRow> {
    let ts = ts.to_rfc3339();
    per_fly
        .iter()
        .map(|(body, pnl)| PnlRow {
            ts: ts.clone(),
            body: *body,
            pnl: *pnl,
            total_pnl: total,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::value_objects::OptionReference;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn ts() -> DateTime<Utc> {
        "2025-08-15T15:00:00Z".parse().unwrap()
    }

    #[test]
    fn pnl_rows_one_per_fly_sorted_by_body() {
        let mut per_fly = BTreeMap::new();
        per_fly.insert(dec!(6005), dec!(-1.00));
        per_fly.insert(dec!(6000), dec!(-0.50));

        let rows = pnl_rows(ts(), &per_fly, dec!(-1.50));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].body, dec!(6000));
        assert_eq!(rows[0].pnl, dec!(-0.50));
        assert_eq!(rows[0].total_pnl, dec!(-1.50));
        assert_eq!(rows[1].body, dec!(6005));
    }

    #[test]
    fn quote_row_is_flat() {
        let update = MarkUpdate::from_quote(
            OptionReference::call(
                "SPX",
                dec!(6000),
                NaiveDate::from_ymd_opt(2025, 8, 15).unwrap(),
                "",
            ),
            Some(dec!(2.40)),
            Some(dec!(2.60)),
            ts(),
        );
        let row = QuoteRow::from_update(&update);
        assert_eq!(row.symbol, "SPX 2025-08-15 6000 CALL");
        assert_eq!(row.mid, Some(dec!(2.50)));

        // Flat record: serializes to a single-level JSON object.
        let json = serde_json::to_value(&row).unwrap();
        assert!(json.as_object().unwrap().values().all(|v| !v.is_object() && !v.is_array()));
    }

    #[test]
    fn strategy_row_serde() {
        let row = StrategyPnlRow {
            ts: ts().to_rfc3339(),
            strategy_total_pnl: dec!(-2.50),
        };
        let json = serde_json::to_string(&row).unwrap();
        let parsed: StrategyPnlRow = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, row);
    }
}
