//! Ladder Construction
//!
//! Builds the session's iron-fly ladder: the ATM body plus evenly spaced
//! bodies above and below, each fly a short straddle at the body with long
//! wings. Contracts come from an option-chain lookup (an external
//! collaborator behind the [`ChainLookup`] seam) and entry premiums from
//! the freshest marks.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::domain::position::value_objects::{Fly, FlyDraft, Leg, OptionReference, OptionRight};
use crate::domain::position::PositionError;
use crate::domain::shared::rounding::round_to_nickel;
use crate::feed::MarkBook;

/// Lookup seam over one expiry of an option chain.
pub trait ChainLookup {
    /// The expiry this chain covers.
    fn expiry(&self) -> NaiveDate;

    /// Find the contract at a strike, if listed.
    fn option_at(&self, strike: Decimal, right: OptionRight) -> Option<OptionReference>;

    /// All listed strikes, sorted ascending.
    fn strikes(&self) -> Vec<Decimal>;
}

/// In-memory chain built from a set of option references.
#[derive(Debug, Clone)]
pub struct StaticChain {
    expiry: NaiveDate,
    options: Vec<OptionReference>,
}

impl StaticChain {
    /// Build a chain from references sharing one expiry; references with a
    /// different expiry are dropped.
    #[must_use]
    pub fn new(expiry: NaiveDate, options: impl IntoIterator<Item = OptionReference>) -> Self {
        Self {
            expiry,
            options: options
                .into_iter()
                .filter(|o| o.expiry() == expiry)
                .collect(),
        }
    }

    /// Number of contracts in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.options.len()
    }

    /// Check if the chain is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

impl ChainLookup for StaticChain {
    fn expiry(&self) -> NaiveDate {
        self.expiry
    }

    fn option_at(&self, strike: Decimal, right: OptionRight) -> Option<OptionReference> {
        self.options
            .iter()
            .find(|o| o.strike() == strike && o.right() == right)
            .cloned()
    }

    fn strikes(&self) -> Vec<Decimal> {
        let mut strikes: Vec<Decimal> = self.options.iter().map(OptionReference::strike).collect();
        strikes.sort();
        strikes.dedup();
        strikes
    }
}

/// Median listed strike: the ATM fallback when no spot is available
/// (e.g. the market is closed and neither a trade nor a quote mid exists).
#[must_use]
pub fn median_strike(chain: &dyn ChainLookup) -> Option<Decimal> {
    let strikes = chain.strikes();
    if strikes.is_empty() {
        return None;
    }
    Some(strikes[strikes.len() / 2])
}

/// Body strikes for a ladder centered on the ATM body, sorted ascending.
#[must_use]
pub fn ladder_bodies(atm: Decimal, n_below: u32, n_above: u32, step: Decimal) -> Vec<Decimal> {
    let mut bodies = Vec::with_capacity((n_below + n_above + 1) as usize);
    for i in (1..=n_below).rev() {
        bodies.push(atm - step * Decimal::from(i));
    }
    bodies.push(atm);
    for i in 1..=n_above {
        bodies.push(atm + step * Decimal::from(i));
    }
    bodies
}

/// Build one iron fly at `body`: short call and put at the body, long call
/// at `body + width`, long put at `body − width`. Entry premiums are the
/// current leg marks; the structure's entry credit is their nickel-rounded
/// net.
///
/// # Errors
///
/// Returns an error if any of the four contracts is not listed or has no
/// mark to price the entry against.
pub fn build_iron_fly(
    chain: &dyn ChainLookup,
    marks: &MarkBook,
    body: Decimal,
    width: Decimal,
    quantity: Decimal,
    now: DateTime<Utc>,
) -> Result<Fly, PositionError> {
    let legs = [
        (body, OptionRight::Call, true),
        (body, OptionRight::Put, true),
        (body + width, OptionRight::Call, false),
        (body - width, OptionRight::Put, false),
    ];

    let mut draft = FlyDraft::new(body);
    let mut credit = Decimal::ZERO;

    for (strike, right, short) in legs {
        let reference =
            chain
                .option_at(strike, right)
                .ok_or_else(|| PositionError::InvalidStructure {
                    body,
                    message: format!("no {right} listed at strike {strike}"),
                })?;
        let mark =
            marks
                .mark_for(&reference)
                .ok_or_else(|| PositionError::InvalidStructure {
                    body,
                    message: format!("no mark for {reference}"),
                })?;

        let leg = if short {
            credit += mark;
            Leg::short(reference, quantity, mark)?
        } else {
            credit -= mark;
            Leg::long(reference, quantity, mark)?
        };
        draft = draft.with_leg(leg);
    }

    draft.activate(round_to_nickel(credit), now)
}
