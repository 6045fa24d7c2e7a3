//! Position Errors

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that can occur with fly positions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PositionError {
    /// Invalid leg configuration.
    #[error("Invalid leg: {message}")]
    InvalidLeg {
        /// What was wrong with the leg.
        message: String,
    },

    /// Invalid fly structure.
    #[error("Invalid fly structure at body {body}: {message}")]
    InvalidStructure {
        /// Body strike of the offending structure.
        body: Decimal,
        /// What was wrong with it.
        message: String,
    },

    /// The fly is already closed; the operation is not permitted.
    #[error("Fly at body {body} is already closed")]
    AlreadyClosed {
        /// Body strike of the fly.
        body: Decimal,
    },

    /// No fly with this body exists in the aggregate.
    #[error("No fly with body {body}")]
    UnknownBody {
        /// The unknown body strike.
        body: Decimal,
    },

    /// A fly with this body already exists (active or closed).
    #[error("A fly with body {body} already exists")]
    DuplicateBody {
        /// The duplicate body strike.
        body: Decimal,
    },

    /// The fly never received a mark, so a synthetic close price cannot
    /// be derived.
    #[error("Fly at body {body} has no mark to close against")]
    NoMark {
        /// Body strike of the fly.
        body: Decimal,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn error_display() {
        let err = PositionError::DuplicateBody { body: dec!(6000) };
        assert_eq!(err.to_string(), "A fly with body 6000 already exists");

        let err = PositionError::AlreadyClosed { body: dec!(5995) };
        assert_eq!(err.to_string(), "Fly at body 5995 is already closed");

        let err = PositionError::InvalidLeg {
            message: "quantity must be positive".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid leg: quantity must be positive");
    }
}
