//! Shared domain errors.

use thiserror::Error;

/// Errors from shared value object validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation.
    #[error("Invalid {field}: {message}")]
    InvalidValue {
        /// The offending field.
        field: String,
        /// What was wrong with it.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = DomainError::InvalidValue {
            field: "symbol".to_string(),
            message: "cannot be empty".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid symbol: cannot be empty");
    }
}
