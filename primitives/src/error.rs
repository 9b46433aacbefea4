//! Error types for the primitives crate.

/// Errors raised while parsing, decoding, or validating primitive values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PrimitiveError {
    /// Input was not valid hex.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// A fixed-size field had the wrong number of bytes.
    #[error("invalid {what} length: expected {expected}, got {got}")]
    InvalidLength {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    /// A margin string or ratio could not be used as a non-negative fraction.
    #[error("invalid margin: {0}")]
    InvalidMargin(String),

    /// An amount string was not a non-negative integer.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Key material was rejected by the signature scheme.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// A transaction envelope could not be decoded.
    #[error("serialization error: {0}")]
    SerializationError(String),
}

/// Convenience result type for primitive operations.
pub type PrimitiveResult<T> = Result<T, PrimitiveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_invalid_length() {
        let err = PrimitiveError::InvalidLength {
            what: "address",
            expected: 32,
            got: 20,
        };
        let s = err.to_string();
        assert!(s.contains("address"));
        assert!(s.contains("32"));
        assert!(s.contains("20"));
    }

    #[test]
    fn test_display_margin() {
        let err = PrimitiveError::InvalidMargin("-0.05".into());
        assert_eq!(err.to_string(), "invalid margin: -0.05");
    }
}
