use thiserror::Error;

/// Validation and contract errors exposed by `tokenlens-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("token address cannot be empty")]
    EmptyAddress,
    #[error("token address '{value}' must be 0x-prefixed hex of 40 or 64 digits")]
    InvalidAddress { value: String },
    #[error("chain cannot be empty")]
    EmptyChain,
    #[error("chain '{value}' contains invalid characters")]
    InvalidChain { value: String },

    #[error("invalid provider '{value}', expected one of moralis, bitquery-holders, bitquery-trades, bitquery-transfers, gmgn")]
    InvalidProvider { value: String },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },
    #[error("date must be YYYY-MM-DD: '{value}'")]
    InvalidDate { value: String },

    #[error("field '{field}' must be greater than zero")]
    ZeroValue { field: &'static str },
    #[error("nakamoto threshold must be within (0, 1): {value}")]
    InvalidThreshold { value: String },
}

/// Numeric failures that no edge-case policy resolves.
///
/// These point at broken upstream data and are never coerced into a value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ComputationError {
    #[error("balance for holder '{address}' is negative: {balance}")]
    NegativeBalance { address: String, balance: String },
    #[error("decimal overflow while computing {operation}")]
    Overflow { operation: &'static str },
    #[error("share threshold must be within (0, 1): {value}")]
    InvalidThreshold { value: String },
}
