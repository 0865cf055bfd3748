//! Error types for the order book and its feed adapters

use rust_decimal::Decimal;
use thiserror::Error;

/// Order book and ingestion errors
#[derive(Error, Debug)]
pub enum BookError {
    #[error("Failed to parse message: {0}")]
    ParseError(String),

    #[error("Negative value cannot be converted to fixed point: {0}")]
    NegativeValue(Decimal),

    #[error("Value {value} does not fit in u64 at {decimals} decimals")]
    FixedPointOverflow { value: Decimal, decimals: u32 },

    #[error("Unsupported price scale: {0} decimals (max {max})", max = crate::fixed::MAX_DECIMALS)]
    InvalidScale(u32),

    #[error("Order book not initialized - apply a snapshot first")]
    NotInitialized,

    #[error("Price level tree corrupted: {0}")]
    CorruptTree(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(String),
}

impl From<serde_json::Error> for BookError {
    fn from(err: serde_json::Error) -> Self {
        BookError::ParseError(err.to_string())
    }
}

impl From<std::io::Error> for BookError {
    fn from(err: std::io::Error) -> Self {
        BookError::IoError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BookError>;
