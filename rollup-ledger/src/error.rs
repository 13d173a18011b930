//! Error types for the rollup ledger

use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Binary deposit shorter than the fixed 52-byte layout
    #[error("Payload too short: expected at least {expected} bytes, got {actual}")]
    PayloadTooShort {
        /// Minimum length
        expected: usize,
        /// Received length
        actual: usize,
    },

    /// Address bytes or text could not be normalized
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Inspect payload is not UTF-8 JSON
    #[error("Malformed inspect payload: {0}")]
    MalformedInspectPayload(String),

    /// Debit larger than the available balance
    #[error("Insufficient balance for {address}: has {available}, needs {requested}")]
    InsufficientBalance {
        /// Debited account (canonical form)
        address: String,
        /// Current balance
        available: String,
        /// Requested amount
        requested: String,
    },

    /// Required JSON field absent
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// Amount is negative, fractional or wider than 256 bits
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Credit would exceed the 256-bit balance range
    #[error("Balance overflow for {0}")]
    BalanceOverflow(String),

    /// Binary deposit from a sender other than the configured one
    #[error("Untrusted deposit sender: {0}")]
    UntrustedDepositSender(String),

    /// Host rejected or failed an exchange
    #[error("Host unavailable: {0}")]
    HostUnavailable(String),

    /// Host response did not follow the rollup HTTP protocol
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client error
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
