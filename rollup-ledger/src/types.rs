//! Core types for the rollup ledger
//!
//! All types are designed for:
//! - Deterministic handling (no clocks, no randomness)
//! - Exact arithmetic (256-bit unsigned balances)
//! - Canonical text forms (EIP-55 addresses)

use crate::crypto::{to_checksum, verify_checksum};
use crate::{Error, Result};
use primitive_types::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Account balance in wei-equivalent units
pub type Balance = U256;

/// 20-byte account identifier
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 20]);

impl Address {
    /// Byte length of an address
    pub const LEN: usize = 20;

    /// Create from raw bytes
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, which must be exactly 20 bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; 20] = bytes.try_into().map_err(|_| {
            Error::InvalidAddress(format!("expected {} bytes, got {}", Self::LEN, bytes.len()))
        })?;
        Ok(Self(arr))
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Canonical (checksummed) text form
    pub fn to_checksum(&self) -> String {
        to_checksum(&self.0)
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let body = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);

        if body.len() != 40 {
            return Err(Error::InvalidAddress(format!(
                "{s}: expected 40 hex digits, got {}",
                body.len()
            )));
        }

        let mut bytes = [0u8; 20];
        hex::decode_to_slice(body, &mut bytes)
            .map_err(|e| Error::InvalidAddress(format!("{s}: {e}")))?;

        if !verify_checksum(body, &bytes) {
            return Err(Error::InvalidAddress(format!("{s}: checksum mismatch")));
        }

        Ok(Self(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_checksum())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_checksum())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Kind of request handed out by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// State-changing input
    Advance,
    /// Read-only query
    Inspect,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestKind::Advance => f.write_str("advance_state"),
            RequestKind::Inspect => f.write_str("inspect_state"),
        }
    }
}

/// Host metadata attached to advance requests
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputMetadata {
    /// Input index assigned by the host
    pub input_index: Option<u64>,
    /// Base layer block number
    pub block_number: Option<u64>,
    /// Base layer timestamp (seconds)
    pub timestamp: Option<u64>,
}

/// One request from the host, discarded after handling
#[derive(Debug, Clone)]
pub struct InputEnvelope {
    /// Advance or inspect
    pub kind: RequestKind,
    /// Message sender (advance only)
    pub sender: Option<Address>,
    /// Undecoded payload
    pub payload: Vec<u8>,
    /// Host metadata (advance only)
    pub metadata: InputMetadata,
}

impl InputEnvelope {
    /// Build an advance envelope
    pub fn advance(sender: Address, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            kind: RequestKind::Advance,
            sender: Some(sender),
            payload: payload.into(),
            metadata: InputMetadata::default(),
        }
    }

    /// Build an inspect envelope
    pub fn inspect(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            kind: RequestKind::Inspect,
            sender: None,
            payload: payload.into(),
            metadata: InputMetadata::default(),
        }
    }
}

/// Result of a decoded payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedAction {
    /// Credit `amount` to `recipient`
    Deposit {
        /// Credited account
        recipient: Address,
        /// Credited amount
        amount: Balance,
        /// Whether the deposit came in the fixed binary layout
        binary: bool,
    },
    /// Move `amount` from `from` to `to`
    Transfer {
        /// Debited account
        from: Address,
        /// Credited account
        to: Address,
        /// Moved amount
        amount: Balance,
    },
    /// Pay the loser's whole balance to the winner
    Settle {
        /// Receives the balance and the voucher
        winner: Address,
        /// Zeroed account
        loser: Address,
    },
    /// Read a balance (inspect only)
    BalanceQuery {
        /// Queried account
        user: Address,
    },
    /// Shape matched no known action
    Unrecognized,
}

/// Final status of a request, sent on the next `/finish`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Request applied
    Accept,
    /// Request refused; host reverts it
    Reject,
}

impl Status {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Accept => "accept",
            Status::Reject => "reject",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event sent to the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    /// Provable, state-committing message
    Notice(String),
    /// Diagnostic message
    Report(String),
    /// Payout instruction
    Voucher {
        /// Paid account
        destination: Address,
        /// Paid amount
        amount: Balance,
    },
}
