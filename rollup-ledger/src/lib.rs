//! Rollup Ledger
//!
//! Deterministic balance ledger driven by a rollup host.
//!
//! # Architecture
//!
//! - **Single Writer**: one request loop owns the ledger and handles one input at a time
//! - **Ordered Classification**: payloads decode into exactly one action variant
//! - **Revertible Requests**: a rejected input leaves no writes behind
//! - **Polling**: the host is asked for the next input; idle answers back off
//!
//! # Invariants
//!
//! - Balances are never negative
//! - Deterministic replay: same inputs → same balances
//! - Transfers, and settlements between distinct accounts, conserve the total supply

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    clippy::all
)]

pub mod codec;
pub mod config;
pub mod crypto;
pub mod error;
pub mod host;
pub mod ledger;
pub mod metrics;
pub mod router;
pub mod runner;
pub mod types;

// Re-exports
pub use config::Config;
pub use error::{Error, Result};
pub use host::{HttpRollupHost, NextRequest, RollupHost};
pub use ledger::{Ledger, Settlement};
pub use metrics::Metrics;
pub use router::{Outcome, Router};
pub use runner::RequestLoop;
pub use types::{Address, Balance, DecodedAction, InputEnvelope, Output, RequestKind, Status};
