//! Action router
//!
//! Classifies one input, applies it to the [`Ledger`] and decides the status and
//! the outputs to send. Every error is caught here and turned into a report plus
//! [`Status::Reject`]; nothing escapes to the request loop.
//!
//! # Advance dispatch
//!
//! | Action         | Ledger call        | Output on success               |
//! |----------------|--------------------|---------------------------------|
//! | `Deposit`      | `credit`           | notice `Deposit OK`             |
//! | `Transfer`     | `transfer`         | notice `Transfer OK`            |
//! | `Settle`       | `settle`           | voucher + notice `Voucher issued` |
//! | `Unrecognized` | none               | report, still accepted          |

use crate::{
    codec,
    config::DepositConfig,
    ledger::{Ledger, Settlement},
    types::{Address, DecodedAction, InputEnvelope, Output, RequestKind, Status},
    Error, Result,
};
use tracing::{debug, warn};

/// Status and outputs produced by one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Status sent on the next `/finish`
    pub status: Status,
    /// Outputs in emission order
    pub outputs: Vec<Output>,
}

impl Outcome {
    fn accept(outputs: Vec<Output>) -> Self {
        Self {
            status: Status::Accept,
            outputs,
        }
    }

    fn reject(message: String) -> Self {
        Self {
            status: Status::Reject,
            outputs: vec![Output::Report(message)],
        }
    }
}

/// Routes decoded inputs to ledger operations
#[derive(Debug, Clone, Default)]
pub struct Router {
    /// Only sender allowed to push binary deposits, if set
    trusted_deposit_sender: Option<Address>,
}

impl Router {
    /// Create a router from deposit settings
    pub fn new(config: &DepositConfig) -> Self {
        Self {
            trusted_deposit_sender: config.trusted_sender,
        }
    }

    /// Handle one request against `ledger`
    ///
    /// Writes made by a rejected advance are never left behind. Writes of an
    /// accepted advance stay in the ledger journal so the caller can still roll
    /// them back (for example when an output cannot be delivered); call
    /// [`Ledger::commit`] once the request is final.
    pub fn handle(&self, ledger: &mut Ledger, input: &InputEnvelope) -> Outcome {
        let result = match input.kind {
            RequestKind::Advance => {
                let checkpoint = ledger.checkpoint();
                let result = self.advance(ledger, input);
                if result.is_err() {
                    ledger.rollback(checkpoint);
                }
                result
            }
            RequestKind::Inspect => self.inspect(ledger, input),
        };

        result.unwrap_or_else(|e| {
            warn!(kind = %input.kind, error = %e, "Input rejected");
            Outcome::reject(format!("Error: {e}"))
        })
    }

    fn advance(&self, ledger: &mut Ledger, input: &InputEnvelope) -> Result<Outcome> {
        let action = codec::decode(&input.payload, RequestKind::Advance)?;
        debug!(?action, sender = ?input.sender, "Decoded advance input");

        match action {
            DecodedAction::Deposit {
                recipient,
                amount,
                binary,
            } => {
                if binary {
                    self.check_deposit_sender(input.sender)?;
                }
                let balance = ledger.credit(recipient, amount)?;
                Ok(Outcome::accept(vec![Output::Notice(format!(
                    "Deposit OK: {recipient}, {balance}"
                ))]))
            }

            DecodedAction::Transfer { from, to, amount } => {
                ledger.transfer(from, to, amount)?;
                Ok(Outcome::accept(vec![Output::Notice(format!(
                    "Transfer OK: {from}, {to}, {amount}"
                ))]))
            }

            DecodedAction::Settle { winner, loser } => match ledger.settle(loser, winner)? {
                Settlement::Paid { amount } => Ok(Outcome::accept(vec![
                    Output::Voucher {
                        destination: winner,
                        amount,
                    },
                    Output::Notice(format!("Voucher issued: {winner} gets {amount}")),
                ])),
                Settlement::NothingToTransfer => Ok(Outcome::accept(vec![Output::Report(
                    format!("No balance to transfer from {loser}"),
                )])),
            },

            // Balance queries only exist in inspect context
            DecodedAction::Unrecognized | DecodedAction::BalanceQuery { .. } => {
                Ok(Outcome::accept(vec![Output::Report(
                    "Unrecognized structure".to_string(),
                )]))
            }
        }
    }

    fn inspect(&self, ledger: &Ledger, input: &InputEnvelope) -> Result<Outcome> {
        match codec::decode(&input.payload, RequestKind::Inspect)? {
            DecodedAction::BalanceQuery { user } => {
                let balance = ledger.query(&user);
                Ok(Outcome::accept(vec![Output::Report(format!(
                    "Balance of {user} = {balance}"
                ))]))
            }
            _ => Ok(Outcome::accept(Vec::new())),
        }
    }

    fn check_deposit_sender(&self, sender: Option<Address>) -> Result<()> {
        match self.trusted_deposit_sender {
            Some(trusted) if sender != Some(trusted) => Err(Error::UntrustedDepositSender(
                sender.map_or_else(|| "unknown".to_string(), |s| s.to_string()),
            )),
            _ => Ok(()),
        }
    }
}
