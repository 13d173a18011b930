//! In-memory balance ledger
//!
//! Maps [`Address`] to a non-negative [`Balance`]. Keys are created lazily on
//! first credit. The ledger is a plain value: the request loop owns it and lends
//! it to the router for one request at a time, so no locking is involved.
//!
//! # Invariants
//!
//! - Balances never go negative: a failing debit leaves state untouched
//! - Transfers are all-or-nothing
//! - Transfers, and settlements between distinct accounts, conserve the total supply
//!
//! # Example
//!
//! ```
//! use rollup_ledger::{Address, Balance, Ledger};
//!
//! let alice = Address::new([1u8; 20]);
//! let bob = Address::new([2u8; 20]);
//!
//! let mut ledger = Ledger::new();
//! ledger.credit(alice, Balance::from(100u64)).unwrap();
//! ledger.transfer(alice, bob, Balance::from(40u64)).unwrap();
//!
//! assert_eq!(ledger.query(&alice), Balance::from(60u64));
//! assert_eq!(ledger.query(&bob), Balance::from(40u64));
//! ```

use crate::{
    types::{Address, Balance},
    Error, Result,
};
use std::collections::HashMap;

/// Outcome of [`Ledger::settle`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// Loser had no balance; nothing changed
    NothingToTransfer,
    /// Winner was credited with the loser's former balance
    Paid {
        /// Amount moved, also the voucher amount
        amount: Balance,
    },
}

/// Position in the undo journal returned by [`Ledger::checkpoint`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(usize);

/// Address balance ledger
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    /// Current balances
    balances: HashMap<Address, Balance>,

    /// Prior values of every key written since the last commit
    journal: Vec<(Address, Option<Balance>)>,
}

impl Ledger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Balance of `address`, zero if never credited
    pub fn query(&self, address: &Address) -> Balance {
        self.balances.get(address).copied().unwrap_or_default()
    }

    /// Add `amount` to `address`, returning the new balance
    pub fn credit(&mut self, address: Address, amount: Balance) -> Result<Balance> {
        let current = self.query(&address);
        let updated = current
            .checked_add(amount)
            .ok_or_else(|| Error::BalanceOverflow(address.to_string()))?;
        self.write(address, updated);
        Ok(updated)
    }

    /// Subtract `amount` from `address`, returning the new balance
    pub fn debit(&mut self, address: Address, amount: Balance) -> Result<Balance> {
        let current = self.query(&address);
        let updated = current
            .checked_sub(amount)
            .ok_or_else(|| Error::InsufficientBalance {
                address: address.to_string(),
                available: current.to_string(),
                requested: amount.to_string(),
            })?;
        self.write(address, updated);
        Ok(updated)
    }

    /// Move `amount` from `from` to `to`
    ///
    /// Either both sides are applied or neither is.
    pub fn transfer(&mut self, from: Address, to: Address, amount: Balance) -> Result<()> {
        let checkpoint = self.checkpoint();
        self.debit(from, amount)?;
        if let Err(e) = self.credit(to, amount) {
            self.rollback(checkpoint);
            return Err(e);
        }
        Ok(())
    }

    /// Pay the loser's whole balance to the winner and zero the loser
    pub fn settle(&mut self, loser: Address, winner: Address) -> Result<Settlement> {
        let amount = self.query(&loser);
        if amount.is_zero() {
            return Ok(Settlement::NothingToTransfer);
        }
        // A self-settlement ends at zero like any other loser
        if loser != winner {
            self.credit(winner, amount)?;
        }
        self.write(loser, Balance::zero());
        Ok(Settlement::Paid { amount })
    }

    /// Mark the current state so it can be restored with [`Ledger::rollback`].
    ///
    /// Checkpoints do not nest across [`Ledger::commit`].
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.journal.len())
    }

    /// Undo every write made since `checkpoint`
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        while self.journal.len() > checkpoint.0 {
            let Some((address, prior)) = self.journal.pop() else {
                break;
            };
            match prior {
                Some(balance) => {
                    self.balances.insert(address, balance);
                }
                None => {
                    self.balances.remove(&address);
                }
            }
        }
    }

    /// Drop undo information; everything written so far becomes permanent.
    ///
    /// Every write is journaled until the next commit, so callers driving the
    /// ledger outside the request loop commit after each request.
    pub fn commit(&mut self) {
        self.journal.clear();
    }

    /// Writes that a rollback could still undo
    pub fn pending_writes(&self) -> usize {
        self.journal.len()
    }

    /// Number of known accounts
    pub fn len(&self) -> usize {
        self.balances.len()
    }

    /// Whether no account was ever credited
    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }

    /// Sum of all balances, `None` if it does not fit in 256 bits
    pub fn total_supply(&self) -> Option<Balance> {
        self.balances
            .values()
            .try_fold(Balance::zero(), |acc, b| acc.checked_add(*b))
    }

    fn write(&mut self, address: Address, balance: Balance) {
        let prior = self.balances.insert(address, balance);
        self.journal.push((address, prior));
    }
}
