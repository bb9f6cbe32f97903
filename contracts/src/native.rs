//! # Native Value
//!
//! The native asset is not a contract. It lives in the host's own balance
//! table and moves by direct value transfer. Two ways to move it:
//!
//! - **attach**: value travelling *with* a call (what a payable entry
//!   point receives). No recipient code runs.
//! - **send**: a direct transfer to an address. If the recipient has a
//!   [`NativeReceiver`] hook, it runs and may reject the value or call
//!   back into whoever sent it. The vault's native withdrawals go through
//!   here, so they face the same reentrancy exposure as token calls.

use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use custody_protocol::{Address, Amount};

/// Errors from moving native value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NativeTransferError {
    #[error("insufficient native funds at {from}: available {available}, requested {requested}")]
    InsufficientFunds {
        from: Address,
        available: Amount,
        requested: Amount,
    },

    #[error("native balance overflow at {to}")]
    Overflow { to: Address },

    /// The recipient's hook refused the value. Everything the transfer did
    /// to native balances was undone.
    #[error("recipient {to} rejected native value: {reason}")]
    Rejected { to: Address, reason: String },
}

/// Code that runs when an address receives a native `send`.
pub trait NativeReceiver: Send + Sync {
    /// Returning `Err` rejects the value.
    fn on_receive(&self, from: Address, amount: Amount) -> Result<(), String>;
}

/// The host's native balance table.
pub trait NativeBank: Send + Sync {
    /// Native balance of `who`.
    fn balance_of(&self, who: Address) -> Amount;

    /// Moves value attached to a call. Runs no recipient code.
    fn attach(&self, from: Address, to: Address, amount: Amount) -> Result<(), NativeTransferError>;

    /// Direct value transfer. Runs the recipient's hook, if any.
    fn send(&self, from: Address, to: Address, amount: Amount) -> Result<(), NativeTransferError>;
}

/// In-process [`NativeBank`].
#[derive(Default)]
pub struct InMemoryBank {
    balances: RwLock<HashMap<Address, Amount>>,
    receivers: DashMap<Address, Arc<dyn NativeReceiver>>,
}

impl InMemoryBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates native value out of thin air. Genesis and tests only.
    pub fn mint(&self, to: Address, amount: Amount) -> Result<Amount, NativeTransferError> {
        let mut balances = self.balances.write();
        let balance = balances.entry(to).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or(NativeTransferError::Overflow { to })?;
        Ok(*balance)
    }

    /// Installs `receiver` as the code behind `address`.
    pub fn set_receiver(&self, address: Address, receiver: Arc<dyn NativeReceiver>) {
        self.receivers.insert(address, receiver);
    }

    /// Removes the hook for `address`.
    pub fn clear_receiver(&self, address: &Address) {
        self.receivers.remove(address);
    }

    fn move_value(
        &self,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), NativeTransferError> {
        let mut balances = self.balances.write();
        let available = balances.get(&from).copied().unwrap_or(0);
        let remaining = available
            .checked_sub(amount)
            .ok_or(NativeTransferError::InsufficientFunds {
                from,
                available,
                requested: amount,
            })?;
        if from == to {
            return Ok(());
        }
        let credited = balances
            .get(&to)
            .copied()
            .unwrap_or(0)
            .checked_add(amount)
            .ok_or(NativeTransferError::Overflow { to })?;
        balances.insert(from, remaining);
        balances.insert(to, credited);
        Ok(())
    }
}

impl NativeBank for InMemoryBank {
    fn balance_of(&self, who: Address) -> Amount {
        self.balances.read().get(&who).copied().unwrap_or(0)
    }

    fn attach(&self, from: Address, to: Address, amount: Amount) -> Result<(), NativeTransferError> {
        self.move_value(from, to, amount)
    }

    fn send(&self, from: Address, to: Address, amount: Amount) -> Result<(), NativeTransferError> {
        let receiver = self.receivers.get(&to).map(|r| Arc::clone(r.value()));
        let Some(receiver) = receiver else {
            return self.move_value(from, to, amount);
        };

        // A rejecting hook undoes the whole send, including any native
        // movements the hook itself made.
        let snapshot = self.balances.read().clone();
        self.move_value(from, to, amount)?;
        if let Err(reason) = receiver.on_receive(from, amount) {
            *self.balances.write() = snapshot;
            return Err(NativeTransferError::Rejected { to, reason });
        }
        Ok(())
    }
}

impl fmt::Debug for InMemoryBank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryBank")
            .field("accounts", &self.balances.read().len())
            .field("receivers", &self.receivers.len())
            .finish()
    }
}
