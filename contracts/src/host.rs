//! # Host
//!
//! The execution environment the vault assumes: one top-level call at a
//! time, and native value that travels with the call that carries it.
//!
//! [`Host`] provides both. Every entry point takes the host's serial lock
//! for its whole duration, so concurrent callers queue instead of tripping
//! the vault's reentrancy lock. Asset code that calls back into the vault
//! talks to the [`Vault`] directly (it is already inside a call) and must
//! never call back into the `Host`.

use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;

use custody_protocol::{Address, Amount, AssetId};

use crate::error::VaultError;
use crate::native::{NativeBank, NativeTransferError};
use crate::vault::Vault;

/// Errors surfaced by host-level calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// The vault rejected the call.
    #[error(transparent)]
    Vault(#[from] VaultError),

    /// The caller could not cover the value attached to the call.
    #[error("cannot attach value: {0}")]
    Value(#[from] NativeTransferError),
}

impl HostError {
    /// Short stable code for logs, metrics labels and API bodies.
    pub fn code(&self) -> &'static str {
        match self {
            HostError::Vault(e) => e.code(),
            HostError::Value(_) => "insufficient_value",
        }
    }
}

/// Serialized entry point to a [`Vault`].
pub struct Host {
    vault: Arc<Vault>,
    bank: Arc<dyn NativeBank>,
    serial: Mutex<()>,
}

impl Host {
    pub fn new(vault: Arc<Vault>, bank: Arc<dyn NativeBank>) -> Self {
        Self {
            vault,
            bank,
            serial: Mutex::new(()),
        }
    }

    /// The hosted vault, for reads.
    pub fn vault(&self) -> &Arc<Vault> {
        &self.vault
    }

    /// The native balance table.
    pub fn bank(&self) -> &Arc<dyn NativeBank> {
        &self.bank
    }

    /// Runs `call` as one top-level call.
    pub fn execute<T>(
        &self,
        call: impl FnOnce(&Vault) -> Result<T, VaultError>,
    ) -> Result<T, HostError> {
        let _serial = self.serial.lock();
        Ok(call(&self.vault)?)
    }

    pub fn set_allowed(&self, caller: Address, asset: AssetId, allowed: bool) -> Result<(), HostError> {
        self.execute(|v| v.set_allowed(caller, asset, allowed))
    }

    pub fn set_banned(&self, caller: Address, addresses: &[Address], banned: bool) -> Result<(), HostError> {
        self.execute(|v| v.set_banned(caller, addresses, banned))
    }

    pub fn transfer_ownership(&self, caller: Address, new_owner: Address) -> Result<(), HostError> {
        self.execute(|v| v.transfer_ownership(caller, new_owner))
    }

    pub fn renounce_ownership(&self, caller: Address) -> Result<(), HostError> {
        self.execute(|v| v.renounce_ownership(caller))
    }

    pub fn deposit(&self, caller: Address, asset: AssetId, amount: Amount) -> Result<(), HostError> {
        self.execute(|v| v.deposit(caller, asset, amount))
    }

    /// Attaches `value` from `caller` to the vault and calls
    /// [`Vault::deposit_native`]. If the vault rejects the call the value
    /// goes back to the caller.
    pub fn deposit_native(&self, caller: Address, value: Amount) -> Result<(), HostError> {
        let _serial = self.serial.lock();
        let vault = self.vault.address();
        self.bank.attach(caller, vault, value)?;
        if let Err(err) = self.vault.deposit_native(caller, value) {
            self.bank.attach(vault, caller, value)?;
            return Err(err.into());
        }
        Ok(())
    }

    pub fn withdraw(&self, caller: Address, asset: AssetId, amount: Amount) -> Result<(), HostError> {
        self.execute(|v| v.withdraw(caller, asset, amount))
    }

    pub fn withdraw_native(&self, caller: Address, amount: Amount) -> Result<(), HostError> {
        self.execute(|v| v.withdraw_native(caller, amount))
    }
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host").field("vault", &self.vault).finish()
    }
}
