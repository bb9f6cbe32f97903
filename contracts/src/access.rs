//! # Access Gate
//!
//! The checks that run before any state changes:
//!
//! 1. the caller must not be banned (ledger operations);
//! 2. the asset must be allow-listed (asset operations);
//! 3. the caller must be the owner (administrative operations).
//!
//! [`AccessGate`] owns the three pieces of state those checks consult and
//! only ever answers yes or no. It never mutates on a failed check, and
//! the vault runs it to completion before touching the ledger.

use custody_protocol::{Address, AssetId};

use crate::bans::BanList;
use crate::error::VaultError;
use crate::registry::AssetRegistry;

// ---------------------------------------------------------------------------
// Ownership
// ---------------------------------------------------------------------------

/// Single-owner administration.
///
/// Once renounced (`owner == None`) no administrative call can succeed
/// again.
#[derive(Debug, Clone)]
pub struct Ownership {
    owner: Option<Address>,
}

impl Ownership {
    pub fn new(owner: Address) -> Self {
        Self { owner: Some(owner) }
    }

    pub fn owner(&self) -> Option<Address> {
        self.owner
    }

    /// Fails with [`VaultError::Unauthorized`] unless `caller` is the owner.
    pub fn ensure_owner(&self, caller: &Address) -> Result<(), VaultError> {
        match self.owner {
            Some(owner) if owner == *caller => Ok(()),
            _ => Err(VaultError::Unauthorized { caller: *caller }),
        }
    }

    /// Hands ownership to `new_owner`. Returns the previous owner.
    pub fn transfer(
        &mut self,
        caller: &Address,
        new_owner: Address,
    ) -> Result<Option<Address>, VaultError> {
        self.ensure_owner(caller)?;
        Ok(self.owner.replace(new_owner))
    }

    /// Gives up ownership for good. Returns the previous owner.
    pub fn renounce(&mut self, caller: &Address) -> Result<Option<Address>, VaultError> {
        self.ensure_owner(caller)?;
        Ok(self.owner.take())
    }
}

// ---------------------------------------------------------------------------
// AccessGate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AccessGate {
    pub(crate) ownership: Ownership,
    pub(crate) registry: AssetRegistry,
    pub(crate) bans: BanList,
}

impl AccessGate {
    pub fn new(owner: Address) -> Self {
        Self {
            ownership: Ownership::new(owner),
            registry: AssetRegistry::new(),
            bans: BanList::new(),
        }
    }

    /// Gate for administrative operations.
    pub fn authorize_admin(&self, caller: &Address) -> Result<(), VaultError> {
        self.ownership.ensure_owner(caller)
    }

    /// Gate for ledger operations on `asset`: ban check, then allow-list.
    pub fn authorize_ledger(&self, caller: &Address, asset: &AssetId) -> Result<(), VaultError> {
        self.ensure_not_banned(caller)?;
        self.ensure_allowed(asset)
    }

    /// Gate for the standard-asset entry points. Same as
    /// [`authorize_ledger`](Self::authorize_ledger), with the native sentinel
    /// refused after the ban check.
    pub fn authorize_standard(&self, caller: &Address, asset: &AssetId) -> Result<(), VaultError> {
        self.ensure_not_banned(caller)?;
        if asset.is_native() {
            return Err(VaultError::NativeAssetMisuse);
        }
        self.ensure_allowed(asset)
    }

    fn ensure_not_banned(&self, caller: &Address) -> Result<(), VaultError> {
        if self.bans.is_banned(caller) {
            return Err(VaultError::Banned(*caller));
        }
        Ok(())
    }

    fn ensure_allowed(&self, asset: &AssetId) -> Result<(), VaultError> {
        if !self.registry.is_allowed(asset) {
            return Err(VaultError::AssetNotAllowed(*asset));
        }
        Ok(())
    }

    pub fn ownership(&self) -> &Ownership {
        &self.ownership
    }

    pub fn registry(&self) -> &AssetRegistry {
        &self.registry
    }

    pub fn bans(&self) -> &BanList {
        &self.bans
    }
}
