//! Errors returned by vault entry points.
//!
//! Every variant aborts the whole call with zero state change and zero
//! events. Nothing is retried on the caller's behalf.

use thiserror::Error;

use custody_protocol::{Address, Amount, AssetId};

use crate::ledger::LedgerError;
use crate::safe_transfer::TransferError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultError {
    /// A non-owner attempted an administrative operation.
    #[error("unauthorized: {caller} is not the owner")]
    Unauthorized {
        /// The address that made the call.
        caller: Address,
    },

    /// A banned address attempted a ledger-mutating operation.
    #[error("address {0} is banned")]
    Banned(Address),

    /// The operation referenced an asset that is not allow-listed.
    #[error("asset {0} is not allow-listed")]
    AssetNotAllowed(AssetId),

    /// A withdrawal exceeds the recorded balance.
    #[error("insufficient balance of {asset}: available {available}, requested {requested}")]
    InsufficientBalance {
        asset: AssetId,
        available: Amount,
        requested: Amount,
    },

    /// Crediting would overflow the balance or the asset total.
    #[error("balance overflow for {asset}")]
    BalanceOverflow { asset: AssetId },

    /// Pulling the deposit from the depositor failed.
    #[error("asset pull failed: {0}")]
    AssetPullFailed(#[source] TransferError),

    /// Releasing the withdrawal to the depositor failed. The debit was
    /// rolled back.
    #[error("asset release failed for {asset}: {reason}")]
    AssetReleaseFailed { asset: AssetId, reason: String },

    /// A native deposit claimed more value than the vault's native account
    /// holds beyond what the ledger already owes.
    #[error("native deposit not funded: vault holds {held}, ledger requires {required}")]
    UnfundedNativeDeposit { held: Amount, required: Amount },

    /// The native asset was passed to a standard-asset entry point.
    #[error("native asset must use the native entry points")]
    NativeAssetMisuse,

    /// A mutating call arrived while another one was still in flight.
    #[error("reentrant call rejected")]
    Reentrancy,
}

impl VaultError {
    /// Short stable code for logs, metrics labels and API bodies.
    pub fn code(&self) -> &'static str {
        match self {
            VaultError::Unauthorized { .. } => "unauthorized",
            VaultError::Banned(_) => "banned",
            VaultError::AssetNotAllowed(_) => "asset_not_allowed",
            VaultError::InsufficientBalance { .. } => "insufficient_balance",
            VaultError::BalanceOverflow { .. } => "balance_overflow",
            VaultError::AssetPullFailed(_) => "asset_pull_failed",
            VaultError::AssetReleaseFailed { .. } => "asset_release_failed",
            VaultError::UnfundedNativeDeposit { .. } => "unfunded_native_deposit",
            VaultError::NativeAssetMisuse => "native_asset_misuse",
            VaultError::Reentrancy => "reentrancy",
        }
    }
}

impl From<LedgerError> for VaultError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientBalance {
                asset,
                available,
                requested,
            } => VaultError::InsufficientBalance {
                asset,
                available,
                requested,
            },
            LedgerError::Overflow { asset } => VaultError::BalanceOverflow { asset },
        }
    }
}
