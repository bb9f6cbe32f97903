//! # Safe Transfers
//!
//! Moves standard assets in and out of the vault without trusting the
//! asset's return-value convention. Three behaviors are seen in the wild:
//!
//! | Asset behavior                        | Outcome                 | Verdict |
//! |---------------------------------------|-------------------------|---------|
//! | conforming, success                   | `Returned(true)`        | success |
//! | non-compliant, success                | `NoData`                | success |
//! | signals failure with a return value   | `Returned(false)`       | failure |
//! | call does not complete                | `Reverted(_)`           | failure |
//!
//! The rule is asymmetric: silence means success, an explicit `false`
//! means failure. "Success iff it returned true" would reject perfectly
//! good non-compliant assets.

use thiserror::Error;

use custody_protocol::{Address, Amount, AssetId};

use crate::asset::{AssetBook, TransferOutcome};

/// A safe transfer resolved to failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    /// Two-party transfer (vault → recipient) failed.
    #[error("transfer of {asset} failed: {reason}")]
    TransferFailed {
        /// The asset that was called.
        asset: AssetId,
        /// Why the call resolved to failure.
        reason: String,
    },

    /// Three-party transfer (payer → recipient, via allowance) failed.
    #[error("transfer_from of {asset} failed: {reason}")]
    TransferFromFailed {
        /// The asset that was called.
        asset: AssetId,
        /// Why the call resolved to failure.
        reason: String,
    },
}

/// Resolves a raw call outcome to pass/fail. `Err` carries the reason.
pub fn resolve(outcome: TransferOutcome) -> Result<(), String> {
    match outcome {
        TransferOutcome::Returned(true) | TransferOutcome::NoData => Ok(()),
        TransferOutcome::Returned(false) => Err("asset returned false".to_string()),
        TransferOutcome::Reverted(reason) => Err(format!("call reverted: {}", reason)),
    }
}

/// Calls `transfer(to, amount)` on `asset` as `caller`.
pub fn safe_transfer(
    book: &AssetBook,
    asset: AssetId,
    caller: Address,
    to: Address,
    amount: Amount,
) -> Result<(), TransferError> {
    let outcome = match book.get(&asset) {
        Some(contract) => contract.transfer(caller, to, amount),
        None => no_code(),
    };
    resolve(outcome).map_err(|reason| TransferError::TransferFailed { asset, reason })
}

/// Calls `transfer_from(from, to, amount)` on `asset` as `caller`.
pub fn safe_transfer_from(
    book: &AssetBook,
    asset: AssetId,
    caller: Address,
    from: Address,
    to: Address,
    amount: Amount,
) -> Result<(), TransferError> {
    let outcome = match book.get(&asset) {
        Some(contract) => contract.transfer_from(caller, from, to, amount),
        None => no_code(),
    };
    resolve(outcome).map_err(|reason| TransferError::TransferFromFailed { asset, reason })
}

// A call to an address with no code would "succeed" with no data on a real
// chain. Here it reverts, so a typo'd asset id can never mint balances.
fn no_code() -> TransferOutcome {
    TransferOutcome::revert("no asset bound at address")
}
