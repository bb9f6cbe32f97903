//! # Ledger
//!
//! Per-(depositor, asset) balances and per-asset totals. The ledger is pure
//! bookkeeping: it never talks to assets and knows nothing about
//! authorization. The vault decides *when* to call it.
//!
//! ## Invariant
//!
//! For every asset `a`: `total_of(a) == Σ_d balance_of(d, a)`. Balances and
//! totals only ever change together, in [`Ledger::credit`] and
//! [`Ledger::debit`], and both operations validate fully before touching
//! either map. Debug builds re-check conservation after every mutation.

use std::collections::HashMap;

use thiserror::Error;

use custody_protocol::{Address, Amount, AssetId};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Attempted to debit more than the recorded balance.
    #[error("insufficient balance: available {available}, requested {requested} (asset {asset})")]
    InsufficientBalance {
        asset: AssetId,
        available: Amount,
        requested: Amount,
    },

    /// A credit would push the balance or the asset total past `u128::MAX`.
    #[error("balance overflow (asset {asset})")]
    Overflow { asset: AssetId },
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Balance book of the vault.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    balances: HashMap<(Address, AssetId), Amount>,
    totals: HashMap<AssetId, Amount>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Balance of `depositor` in `asset`; zero if never deposited.
    pub fn balance_of(&self, depositor: &Address, asset: &AssetId) -> Amount {
        self.balances
            .get(&(*depositor, *asset))
            .copied()
            .unwrap_or(0)
    }

    /// Sum of all balances in `asset`.
    pub fn total_of(&self, asset: &AssetId) -> Amount {
        self.totals.get(asset).copied().unwrap_or(0)
    }

    /// Checks that crediting `amount` would not overflow, without mutating.
    ///
    /// Returns the `(new_balance, new_total)` pair the credit would produce.
    pub fn check_credit(
        &self,
        depositor: &Address,
        asset: &AssetId,
        amount: Amount,
    ) -> Result<(Amount, Amount), LedgerError> {
        let overflow = || LedgerError::Overflow { asset: *asset };
        let balance = self
            .balance_of(depositor, asset)
            .checked_add(amount)
            .ok_or_else(overflow)?;
        let total = self
            .total_of(asset)
            .checked_add(amount)
            .ok_or_else(overflow)?;
        Ok((balance, total))
    }

    /// Checks that debiting `amount` is covered by the balance, without
    /// mutating.
    pub fn check_debit(
        &self,
        depositor: &Address,
        asset: &AssetId,
        amount: Amount,
    ) -> Result<(Amount, Amount), LedgerError> {
        let available = self.balance_of(depositor, asset);
        let balance = available
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance {
                asset: *asset,
                available,
                requested: amount,
            })?;
        // The total covers every balance, so this cannot fail while the
        // invariant holds. Checked anyway: a broken invariant must not wrap.
        let total = self
            .total_of(asset)
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance {
                asset: *asset,
                available,
                requested: amount,
            })?;
        Ok((balance, total))
    }

    /// Increments the balance and the total by `amount`. Returns the new
    /// balance.
    pub fn credit(
        &mut self,
        depositor: Address,
        asset: AssetId,
        amount: Amount,
    ) -> Result<Amount, LedgerError> {
        let (balance, total) = self.check_credit(&depositor, &asset, amount)?;
        self.balances.insert((depositor, asset), balance);
        self.totals.insert(asset, total);
        debug_assert!(self.is_conserved(&asset), "ledger conservation broken");
        Ok(balance)
    }

    /// Decrements the balance and the total by `amount`. Returns the new
    /// balance. A balance that reaches zero stays as an entry.
    pub fn debit(
        &mut self,
        depositor: Address,
        asset: AssetId,
        amount: Amount,
    ) -> Result<Amount, LedgerError> {
        let (balance, total) = self.check_debit(&depositor, &asset, amount)?;
        self.balances.insert((depositor, asset), balance);
        self.totals.insert(asset, total);
        debug_assert!(self.is_conserved(&asset), "ledger conservation broken");
        Ok(balance)
    }

    /// Recomputes `Σ_d balance(d, asset)` and compares it to the stored
    /// total. Linear in the number of balance entries.
    pub fn is_conserved(&self, asset: &AssetId) -> bool {
        let sum = self
            .balances
            .iter()
            .filter(|((_, a), _)| a == asset)
            .try_fold(0u128, |acc, (_, amount)| acc.checked_add(*amount));
        sum == Some(self.total_of(asset))
    }

    /// Non-zero balances held by `depositor`, sorted by asset.
    pub fn positions_of(&self, depositor: &Address) -> Vec<(AssetId, Amount)> {
        let mut positions: Vec<(AssetId, Amount)> = self
            .balances
            .iter()
            .filter(|((d, _), amount)| d == depositor && **amount > 0)
            .map(|((_, asset), amount)| (*asset, *amount))
            .collect();
        positions.sort();
        positions
    }

    /// Assets with a non-zero total, sorted.
    pub fn assets(&self) -> Vec<AssetId> {
        let mut assets: Vec<AssetId> = self
            .totals
            .iter()
            .filter(|(_, total)| **total > 0)
            .map(|(asset, _)| *asset)
            .collect();
        assets.sort();
        assets
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn token() -> AssetId {
        AssetId::new(Address::derive("token:T"))
    }

    #[test]
    fn credit_creates_entry_and_total() {
        let mut ledger = Ledger::new();
        let d = Address::derive("d");

        assert_eq!(ledger.credit(d, token(), 500).unwrap(), 500);
        assert_eq!(ledger.balance_of(&d, &token()), 500);
        assert_eq!(ledger.total_of(&token()), 500);
    }

    #[test]
    fn credits_accumulate_across_depositors() {
        let mut ledger = Ledger::new();
        let a = Address::derive("a");
        let b = Address::derive("b");

        ledger.credit(a, token(), 500).unwrap();
        ledger.credit(a, token(), 2000).unwrap();
        ledger.credit(b, token(), 7).unwrap();

        assert_eq!(ledger.balance_of(&a, &token()), 2500);
        assert_eq!(ledger.balance_of(&b, &token()), 7);
        assert_eq!(ledger.total_of(&token()), 2507);
        assert!(ledger.is_conserved(&token()));
    }

    #[test]
    fn debit_insufficient_rejected_without_mutation() {
        let mut ledger = Ledger::new();
        let d = Address::derive("d");
        ledger.credit(d, AssetId::NATIVE, 500).unwrap();

        let err = ledger.debit(d, AssetId::NATIVE, 1000).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientBalance {
                asset: AssetId::NATIVE,
                available: 500,
                requested: 1000,
            }
        );
        assert_eq!(ledger.balance_of(&d, &AssetId::NATIVE), 500);
        assert_eq!(ledger.total_of(&AssetId::NATIVE), 500);
    }

    #[test]
    fn debit_of_unknown_depositor_is_insufficient() {
        let mut ledger = Ledger::new();
        let err = ledger.debit(Address::derive("nobody"), token(), 1).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientBalance { available: 0, .. }));
    }

    #[test]
    fn overflow_rejected_without_mutation() {
        let mut ledger = Ledger::new();
        let a = Address::derive("a");
        let b = Address::derive("b");

        ledger.credit(a, token(), u128::MAX).unwrap();
        // b's own balance would fit, but the total would not.
        assert_eq!(
            ledger.credit(b, token(), 1).unwrap_err(),
            LedgerError::Overflow { asset: token() }
        );
        assert_eq!(ledger.balance_of(&b, &token()), 0);
        assert_eq!(ledger.total_of(&token()), u128::MAX);
    }

    #[test]
    fn debit_to_zero_keeps_invariant() {
        let mut ledger = Ledger::new();
        let d = Address::derive("d");
        ledger.credit(d, token(), 42).unwrap();
        assert_eq!(ledger.debit(d, token(), 42).unwrap(), 0);

        assert_eq!(ledger.total_of(&token()), 0);
        assert!(ledger.is_conserved(&token()));
        assert!(ledger.positions_of(&d).is_empty());
        assert!(ledger.assets().is_empty());
    }

    #[test]
    fn zero_amounts_are_noops() {
        let mut ledger = Ledger::new();
        let d = Address::derive("d");
        assert_eq!(ledger.credit(d, token(), 0).unwrap(), 0);
        assert_eq!(ledger.debit(d, token(), 0).unwrap(), 0);
        assert_eq!(ledger.total_of(&token()), 0);
    }

    #[test]
    fn positions_are_sorted_and_skip_zeros() {
        let mut ledger = Ledger::new();
        let d = Address::derive("d");
        ledger.credit(d, token(), 10).unwrap();
        ledger.credit(d, AssetId::NATIVE, 3).unwrap();

        let positions = ledger.positions_of(&d);
        assert_eq!(positions.len(), 2);
        assert_eq!(positions[0], (AssetId::NATIVE, 3));
    }
}
