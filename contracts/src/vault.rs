//! # Custody Vault
//!
//! The contract proper. Accepts deposits of allow-listed assets, records
//! them in the [`Ledger`], and releases them back on request.
//!
//! ## Call discipline
//!
//! Every deposit/withdraw entry point follows the same shape:
//!
//! 1. take the [`ReentrancyLock`] (nested calls fail here);
//! 2. run the [`AccessGate`] and every ledger pre-check;
//! 3. for deposits: pull the funds, *then* credit;
//!    for withdrawals: debit, *then* release, and re-credit if the
//!    release fails;
//! 4. emit exactly one event.
//!
//! The state lock is never held while an asset or a native recipient runs.
//! Anything they read back from the vault mid-call reflects the effects
//! already applied, never a stale pre-call view.

use chrono::Utc;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use custody_protocol::{Address, Amount, AssetId, EventSink, VaultEvent};

use crate::access::AccessGate;
use crate::asset::AssetBook;
use crate::error::VaultError;
use crate::guard::ReentrancyLock;
use crate::ledger::Ledger;
use crate::native::NativeBank;
use crate::safe_transfer::{safe_transfer, safe_transfer_from};

#[derive(Debug)]
struct VaultState {
    gate: AccessGate,
    ledger: Ledger,
}

/// The custody vault.
pub struct Vault {
    /// The vault's own address: recipient of pulls, sender of releases.
    address: Address,
    state: RwLock<VaultState>,
    lock: ReentrancyLock,
    assets: Arc<AssetBook>,
    bank: Arc<dyn NativeBank>,
    events: Arc<dyn EventSink>,
}

impl Vault {
    /// Deploys a vault at `address`, owned by `owner`, with an empty
    /// allow-list, empty ban-list and empty ledger.
    pub fn new(
        address: Address,
        owner: Address,
        assets: Arc<AssetBook>,
        bank: Arc<dyn NativeBank>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        info!(vault = %address, owner = %owner, "vault deployed");
        Self {
            address,
            state: RwLock::new(VaultState {
                gate: AccessGate::new(owner),
                ledger: Ledger::new(),
            }),
            lock: ReentrancyLock::new(),
            assets,
            bank,
            events,
        }
    }

    // -----------------------------------------------------------------------
    // Administration
    // -----------------------------------------------------------------------

    /// Sets the allow-list entry for `asset`. Owner only.
    pub fn set_allowed(
        &self,
        caller: Address,
        asset: AssetId,
        allowed: bool,
    ) -> Result<(), VaultError> {
        {
            let mut state = self.state.write();
            state
                .gate
                .authorize_admin(&caller)
                .map_err(|e| rejected("set_allowed", &caller, e))?;
            state.gate.registry.set_allowed(asset, allowed);
        }
        info!(asset = %asset, allowed, "allow-list updated");
        self.events
            .emit(VaultEvent::AllowListUpdated { asset, allowed });
        Ok(())
    }

    /// Sets the ban status of every address in `addresses`. Owner only.
    ///
    /// Emits one event for the whole batch, listing each address once.
    pub fn set_banned(
        &self,
        caller: Address,
        addresses: &[Address],
        banned: bool,
    ) -> Result<(), VaultError> {
        let applied = {
            let mut state = self.state.write();
            state
                .gate
                .authorize_admin(&caller)
                .map_err(|e| rejected("set_banned", &caller, e))?;
            state.gate.bans.apply(addresses, banned)
        };
        info!(count = applied.len(), banned, "ban-list updated");
        self.events.emit(VaultEvent::BanListUpdated {
            addresses: applied,
            banned,
        });
        Ok(())
    }

    /// Hands ownership to `new_owner`. Owner only.
    pub fn transfer_ownership(&self, caller: Address, new_owner: Address) -> Result<(), VaultError> {
        let previous_owner = self
            .state
            .write()
            .gate
            .ownership
            .transfer(&caller, new_owner)
            .map_err(|e| rejected("transfer_ownership", &caller, e))?;
        info!(new_owner = %new_owner, "ownership transferred");
        self.events.emit(VaultEvent::OwnershipTransferred {
            previous_owner,
            new_owner: Some(new_owner),
        });
        Ok(())
    }

    /// Gives up ownership. Afterwards no administrative call succeeds.
    pub fn renounce_ownership(&self, caller: Address) -> Result<(), VaultError> {
        let previous_owner = self
            .state
            .write()
            .gate
            .ownership
            .renounce(&caller)
            .map_err(|e| rejected("renounce_ownership", &caller, e))?;
        info!("ownership renounced");
        self.events.emit(VaultEvent::OwnershipTransferred {
            previous_owner,
            new_owner: None,
        });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Deposits
    // -----------------------------------------------------------------------

    /// Pulls `amount` of a standard asset from `caller` and credits it.
    ///
    /// `caller` must have granted the vault an allowance on the asset.
    /// Zero is accepted: it pulls zero and credits zero.
    pub fn deposit(&self, caller: Address, asset: AssetId, amount: Amount) -> Result<(), VaultError> {
        self.deposit_standard(caller, asset, amount)
            .map_err(|e| rejected("deposit", &caller, e))?;
        self.emit_deposit(caller, asset, amount);
        Ok(())
    }

    fn deposit_standard(
        &self,
        caller: Address,
        asset: AssetId,
        amount: Amount,
    ) -> Result<(), VaultError> {
        let _guard = self.lock.enter()?;
        self.check_deposit(&caller, &asset, amount)?;

        safe_transfer_from(
            &self.assets,
            asset,
            self.address,
            caller,
            self.address,
            amount,
        )
        .map_err(VaultError::AssetPullFailed)?;

        self.state.write().ledger.credit(caller, asset, amount)?;
        Ok(())
    }

    /// Credits native `value` attached to the call.
    ///
    /// The host moves the value into the vault's native account before
    /// invoking this, and moves it back if this returns an error. See
    /// [`crate::host::Host::deposit_native`]. The credit is refused unless
    /// the vault's native holdings cover everything the ledger would then
    /// owe.
    pub fn deposit_native(&self, caller: Address, value: Amount) -> Result<(), VaultError> {
        self.credit_native(caller, value)
            .map_err(|e| rejected("deposit_native", &caller, e))?;
        self.emit_deposit(caller, AssetId::NATIVE, value);
        Ok(())
    }

    fn credit_native(&self, caller: Address, value: Amount) -> Result<(), VaultError> {
        let _guard = self.lock.enter()?;
        let mut state = self.state.write();
        state.gate.authorize_ledger(&caller, &AssetId::NATIVE)?;
        let (_, required) = state.ledger.check_credit(&caller, &AssetId::NATIVE, value)?;
        let held = self.bank.balance_of(self.address);
        if held < required {
            return Err(VaultError::UnfundedNativeDeposit { held, required });
        }

        state.ledger.credit(caller, AssetId::NATIVE, value)?;
        Ok(())
    }

    fn check_deposit(&self, caller: &Address, asset: &AssetId, amount: Amount) -> Result<(), VaultError> {
        let state = self.state.read();
        state.gate.authorize_standard(caller, asset)?;
        state.ledger.check_credit(caller, asset, amount)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Withdrawals
    // -----------------------------------------------------------------------

    /// Debits `amount` of a standard asset and releases it to `caller`.
    pub fn withdraw(&self, caller: Address, asset: AssetId, amount: Amount) -> Result<(), VaultError> {
        self.debit_and_release(caller, asset, amount, AccessGate::authorize_standard)
            .map_err(|e| rejected("withdraw", &caller, e))?;
        self.emit_withdraw(caller, asset, amount);
        Ok(())
    }

    /// Debits `amount` of the native asset and sends it to `caller`.
    pub fn withdraw_native(&self, caller: Address, amount: Amount) -> Result<(), VaultError> {
        self.debit_and_release(caller, AssetId::NATIVE, amount, AccessGate::authorize_ledger)
            .map_err(|e| rejected("withdraw_native", &caller, e))?;
        self.emit_withdraw(caller, AssetId::NATIVE, amount);
        Ok(())
    }

    fn debit_and_release(
        &self,
        caller: Address,
        asset: AssetId,
        amount: Amount,
        authorize: fn(&AccessGate, &Address, &AssetId) -> Result<(), VaultError>,
    ) -> Result<(), VaultError> {
        let _guard = self.lock.enter()?;
        {
            let mut state = self.state.write();
            authorize(&state.gate, &caller, &asset)?;
            state.ledger.debit(caller, asset, amount)?;
        }

        if let Err(reason) = self.release(caller, asset, amount) {
            self.state.write().ledger.credit(caller, asset, amount)?;
            return Err(VaultError::AssetReleaseFailed { asset, reason });
        }
        Ok(())
    }

    fn release(&self, to: Address, asset: AssetId, amount: Amount) -> Result<(), String> {
        if asset.is_native() {
            self.bank
                .send(self.address, to, amount)
                .map_err(|e| e.to_string())
        } else {
            safe_transfer(&self.assets, asset, self.address, to, amount).map_err(|e| e.to_string())
        }
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// The vault's own address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Current owner; `None` once renounced.
    pub fn owner(&self) -> Option<Address> {
        self.state.read().gate.ownership().owner()
    }

    pub fn is_allowed(&self, asset: &AssetId) -> bool {
        self.state.read().gate.registry().is_allowed(asset)
    }

    pub fn is_banned(&self, address: &Address) -> bool {
        self.state.read().gate.bans().is_banned(address)
    }

    pub fn balance_of(&self, depositor: &Address, asset: &AssetId) -> Amount {
        self.state.read().ledger.balance_of(depositor, asset)
    }

    pub fn total_of(&self, asset: &AssetId) -> Amount {
        self.state.read().ledger.total_of(asset)
    }

    /// All currently allow-listed assets.
    pub fn allowed_assets(&self) -> Vec<AssetId> {
        self.state.read().gate.registry().allowed_assets()
    }

    /// Non-zero positions of `depositor`.
    pub fn positions_of(&self, depositor: &Address) -> Vec<(AssetId, Amount)> {
        self.state.read().ledger.positions_of(depositor)
    }

    /// Assets the vault currently holds on behalf of depositors.
    pub fn held_assets(&self) -> Vec<AssetId> {
        self.state.read().ledger.assets()
    }

    /// Number of addresses currently banned.
    pub fn banned_count(&self) -> usize {
        self.state.read().gate.bans().banned_count()
    }

    /// Audits `total_of(asset) == Σ balance_of(_, asset)`.
    pub fn is_conserved(&self, asset: &AssetId) -> bool {
        self.state.read().ledger.is_conserved(asset)
    }

    /// `true` while a deposit or withdrawal is in flight.
    pub fn is_busy(&self) -> bool {
        self.lock.is_entered()
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    fn emit_deposit(&self, depositor: Address, asset: AssetId, amount: Amount) {
        info!(depositor = %depositor, asset = %asset, amount, "deposit credited");
        self.events.emit(VaultEvent::Deposited {
            depositor,
            asset,
            amount,
            timestamp: Utc::now(),
        });
    }

    fn emit_withdraw(&self, depositor: Address, asset: AssetId, amount: Amount) {
        info!(depositor = %depositor, asset = %asset, amount, "withdrawal released");
        self.events.emit(VaultEvent::Withdrawn {
            depositor,
            asset,
            amount,
            timestamp: Utc::now(),
        });
    }
}

impl fmt::Debug for Vault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vault")
            .field("address", &self.address)
            .field("owner", &self.owner())
            .field("busy", &self.is_busy())
            .finish()
    }
}

/// Logs a rejected call and hands the error back.
fn rejected(op: &'static str, caller: &Address, err: VaultError) -> VaultError {
    match &err {
        VaultError::AssetPullFailed(_)
        | VaultError::AssetReleaseFailed { .. }
        | VaultError::UnfundedNativeDeposit { .. }
        | VaultError::Reentrancy => {
            warn!(op, caller = %caller, code = err.code(), error = %err, "call rejected");
        }
        _ => debug!(op, caller = %caller, code = err.code(), error = %err, "call rejected"),
    }
    err
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::InMemoryBank;
    use crate::token::{ReturnConvention, Token};
    use custody_protocol::EventLog;

    struct Fixture {
        vault: Vault,
        token: Arc<Token>,
        bank: Arc<InMemoryBank>,
        log: Arc<EventLog>,
        owner: Address,
    }

    fn fixture() -> Fixture {
        let owner = Address::derive("owner");
        let book = Arc::new(AssetBook::new());
        let token = Arc::new(Token::new("T", "T", 0, owner, ReturnConvention::Standard));
        book.bind(token.id(), token.clone());
        let bank = Arc::new(InMemoryBank::new());
        let log = Arc::new(EventLog::default());
        let vault = Vault::new(
            Address::derive("vault"),
            owner,
            book,
            bank.clone(),
            log.clone(),
        );
        Fixture {
            vault,
            token,
            bank,
            log,
            owner,
        }
    }

    #[test]
    fn deposit_then_withdraw_moves_tokens() {
        let f = fixture();
        let d = Address::derive("d");
        let t = f.token.id();
        f.token.mint(f.owner, d, 1_000).unwrap();
        f.token.approve(d, f.vault.address(), 1_000);
        f.vault.set_allowed(f.owner, t, true).unwrap();

        f.vault.deposit(d, t, 600).unwrap();
        assert_eq!(f.token.balance_of(d), 400);
        assert_eq!(f.token.balance_of(f.vault.address()), 600);

        f.vault.withdraw(d, t, 600).unwrap();
        assert_eq!(f.token.balance_of(d), 1_000);
        assert_eq!(f.vault.balance_of(&d, &t), 0);
        assert_eq!(f.log.len(), 3);
    }

    #[test]
    fn native_asset_rejected_on_standard_entry_points() {
        let f = fixture();
        let d = Address::derive("d");
        f.vault.set_allowed(f.owner, AssetId::NATIVE, true).unwrap();
        assert_eq!(
            f.vault.deposit(d, AssetId::NATIVE, 1).unwrap_err(),
            VaultError::NativeAssetMisuse
        );
        assert_eq!(
            f.vault.withdraw(d, AssetId::NATIVE, 1).unwrap_err(),
            VaultError::NativeAssetMisuse
        );
    }

    #[test]
    fn native_withdraw_sends_from_vault_account() {
        let f = fixture();
        let d = Address::derive("d");
        f.vault.set_allowed(f.owner, AssetId::NATIVE, true).unwrap();
        f.bank.mint(f.vault.address(), 500).unwrap();

        f.vault.deposit_native(d, 500).unwrap();
        f.vault.withdraw_native(d, 200).unwrap();

        assert_eq!(f.bank.balance_of(d), 200);
        assert_eq!(f.bank.balance_of(f.vault.address()), 300);
        assert_eq!(f.vault.balance_of(&d, &AssetId::NATIVE), 300);
    }

    #[test]
    fn native_credit_requires_holdings() {
        let f = fixture();
        let d = Address::derive("d");
        f.vault.set_allowed(f.owner, AssetId::NATIVE, true).unwrap();
        f.bank.mint(f.vault.address(), 300).unwrap();

        assert_eq!(
            f.vault.deposit_native(d, 301).unwrap_err(),
            VaultError::UnfundedNativeDeposit {
                held: 300,
                required: 301,
            }
        );
        f.vault.deposit_native(d, 300).unwrap();
        assert!(f.vault.deposit_native(d, 1).is_err());
        assert_eq!(f.vault.total_of(&AssetId::NATIVE), 300);
        assert!(!f.vault.is_busy());
    }

    #[test]
    fn admin_event_not_emitted_on_rejection() {
        let f = fixture();
        let mallory = Address::derive("mallory");
        assert!(f.vault.set_allowed(mallory, AssetId::NATIVE, true).is_err());
        assert!(f.log.is_empty());
        assert!(!f.vault.is_allowed(&AssetId::NATIVE));
    }

    #[test]
    fn lock_released_after_failed_call() {
        let f = fixture();
        let d = Address::derive("d");
        assert!(f.vault.deposit(d, f.token.id(), 1).is_err());
        assert!(!f.vault.is_busy());
    }
}
