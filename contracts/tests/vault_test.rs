//! Integration tests for the custody vault.
//!
//! These run the vault through its host against real reference tokens and
//! the in-memory native bank: deposit and withdrawal flows, the access
//! gate, and the ledger invariants after every call, failed or not.

use std::sync::Arc;

use custody_contracts::{
    AssetBook, Host, HostError, InMemoryBank, NativeBank, ReturnConvention, Token, Vault,
    VaultError,
};
use custody_protocol::{Address, AssetId, EventLog, VaultEvent};

struct World {
    host: Host,
    token: Arc<Token>,
    bank: Arc<InMemoryBank>,
    log: Arc<EventLog>,
    owner: Address,
}

impl World {
    fn new() -> Self {
        Self::with_convention(ReturnConvention::Standard)
    }

    fn with_convention(convention: ReturnConvention) -> Self {
        let owner = Address::derive("owner");
        let book = Arc::new(AssetBook::new());
        let token = Arc::new(Token::new("Tether", "T", 6, owner, convention));
        book.bind(token.id(), token.clone());

        let bank = Arc::new(InMemoryBank::new());
        let log = Arc::new(EventLog::default());
        let vault = Arc::new(Vault::new(
            Address::derive("vault"),
            owner,
            book,
            bank.clone(),
            log.clone(),
        ));
        Self {
            host: Host::new(vault, bank.clone()),
            token,
            bank,
            log,
            owner,
        }
    }

    fn vault(&self) -> &Vault {
        self.host.vault()
    }

    fn t(&self) -> AssetId {
        self.token.id()
    }

    /// Mints `amount` to `who` and approves the vault for all of it.
    fn fund(&self, who: Address, amount: u128) {
        self.token.mint(self.owner, who, amount).unwrap();
        let approved = self.token.allowance(who, self.vault().address()) + amount;
        self.token.approve(who, self.vault().address(), approved);
    }

    fn allow(&self, asset: AssetId) {
        self.host.set_allowed(self.owner, asset, true).unwrap();
    }

    /// Ledger view of `(balance(d), total)` for `asset`.
    fn position(&self, d: Address, asset: AssetId) -> (u128, u128) {
        (self.vault().balance_of(&d, &asset), self.vault().total_of(&asset))
    }

    fn assert_conserved(&self) {
        assert!(self.vault().is_conserved(&self.t()));
        assert!(self.vault().is_conserved(&AssetId::NATIVE));
        // The vault's real holdings always cover the ledger.
        assert!(self.token.balance_of(self.vault().address()) >= self.vault().total_of(&self.t()));
        assert!(
            self.bank.balance_of(self.vault().address())
                >= self.vault().total_of(&AssetId::NATIVE)
        );
    }
}

fn depositor() -> Address {
    Address::derive("depositor")
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn standard_asset_scenario() {
    let w = World::new();
    let d = depositor();
    w.allow(w.t());
    w.fund(d, 10_000);

    w.host.deposit(d, w.t(), 500).unwrap();
    assert_eq!(w.position(d, w.t()), (500, 500));

    w.host.deposit(d, w.t(), 2_000).unwrap();
    assert_eq!(w.position(d, w.t()), (2_500, 2_500));

    w.host.withdraw(d, w.t(), 200).unwrap();
    assert_eq!(w.position(d, w.t()), (2_300, 2_300));

    assert_eq!(w.token.balance_of(d), 10_000 - 2_300);
    assert_eq!(w.token.balance_of(w.vault().address()), 2_300);
    w.assert_conserved();
}

#[test]
fn native_asset_scenario() {
    let w = World::new();
    let d = depositor();
    w.allow(AssetId::NATIVE);
    w.bank.mint(d, 5_000).unwrap();

    w.host.deposit_native(d, 500).unwrap();
    assert_eq!(w.vault().balance_of(&d, &AssetId::NATIVE), 500);

    let err = w.host.withdraw_native(d, 1_000).unwrap_err();
    assert!(matches!(
        err,
        HostError::Vault(VaultError::InsufficientBalance {
            available: 500,
            requested: 1_000,
            ..
        })
    ));
    assert_eq!(w.vault().balance_of(&d, &AssetId::NATIVE), 500);
    assert_eq!(w.bank.balance_of(d), 4_500);
    w.assert_conserved();
}

#[test]
fn unfunded_native_credit_is_refused() {
    let w = World::new();
    let honest = depositor();
    let thief = Address::derive("thief");
    w.allow(AssetId::NATIVE);
    w.bank.mint(honest, 1_000).unwrap();
    w.host.deposit_native(honest, 1_000).unwrap();
    let events = w.log.len();

    // Straight to the vault, with nothing attached.
    let err = w
        .host
        .execute(|v| v.deposit_native(thief, 1_000))
        .unwrap_err();
    assert_eq!(
        err,
        HostError::Vault(VaultError::UnfundedNativeDeposit {
            held: 1_000,
            required: 2_000,
        })
    );
    assert_eq!(w.vault().balance_of(&thief, &AssetId::NATIVE), 0);
    assert_eq!(w.log.len(), events);
    assert!(w.host.withdraw_native(thief, 1_000).is_err());
    assert_eq!(w.bank.balance_of(thief), 0);

    w.host.withdraw_native(honest, 1_000).unwrap();
    assert_eq!(w.bank.balance_of(honest), 1_000);
    w.assert_conserved();
}

// ---------------------------------------------------------------------------
// Ledger properties
// ---------------------------------------------------------------------------

#[test]
fn sequential_deposits_accumulate() {
    let w = World::new();
    let d = depositor();
    let other = Address::derive("other");
    w.allow(w.t());
    w.fund(d, 1_000);
    w.fund(other, 1_000);

    w.host.deposit(other, w.t(), 77).unwrap();
    w.host.deposit(d, w.t(), 120).unwrap();
    w.host.deposit(d, w.t(), 380).unwrap();

    assert_eq!(w.vault().balance_of(&d, &w.t()), 500);
    assert_eq!(w.vault().total_of(&w.t()), 577);
    w.assert_conserved();
}

#[test]
fn round_trip_restores_ledger() {
    let w = World::new();
    let d = depositor();
    w.allow(w.t());
    w.fund(d, 1_000);
    w.host.deposit(d, w.t(), 100).unwrap();

    let before = w.position(d, w.t());
    w.host.deposit(d, w.t(), 650).unwrap();
    w.host.withdraw(d, w.t(), 650).unwrap();
    assert_eq!(w.position(d, w.t()), before);
    assert_eq!(w.token.balance_of(d), 900);
}

#[test]
fn overdraw_rejected_without_mutation() {
    let w = World::new();
    let d = depositor();
    w.allow(w.t());
    w.fund(d, 300);
    w.host.deposit(d, w.t(), 300).unwrap();
    let events = w.log.len();

    let err = w.host.withdraw(d, w.t(), 301).unwrap_err();
    assert_eq!(err.code(), "insufficient_balance");
    assert_eq!(w.position(d, w.t()), (300, 300));
    assert_eq!(w.log.len(), events);
    w.assert_conserved();
}

#[test]
fn zero_amounts_succeed_as_no_ops() {
    let w = World::new();
    let d = depositor();
    w.allow(w.t());
    w.allow(AssetId::NATIVE);

    w.host.deposit(d, w.t(), 0).unwrap();
    w.host.withdraw(d, w.t(), 0).unwrap();
    w.host.deposit_native(d, 0).unwrap();
    w.host.withdraw_native(d, 0).unwrap();

    assert_eq!(w.position(d, w.t()), (0, 0));
    assert_eq!(w.position(d, AssetId::NATIVE), (0, 0));
    // Each call still emits its event.
    let moves = w
        .log
        .snapshot()
        .into_iter()
        .filter(|e| matches!(e, VaultEvent::Deposited { .. } | VaultEvent::Withdrawn { .. }))
        .count();
    assert_eq!(moves, 4);
}

#[test]
fn deposit_without_allowance_is_a_pull_failure() {
    let w = World::new();
    let d = depositor();
    w.allow(w.t());
    w.token.mint(w.owner, d, 1_000).unwrap();

    let err = w.host.deposit(d, w.t(), 10).unwrap_err();
    assert_eq!(err.code(), "asset_pull_failed");
    assert_eq!(w.position(d, w.t()), (0, 0));
    assert_eq!(w.token.balance_of(d), 1_000);
}

#[test]
fn positions_list_non_zero_balances() {
    let w = World::new();
    let d = depositor();
    w.allow(w.t());
    w.allow(AssetId::NATIVE);
    w.fund(d, 40);
    w.bank.mint(d, 9).unwrap();

    w.host.deposit(d, w.t(), 40).unwrap();
    w.host.deposit_native(d, 9).unwrap();
    let positions = w.vault().positions_of(&d);
    assert_eq!(positions.len(), 2);
    assert!(positions.contains(&(AssetId::NATIVE, 9)));
    assert!(positions.contains(&(w.t(), 40)));

    w.host.withdraw_native(d, 9).unwrap();
    assert_eq!(w.vault().positions_of(&d), vec![(w.t(), 40)]);
}

// ---------------------------------------------------------------------------
// Access gate
// ---------------------------------------------------------------------------

#[test]
fn non_owner_cannot_administer() {
    let w = World::new();
    let mallory = Address::derive("mallory");

    let err = w.host.set_allowed(mallory, w.t(), true).unwrap_err();
    assert_eq!(err, HostError::Vault(VaultError::Unauthorized { caller: mallory }));
    let err = w.host.set_banned(mallory, &[depositor()], true).unwrap_err();
    assert_eq!(err.code(), "unauthorized");

    assert!(!w.vault().is_allowed(&w.t()));
    assert!(!w.vault().is_banned(&depositor()));
    assert!(w.log.is_empty());
}

#[test]
fn ban_blocks_until_lifted() {
    let w = World::new();
    let d = depositor();
    w.allow(w.t());
    w.fund(d, 1_000);
    w.host.deposit(d, w.t(), 400).unwrap();

    w.host.set_banned(w.owner, &[d], true).unwrap();
    assert_eq!(
        w.host.deposit(d, w.t(), 1).unwrap_err(),
        HostError::Vault(VaultError::Banned(d))
    );
    assert_eq!(
        w.host.withdraw(d, w.t(), 1).unwrap_err(),
        HostError::Vault(VaultError::Banned(d))
    );
    assert_eq!(w.position(d, w.t()), (400, 400));

    w.host.set_banned(w.owner, &[d], false).unwrap();
    w.host.withdraw(d, w.t(), 400).unwrap();
    assert_eq!(w.token.balance_of(d), 1_000);
}

#[test]
fn banned_native_depositor_keeps_value() {
    let w = World::new();
    let d = depositor();
    w.allow(AssetId::NATIVE);
    w.bank.mint(d, 100).unwrap();
    w.host.set_banned(w.owner, &[d], true).unwrap();

    assert!(w.host.deposit_native(d, 100).is_err());
    assert_eq!(w.bank.balance_of(d), 100);
    assert_eq!(w.bank.balance_of(w.vault().address()), 0);
}

#[test]
fn banned_caller_sees_ban_before_native_misuse() {
    let w = World::new();
    let d = depositor();
    w.allow(AssetId::NATIVE);
    w.host.set_banned(w.owner, &[d], true).unwrap();

    assert_eq!(
        w.host.deposit(d, AssetId::NATIVE, 1).unwrap_err(),
        HostError::Vault(VaultError::Banned(d))
    );
    assert_eq!(
        w.host.withdraw(d, AssetId::NATIVE, 1).unwrap_err(),
        HostError::Vault(VaultError::Banned(d))
    );

    w.host.set_banned(w.owner, &[d], false).unwrap();
    assert_eq!(
        w.host.deposit(d, AssetId::NATIVE, 1).unwrap_err(),
        HostError::Vault(VaultError::NativeAssetMisuse)
    );
}

#[test]
fn ban_batch_event_lists_each_address_once() {
    let w = World::new();
    let a = Address::derive("a");
    let b = Address::derive("b");

    w.host.set_banned(w.owner, &[a, b, a], true).unwrap();
    assert_eq!(
        w.log.last(),
        Some(VaultEvent::BanListUpdated {
            addresses: vec![a, b],
            banned: true,
        })
    );
    assert!(w.vault().is_banned(&a) && w.vault().is_banned(&b));
}

#[test]
fn disallowed_asset_rejected() {
    let w = World::new();
    let d = depositor();
    w.fund(d, 100);

    // Never listed.
    assert_eq!(
        w.host.deposit(d, w.t(), 1).unwrap_err(),
        HostError::Vault(VaultError::AssetNotAllowed(w.t()))
    );

    // Listed, funded, then delisted: the balance is stuck until relisted.
    w.allow(w.t());
    w.host.deposit(d, w.t(), 50).unwrap();
    w.host.set_allowed(w.owner, w.t(), false).unwrap();
    assert_eq!(w.host.withdraw(d, w.t(), 50).unwrap_err().code(), "asset_not_allowed");
    assert_eq!(w.position(d, w.t()), (50, 50));
}

#[test]
fn ownership_transfer_moves_admin_rights() {
    let w = World::new();
    let next = Address::derive("next-owner");

    w.host.transfer_ownership(w.owner, next).unwrap();
    assert_eq!(w.vault().owner(), Some(next));
    assert!(w.host.set_allowed(w.owner, w.t(), true).is_err());
    w.host.set_allowed(next, w.t(), true).unwrap();

    assert!(matches!(
        w.log.snapshot()[0],
        VaultEvent::OwnershipTransferred { new_owner: Some(n), .. } if n == next
    ));
}

#[test]
fn renounced_vault_has_no_admin() {
    let w = World::new();
    w.vault().renounce_ownership(w.owner).unwrap();
    assert_eq!(w.vault().owner(), None);
    assert_eq!(w.host.set_allowed(w.owner, w.t(), true).unwrap_err().code(), "unauthorized");
}

// ---------------------------------------------------------------------------
// Return conventions
// ---------------------------------------------------------------------------

#[test]
fn every_convention_round_trips() {
    for convention in [
        ReturnConvention::Standard,
        ReturnConvention::NoReturn,
        ReturnConvention::ReturnsFalse,
    ] {
        let w = World::with_convention(convention);
        let d = depositor();
        w.allow(w.t());
        w.fund(d, 1_000);

        w.host.deposit(d, w.t(), 700).unwrap();
        w.host.withdraw(d, w.t(), 300).unwrap();
        assert_eq!(w.position(d, w.t()), (400, 400), "{}", convention);
        assert_eq!(w.token.balance_of(d), 600, "{}", convention);
    }
}

#[test]
fn false_returning_token_cannot_fake_a_deposit() {
    let w = World::with_convention(ReturnConvention::ReturnsFalse);
    let d = depositor();
    w.allow(w.t());
    // Allowance but no balance: the token answers `false`.
    w.token.approve(d, w.vault().address(), 1_000);

    let err = w.host.deposit(d, w.t(), 1_000).unwrap_err();
    assert_eq!(err.code(), "asset_pull_failed");
    assert_eq!(w.position(d, w.t()), (0, 0));
    w.assert_conserved();
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[test]
fn concurrent_callers_are_serialized() {
    let w = Arc::new(World::new());
    w.allow(w.t());
    let depositors: Vec<Address> = (0..8).map(|i| Address::derive(&format!("d{}", i))).collect();
    for d in &depositors {
        w.fund(*d, 100);
    }

    let handles: Vec<_> = depositors
        .iter()
        .map(|d| {
            let w = Arc::clone(&w);
            let d = *d;
            std::thread::spawn(move || {
                for _ in 0..50 {
                    w.host.deposit(d, w.t(), 2).unwrap();
                    w.host.withdraw(d, w.t(), 1).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    for d in &depositors {
        assert_eq!(w.vault().balance_of(d, &w.t()), 50);
    }
    assert_eq!(w.vault().total_of(&w.t()), 400);
    w.assert_conserved();
}
