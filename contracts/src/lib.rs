//! # Custody Contracts
//!
//! The custody vault and everything it needs to move value safely:
//!
//! - **Vault**: deposit/withdraw entry points for standard and native assets.
//! - **Ledger**: per-depositor, per-asset balances and per-asset totals.
//! - **Access Gate**: owner-only administration, ban-list, asset allow-list.
//! - **Safe Transfer**: asset calls that tolerate missing or lying return values.
//! - **Reentrancy Lock**: one mutating call in flight at a time.
//! - **Host**: serialized top-level calls and native value attachment.
//!
//! ## Design Principles
//!
//! 1. All monetary arithmetic is checked. Wrapping arithmetic and money do
//!    not mix.
//! 2. Checks, then effects, then interactions. State is never locked while
//!    untrusted code runs.
//! 3. Every failure aborts with zero state change and zero events.
//! 4. Asset implementations are untrusted. They are reached only through
//!    the [`asset::Asset`] trait and their results are resolved by
//!    [`safe_transfer::resolve`].

pub mod access;
pub mod asset;
pub mod bans;
pub mod error;
pub mod guard;
pub mod host;
pub mod ledger;
pub mod native;
pub mod registry;
pub mod safe_transfer;
pub mod token;
pub mod vault;

pub use asset::{Asset, AssetBook, TransferOutcome};
pub use error::VaultError;
pub use host::{Host, HostError};
pub use native::{InMemoryBank, NativeBank, NativeReceiver};
pub use token::{ReturnConvention, Token};
pub use vault::Vault;
