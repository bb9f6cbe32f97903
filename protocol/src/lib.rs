// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Custody Protocol: Shared Primitives
//!
//! The vocabulary every other crate in the workspace speaks: who holds value
//! ([`Address`]), what value it is ([`AssetId`], [`Amount`]), and what the
//! vault tells the outside world when it changes ([`VaultEvent`]).
//!
//! ## Modules
//!
//! - **address**: 20-byte addresses with hex wire format and label derivation.
//! - **asset**: asset identifiers, including the native-asset sentinel.
//! - **event**: vault notifications and the sink they flow into.
//! - **config**: protocol constants and node defaults.
//!
//! Nothing in here moves money. That is the job of `custody-contracts`.

pub mod address;
pub mod asset;
pub mod config;
pub mod event;

pub use address::{Address, AddressError};
pub use asset::{Amount, AssetId};
pub use event::{EventLog, EventSink, VaultEvent};
