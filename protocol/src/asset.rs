//! # Asset Identifiers
//!
//! Every asset the vault can custody is named by an [`AssetId`]. For
//! standard assets the id is the address of the asset contract. The native
//! asset is not a contract at all (it moves by direct value transfer), so
//! it gets a reserved sentinel: the zero address, rendered as `native`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::address::{Address, AddressError};
use crate::config::NATIVE_ASSET_LABEL;

/// Amounts are unsigned, in the asset's smallest unit. The protocol never
/// divides and never wraps: every addition and subtraction is checked.
pub type Amount = u128;

/// Identifier of an asset held by the vault.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(Address);

impl AssetId {
    /// The native asset sentinel.
    pub const NATIVE: AssetId = AssetId(Address::ZERO);

    /// Names a standard asset by its contract address.
    pub const fn new(contract: Address) -> Self {
        Self(contract)
    }

    /// Returns the underlying address.
    pub fn address(&self) -> Address {
        self.0
    }

    /// Returns `true` if this is [`AssetId::NATIVE`].
    pub fn is_native(&self) -> bool {
        *self == Self::NATIVE
    }

    /// Parses either the literal `native` or a hex contract address.
    pub fn parse(s: &str) -> Result<Self, AddressError> {
        if s.eq_ignore_ascii_case(NATIVE_ASSET_LABEL) {
            return Ok(Self::NATIVE);
        }
        Address::from_hex(s).map(Self)
    }
}

impl From<Address> for AssetId {
    fn from(addr: Address) -> Self {
        Self(addr)
    }
}

impl fmt::Debug for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_native() {
            write!(f, "AssetId(native)")
        } else {
            write!(f, "AssetId({}...)", &self.0.to_hex()[..10])
        }
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_native() {
            write!(f, "{}", NATIVE_ASSET_LABEL)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl std::str::FromStr for AssetId {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for AssetId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for AssetId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        AssetId::parse(&s).map_err(serde::de::Error::custom)
    }
}
