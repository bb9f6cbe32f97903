//! # Asset Interface
//!
//! The vault treats every standard asset as an untrusted black box reached
//! through the [`Asset`] trait. Implementations may be well-behaved, may
//! omit the conventional boolean result, may lie about it, or may call
//! back into the vault while the vault is waiting on them.
//!
//! The [`AssetBook`] plays the role of "code deployed at an address": it
//! maps an [`AssetId`] to the implementation that answers calls for it.

use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;

use custody_protocol::{Address, Amount, AssetId};

/// What came back from a call into an asset's transfer entry points.
///
/// Three cases, kept distinct on purpose. Collapsing them into a `bool`
/// loses the difference between "said nothing" (fine) and "said false"
/// (not fine). See [`crate::safe_transfer::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// The call did not complete.
    Reverted(String),
    /// The call completed and returned no data.
    NoData,
    /// The call completed and returned a boolean.
    Returned(bool),
}

impl TransferOutcome {
    /// Shorthand for the outcome of a conforming successful call.
    pub fn ok() -> Self {
        TransferOutcome::Returned(true)
    }

    /// Shorthand for a reverted call.
    pub fn revert(reason: impl Into<String>) -> Self {
        TransferOutcome::Reverted(reason.into())
    }
}

impl fmt::Display for TransferOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferOutcome::Reverted(reason) => write!(f, "reverted: {}", reason),
            TransferOutcome::NoData => write!(f, "returned no data"),
            TransferOutcome::Returned(b) => write!(f, "returned {}", b),
        }
    }
}

/// A fungible asset contract.
///
/// `caller` is the address making the call (for the vault, its own
/// address). Implementations must not assume anything about the caller
/// beyond what their own accounting checks.
pub trait Asset: Send + Sync {
    /// Moves `amount` from `caller` to `to`.
    fn transfer(&self, caller: Address, to: Address, amount: Amount) -> TransferOutcome;

    /// Moves `amount` from `from` to `to`, spending the allowance `from`
    /// granted to `caller`.
    fn transfer_from(
        &self,
        caller: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> TransferOutcome;
}

/// Registry of asset implementations keyed by asset id.
///
/// Binding an implementation does not make the asset usable in the vault;
/// that is the allow-list's job. An id with no binding behaves like an
/// address with no code: every call to it reverts.
#[derive(Default)]
pub struct AssetBook {
    assets: DashMap<AssetId, Arc<dyn Asset>>,
}

impl AssetBook {
    /// Creates an empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `asset` as the implementation for `id`, replacing any previous
    /// binding. Returns the previous implementation, if any.
    pub fn bind(&self, id: AssetId, asset: Arc<dyn Asset>) -> Option<Arc<dyn Asset>> {
        self.assets.insert(id, asset)
    }

    /// Returns the implementation bound to `id`.
    ///
    /// The returned `Arc` is cloned out of the map so no map shard lock is
    /// held while the caller talks to the asset.
    pub fn get(&self, id: &AssetId) -> Option<Arc<dyn Asset>> {
        self.assets.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Number of bound assets.
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Returns `true` if nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

impl fmt::Debug for AssetBook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetBook")
            .field("assets", &self.assets.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Silent;

    impl Asset for Silent {
        fn transfer(&self, _: Address, _: Address, _: Amount) -> TransferOutcome {
            TransferOutcome::NoData
        }

        fn transfer_from(&self, _: Address, _: Address, _: Address, _: Amount) -> TransferOutcome {
            TransferOutcome::NoData
        }
    }

    #[test]
    fn bind_then_get() {
        let book = AssetBook::new();
        let id = AssetId::new(Address::derive("silent"));
        assert!(book.get(&id).is_none());

        assert!(book.is_empty());
        assert!(book.bind(id, Arc::new(Silent)).is_none());
        assert_eq!(book.len(), 1);

        let asset = book.get(&id).unwrap();
        assert_eq!(
            asset.transfer(Address::ZERO, Address::ZERO, 1),
            TransferOutcome::NoData
        );
    }

    #[test]
    fn rebinding_returns_previous() {
        let book = AssetBook::new();
        let id = AssetId::new(Address::derive("silent"));
        book.bind(id, Arc::new(Silent));
        assert!(book.bind(id, Arc::new(Silent)).is_some());
        assert_eq!(book.len(), 1);
    }
}
