//! # Asset Registry
//!
//! The owner-curated allow-list. An asset with no entry is disallowed;
//! only the current boolean matters, there is no history.

use std::collections::HashMap;

use custody_protocol::AssetId;

/// Allow-list of assets permitted to participate in the ledger.
#[derive(Debug, Clone, Default)]
pub struct AssetRegistry {
    entries: HashMap<AssetId, bool>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the entry for `asset` to exactly `allowed`. Idempotent.
    /// Returns the previous status.
    pub fn set_allowed(&mut self, asset: AssetId, allowed: bool) -> bool {
        self.entries.insert(asset, allowed).unwrap_or(false)
    }

    /// Current status; `false` when there is no entry.
    pub fn is_allowed(&self, asset: &AssetId) -> bool {
        self.entries.get(asset).copied().unwrap_or(false)
    }

    /// All assets whose entry is currently `true`.
    pub fn allowed_assets(&self) -> Vec<AssetId> {
        let mut assets: Vec<AssetId> = self
            .entries
            .iter()
            .filter(|(_, allowed)| **allowed)
            .map(|(asset, _)| *asset)
            .collect();
        assets.sort();
        assets
    }
}
