//! # Ban List
//!
//! Owner-curated set of addresses barred from every ledger-mutating
//! operation. Same shape as the allow-list, keyed by depositor address.

use std::collections::{HashMap, HashSet};

use custody_protocol::Address;

#[derive(Debug, Clone, Default)]
pub struct BanList {
    entries: HashMap<Address, bool>,
}

impl BanList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `banned` to every address in `addresses`.
    ///
    /// Duplicates are applied once. Returns the distinct addresses in
    /// first-occurrence order, which is what the batch event reports.
    pub fn apply(&mut self, addresses: &[Address], banned: bool) -> Vec<Address> {
        let mut seen = HashSet::with_capacity(addresses.len());
        let mut distinct = Vec::with_capacity(addresses.len());
        for addr in addresses {
            if seen.insert(*addr) {
                self.entries.insert(*addr, banned);
                distinct.push(*addr);
            }
        }
        distinct
    }

    /// Current status; `false` when there is no entry.
    pub fn is_banned(&self, address: &Address) -> bool {
        self.entries.get(address).copied().unwrap_or(false)
    }

    /// Number of addresses currently banned.
    pub fn banned_count(&self) -> usize {
        self.entries.values().filter(|b| **b).count()
    }
}
