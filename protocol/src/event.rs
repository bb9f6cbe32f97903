//! # Vault Events
//!
//! Observable notifications emitted by the vault. Each successful mutating
//! call emits exactly one event; failed calls emit nothing. Consumers
//! (the node's WebSocket stream, the in-memory log, tests) receive them
//! through the [`EventSink`] trait.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::address::Address;
use crate::asset::{Amount, AssetId};

/// A notification describing one committed state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VaultEvent {
    /// An asset's allow-list entry was set.
    AllowListUpdated { asset: AssetId, allowed: bool },

    /// A batch of addresses had their ban status set.
    BanListUpdated {
        addresses: Vec<Address>,
        banned: bool,
    },

    /// Funds were received from a depositor and credited.
    Deposited {
        depositor: Address,
        asset: AssetId,
        amount: Amount,
        timestamp: DateTime<Utc>,
    },

    /// Funds were debited and released back to a depositor.
    Withdrawn {
        depositor: Address,
        asset: AssetId,
        amount: Amount,
        timestamp: DateTime<Utc>,
    },

    /// The owner changed. `new_owner` is `None` after a renounce.
    OwnershipTransferred {
        previous_owner: Option<Address>,
        new_owner: Option<Address>,
    },
}

impl VaultEvent {
    /// Short machine-friendly name, used as a metrics label and log field.
    pub fn kind(&self) -> &'static str {
        match self {
            VaultEvent::AllowListUpdated { .. } => "allow_list_updated",
            VaultEvent::BanListUpdated { .. } => "ban_list_updated",
            VaultEvent::Deposited { .. } => "deposited",
            VaultEvent::Withdrawn { .. } => "withdrawn",
            VaultEvent::OwnershipTransferred { .. } => "ownership_transferred",
        }
    }
}

/// Receives events from the vault.
///
/// Called after the state change is committed and outside any vault lock,
/// so implementations may read vault state.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: VaultEvent);
}

/// An in-memory, bounded, ordered event log.
///
/// When `capacity` is reached the oldest event is dropped.
#[derive(Debug)]
pub struct EventLog {
    events: Mutex<VecDeque<VaultEvent>>,
    capacity: usize,
}

impl EventLog {
    /// Creates a log that retains at most `capacity` events.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity: capacity.max(1),
        }
    }

    /// Returns a copy of all retained events, oldest first.
    pub fn snapshot(&self) -> Vec<VaultEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Number of retained events.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Returns `true` if no events are retained.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Returns the most recent event, if any.
    pub fn last(&self) -> Option<VaultEvent> {
        self.events.lock().back().cloned()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::with_capacity(crate::config::EVENT_RETENTION)
    }
}

impl EventSink for EventLog {
    fn emit(&self, event: VaultEvent) {
        tracing::trace!(kind = event.kind(), "event recorded");
        let mut events = self.events.lock();
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }
}
