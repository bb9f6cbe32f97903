//! # Event Hub
//!
//! The node's [`EventSink`]. Every vault event is appended to the bounded
//! in-memory log served at `GET /events`, counted in the metrics, and
//! broadcast to live WebSocket subscribers.

use tokio::sync::broadcast;

use custody_protocol::{EventLog, EventSink, VaultEvent};

use crate::metrics::SharedMetrics;

pub struct EventHub {
    log: EventLog,
    tx: broadcast::Sender<VaultEvent>,
    metrics: SharedMetrics,
}

impl EventHub {
    pub fn new(retention: usize, channel_capacity: usize, metrics: SharedMetrics) -> Self {
        let (tx, _) = broadcast::channel(channel_capacity);
        Self {
            log: EventLog::with_capacity(retention),
            tx,
            metrics,
        }
    }

    /// A new live subscription. Receives only events emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<VaultEvent> {
        self.tx.subscribe()
    }

    /// Retained events, oldest first.
    pub fn history(&self) -> Vec<VaultEvent> {
        self.log.snapshot()
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }
}

impl EventSink for EventHub {
    fn emit(&self, event: VaultEvent) {
        self.metrics.observe_event(&event);
        // No subscribers is not an error.
        let _ = self.tx.send(event.clone());
        self.log.emit(event);
    }
}
