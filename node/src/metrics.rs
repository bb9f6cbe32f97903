//! # Prometheus Metrics
//!
//! Operational metrics for the custody node, scraped at `/metrics` on the
//! metrics port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] so they
//! do not collide with any default global registry consumers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

use custody_protocol::VaultEvent;

/// Holds all Prometheus metric handles for the node.
#[derive(Clone)]
pub struct NodeMetrics {
    registry: Registry,
    /// Committed deposits, standard and native.
    pub deposits_total: IntCounter,
    /// Committed withdrawals, standard and native.
    pub withdrawals_total: IntCounter,
    /// Committed allow-list, ban-list and ownership changes.
    pub admin_updates_total: IntCounter,
    /// Rejected calls, by operation and error code.
    pub rejected_calls_total: IntCounterVec,
    /// Wall-clock time spent inside the vault per call.
    pub call_latency_seconds: Histogram,
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("custody".into()), None)
            .expect("failed to create prometheus registry");

        let deposits_total = IntCounter::new("deposits_total", "Total number of committed deposits")
            .expect("metric creation");
        registry
            .register(Box::new(deposits_total.clone()))
            .expect("metric registration");

        let withdrawals_total =
            IntCounter::new("withdrawals_total", "Total number of committed withdrawals")
                .expect("metric creation");
        registry
            .register(Box::new(withdrawals_total.clone()))
            .expect("metric registration");

        let admin_updates_total = IntCounter::new(
            "admin_updates_total",
            "Total number of committed allow-list, ban-list and ownership changes",
        )
        .expect("metric creation");
        registry
            .register(Box::new(admin_updates_total.clone()))
            .expect("metric registration");

        let rejected_calls_total = IntCounterVec::new(
            Opts::new("rejected_calls_total", "Total number of rejected vault calls"),
            &["op", "code"],
        )
        .expect("metric creation");
        registry
            .register(Box::new(rejected_calls_total.clone()))
            .expect("metric registration");

        let call_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "call_latency_seconds",
                "Time spent executing a vault call, in seconds",
            )
            .buckets(vec![
                0.000_01, 0.000_05, 0.000_1, 0.000_5, 0.001, 0.005, 0.01, 0.05, 0.1,
            ]),
        )
        .expect("metric creation");
        registry
            .register(Box::new(call_latency_seconds.clone()))
            .expect("metric registration");

        Self {
            registry,
            deposits_total,
            withdrawals_total,
            admin_updates_total,
            rejected_calls_total,
            call_latency_seconds,
        }
    }

    /// Counts a committed event.
    pub fn observe_event(&self, event: &VaultEvent) {
        match event {
            VaultEvent::Deposited { .. } => self.deposits_total.inc(),
            VaultEvent::Withdrawn { .. } => self.withdrawals_total.inc(),
            VaultEvent::AllowListUpdated { .. }
            | VaultEvent::BanListUpdated { .. }
            | VaultEvent::OwnershipTransferred { .. } => self.admin_updates_total.inc(),
        }
    }

    /// Counts a rejected call.
    pub fn observe_rejection(&self, op: &str, code: &str) {
        self.rejected_calls_total
            .with_label_values(&[op, code])
            .inc();
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<NodeMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use custody_protocol::{Address, AssetId};

    #[test]
    fn events_feed_counters() {
        let metrics = NodeMetrics::new();
        metrics.observe_event(&VaultEvent::AllowListUpdated {
            asset: AssetId::NATIVE,
            allowed: true,
        });
        metrics.observe_event(&VaultEvent::Deposited {
            depositor: Address::derive("d"),
            asset: AssetId::NATIVE,
            amount: 5,
            timestamp: chrono::Utc::now(),
        });
        metrics.observe_rejection("withdraw", "insufficient_balance");

        assert_eq!(metrics.admin_updates_total.get(), 1);
        assert_eq!(metrics.deposits_total.get(), 1);
        assert_eq!(metrics.withdrawals_total.get(), 0);

        let text = metrics.encode().unwrap();
        assert!(text.contains("custody_deposits_total 1"));
        assert!(text.contains("code=\"insufficient_balance\""));
    }
}
