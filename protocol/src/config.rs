//! # Protocol Configuration & Constants
//!
//! Every magic number in the custody system lives here. If you're
//! hardcoding a constant somewhere else, move it here first.

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// Protocol fingerprint reported by nodes in their status payload.
pub const PROTOCOL_FINGERPRINT: &str = "ALAS-CUSTODY-2026";

/// Major version. Bump on changes to ledger semantics or event shapes.
pub const PROTOCOL_VERSION_MAJOR: u16 = 0;

/// Minor version. Bump on backward-compatible additions.
pub const PROTOCOL_VERSION_MINOR: u16 = 1;

/// Patch version. Bump on bug fixes.
pub const PROTOCOL_VERSION_PATCH: u16 = 0;

/// The full version string.
pub const PROTOCOL_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// Addresses & Assets
// ---------------------------------------------------------------------------

/// Address length in bytes.
pub const ADDRESS_LENGTH: usize = 20;

/// Domain separator mixed into [`crate::Address::derive`]. Changing it
/// changes every derived address, so genesis files stop lining up.
pub const ADDRESS_DERIVATION_DOMAIN: &str = "custody/address/v1";

/// Textual name of the native asset sentinel.
pub const NATIVE_ASSET_LABEL: &str = "native";

/// Ticker of the native asset, for display only.
pub const NATIVE_SYMBOL: &str = "NVC";

/// Decimal places of the native asset. Display only: the ledger never
/// divides.
pub const NATIVE_DECIMALS: u8 = 18;

// ---------------------------------------------------------------------------
// Node Defaults
// ---------------------------------------------------------------------------

/// Default port for the HTTP API.
pub const DEFAULT_API_PORT: u16 = 9841;

/// Default port for the Prometheus metrics endpoint.
pub const DEFAULT_METRICS_PORT: u16 = 9842;

/// Broadcast channel capacity for live event streaming. Large enough to
/// absorb short bursts without dropping events for WebSocket clients.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Number of events the node keeps in memory for `GET /events`.
pub const EVENT_RETENTION: usize = 10_000;

/// Name of the configuration file written by `init` into the data dir.
pub const CONFIG_FILE_NAME: &str = "custody.json";
