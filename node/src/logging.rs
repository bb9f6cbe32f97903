//! # Structured Logging
//!
//! One global `tracing` subscriber for the node: an `EnvFilter` in front of
//! a single output layer, pretty or JSON lines, chosen by `--log-format`.
//!
//! Output goes to stderr. Stdout belongs to `init` and `version`.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::cli::LogFormatArg;

/// Filter used by `run` when `RUST_LOG` is unset.
pub const RUN_DIRECTIVES: &str = "custody_node=info,custody_contracts=info,tower_http=debug";

/// Filter used by the short-lived subcommands when `RUST_LOG` is unset.
pub const INIT_DIRECTIVES: &str = "custody_node=info";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    /// One JSON object per line, event fields flattened to the top level.
    Json,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
        }
    }
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

/// `RUST_LOG` when set and parseable, else `directives`.
fn env_filter(directives: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives))
}

/// Installs the global subscriber. Panics if one is already installed, so
/// call it once per process.
///
/// ```text
/// RUST_LOG=custody_contracts=debug custody-node run --log-format json
/// ```
pub fn init_logging(directives: &str, format: LogFormat) {
    let output = match format {
        LogFormat::Pretty => fmt::layer()
            .with_writer(std::io::stderr)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .flatten_event(true)
            .with_current_span(false)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter(directives))
        .with(output)
        .init();

    tracing::info!(format = format.as_str(), "logging initialized");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_format_maps_to_log_format() {
        assert_eq!(LogFormat::from(LogFormatArg::Json), LogFormat::Json);
        assert_eq!(LogFormat::from(LogFormatArg::Pretty), LogFormat::Pretty);
        assert_eq!(LogFormat::Json.as_str(), "json");
    }

    #[test]
    fn default_directives_parse() {
        for directives in [RUN_DIRECTIVES, INIT_DIRECTIVES] {
            assert!(directives.parse::<EnvFilter>().is_ok(), "{directives}");
        }
    }
}
