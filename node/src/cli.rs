//! # CLI Interface
//!
//! Defines the command-line argument structure for `custody-node` using
//! `clap` derive. Supports three subcommands: `run`, `init` and `version`.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use custody_protocol::config::{DEFAULT_API_PORT, DEFAULT_METRICS_PORT};

/// Custody vault node.
///
/// Deploys a custody vault and its reference assets from a JSON
/// configuration, then serves the vault over HTTP/WebSocket and exposes
/// Prometheus metrics.
#[derive(Parser, Debug)]
#[command(
    name = "custody-node",
    about = "Custody vault node",
    version,
    propagate_version = true
)]
pub struct CustodyNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the custody node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the node.
    Run(RunArgs),
    /// Initialize a data directory with a devnet configuration.
    Init(InitArgs),
    /// Print version information and exit.
    Version,
}

/// Log output format.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormatArg {
    /// Human-readable output for local development.
    Pretty,
    /// JSON lines for log aggregation.
    Json,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the vault configuration file (JSON).
    ///
    /// When omitted, the node looks for `custody.json` in the data
    /// directory and falls back to the built-in devnet configuration.
    #[arg(long, short = 'c', env = "CUSTODY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path to the node data directory.
    #[arg(long, short = 'd', env = "CUSTODY_DATA_DIR", default_value = ".custody")]
    pub data_dir: PathBuf,

    /// Port for the HTTP/WebSocket API.
    #[arg(long, env = "CUSTODY_API_PORT", default_value_t = DEFAULT_API_PORT)]
    pub api_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "CUSTODY_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Log output format.
    #[arg(long, env = "CUSTODY_LOG_FORMAT", value_enum, default_value_t = LogFormatArg::Pretty)]
    pub log_format: LogFormatArg,
}

/// Arguments for the `init` subcommand.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Path to the data directory to initialize.
    #[arg(long, short = 'd', env = "CUSTODY_DATA_DIR", default_value = ".custody")]
    pub data_dir: PathBuf,

    /// Overwrite an existing configuration file.
    #[arg(long)]
    pub force: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        // Ensures the derive macros produce a valid CLI definition.
        CustodyNodeCli::command().debug_assert();
    }

    #[test]
    fn run_defaults() {
        let cli = CustodyNodeCli::parse_from(["custody-node", "run"]);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.api_port, DEFAULT_API_PORT);
        assert_eq!(args.metrics_port, DEFAULT_METRICS_PORT);
        assert_eq!(args.log_format, LogFormatArg::Pretty);
        assert!(args.config.is_none());
    }

    #[test]
    fn run_accepts_json_logs() {
        let cli = CustodyNodeCli::parse_from(["custody-node", "run", "--log-format", "json"]);
        assert!(matches!(
            cli.command,
            Commands::Run(RunArgs {
                log_format: LogFormatArg::Json,
                ..
            })
        ));
    }
}
