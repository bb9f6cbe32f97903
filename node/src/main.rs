// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Custody Vault Node
//!
//! Entry point for the `custody-node` binary. Parses CLI arguments,
//! initializes logging and metrics, deploys the vault described by the
//! configuration, and serves the HTTP/WS API.
//!
//! The binary supports three subcommands:
//!
//! - `run`    : deploy the vault and serve it
//! - `init`   : write a devnet configuration into a data directory
//! - `version`: print build version information

mod api;
mod cli;
mod config;
mod events;
mod genesis;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;

use custody_protocol::config::{CONFIG_FILE_NAME, EVENT_CHANNEL_CAPACITY, EVENT_RETENTION};

use cli::{Commands, CustodyNodeCli};
use config::NodeConfig;
use events::EventHub;
use logging::LogFormat;
use metrics::NodeMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = CustodyNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Init(args) => init_node(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Deploys the vault and serves the API and metrics endpoints until a
/// shutdown signal arrives.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(logging::RUN_DIRECTIVES, LogFormat::from(args.log_format));

    tracing::info!(
        api_port = args.api_port,
        metrics_port = args.metrics_port,
        data_dir = %args.data_dir.display(),
        "starting custody-node"
    );

    // --- Configuration ---
    let node_config = load_config(args.config, &args.data_dir)?;

    // --- Metrics & events ---
    let node_metrics = Arc::new(NodeMetrics::new());
    let hub = Arc::new(EventHub::new(
        EVENT_RETENTION,
        EVENT_CHANNEL_CAPACITY,
        Arc::clone(&node_metrics),
    ));

    // --- Genesis ---
    let deployment = genesis::deploy(&node_config, hub.clone()).context("genesis failed")?;
    tracing::info!(
        vault = %deployment.vault().address(),
        tokens = deployment.tokens.len(),
        network = %deployment.network,
        "vault deployed"
    );

    // --- Application state ---
    let app_state = api::AppState::new(
        format!(
            "{} (protocol {})",
            env!("CARGO_PKG_VERSION"),
            custody_protocol::config::PROTOCOL_VERSION,
        ),
        deployment,
        hub,
        Arc::clone(&node_metrics),
    );

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", args.api_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    tracing::info!("custody-node stopped");
    Ok(())
}

/// Picks the configuration: an explicit `--config`, else `custody.json` in
/// the data directory, else the built-in devnet.
fn load_config(explicit: Option<PathBuf>, data_dir: &std::path::Path) -> Result<NodeConfig> {
    if let Some(path) = explicit {
        tracing::info!(path = %path.display(), "loading config");
        return NodeConfig::load(&path);
    }
    let path = data_dir.join(CONFIG_FILE_NAME);
    if path.exists() {
        tracing::info!(path = %path.display(), "loading config");
        return NodeConfig::load(&path);
    }
    tracing::warn!(
        path = %path.display(),
        "no config file found, using built-in devnet configuration"
    );
    Ok(NodeConfig::devnet())
}

/// Writes the devnet configuration into a data directory.
fn init_node(args: cli::InitArgs) -> Result<()> {
    logging::init_logging(logging::INIT_DIRECTIVES, LogFormat::Pretty);

    let data_dir = &args.data_dir;
    tracing::info!(data_dir = %data_dir.display(), "initializing node");

    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;

    let path = data_dir.join(CONFIG_FILE_NAME);
    if path.exists() && !args.force {
        anyhow::bail!(
            "{} already exists (pass --force to overwrite)",
            path.display()
        );
    }

    let devnet = NodeConfig::devnet();
    devnet.save(&path)?;
    tracing::info!(path = %path.display(), "devnet configuration written");

    println!("Node initialized successfully.");
    println!("  Data directory : {}", data_dir.display());
    println!("  Config         : {}", path.display());
    println!("  Network        : {}", devnet.network);
    println!("  Vault          : {}", config::resolve_account(&devnet.vault));
    println!("  Owner          : {}", config::resolve_account(&devnet.owner));
    for token in &devnet.tokens {
        println!(
            "  Token          : {} ({}, {})",
            token.symbol,
            custody_contracts::Token::id_for(&token.symbol),
            token.convention
        );
    }

    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("custody-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol     {}", custody_protocol::config::PROTOCOL_VERSION);
    println!("rustc        {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
