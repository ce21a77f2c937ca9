//! # Claim Node
//!
//! ```text
//! claim-node [--config node.toml] serve
//! claim-node [--config node.toml] provision --count 1000 --length 10
//! claim-node [--config node.toml] provision --from-file codes.txt
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use claim_node::container::{build_store, ClaimContainer, NodeConfig};
use claim_node::http;
use claim_node::provisioning::{self, DEFAULT_COUNT, DEFAULT_LENGTH};
use claim_telemetry::{init_telemetry, TelemetryConfig, CODES_PROVISIONED, RECONCILIATIONS_TOTAL};
use claim_workflow::ClaimApi;

#[derive(Parser, Debug)]
#[command(author, version, about = "Redeem code claim service")]
struct Args {
    /// Path to a TOML config file. Environment variables override it.
    #[arg(long, env = "CLAIM_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Reconcile interrupted claims, then serve the HTTP API (default).
    Serve,
    /// Insert new redeem codes into the record store.
    Provision {
        /// Number of random codes to generate.
        #[arg(long, default_value_t = DEFAULT_COUNT)]
        count: usize,
        /// Length of each generated code.
        #[arg(long, default_value_t = DEFAULT_LENGTH)]
        length: usize,
        /// Newline separated codes to insert instead of generating.
        #[arg(long, conflicts_with_all = ["count", "length"])]
        from_file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _telemetry =
        init_telemetry(TelemetryConfig::from_env()).context("failed to initialize telemetry")?;

    let config = NodeConfig::load(args.config.as_deref()).context("failed to load configuration")?;

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Provision {
            count,
            length,
            from_file,
        } => provision(config, count, length, from_file).await,
    }
}

async fn serve(config: NodeConfig) -> Result<()> {
    let addr = config.http.addr().context("invalid listen address")?;
    let container = ClaimContainer::new(config).context("failed to build claim node")?;

    info!("===========================================");
    info!("  Claim Node v{}", claim_node::VERSION);
    info!("===========================================");

    match container.controller.recover_pending().await {
        Ok(report) => {
            RECONCILIATIONS_TOTAL
                .with_label_values(&["minted"])
                .inc_by(report.minted as u64);
            RECONCILIATIONS_TOTAL
                .with_label_values(&["failed"])
                .inc_by(report.failed as u64);
            RECONCILIATIONS_TOTAL
                .with_label_values(&["skipped"])
                .inc_by(report.skipped as u64);
            RECONCILIATIONS_TOTAL
                .with_label_values(&["error"])
                .inc_by(report.errors as u64);
            info!(
                scanned = report.scanned,
                minted = report.minted,
                failed = report.failed,
                skipped = report.skipped,
                errors = report.errors,
                "[claim] startup reconciliation complete"
            );
            if report.errors > 0 {
                warn!("[claim] some records could not be reconciled; they are retried on next claim");
            }
        }
        Err(e) => error!(error = %e, "[claim] startup reconciliation failed"),
    }

    let router = http::router(Arc::new(container.controller));
    http::serve(addr, router, shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("[claim] node stopped");
    Ok(())
}

async fn provision(
    config: NodeConfig,
    count: usize,
    length: usize,
    from_file: Option<PathBuf>,
) -> Result<()> {
    config.validate_storage()?;
    let store = build_store(&config.storage).context("failed to open record store")?;

    let report = match from_file {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            provisioning::provision_codes(store.as_ref(), text.lines().map(str::to_string)).await?
        }
        None => provisioning::provision_random(store.as_ref(), count, length).await?,
    };

    CODES_PROVISIONED.set(report.inserted.len() as i64);
    for code in &report.inserted {
        println!("{}", code);
    }
    info!(
        inserted = report.inserted.len(),
        skipped = report.skipped.len(),
        "[claim] provisioning complete"
    );
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
