//! appstatd — the appstat daemon.
//!
//! Single binary that assembles:
//! - Application store (redb, on disk or in memory)
//! - Manifest resync loop feeding the store
//! - Metrics schema + HTTP exporter endpoint
//!
//! # Usage
//!
//! ```text
//! appstatd serve --port 8082 --manifests-dir /etc/appstat/apps
//! ```

mod config;
mod resync;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tokio::sync::watch;
use tracing::{info, warn};

use appstat_api::{build_router, ExporterState};
use appstat_state::StateStore;

use crate::config::{ExporterConfig, Settings};
use crate::resync::ManifestSync;

#[derive(Parser)]
#[command(name = "appstatd", about = "Application metrics exporter")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve application metrics over HTTP.
    Serve(ServeArgs),
}

#[derive(Args)]
struct ServeArgs {
    /// TOML config file. Flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Port to listen on [default: 8082].
    #[arg(long)]
    port: Option<u16>,

    /// HTTP path that serves the scrape [default: /metrics].
    #[arg(long)]
    metrics_path: Option<String>,

    /// Directory for the persistent store. In-memory when unset.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Directory of application manifests (*.json) to keep the store in sync with.
    #[arg(long)]
    manifests_dir: Option<PathBuf>,

    /// Manifest resync interval in seconds [default: 30].
    #[arg(long)]
    resync_interval: Option<u64>,

    /// Prefix for metric names; empty for none [default: argocd].
    #[arg(long)]
    metric_prefix: Option<String>,

    /// Set the logging level. One of: trace|debug|info|warn|error [default: info].
    #[arg(long)]
    loglevel: Option<String>,
}

impl ServeArgs {
    fn settings(&self) -> Settings {
        Settings {
            port: self.port,
            metrics_path: self.metrics_path.clone(),
            data_dir: self.data_dir.clone(),
            manifests_dir: self.manifests_dir.clone(),
            resync_interval: self.resync_interval,
            metric_prefix: self.metric_prefix.clone(),
            loglevel: self.loglevel.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve(args) => {
            let file = match &args.config {
                Some(path) => Settings::from_file(path)?,
                None => Settings::default(),
            };
            let config = ExporterConfig::resolve(file.merge(args.settings()))?;
            init_tracing(&config.log_level);
            run_serve(config).await
        }
    }
}

fn init_tracing(level: &str) {
    // RUST_LOG wins over --loglevel.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run_serve(config: ExporterConfig) -> anyhow::Result<()> {
    info!("appstat exporter starting");

    // ── Initialize subsystems ──────────────────────────────────

    // Application store.
    let store = match &config.data_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let db_path = dir.join("appstat.redb");
            let store = StateStore::open(&db_path)?;
            info!(path = ?db_path, "application store opened");
            store
        }
        None => {
            let store = StateStore::open_in_memory()?;
            info!("in-memory application store opened");
            store
        }
    };

    if !config.has_application_source() {
        warn!("no data dir or manifests dir configured, the in-memory store stays empty");
    }

    // Metric schema.
    let schema = Arc::new(config.schema()?);
    info!(prefix = %config.metric_prefix, "metric schema built");

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Start background tasks ─────────────────────────────────

    let sync_handle = config.manifests_dir.clone().map(|dir| {
        let sync = ManifestSync::new(dir, store.clone(), config.resync_interval);
        let sync_shutdown = shutdown_rx.clone();
        tokio::spawn(async move {
            sync.run(sync_shutdown).await;
        })
    });

    // ── Start exporter ─────────────────────────────────────────

    let router = build_router(
        &config.metrics_path,
        ExporterState::new(schema, Arc::new(store)),
    );
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    info!(%addr, path = %config.metrics_path, "metrics server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Graceful shutdown on Ctrl-C.
    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for shutdown signal");
        }
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    server.await?;

    if let Some(handle) = sync_handle {
        let _ = handle.await;
    }

    info!("appstat exporter stopped");
    Ok(())
}
