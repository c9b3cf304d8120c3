//! capgridd — the applet capability broker daemon.
//!
//! Single binary serving the RPC surface over memory-backed stores,
//! the development profile. Production hosts embed the capability
//! crates directly and wire their own Postgres/Redis/S3 clients.
//!
//! # Usage
//!
//! ```text
//! capgridd serve --port 8090 --data-dir /var/lib/capgrid --applet crm --applet billing
//! ```
//!
//! Secrets come from `IOTA_APPLET_SECRET_{APPLET}_{NAME}` environment
//! variables; file blobs land under `{data-dir}/files`.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use capgrid_files::{FileStore, MemoryFileMetaStore};
use capgrid_rpc::handlers::{CapabilitySet, register_applet};
use capgrid_rpc::{Dispatcher, Registry, build_router};
use capgrid_secrets::EnvSecretStore;
use capgrid_ws::WsHub;

#[derive(Parser)]
#[command(name = "capgridd", about = "Applet capability broker daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the RPC surface with in-process backends.
    Serve {
        /// Port to listen on.
        #[arg(long, default_value = "8090")]
        port: u16,

        /// Data directory for stored file blobs.
        #[arg(long, default_value = "/var/lib/capgrid")]
        data_dir: PathBuf,

        /// Applet id to register capabilities for (repeatable).
        #[arg(long = "applet", required = true)]
        applets: Vec<String>,

        /// Request body cap in bytes.
        #[arg(long, default_value_t = capgrid_rpc::DEFAULT_BODY_LIMIT)]
        body_limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,capgridd=debug,capgrid=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            port,
            data_dir,
            applets,
            body_limit,
        } => serve(port, &data_dir, &applets, body_limit).await,
    }
}

/// Builds the dispatcher over memory backends, shared by every applet.
fn build_dispatcher(
    data_dir: &Path,
    applets: &[String],
    body_limit: usize,
) -> anyhow::Result<Arc<Dispatcher>> {
    let files_dir = data_dir.join("files");
    std::fs::create_dir_all(&files_dir)?;
    let objects = Arc::new(object_store::local::LocalFileSystem::new_with_prefix(
        &files_dir,
    )?);

    let caps = CapabilitySet {
        kv: Arc::new(capgrid_kv::MemoryKvStore::new()),
        db: Arc::new(capgrid_db::MemoryDocStore::new()),
        jobs: Arc::new(capgrid_jobs::MemoryJobStore::new()),
        secrets: Arc::new(EnvSecretStore::new()),
        files: Arc::new(FileStore::new(objects, Arc::new(MemoryFileMetaStore::new()))),
        ws: Arc::new(WsHub::new()),
    };

    let mut registry = Registry::new();
    for applet in applets {
        register_applet(&mut registry, applet, &caps)?;
        info!(applet, "registered capability surface");
    }
    info!(methods = registry.method_names().count(), "registry ready");

    Ok(Arc::new(Dispatcher::new(registry).with_body_limit(body_limit)))
}

async fn serve(
    port: u16,
    data_dir: &Path,
    applets: &[String],
    body_limit: usize,
) -> anyhow::Result<()> {
    info!("capgrid daemon starting");

    let dispatcher = build_dispatcher(data_dir, applets, body_limit)?;
    let router = build_router(dispatcher);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "rpc server starting");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to install CTRL+C handler");
            info!("shutdown signal received");
        })
        .await?;

    info!("capgrid daemon stopped");
    Ok(())
}

// ── Tests ───────────────────────────────────────────────────────────────
