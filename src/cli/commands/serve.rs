//! Implementation of the `issue-tracker serve` command.

use anyhow::{Context, Result};
use clap::Args;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::info;

use crate::adapters::http::{IssuesHttpConfig, IssuesHttpServer};
use crate::adapters::memory::InMemoryIssueStore;
use crate::adapters::sqlite::{initialize_database, PoolConfig, SqliteIssueStore};
use crate::domain::models::{Config, StorageBackend, StorageConfig};
use crate::domain::ports::IssueStore;
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::logging::{LogConfig, Logger};
use crate::services::IssueService;

#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Address to bind to (overrides server.host)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides server.port)
    #[arg(short, long)]
    pub port: Option<u16>,
}

impl ServeArgs {
    /// Apply the command-line overrides on top of the loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
    }
}

/// A ready store plus the pool to close on shutdown, if any.
pub struct OpenedStore {
    pub store: Arc<dyn IssueStore>,
    pub pool: Option<SqlitePool>,
}

/// Open the configured document store.
pub async fn open_store(storage: &StorageConfig) -> Result<OpenedStore> {
    match storage.backend {
        StorageBackend::Sqlite => {
            let url = storage.database_url();
            let pool = initialize_database(&url, Some(PoolConfig::from(storage)))
                .await
                .with_context(|| format!("Failed to initialize database at {url}"))?;
            info!(path = %storage.path, "using SQLite issue store");

            Ok(OpenedStore {
                store: Arc::new(SqliteIssueStore::new(pool.clone())),
                pool: Some(pool),
            })
        }
        StorageBackend::Memory => {
            info!("using in-memory issue store; issues are lost on exit");
            Ok(OpenedStore {
                store: Arc::new(InMemoryIssueStore::new()),
                pool: None,
            })
        }
    }
}

pub async fn execute(args: ServeArgs, mut config: Config) -> Result<()> {
    args.apply(&mut config);
    ConfigLoader::validate(&config).context("Invalid server options")?;

    let _logger = Logger::init(&LogConfig::from(&config.logging))?;

    let opened = open_store(&config.storage).await?;
    let service = IssueService::new(opened.store);
    let server = IssuesHttpServer::new(service, IssuesHttpConfig::from(&config.server));

    server
        .serve_with_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!(e))
        .context("HTTP server failed")?;

    if let Some(pool) = opened.pool {
        pool.close().await;
    }
    info!("server stopped");
    Ok(())
}

/// Resolve on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received");
}
