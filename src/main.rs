//! Invory - backend cache service for a server-inventory dashboard
//!
//! Wires together the dual-tier cache, the background refresh scheduler
//! and the monitoring API, then serves until interrupted.

mod api;
mod cache;
mod cli;
mod config;
mod data;

use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use api::AppState;
use cache::{
    CacheCoordinator, InfoReporter, PersistentStore, RefreshScheduler, SchedulerConfig,
};
use cli::Cli;
use data::UpstreamClient;

/// Initializes console logging plus a log file in the logs dir
///
/// The file is `app.log`, the path the storage flags report on. The guard
/// must stay alive for the lifetime of the process or buffered log lines
/// are lost.
fn init_tracing(logs_dir: &std::path::Path) -> tracing_appender::non_blocking::WorkerGuard {
    let file_appender = tracing_appender::rolling::never(logs_dir, "app.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .init();
    guard
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let service_config = cli.service_config()?;
    service_config.storage.ensure_dirs()?;

    let _log_guard = init_tracing(&service_config.storage.logs_dir);
    info!(
        data_dir = %service_config.storage.data_dir.display(),
        cache_dir = %service_config.storage.cache_dir.display(),
        ttl_seconds = service_config.ttl_seconds(),
        "starting invory"
    );

    let store = PersistentStore::new(service_config.storage.clone());
    let fetcher = Arc::new(UpstreamClient::new(cli.catalog_url.clone())?);
    let coordinator = CacheCoordinator::new(store, fetcher, service_config.ttl_seconds());

    let scheduler = Arc::new(RefreshScheduler::spawn(
        coordinator.clone(),
        SchedulerConfig {
            refresh_lead: service_config.effective_refresh_lead(),
            retry_backoff: service_config.retry_backoff,
            refresh_on_start: !cli.no_initial_refresh,
        },
    ));

    let state = AppState {
        coordinator: coordinator.clone(),
        reporter: InfoReporter::new(coordinator, Arc::clone(&scheduler)),
        api_key: cli.api_key.clone(),
    };
    let router = api::router(state);

    let listener = tokio::net::TcpListener::bind(cli.listen).await?;
    info!(listen = %cli.listen, "monitoring API listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_err() {
                warn!("failed to listen for shutdown signal");
            }
            info!("shutting down");
        })
        .await?;

    Ok(())
}
