/**
 * PROCWATCH KERNEL - Point d'entrée du collecteur
 *
 * RÔLE : charge la liste blanche des connexions, ouvre le journal OFFLINE,
 * construit le contexte du collecteur et sert l'API HTTP.
 *
 * ARCHITECTURE : état explicite (Collector) partagé par Arc entre les
 * requêtes, un worker tokio par requête entrante.
 */

mod aggregator;
mod clock;
mod config;
mod dashboard;
mod event_log;
mod health;
mod http;
mod ingest;
mod models;
mod registry;

use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use time::UtcOffset;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::clock::SystemClock;
use crate::config::{load_config, Settings};
use crate::event_log::OfflineEventLog;
use crate::health::HealthTracker;
use crate::http::AppState;
use crate::ingest::Collector;
use crate::registry::ConnectionRegistry;

fn main() -> anyhow::Result<()> {
    // lu avant le runtime : sous Unix le décalage local n'est plus lisible une fois les workers lancés
    let offset = clock::local_offset();

    // Charger les variables d'environnement depuis .env (si présent)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("cannot start tokio runtime")?
        .block_on(run(offset))
}

async fn run(offset: UtcOffset) -> anyhow::Result<()> {
    info!(%offset, "[kernel] clock offset");

    let settings = Settings::from_env();

    // liste blanche statique
    let cfg = load_config(&settings.config_path).await?;
    let registry = ConnectionRegistry::from_config(&cfg);
    info!(connections = registry.len(), config = %settings.config_path.display(), "[kernel] loaded connections");

    // journal OFFLINE
    let log = OfflineEventLog::open(&settings.log_file)
        .with_context(|| format!("cannot open offline log {}", settings.log_file.display()))?;
    info!(path = %log.path().display(), "[kernel] offline log ready");

    let collector = Arc::new(Collector::new(registry, log, Arc::new(SystemClock::with_offset(offset))));
    let app_state = AppState { collector, health_tracker: HealthTracker::new() };

    // HTTP
    let app = http::build_router(app_state);

    let listener = TcpListener::bind(&settings.bind)
        .await
        .with_context(|| format!("cannot bind {}", settings.bind))?;
    info!("[kernel] listening on http://{}", listener.local_addr()?);

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
        info!("[kernel] shutting down");
    };

    if let Err(e) = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown)
        .await
    {
        error!(error = %e, "[kernel] server error");
        return Err(e.into());
    }
    Ok(())
}
