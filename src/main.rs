mod api;
mod config;
mod dispatch;
mod error;
mod eta;
mod geo;
mod models;
mod observability;
mod state;
mod store;

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use crate::eta::EtaSimulator;
use crate::store::memory::MemoryStore;
use crate::store::DocumentStore;

#[tokio::main]
async fn main() -> Result<(), error::AppError> {
    let config = config::Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new(config.event_buffer_size));
    let eta = EtaSimulator::with_source(
        Arc::new(eta::ThreadRngSource),
        config.eta_min_minutes,
        config.eta_max_minutes,
    );
    let app_state = Arc::new(state::AppState::new(
        store,
        eta,
        Duration::from_millis(config.progress_tick_ms),
    ));

    let gauge = app_state.metrics.pending_orders.clone();
    let _pending_gauge = app_state
        .feed
        .subscribe(move |orders| gauge.set(orders.len() as i64));

    let app = api::rest::router(app_state.clone());

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| error::AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port = config.http_port, "dispatch server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| error::AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
