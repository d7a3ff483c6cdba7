use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use metro_routes::config::EngineConfig;
use metro_routes::engine::RouteEngine;
use metro_routes::web::{AppState, BatchSummary, create_router};

#[tokio::main]
async fn main() -> ExitCode {
    setup_logging();

    let config = match EngineConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    // Fail fast if the fare form is unreachable
    info!(url = %config.fares.url, persist = config.persistence_enabled, "Starting route engine");
    let engine = match RouteEngine::start(&config).await {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            error!(error = %e, "Failed to start route engine");
            return ExitCode::FAILURE;
        }
    };
    info!(
        stations = engine.list_station_names().len(),
        routes = engine.cached_routes(),
        "Route engine ready"
    );

    if config.warm_on_start {
        let engine = engine.clone();
        tokio::spawn(async move {
            let report = engine.warm_all().await;
            let summary = BatchSummary::from(&report);
            info!(
                requested = summary.requested,
                succeeded = summary.succeeded,
                failed = summary.failed,
                aborted = summary.aborted,
                "Startup warm-up finished"
            );
        });
    }

    let app = create_router(AppState::new(engine.clone()));

    let listener = match tokio::net::TcpListener::bind(config.listen_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(addr = %config.listen_addr, error = %e, "Failed to bind");
            return ExitCode::FAILURE;
        }
    };
    info!(addr = %config.listen_addr, "Listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "Server error");
    }

    if let Err(e) = engine.save(true).await {
        warn!(error = %e, "Failed to save snapshot on shutdown");
    }

    ExitCode::SUCCESS
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("metro_routes=info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_writer(std::io::stderr),
        )
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
