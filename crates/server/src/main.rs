//! Polis server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, middleware};
use polis_api::{AppState, actor_middleware, router as api_router};
use polis_common::{Config, SharedClock, SystemClock};
use polis_core::{AggregationEngine, PollService, ResponseLedger, VisibilityGate};
use polis_db::repositories::{PollOptionRepository, PollRepository, PollResponseRepository};
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    map_request_body::MapRequestBodyLayer,
    map_response_body::MapResponseBodyLayer,
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Largest accepted request body.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "polis=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting polis server...");

    let config = match std::env::var("POLIS_CONFIG") {
        Ok(path) => {
            info!(path = %path, "Loading configuration file");
            Config::from_file(path)?
        }
        Err(_) => Config::load()?,
    };

    let db = Arc::new(polis_db::init(&config).await?);
    info!("Connected to database");

    info!("Running database migrations...");
    polis_db::migrate(&db).await?;
    info!("Migrations completed");

    let clock: SharedClock = Arc::new(SystemClock);

    let poll_repo = PollRepository::new(Arc::clone(&db));
    let option_repo = PollOptionRepository::new(Arc::clone(&db));
    let response_repo = PollResponseRepository::new(Arc::clone(&db));

    let engine = AggregationEngine::new(
        poll_repo.clone(),
        option_repo.clone(),
        response_repo.clone(),
        clock.clone(),
    );
    let state = AppState {
        poll_service: PollService::new(
            poll_repo.clone(),
            option_repo.clone(),
            clock.clone(),
            config.poll.clone(),
        ),
        ledger: ResponseLedger::new(
            poll_repo.clone(),
            option_repo,
            response_repo.clone(),
            clock.clone(),
        ),
        visibility_gate: VisibilityGate::new(poll_repo, response_repo, engine, clock),
    };

    let app = Router::new()
        .nest("/api", api_router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                )
                .layer(MapResponseBodyLayer::new(axum::body::Body::new))
                .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
                .layer(MapRequestBodyLayer::new(axum::body::Body::new))
                .layer(middleware::from_fn(actor_middleware)),
        )
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
