use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use takeone_api::config::{BackendConfig, ServerConfig};
use takeone_api::router::build_app_router;
use takeone_api::state::AppState;
use takeone_api::wiring::build_capabilities;
use takeone_pipeline::{SceneSearchService, ServiceSettings};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    // LOG_FORMAT=json switches to one JSON object per line.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "takeone_api=debug,takeone_pipeline=debug,takeone_capabilities=info,tower_http=debug"
            .into()
    });
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        frames_root = ?config.frames_root,
        "Loaded server configuration",
    );

    let backend = BackendConfig::from_env();
    let settings = ServiceSettings::from_env();

    // --- Capabilities ---
    let capabilities = build_capabilities(&backend)
        .await
        .expect("Failed to initialise backends");

    let service = SceneSearchService::new(capabilities, settings)
        .expect("Invalid scene search settings");

    // --- App state ---
    let shutdown = CancellationToken::new();
    let state = AppState {
        service: Arc::new(service),
        config: Arc::new(config.clone()),
        shutdown: shutdown.clone(),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    let drain = Duration::from_secs(config.shutdown_timeout_secs);
    let signal_token = shutdown.clone();
    let server = async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown_signal().await;
                // Aborts segmentations still in flight.
                signal_token.cancel();
            })
            .await
    };

    tokio::select! {
        result = server => result.expect("Server error"),
        () = drain_deadline(shutdown, drain) => {
            tracing::warn!(?drain, "Shutdown drain timed out, exiting with requests in flight");
        }
    }

    tracing::info!("Graceful shutdown complete");
}

/// Resolves `drain` after shutdown has started.
async fn drain_deadline(shutdown: CancellationToken, drain: Duration) {
    shutdown.cancelled().await;
    tokio::time::sleep(drain).await;
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
