use axum::middleware::from_fn_with_state;
use std::error::Error as StdError;
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use classifieds_api::config::AppConfig;
use classifieds_api::middleware::{
    create_cors_layer, create_custom_cors_layer, create_rate_limiter_with_quota, init_tracing,
    rate_limit_middleware,
};
use classifieds_api::routes::{AppState, create_app};
use classifieds_api::services::account_service::start_unverified_cleanup_task;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), Box<dyn StdError + Send + Sync + 'static>> {
    // RUST_LOG controls the level (default: info), LOG_FORMAT=json switches to JSON lines
    init_tracing()?;
    info!("Application starting...");

    let config = AppConfig::from_env().inspect_err(|e| error!("Invalid configuration: {}", e))?;
    let port = config.port;
    let cors = if config.cors_allowed_origins.is_empty() {
        create_cors_layer()
    } else {
        create_custom_cors_layer(&config.cors_allowed_origins)
    };
    let limiter = create_rate_limiter_with_quota(config.global_requests_per_minute);

    let mut app_state = AppState::new(config)?;
    app_state.init_storage().await?;
    if let Err(e) = tokio::fs::create_dir_all(&app_state.config.media_root).await {
        error!(
            "Failed to create media root {:?}: {}",
            app_state.config.media_root, e
        );
    }
    if !app_state.email.is_enabled() {
        info!("SMTP_HOST not set; outgoing email is logged only");
    }

    tokio::spawn(start_unverified_cleanup_task(
        app_state.storage.clone(),
        app_state.media.clone(),
    ));

    // Apply middleware layers
    let app = create_app(app_state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .layer(from_fn_with_state(limiter, rate_limit_middleware)),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on {} (port {})", addr, port);
    info!("Health check available at http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolve on SIGINT (Ctrl+C) or SIGTERM (Docker stop).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("SIGINT received, shutting down gracefully"),
        _ = terminate => info!("SIGTERM received, shutting down gracefully"),
    }
}
