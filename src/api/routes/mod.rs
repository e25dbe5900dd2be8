//! API routes module - organizes all route handlers.
//!
//! Everything here is mounted under `/api/v1` by the binary.

pub mod ads;
pub mod app_state;
pub mod auth;
pub mod auth_context;
pub mod catalog;
pub mod comments;
pub mod error;
pub mod form;
pub mod openapi;
pub mod posts;
pub mod social;
pub mod users;

use axum::extract::DefaultBodyLimit;
use axum::{Json, Router, routing::get};
use serde_json::{Value, json};
use tower_http::services::ServeDir;

pub use app_state::AppState;
pub use error::ApiError;

/// Upper bound for request bodies: a full ad gallery plus its main image.
const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Create the main API router combining all route modules
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::auth_router())
        .nest("/users", users::users_router())
        .nest(
            "/posts",
            posts::posts_router().merge(comments::comments_router()),
        )
        .nest("/ads", ads::ads_router())
        .nest("/services", catalog::catalog_router())
        .nest("/info/social", social::social_router())
        .merge(openapi::openapi_router())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
    // Note: State is applied by callers who need it (e.g., TestServer)
}

/// Full application: health checks, the API under `/api/v1` and uploaded
/// media under the configured media URL.
pub fn create_app(state: AppState) -> Router {
    let media_prefix = match state.config.media_url.trim_matches('/') {
        "" => "media",
        prefix => prefix,
    };
    let media_url = format!("/{}", media_prefix);
    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/health", get(health_check))
        .nest("/api/v1", create_api_router())
        .nest_service(&media_url, ServeDir::new(&state.config.media_root))
        .with_state(state)
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "classifieds-api",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
