//! Application state management.
//!
//! Defines the AppState struct that holds all shared application state:
//! configuration, the storage backend, media storage, token and mail
//! services, and the per-user rate limiters.

use crate::config::AppConfig;
use crate::services::{
    CacheBackend, EmailService, InMemoryCache, JwtService, SharedJwtService, SlidingWindowLimiter,
};
use crate::storage::{
    LocalMediaStore, MediaStore, MemoryStorageBackend, PostgresStorageBackend, StorageBackend,
    StorageError,
};
use axum::extract::FromRef;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

/// Application state shared across all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// Storage backend (PostgreSQL or in-memory)
    pub storage: Arc<dyn StorageBackend>,
    /// Uploaded files
    pub media: Arc<dyn MediaStore>,
    pub jwt: SharedJwtService,
    pub email: Arc<EmailService>,
    pub cache: Arc<dyn CacheBackend>,
    pub post_limiter: SlidingWindowLimiter,
    pub comment_limiter: SlidingWindowLimiter,
    /// PostgreSQL database connection pool (optional)
    pub database: Option<PgPool>,
}

impl AppState {
    /// Create application state backed by in-memory storage.
    pub fn new(config: AppConfig) -> Result<Self, String> {
        Self::with_storage(config, Arc::new(MemoryStorageBackend::new()))
    }

    /// Create application state around an existing storage backend.
    pub fn with_storage(
        config: AppConfig,
        storage: Arc<dyn StorageBackend>,
    ) -> Result<Self, String> {
        let email = EmailService::new(&config.smtp, &config.public_base_url)?;
        let media: Arc<dyn MediaStore> = Arc::new(LocalMediaStore::new(
            config.media_root.clone(),
            config.media_url.clone(),
        ));
        let cache: Arc<dyn CacheBackend> = Arc::new(InMemoryCache::new());

        Ok(Self {
            post_limiter: SlidingWindowLimiter::new(cache.clone(), "posts", config.post_rate),
            comment_limiter: SlidingWindowLimiter::new(
                cache.clone(),
                "comments",
                config.comment_rate,
            ),
            jwt: Arc::new(JwtService::from_config(&config)),
            email: Arc::new(email),
            config: Arc::new(config),
            storage,
            media,
            cache,
            database: None,
        })
    }

    /// Initialize storage backend from configuration.
    ///
    /// Connects to PostgreSQL and runs migrations when `DATABASE_URL` is set,
    /// otherwise keeps the in-memory backend.
    pub async fn init_storage(&mut self) -> Result<(), StorageError> {
        let Some(database_url) = self.config.database_url.clone() else {
            info!("DATABASE_URL not set; using in-memory storage");
            return Ok(());
        };

        let pool = sqlx::PgPool::connect(&database_url).await.map_err(|e| {
            StorageError::ConnectionError(format!("Failed to connect to database: {}", e))
        })?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StorageError::ConnectionError(format!("Migration failed: {}", e)))?;

        self.storage = Arc::new(PostgresStorageBackend::new(pool.clone()));
        self.database = Some(pool);
        info!("PostgreSQL storage initialized");
        Ok(())
    }

    /// Check if PostgreSQL storage is enabled
    pub fn is_postgres(&self) -> bool {
        self.database.is_some()
    }

    /// Public URL for a stored media path.
    pub fn media_url(&self, path: Option<&str>) -> Option<String> {
        path.filter(|p| !p.is_empty()).map(|p| self.media.url(p))
    }
}

// Allow sub-state extraction (for Axum)
impl FromRef<AppState> for Arc<dyn StorageBackend> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for SharedJwtService {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.jwt.clone()
    }
}
