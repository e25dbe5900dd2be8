//! Account lifecycle helpers shared by the handlers and the cleanup task.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use super::media_service::delete_files;
use crate::models::User;
use crate::storage::{MediaStore, StorageBackend, StorageError};

/// How long a verification link stays valid.
pub fn verification_ttl() -> Duration {
    Duration::hours(24)
}

/// How long a password reset link stays valid.
pub fn password_reset_ttl() -> Duration {
    Duration::hours(1)
}

/// Opaque single-use token for email links.
pub fn generate_token() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Whether a token issued at `sent_at` has outlived `ttl`. A missing
/// timestamp counts as expired.
pub fn token_expired(sent_at: Option<DateTime<Utc>>, ttl: Duration, now: DateTime<Utc>) -> bool {
    sent_at.is_none_or(|sent| now - sent > ttl)
}

/// Delete a user together with every media file they own.
pub async fn delete_user_with_media(
    storage: &dyn StorageBackend,
    media: &dyn MediaStore,
    user: &User,
) -> Result<(), StorageError> {
    let paths = storage.user_media_paths(user.id).await?;
    storage.delete_user(user.id).await?;
    delete_files(media, paths).await;
    Ok(())
}

/// Remove accounts that were not verified within the verification window.
pub async fn purge_unverified_users(
    storage: &dyn StorageBackend,
    media: &dyn MediaStore,
    now: DateTime<Utc>,
) -> Result<usize, StorageError> {
    let stale = storage
        .list_unverified_users_before(now - verification_ttl())
        .await?;
    let mut removed = 0;
    for user in &stale {
        match delete_user_with_media(storage, media, user).await {
            Ok(()) => removed += 1,
            Err(StorageError::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }
    }
    if removed > 0 {
        info!("Removed {} unverified accounts", removed);
    }
    Ok(removed)
}

/// Start background task to purge unverified accounts every hour
pub async fn start_unverified_cleanup_task(
    storage: Arc<dyn StorageBackend>,
    media: Arc<dyn MediaStore>,
) {
    let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(3600));

    loop {
        interval.tick().await;

        if let Err(e) = purge_unverified_users(storage.as_ref(), media.as_ref(), Utc::now()).await
        {
            error!("Failed to purge unverified accounts: {}", e);
        }
    }
}
