//! Posts and likes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::user::AuthorSummary;

/// Maximum post body length, counted before sanitizing.
pub const POST_BODY_MAX_CHARS: usize = 4096;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub public_id: Uuid,
    pub author_id: i64,
    pub body: String,
    pub image: Option<String>,
    pub edited: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub author_id: i64,
    pub body: String,
    pub image: Option<String>,
}

/// Like and comment counters for one post, plus the viewer's like state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostStats {
    pub likes_count: i64,
    pub comments_count: i64,
    pub liked: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PostResponse {
    pub id: String,
    pub author: AuthorSummary,
    pub body: String,
    pub short_content: String,
    pub image: Option<String>,
    pub edited: bool,
    pub liked: bool,
    pub likes_count: i64,
    pub comments_count: i64,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LikeToggleResponse {
    pub liked: bool,
    pub likes_count: i64,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
pub struct PostListQuery {
    /// Public id of the author to filter by
    pub author: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}
