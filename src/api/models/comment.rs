use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::user::AuthorSummary;

/// Comment list page size defaults.
pub const COMMENT_PAGE_SIZE: usize = 4;
pub const COMMENT_MAX_PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub public_id: Uuid,
    pub post_id: i64,
    pub author_id: i64,
    pub body: String,
    pub edited: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: i64,
    pub author_id: i64,
    pub body: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CommentRequest {
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CommentResponse {
    pub id: String,
    /// Public id of the post
    pub post: String,
    pub author: AuthorSummary,
    pub body: String,
    pub edited: bool,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}
