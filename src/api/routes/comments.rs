//! Comment routes, nested under `/posts/{id}/comments`.

use axum::{
    Json, Router,
    extract::{OriginalUri, Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
};
use serde::Deserialize;
use tracing::info;

use super::app_state::AppState;
use super::auth_context::AuthContext;
use super::error::ApiError;
use super::form::ApiJson;
use super::posts::load_post;
use super::users::{load_author, parse_public_id};
use crate::models::comment::{COMMENT_MAX_PAGE_SIZE, COMMENT_PAGE_SIZE, CommentRequest};
use crate::models::{Comment, CommentResponse, NewComment, Page, PageRequest, Post};
use crate::sanitizer::sanitize_html;

pub fn comments_router() -> Router<AppState> {
    Router::new()
        .route("/{id}/comments", get(list_comments).post(create_comment))
        .route(
            "/{id}/comments/{comment_id}",
            get(get_comment)
                .put(update_comment)
                .patch(update_comment)
                .delete(delete_comment),
        )
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct CommentListQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

async fn comment_response(
    state: &AppState,
    post: &Post,
    comment: &Comment,
) -> Result<CommentResponse, ApiError> {
    Ok(CommentResponse {
        id: comment.public_id.simple().to_string(),
        post: post.public_id.simple().to_string(),
        author: load_author(state, comment.author_id).await?,
        body: comment.body.clone(),
        edited: comment.edited,
        created: comment.created_at,
        updated: comment.updated_at,
    })
}

fn clean_comment(raw: &str) -> Result<String, ApiError> {
    let body = sanitize_html(raw);
    if body.trim().is_empty() {
        return Err(ApiError::field("body", "Comment must not be empty."));
    }
    Ok(body)
}

async fn load_comment(
    state: &AppState,
    post_id: &str,
    comment_id: &str,
) -> Result<(Post, Comment), ApiError> {
    let post = load_post(state, post_id).await?;
    let comment_id = parse_public_id(comment_id)?;
    let comment = state
        .storage
        .get_comment(post.id, comment_id)
        .await?
        .ok_or_else(ApiError::not_found)?;
    Ok((post, comment))
}

/// GET /posts/{id}/comments - List comments, newest first
#[utoipa::path(
    get,
    path = "/posts/{id}/comments",
    tag = "Comments",
    params(("id" = String, Path, description = "Post public id"), CommentListQuery),
    responses(
        (status = 200, description = "Paginated comments", body = Object),
        (status = 404, description = "Post not found")
    )
)]
pub async fn list_comments(
    State(state): State<AppState>,
    Path(id): Path<String>,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<CommentListQuery>,
) -> Result<Json<Page<CommentResponse>>, ApiError> {
    let post = load_post(&state, &id).await?;
    let page = PageRequest::resolve(
        query.limit,
        query.offset,
        COMMENT_PAGE_SIZE,
        COMMENT_MAX_PAGE_SIZE,
    );
    let (comments, count) = state
        .storage
        .list_comments(post.id, page.limit, page.offset)
        .await?;
    let mut results = Vec::with_capacity(comments.len());
    for comment in &comments {
        results.push(comment_response(&state, &post, comment).await?);
    }
    Ok(Json(Page::new(results, count, page, &uri)))
}

/// POST /posts/{id}/comments - Comment on a post
#[utoipa::path(
    post,
    path = "/posts/{id}/comments",
    tag = "Comments",
    params(("id" = String, Path, description = "Post public id")),
    request_body = CommentRequest,
    responses(
        (status = 201, description = "Comment created", body = CommentResponse),
        (status = 400, description = "Empty comment"),
        (status = 404, description = "Post not found"),
        (status = 429, description = "Commenting too fast")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_comment(
    State(state): State<AppState>,
    auth: AuthContext,
    headers: HeaderMap,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<CommentRequest>,
) -> Result<(StatusCode, Json<CommentResponse>), ApiError> {
    let post = load_post(&state, &id).await?;
    state
        .comment_limiter
        .check(&auth.user_id().to_string())
        .await
        .map_err(|retry_after| ApiError::rate_limited(retry_after, &headers))?;

    let body = clean_comment(&request.body)?;
    let comment = state
        .storage
        .create_comment(NewComment {
            post_id: post.id,
            author_id: auth.user_id(),
            body,
        })
        .await?;
    info!(
        "User {} commented on post {}",
        auth.user_id(),
        post.public_id.simple()
    );

    let response = comment_response(&state, &post, &comment).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /posts/{id}/comments/{comment_id} - Retrieve a comment
#[utoipa::path(
    get,
    path = "/posts/{id}/comments/{comment_id}",
    tag = "Comments",
    params(
        ("id" = String, Path, description = "Post public id"),
        ("comment_id" = String, Path, description = "Comment public id")
    ),
    responses(
        (status = 200, description = "Comment", body = CommentResponse),
        (status = 404, description = "Post or comment not found")
    )
)]
pub async fn get_comment(
    State(state): State<AppState>,
    Path((id, comment_id)): Path<(String, String)>,
) -> Result<Json<CommentResponse>, ApiError> {
    let (post, comment) = load_comment(&state, &id, &comment_id).await?;
    Ok(Json(comment_response(&state, &post, &comment).await?))
}

/// PUT/PATCH /posts/{id}/comments/{comment_id} - Edit a comment
#[utoipa::path(
    put,
    path = "/posts/{id}/comments/{comment_id}",
    tag = "Comments",
    params(
        ("id" = String, Path, description = "Post public id"),
        ("comment_id" = String, Path, description = "Comment public id")
    ),
    request_body = CommentRequest,
    responses(
        (status = 200, description = "Comment updated", body = CommentResponse),
        (status = 400, description = "Empty comment"),
        (status = 403, description = "Not the comment author"),
        (status = 404, description = "Post or comment not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_comment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((id, comment_id)): Path<(String, String)>,
    ApiJson(request): ApiJson<CommentRequest>,
) -> Result<Json<CommentResponse>, ApiError> {
    let (post, mut comment) = load_comment(&state, &id, &comment_id).await?;
    if !auth.user.can_manage(comment.author_id) {
        return Err(ApiError::forbidden());
    }
    comment.body = clean_comment(&request.body)?;
    comment.edited = true;
    let updated = state.storage.update_comment(&comment).await?;
    Ok(Json(comment_response(&state, &post, &updated).await?))
}

/// DELETE /posts/{id}/comments/{comment_id} - Delete a comment
#[utoipa::path(
    delete,
    path = "/posts/{id}/comments/{comment_id}",
    tag = "Comments",
    params(
        ("id" = String, Path, description = "Post public id"),
        ("comment_id" = String, Path, description = "Comment public id")
    ),
    responses(
        (status = 204, description = "Comment deleted"),
        (status = 403, description = "Not allowed to delete this comment"),
        (status = 404, description = "Post or comment not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_comment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((id, comment_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let (post, comment) = load_comment(&state, &id, &comment_id).await?;
    let post_author_allowed =
        state.config.comments_allow_post_author_delete && post.author_id == auth.user_id();
    if !auth.user.can_manage(comment.author_id) && !post_author_allowed {
        return Err(ApiError::forbidden());
    }
    state.storage.delete_comment(comment.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
