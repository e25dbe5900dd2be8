//! Post routes: the public feed, authoring and likes.

use axum::{
    Json, Router,
    extract::{OriginalUri, Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use tracing::info;

use super::app_state::AppState;
use super::auth_context::{AuthContext, OptionalAuthContext};
use super::error::ApiError;
use super::form::FormPayload;
use super::users::{load_author, parse_public_id};
use crate::models::post::{LikeToggleResponse, POST_BODY_MAX_CHARS, PostListQuery};
use crate::models::{NewPost, Page, PageRequest, Post, PostResponse};
use crate::sanitizer::{sanitize_html, strip_all_html};
use crate::services::media_service::{delete_files, replace_file, save_image};
use crate::services::text_service::make_excerpt;

const POST_IMAGE_DIR: &str = "posts";
const EXCERPT_CHARS: usize = 100;

pub fn posts_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_posts).post(create_post))
        .route(
            "/{id}",
            get(get_post).put(update_post).delete(delete_post),
        )
        .route("/{id}/like", post(like_post))
        .route("/{id}/remove_like", post(remove_like))
        .route("/{id}/toggle-like", post(toggle_like))
}

pub async fn load_post(state: &AppState, id: &str) -> Result<Post, ApiError> {
    let public_id = parse_public_id(id)?;
    state
        .storage
        .get_post_by_public_id(public_id)
        .await?
        .ok_or_else(ApiError::not_found)
}

async fn post_response(
    state: &AppState,
    post: &Post,
    viewer_id: Option<i64>,
) -> Result<PostResponse, ApiError> {
    let author = load_author(state, post.author_id).await?;
    let stats = state.storage.post_stats(post.id, viewer_id).await?;
    Ok(PostResponse {
        id: post.public_id.simple().to_string(),
        author,
        body: post.body.clone(),
        short_content: make_excerpt(&strip_all_html(&post.body), EXCERPT_CHARS),
        image: state.media_url(post.image.as_deref()),
        edited: post.edited,
        liked: stats.liked,
        likes_count: stats.likes_count,
        comments_count: stats.comments_count,
        created: post.created_at,
        updated: post.updated_at,
    })
}

/// Sanitize a submitted post body. The length limit applies to the raw input.
fn clean_body(raw: &str) -> Result<String, ApiError> {
    if raw.chars().count() > POST_BODY_MAX_CHARS {
        return Err(ApiError::field(
            "body",
            format!(
                "Ensure this field has no more than {} characters.",
                POST_BODY_MAX_CHARS
            ),
        ));
    }
    let body = sanitize_html(raw);
    if body.trim().is_empty() {
        return Err(ApiError::field("body", "Post body must not be empty"));
    }
    Ok(body)
}

/// GET /posts - List posts, newest first
#[utoipa::path(
    get,
    path = "/posts",
    tag = "Posts",
    params(PostListQuery),
    responses(
        (status = 200, description = "Paginated posts", body = Object)
    )
)]
pub async fn list_posts(
    State(state): State<AppState>,
    viewer: OptionalAuthContext,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<PostListQuery>,
) -> Result<Json<Page<PostResponse>>, ApiError> {
    let page = PageRequest::resolve(
        query.limit,
        query.offset,
        state.config.page_size,
        state.config.max_page_size,
    );

    let author_id = match query.author.as_deref() {
        Some(raw) => {
            let author = match uuid::Uuid::parse_str(raw) {
                Ok(public_id) => state.storage.get_user_by_public_id(public_id).await?,
                Err(_) => None,
            };
            match author {
                Some(author) => Some(author.id),
                None => return Ok(Json(Page::new(Vec::new(), 0, page, &uri))),
            }
        }
        None => None,
    };

    let (posts, count) = state
        .storage
        .list_posts(author_id, page.limit, page.offset)
        .await?;
    let mut results = Vec::with_capacity(posts.len());
    for post in &posts {
        results.push(post_response(&state, post, viewer.user_id()).await?);
    }
    Ok(Json(Page::new(results, count, page, &uri)))
}

/// GET /posts/{id} - Retrieve a post
#[utoipa::path(
    get,
    path = "/posts/{id}",
    tag = "Posts",
    params(("id" = String, Path, description = "Post public id")),
    responses(
        (status = 200, description = "Post", body = PostResponse),
        (status = 404, description = "Post not found")
    )
)]
pub async fn get_post(
    State(state): State<AppState>,
    viewer: OptionalAuthContext,
    Path(id): Path<String>,
) -> Result<Json<PostResponse>, ApiError> {
    let post = load_post(&state, &id).await?;
    Ok(Json(post_response(&state, &post, viewer.user_id()).await?))
}

/// POST /posts - Publish a post
#[utoipa::path(
    post,
    path = "/posts",
    tag = "Posts",
    responses(
        (status = 201, description = "Post created", body = PostResponse),
        (status = 400, description = "Empty or oversized body, or invalid image"),
        (status = 401, description = "Unauthorized"),
        (status = 429, description = "Posting too fast")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_post(
    State(state): State<AppState>,
    auth: AuthContext,
    headers: HeaderMap,
    form: FormPayload,
) -> Result<(StatusCode, Json<PostResponse>), ApiError> {
    state
        .post_limiter
        .check(&auth.user_id().to_string())
        .await
        .map_err(|retry_after| ApiError::rate_limited(retry_after, &headers))?;

    let body = clean_body(form.text("body").unwrap_or(""))?;
    let image = match form.file("image") {
        Some(file) => Some(
            save_image(state.media.as_ref(), POST_IMAGE_DIR, &file.file_name, &file.bytes)
                .await
                .map_err(|e| ApiError::upload("image", e))?,
        ),
        None => None,
    };

    let created = state
        .storage
        .create_post(NewPost {
            author_id: auth.user_id(),
            body,
            image: image.clone(),
        })
        .await;
    let post = match created {
        Ok(post) => post,
        Err(e) => {
            delete_files(state.media.as_ref(), image).await;
            return Err(e.into());
        }
    };
    info!("User {} published post {}", auth.user_id(), post.public_id.simple());

    let response = post_response(&state, &post, Some(auth.user_id())).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// PUT /posts/{id} - Edit a post
#[utoipa::path(
    put,
    path = "/posts/{id}",
    tag = "Posts",
    params(("id" = String, Path, description = "Post public id")),
    responses(
        (status = 200, description = "Post updated", body = PostResponse),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Post not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_post(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    form: FormPayload,
) -> Result<Json<PostResponse>, ApiError> {
    let mut post = load_post(&state, &id).await?;
    if !auth.user.can_manage(post.author_id) {
        return Err(ApiError::forbidden());
    }

    if let Some(raw) = form.text("body") {
        post.body = clean_body(raw)?;
    }
    let old_image = post.image.clone();
    if let Some(file) = form.file("image") {
        let path = save_image(state.media.as_ref(), POST_IMAGE_DIR, &file.file_name, &file.bytes)
            .await
            .map_err(|e| ApiError::upload("image", e))?;
        post.image = Some(path);
    } else if form.is_cleared("image") {
        post.image = None;
    }
    post.edited = true;

    let updated = match state.storage.update_post(&post).await {
        Ok(updated) => updated,
        Err(e) => {
            replace_file(state.media.as_ref(), post.image.as_deref(), old_image.as_deref()).await;
            return Err(e.into());
        }
    };
    replace_file(
        state.media.as_ref(),
        old_image.as_deref(),
        updated.image.as_deref(),
    )
    .await;

    Ok(Json(post_response(&state, &updated, Some(auth.user_id())).await?))
}

/// DELETE /posts/{id} - Delete a post with its comments and likes
#[utoipa::path(
    delete,
    path = "/posts/{id}",
    tag = "Posts",
    params(("id" = String, Path, description = "Post public id")),
    responses(
        (status = 204, description = "Post deleted"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Post not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_post(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let post = load_post(&state, &id).await?;
    if !auth.user.can_manage(post.author_id) {
        return Err(ApiError::forbidden());
    }
    state.storage.delete_post(post.id).await?;
    delete_files(state.media.as_ref(), post.image).await;
    Ok(StatusCode::NO_CONTENT)
}

/// Load a post the caller may like. Authors cannot like their own posts
/// through any of `like`, `remove_like` or `toggle-like`, so a toggle can
/// never create a self-like.
async fn likable_post(state: &AppState, auth: &AuthContext, id: &str) -> Result<Post, ApiError> {
    let post = load_post(state, id).await?;
    if post.author_id == auth.user_id() {
        return Err(ApiError::BadRequest(
            "You cannot like your own post.".to_string(),
        ));
    }
    Ok(post)
}

/// POST /posts/{id}/like - Like a post
#[utoipa::path(
    post,
    path = "/posts/{id}/like",
    tag = "Posts",
    params(("id" = String, Path, description = "Post public id")),
    responses(
        (status = 200, description = "Post after liking", body = PostResponse),
        (status = 400, description = "Own post"),
        (status = 404, description = "Post not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn like_post(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<PostResponse>, ApiError> {
    let post = likable_post(&state, &auth, &id).await?;
    state.storage.add_like(post.id, auth.user_id()).await?;
    Ok(Json(post_response(&state, &post, Some(auth.user_id())).await?))
}

/// POST /posts/{id}/remove_like - Withdraw a like
#[utoipa::path(
    post,
    path = "/posts/{id}/remove_like",
    tag = "Posts",
    params(("id" = String, Path, description = "Post public id")),
    responses(
        (status = 200, description = "Post after unliking", body = PostResponse),
        (status = 400, description = "Own post"),
        (status = 404, description = "Post not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn remove_like(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<PostResponse>, ApiError> {
    let post = likable_post(&state, &auth, &id).await?;
    state.storage.remove_like(post.id, auth.user_id()).await?;
    Ok(Json(post_response(&state, &post, Some(auth.user_id())).await?))
}

/// POST /posts/{id}/toggle-like - Flip the like state
#[utoipa::path(
    post,
    path = "/posts/{id}/toggle-like",
    tag = "Posts",
    params(("id" = String, Path, description = "Post public id")),
    responses(
        (status = 200, description = "New like state", body = LikeToggleResponse),
        (status = 400, description = "Own post"),
        (status = 404, description = "Post not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn toggle_like(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<LikeToggleResponse>, ApiError> {
    let post = likable_post(&state, &auth, &id).await?;
    let added = state.storage.add_like(post.id, auth.user_id()).await?;
    if !added {
        state.storage.remove_like(post.id, auth.user_id()).await?;
    }
    let stats = state.storage.post_stats(post.id, Some(auth.user_id())).await?;
    Ok(Json(LikeToggleResponse {
        liked: stats.liked,
        likes_count: stats.likes_count,
    }))
}
