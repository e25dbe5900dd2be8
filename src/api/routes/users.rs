//! User profile routes.
//!
//! Profiles are addressed by public id (32 hex characters). Only the owner
//! or a superuser may change or delete an account.

use axum::{
    Json, Router,
    extract::{OriginalUri, Path, Query, State},
    http::StatusCode,
    routing::get,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::app_state::AppState;
use super::auth_context::AuthContext;
use super::error::{ApiError, FieldErrors};
use super::form::FormPayload;
use crate::models::{AuthorSummary, Page, PageRequest, User, UserResponse};
use crate::sanitizer::strip_all_html;
use crate::services::account_service::delete_user_with_media;
use crate::services::media_service::{replace_file, save_image};
use crate::services::password_service::{hash_password, validate_password};

const AVATAR_DIR: &str = "avatars";
const NAME_MAX_CHARS: usize = 150;

pub fn users_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/me", get(get_me))
        .route(
            "/{id}",
            get(get_user).patch(update_user).delete(delete_user),
        )
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct UserListQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// Full user projection with the avatar resolved to a URL.
pub fn user_response(state: &AppState, user: &User) -> UserResponse {
    UserResponse {
        id: user.public_id.simple().to_string(),
        email: user.email.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        avatar: state.media_url(user.avatar.as_deref()),
        is_active: user.is_active,
        is_staff: user.is_staff,
        is_email_verified: user.is_email_verified,
        created: user.created_at,
        updated: user.updated_at,
    }
}

pub fn author_summary(state: &AppState, user: &User) -> AuthorSummary {
    AuthorSummary {
        id: user.public_id.simple().to_string(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        email: user.email.clone(),
        avatar: state.media_url(user.avatar.as_deref()),
    }
}

/// Load the author of a record. A dangling reference is an internal error.
pub async fn load_author(state: &AppState, user_id: i64) -> Result<AuthorSummary, ApiError> {
    let user = state
        .storage
        .get_user(user_id)
        .await?
        .ok_or_else(|| ApiError::Internal(format!("author {} is missing", user_id)))?;
    Ok(author_summary(state, &user))
}

/// Parse a public id path segment. Malformed ids are simply not found.
pub fn parse_public_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found())
}

/// Clean a submitted name field: markup stripped, whitespace trimmed.
pub fn clean_name(raw: &str) -> Result<String, String> {
    let name = strip_all_html(raw).trim().to_string();
    if name.is_empty() {
        return Err("This field may not be blank.".to_string());
    }
    if name.chars().count() > NAME_MAX_CHARS {
        return Err(format!(
            "Ensure this field has no more than {} characters.",
            NAME_MAX_CHARS
        ));
    }
    Ok(name)
}

async fn load_user(state: &AppState, id: &str) -> Result<User, ApiError> {
    let public_id = parse_public_id(id)?;
    state
        .storage
        .get_user_by_public_id(public_id)
        .await?
        .ok_or_else(ApiError::not_found)
}

/// GET /users - List users
#[utoipa::path(
    get,
    path = "/users",
    tag = "Users",
    params(UserListQuery),
    responses(
        (status = 200, description = "Paginated users", body = Object),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_users(
    State(state): State<AppState>,
    auth: AuthContext,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<UserListQuery>,
) -> Result<Json<Page<UserResponse>>, ApiError> {
    let page = PageRequest::resolve(
        query.limit,
        query.offset,
        state.config.page_size,
        state.config.max_page_size,
    );
    let (users, count) = state
        .storage
        .list_users(auth.user.is_superuser, page.limit, page.offset)
        .await?;
    let results = users.iter().map(|u| user_response(&state, u)).collect();
    Ok(Json(Page::new(results, count, page, &uri)))
}

/// GET /users/me - Current user
#[utoipa::path(
    get,
    path = "/users/me",
    tag = "Users",
    responses(
        (status = 200, description = "Authenticated user", body = UserResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_me(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Json<UserResponse> {
    Json(user_response(&state, &auth.user))
}

/// GET /users/{id} - Retrieve a user
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = String, Path, description = "User public id")),
    responses(
        (status = 200, description = "User", body = UserResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_user(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = load_user(&state, &id).await?;
    Ok(Json(user_response(&state, &user)))
}

/// PATCH /users/{id} - Update names, password or avatar
#[utoipa::path(
    patch,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = String, Path, description = "User public id")),
    responses(
        (status = 200, description = "Updated user", body = UserResponse),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Not the account owner"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_user(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    form: FormPayload,
) -> Result<Json<UserResponse>, ApiError> {
    let mut user = load_user(&state, &id).await?;
    if !auth.user.can_manage(user.id) {
        return Err(ApiError::forbidden());
    }

    let mut errors = FieldErrors::new();
    for field in ["first_name", "last_name"] {
        let Some(raw) = form.text(field) else {
            continue;
        };
        match clean_name(raw) {
            Ok(name) if field == "first_name" => user.first_name = name,
            Ok(name) => user.last_name = name,
            Err(message) => errors.add(field, message),
        }
    }
    if let Some(password) = form.text("password") {
        match validate_password(password) {
            Ok(()) => user.password_hash = hash_password(password).map_err(ApiError::Internal)?,
            Err(messages) => {
                for message in messages {
                    errors.add("password", message);
                }
            }
        }
    }
    errors.into_result()?;

    let old_avatar = user.avatar.clone();
    if let Some(file) = form.file("avatar") {
        let path = save_image(state.media.as_ref(), AVATAR_DIR, &file.file_name, &file.bytes)
            .await
            .map_err(|e| ApiError::upload("avatar", e))?;
        user.avatar = Some(path);
    } else if form.is_cleared("avatar") {
        user.avatar = None;
    }

    let updated = match state.storage.update_user(&user).await {
        Ok(updated) => updated,
        Err(e) => {
            // Drop the freshly stored avatar when the update fails.
            replace_file(state.media.as_ref(), user.avatar.as_deref(), old_avatar.as_deref())
                .await;
            return Err(e.into());
        }
    };
    replace_file(
        state.media.as_ref(),
        old_avatar.as_deref(),
        updated.avatar.as_deref(),
    )
    .await;

    Ok(Json(user_response(&state, &updated)))
}

/// DELETE /users/{id} - Delete an account and its media
#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = String, Path, description = "User public id")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 403, description = "Not the account owner"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_user(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let user = load_user(&state, &id).await?;
    if !auth.user.can_manage(user.id) {
        return Err(ApiError::forbidden());
    }
    delete_user_with_media(state.storage.as_ref(), state.media.as_ref(), &user).await?;
    info!("Deleted user {}", user.public_id.simple());
    Ok(StatusCode::NO_CONTENT)
}
