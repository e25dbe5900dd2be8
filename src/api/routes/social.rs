//! Social directory routes: useful contacts grouped under a title.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};

use super::ads::is_valid_phone;
use super::app_state::AppState;
use super::auth_context::AuthContext;
use super::error::{ApiError, FieldErrors};
use super::form::ApiJson;
use crate::models::social::{CreateSocialRequest, DEFAULT_ICON_NAME};
use crate::models::{NewSocial, Social};
use crate::sanitizer::strip_all_html;
use crate::services::slug_service::slugify_bounded;

const SLUG_MAX: usize = 100;

pub fn social_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_socials).post(create_social))
        .route("/{slug}", get(get_social))
}

/// GET /info/social - Directory entries in random order
#[utoipa::path(
    get,
    path = "/info/social",
    tag = "Social",
    responses(
        (status = 200, description = "All directory entries", body = Vec<Social>)
    )
)]
pub async fn list_socials(State(state): State<AppState>) -> Result<Json<Vec<Social>>, ApiError> {
    Ok(Json(state.storage.list_socials().await?))
}

/// GET /info/social/{slug} - Retrieve a directory entry
#[utoipa::path(
    get,
    path = "/info/social/{slug}",
    tag = "Social",
    params(("slug" = String, Path, description = "Entry slug")),
    responses(
        (status = 200, description = "Directory entry", body = Social),
        (status = 404, description = "Entry not found")
    )
)]
pub async fn get_social(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Social>, ApiError> {
    state
        .storage
        .get_social_by_slug(&slug)
        .await?
        .map(Json)
        .ok_or_else(ApiError::not_found)
}

/// POST /info/social - Add a directory entry (staff)
#[utoipa::path(
    post,
    path = "/info/social",
    tag = "Social",
    request_body = CreateSocialRequest,
    responses(
        (status = 201, description = "Entry created", body = Social),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Staff only"),
        (status = 409, description = "Slug already taken")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_social(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(request): ApiJson<CreateSocialRequest>,
) -> Result<(StatusCode, Json<Social>), ApiError> {
    if !auth.is_staff() {
        return Err(ApiError::forbidden());
    }

    let mut errors = FieldErrors::new();
    let title = strip_all_html(&request.title).trim().to_string();
    if title.is_empty() {
        errors.add("title", "This field may not be blank.");
    }
    let phones: Vec<String> = request
        .phones
        .iter()
        .map(|phone| phone.trim().to_string())
        .filter(|phone| !phone.is_empty())
        .collect();
    for phone in &phones {
        if !is_valid_phone(phone) {
            errors.add("phones", format!("Enter a valid phone number: {}", phone));
        }
    }
    errors.into_result()?;

    let icon_name = request
        .icon_name
        .map(|icon| icon.trim().to_string())
        .filter(|icon| !icon.is_empty())
        .unwrap_or_else(|| DEFAULT_ICON_NAME.to_string());
    let social = state
        .storage
        .create_social(NewSocial {
            slug: slugify_bounded(&title, SLUG_MAX, "social"),
            title,
            icon_name,
            phones,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(social)))
}
