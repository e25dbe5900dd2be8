//! Services catalog routes.
//!
//! Anyone may browse active services; staff see and manage everything.

use axum::{
    Json, Router,
    extract::{OriginalUri, Path, Query, State},
    http::StatusCode,
    routing::get,
};
use tracing::info;

use super::app_state::AppState;
use super::auth_context::{AuthContext, OptionalAuthContext};
use super::error::{ApiError, FieldErrors};
use super::form::FormPayload;
use crate::models::service::{ServiceListItem, ServiceListQuery, ServiceResponse};
use crate::models::{
    NewService, Page, PageRequest, Price, Service, ServiceFilter, ServiceOrdering,
};
use crate::sanitizer::{sanitize_html, strip_all_html};
use crate::services::media_service::{delete_files, replace_file, save_service_image};
use crate::services::slug_service::slugify_bounded;
use crate::services::text_service::short_description;

const TITLE_MAX_CHARS: usize = 255;
const SLUG_MAX: usize = 240;
const SHORT_DESCRIPTION_CHARS: usize = 100;

pub fn catalog_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_services).post(create_service))
        .route(
            "/{slug}",
            get(get_service)
                .put(update_service)
                .patch(update_service)
                .delete(delete_service),
        )
}

fn list_item(state: &AppState, service: &Service) -> ServiceListItem {
    ServiceListItem {
        id: service.id,
        title: service.title.clone(),
        slug: service.slug.clone(),
        short_description: short_description(
            &strip_all_html(&service.description),
            SHORT_DESCRIPTION_CHARS,
        ),
        price: service.price,
        image_url: state.media_url(service.image.as_deref()),
    }
}

fn detail(state: &AppState, service: Service) -> ServiceResponse {
    ServiceResponse {
        image: state.media_url(service.image.as_deref()),
        id: service.id,
        title: service.title,
        slug: service.slug,
        description: service.description,
        price: service.price,
        is_active: service.is_active,
        created_at: service.created_at,
        updated_at: service.updated_at,
    }
}

fn require_staff(auth: &AuthContext) -> Result<(), ApiError> {
    if auth.is_staff() {
        Ok(())
    } else {
        Err(ApiError::forbidden())
    }
}

/// First free slug for `title`: the bare slug, then `-1`, `-2`, ...
async fn unique_slug(
    state: &AppState,
    title: &str,
    exclude_id: Option<i64>,
) -> Result<String, ApiError> {
    let base = slugify_bounded(title, SLUG_MAX, "service");
    let mut candidate = base.clone();
    let mut suffix = 1;
    while state
        .storage
        .service_slug_exists(&candidate, exclude_id)
        .await?
    {
        candidate = format!("{}-{}", base, suffix);
        suffix += 1;
    }
    Ok(candidate)
}

/// Submitted service fields. `None` means the field was not sent.
#[derive(Debug, Default)]
struct ServiceFields {
    title: Option<String>,
    description: Option<String>,
    price: Option<Price>,
    is_active: Option<bool>,
}

impl ServiceFields {
    fn parse(form: &FormPayload, creating: bool) -> Result<Self, ApiError> {
        let mut errors = FieldErrors::new();
        let mut fields = ServiceFields::default();

        match form.text("title").map(|raw| strip_all_html(raw).trim().to_string()) {
            Some(title) if title.is_empty() => {
                errors.add("title", "This field may not be blank.");
            }
            Some(title) if title.chars().count() > TITLE_MAX_CHARS => errors.add(
                "title",
                format!(
                    "Ensure this field has no more than {} characters.",
                    TITLE_MAX_CHARS
                ),
            ),
            Some(title) => fields.title = Some(title),
            None if creating => errors.add("title", "This field is required."),
            None => {}
        }

        fields.description = form.text("description").map(sanitize_html);

        match form.text("price") {
            Some(raw) => match raw.parse::<Price>() {
                Ok(price) => fields.price = Some(price),
                Err(message) => errors.add("price", message),
            },
            None if creating => errors.add("price", "This field is required."),
            None => {}
        }

        match form.boolean("is_active") {
            Ok(value) => fields.is_active = value,
            Err(message) => errors.add("is_active", message),
        }

        errors.into_result()?;
        Ok(fields)
    }
}

/// GET /services - List catalog services
#[utoipa::path(
    get,
    path = "/services",
    tag = "Services",
    params(ServiceListQuery),
    responses(
        (status = 200, description = "Paginated services", body = Object)
    )
)]
pub async fn list_services(
    State(state): State<AppState>,
    viewer: OptionalAuthContext,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<ServiceListQuery>,
) -> Result<Json<Page<ServiceListItem>>, ApiError> {
    let page = PageRequest::resolve(
        query.limit,
        query.offset,
        state.config.page_size,
        state.config.max_page_size,
    );
    let filter = ServiceFilter {
        is_active: if viewer.is_staff() {
            query.is_active
        } else {
            Some(true)
        },
        search: query
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        ordering: ServiceOrdering::parse(query.ordering.as_deref()),
    };

    let (services, count) = state
        .storage
        .list_services(&filter, page.limit, page.offset)
        .await?;
    let results = services.iter().map(|s| list_item(&state, s)).collect();
    Ok(Json(Page::new(results, count, page, &uri)))
}

/// GET /services/{slug} - Retrieve a service
#[utoipa::path(
    get,
    path = "/services/{slug}",
    tag = "Services",
    params(("slug" = String, Path, description = "Service slug")),
    responses(
        (status = 200, description = "Service", body = ServiceResponse),
        (status = 404, description = "Service not found or inactive")
    )
)]
pub async fn get_service(
    State(state): State<AppState>,
    viewer: OptionalAuthContext,
    Path(slug): Path<String>,
) -> Result<Json<ServiceResponse>, ApiError> {
    let service = state
        .storage
        .get_service_by_slug(&slug)
        .await?
        .filter(|service| service.is_active || viewer.is_staff())
        .ok_or_else(ApiError::not_found)?;
    Ok(Json(detail(&state, service)))
}

/// POST /services - Add a service (staff)
#[utoipa::path(
    post,
    path = "/services",
    tag = "Services",
    responses(
        (status = 201, description = "Service created", body = ServiceResponse),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Staff only")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_service(
    State(state): State<AppState>,
    auth: AuthContext,
    form: FormPayload,
) -> Result<(StatusCode, Json<ServiceResponse>), ApiError> {
    require_staff(&auth)?;
    let fields = ServiceFields::parse(&form, true)?;
    let (Some(title), Some(price)) = (fields.title, fields.price) else {
        return Err(ApiError::BadRequest("Missing required fields.".to_string()));
    };

    let image = match form.file("image") {
        Some(file) => Some(
            save_service_image(state.media.as_ref(), &file.file_name, &file.bytes)
                .await
                .map_err(|e| ApiError::upload("image", e))?,
        ),
        None => None,
    };
    let new_service = NewService {
        slug: unique_slug(&state, &title, None).await?,
        title,
        image: image.clone(),
        description: fields.description.unwrap_or_default(),
        price,
        is_active: fields.is_active.unwrap_or(true),
    };
    let service = match state.storage.create_service(new_service).await {
        Ok(service) => service,
        Err(e) => {
            delete_files(state.media.as_ref(), image).await;
            return Err(e.into());
        }
    };
    info!("Service {} created by user {}", service.slug, auth.user_id());

    Ok((StatusCode::CREATED, Json(detail(&state, service))))
}

/// PUT/PATCH /services/{slug} - Update a service (staff)
#[utoipa::path(
    patch,
    path = "/services/{slug}",
    tag = "Services",
    params(("slug" = String, Path, description = "Service slug")),
    responses(
        (status = 200, description = "Service updated", body = ServiceResponse),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Service not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_service(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(slug): Path<String>,
    form: FormPayload,
) -> Result<Json<ServiceResponse>, ApiError> {
    require_staff(&auth)?;
    let mut service = state
        .storage
        .get_service_by_slug(&slug)
        .await?
        .ok_or_else(ApiError::not_found)?;
    let fields = ServiceFields::parse(&form, false)?;

    if let Some(title) = fields.title
        && title != service.title
    {
        service.slug = unique_slug(&state, &title, Some(service.id)).await?;
        service.title = title;
    }
    if let Some(description) = fields.description {
        service.description = description;
    }
    if let Some(price) = fields.price {
        service.price = price;
    }
    if let Some(is_active) = fields.is_active {
        service.is_active = is_active;
    }

    let old_image = service.image.clone();
    if let Some(file) = form.file("image") {
        let path = save_service_image(state.media.as_ref(), &file.file_name, &file.bytes)
            .await
            .map_err(|e| ApiError::upload("image", e))?;
        service.image = Some(path);
    } else if form.is_cleared("image") {
        service.image = None;
    }

    let updated = match state.storage.update_service(&service).await {
        Ok(updated) => updated,
        Err(e) => {
            replace_file(state.media.as_ref(), service.image.as_deref(), old_image.as_deref())
                .await;
            return Err(e.into());
        }
    };
    replace_file(
        state.media.as_ref(),
        old_image.as_deref(),
        updated.image.as_deref(),
    )
    .await;

    Ok(Json(detail(&state, updated)))
}

/// DELETE /services/{slug} - Remove a service (staff)
#[utoipa::path(
    delete,
    path = "/services/{slug}",
    tag = "Services",
    params(("slug" = String, Path, description = "Service slug")),
    responses(
        (status = 204, description = "Service deleted"),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Service not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_service(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(slug): Path<String>,
) -> Result<StatusCode, ApiError> {
    require_staff(&auth)?;
    let service = state
        .storage
        .get_service_by_slug(&slug)
        .await?
        .ok_or_else(ApiError::not_found)?;
    state.storage.delete_service(service.id).await?;
    delete_files(state.media.as_ref(), service.image).await;
    Ok(StatusCode::NO_CONTENT)
}
