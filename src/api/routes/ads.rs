//! Classified advertisement routes.
//!
//! Ads are addressed by slug (`{slugified title}-{id}`). The slug is fixed at
//! creation and does not follow later title edits. Each ad has an optional
//! main image plus a gallery of up to [`MAX_AD_IMAGES`] images.

use axum::{
    Json, Router,
    extract::{OriginalUri, Path, Query, State},
    http::StatusCode,
    routing::{delete, get},
};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::info;
use validator::ValidateEmail;

use super::app_state::AppState;
use super::auth_context::AuthContext;
use super::error::{ApiError, FieldErrors};
use super::form::{FormPayload, UploadedFile};
use super::users::load_author;
use crate::models::advertisement::{AdListQuery, MAX_AD_IMAGES};
use crate::models::{
    Advertisement, AdvertisementImageResponse, AdvertisementResponse, Category,
    NewAdvertisement, Page, PageRequest, Price,
};
use crate::sanitizer::{sanitize_html, strip_all_html};
use crate::services::media_service::{delete_files, replace_file, save_image};
use crate::services::slug_service::slugify_bounded;
use crate::storage::AdFilter;

const AD_IMAGE_DIR: &str = "ads";
const TITLE_MAX_CHARS: usize = 255;
const LOCATION_MAX_CHARS: usize = 255;
const PHONE_MAX_CHARS: usize = 32;
const SLUG_BASE_MAX: usize = 80;

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9()\- ]+$").expect("valid regex"));

pub fn ads_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_ads).post(create_ad))
        .route(
            "/{slug}",
            get(get_ad)
                .put(update_ad)
                .patch(update_ad)
                .delete(delete_ad),
        )
        .route("/{slug}/images/{image_id}", delete(delete_ad_image))
}

/// Whether `raw` looks like a phone number: an optional leading `+`, then
/// digits with spaces, dashes or parentheses, 5 to 15 digits in total.
pub fn is_valid_phone(raw: &str) -> bool {
    let digits = raw.chars().filter(char::is_ascii_digit).count();
    PHONE_RE.is_match(raw) && (5..=15).contains(&digits)
}

/// Submitted ad fields. `None` means the field was not sent.
#[derive(Debug, Default)]
struct AdFields {
    title: Option<String>,
    description: Option<String>,
    category: Option<Category>,
    price: Option<Option<Price>>,
    location: Option<String>,
    contact_phone: Option<String>,
    contact_email: Option<String>,
    is_active: Option<bool>,
}

fn bounded_text(
    errors: &mut FieldErrors,
    field: &str,
    raw: &str,
    max_chars: usize,
) -> Option<String> {
    let value = strip_all_html(raw).trim().to_string();
    if value.chars().count() > max_chars {
        errors.add(
            field,
            format!("Ensure this field has no more than {} characters.", max_chars),
        );
        return None;
    }
    Some(value)
}

impl AdFields {
    /// Parse and validate whatever fields the form carries. With `creating`
    /// set, title, description, category and contact_phone are required.
    fn parse(form: &FormPayload, creating: bool, errors: &mut FieldErrors) -> Self {
        let mut fields = AdFields::default();
        let required = |errors: &mut FieldErrors, field: &str| {
            if creating {
                errors.add(field, "This field is required.");
            }
        };

        match form.text("title") {
            Some(raw) => {
                fields.title = bounded_text(errors, "title", raw, TITLE_MAX_CHARS);
                if fields.title.as_deref() == Some("") {
                    errors.add("title", "This field may not be blank.");
                }
            }
            None => required(errors, "title"),
        }

        match form.text("description") {
            Some(raw) => fields.description = Some(sanitize_html(raw)),
            None => required(errors, "description"),
        }

        match form.text("category") {
            Some(raw) => match raw.parse::<Category>() {
                Ok(category) => fields.category = Some(category),
                Err(message) => errors.add("category", message),
            },
            None => required(errors, "category"),
        }

        if form.has("price") {
            match form.text("price").map(str::trim).filter(|s| !s.is_empty()) {
                Some(raw) => match raw.parse::<Price>() {
                    Ok(price) => fields.price = Some(Some(price)),
                    Err(message) => errors.add("price", message),
                },
                None => fields.price = Some(None),
            }
        }

        if let Some(raw) = form.text("location") {
            fields.location = bounded_text(errors, "location", raw, LOCATION_MAX_CHARS);
        }

        match form.text("contact_phone").map(str::trim) {
            Some(phone) if phone.chars().count() > PHONE_MAX_CHARS => errors.add(
                "contact_phone",
                format!(
                    "Ensure this field has no more than {} characters.",
                    PHONE_MAX_CHARS
                ),
            ),
            Some(phone) if is_valid_phone(phone) => {
                fields.contact_phone = Some(phone.to_string());
            }
            Some(_) => errors.add("contact_phone", "Enter a valid phone number."),
            None => required(errors, "contact_phone"),
        }

        if let Some(email) = form.text("contact_email").map(str::trim) {
            if email.is_empty() || email.validate_email() {
                fields.contact_email = Some(email.to_lowercase());
            } else {
                errors.add("contact_email", "Enter a valid email address.");
            }
        }

        match form.boolean("is_active") {
            Ok(value) => fields.is_active = value,
            Err(message) => errors.add("is_active", message),
        }

        fields
    }
}

/// Reject a main image that shares its file name with a gallery upload.
fn check_distinct_main_image(
    main_image: Option<&UploadedFile>,
    gallery: &[UploadedFile],
    errors: &mut FieldErrors,
) {
    if let Some(main) = main_image
        && gallery.iter().any(|image| image.file_name == main.file_name)
    {
        errors.add(
            "main_image",
            "The main image must not duplicate a gallery image.",
        );
    }
}

/// Store gallery uploads. On failure, files stored so far are removed.
async fn save_gallery(state: &AppState, files: &[UploadedFile]) -> Result<Vec<String>, ApiError> {
    let mut saved = Vec::with_capacity(files.len());
    for file in files {
        match save_image(state.media.as_ref(), AD_IMAGE_DIR, &file.file_name, &file.bytes).await {
            Ok(path) => saved.push(path),
            Err(e) => {
                delete_files(state.media.as_ref(), saved).await;
                return Err(ApiError::upload("images", e));
            }
        }
    }
    Ok(saved)
}

async fn save_main_image(
    state: &AppState,
    file: Option<&UploadedFile>,
) -> Result<Option<String>, ApiError> {
    match file {
        Some(file) => save_image(state.media.as_ref(), AD_IMAGE_DIR, &file.file_name, &file.bytes)
            .await
            .map(Some)
            .map_err(|e| ApiError::upload("main_image", e)),
        None => Ok(None),
    }
}

async fn ad_response(
    state: &AppState,
    ad: &Advertisement,
) -> Result<AdvertisementResponse, ApiError> {
    let images = state
        .storage
        .list_advertisement_images(ad.id)
        .await?
        .into_iter()
        .map(|image| AdvertisementImageResponse {
            id: image.id,
            image: state.media.url(&image.image),
            order: image.sort_order,
        })
        .collect();

    Ok(AdvertisementResponse {
        id: ad.id,
        slug: ad.slug.clone(),
        user: load_author(state, ad.owner_id).await?,
        title: ad.title.clone(),
        description: ad.description.clone(),
        category: ad.category,
        category_display: ad.category.label().to_string(),
        price: ad.price,
        location: ad.location.clone(),
        contact_phone: ad.contact_phone.clone(),
        contact_email: ad.contact_email.clone(),
        is_active: ad.is_active,
        main_image: state.media_url(ad.main_image.as_deref()),
        images,
        created_at: ad.created_at,
        updated_at: ad.updated_at,
    })
}

async fn load_ad(state: &AppState, slug: &str) -> Result<Advertisement, ApiError> {
    state
        .storage
        .get_advertisement_by_slug(slug)
        .await?
        .ok_or_else(ApiError::not_found)
}

async fn load_owned_ad(
    state: &AppState,
    auth: &AuthContext,
    slug: &str,
) -> Result<Advertisement, ApiError> {
    let ad = load_ad(state, slug).await?;
    if ad.owner_id != auth.user_id() {
        return Err(ApiError::forbidden());
    }
    Ok(ad)
}

/// GET /ads - List advertisements, newest first
#[utoipa::path(
    get,
    path = "/ads",
    tag = "Advertisements",
    params(AdListQuery),
    responses(
        (status = 200, description = "Paginated advertisements", body = Object),
        (status = 400, description = "Unknown category")
    )
)]
pub async fn list_ads(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<AdListQuery>,
) -> Result<Json<Page<AdvertisementResponse>>, ApiError> {
    let page = PageRequest::resolve(
        query.limit,
        query.offset,
        state.config.page_size,
        state.config.max_page_size,
    );

    let mut filter = AdFilter::default();
    if let Some(raw) = query.category.as_deref().filter(|s| !s.is_empty()) {
        filter.category = Some(
            raw.parse::<Category>()
                .map_err(|message: String| ApiError::field("category", message))?,
        );
    }
    if let Some(raw) = query.user.as_deref().filter(|s| !s.is_empty()) {
        let owner = match uuid::Uuid::parse_str(raw) {
            Ok(public_id) => state.storage.get_user_by_public_id(public_id).await?,
            Err(_) => None,
        };
        match owner {
            Some(owner) => filter.owner_id = Some(owner.id),
            None => return Ok(Json(Page::new(Vec::new(), 0, page, &uri))),
        }
    }

    let (ads, count) = state
        .storage
        .list_advertisements(&filter, page.limit, page.offset)
        .await?;
    let mut results = Vec::with_capacity(ads.len());
    for ad in &ads {
        results.push(ad_response(&state, ad).await?);
    }
    Ok(Json(Page::new(results, count, page, &uri)))
}

/// GET /ads/{slug} - Retrieve an advertisement
#[utoipa::path(
    get,
    path = "/ads/{slug}",
    tag = "Advertisements",
    params(("slug" = String, Path, description = "Advertisement slug")),
    responses(
        (status = 200, description = "Advertisement", body = AdvertisementResponse),
        (status = 404, description = "Advertisement not found")
    )
)]
pub async fn get_ad(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<AdvertisementResponse>, ApiError> {
    let ad = load_ad(&state, &slug).await?;
    Ok(Json(ad_response(&state, &ad).await?))
}

/// POST /ads - Publish an advertisement
#[utoipa::path(
    post,
    path = "/ads",
    tag = "Advertisements",
    responses(
        (status = 201, description = "Advertisement created", body = AdvertisementResponse),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_ad(
    State(state): State<AppState>,
    auth: AuthContext,
    form: FormPayload,
) -> Result<(StatusCode, Json<AdvertisementResponse>), ApiError> {
    let mut errors = FieldErrors::new();
    let fields = AdFields::parse(&form, true, &mut errors);
    let gallery = form.files("images");
    if gallery.len() > MAX_AD_IMAGES {
        errors.add(
            "images",
            format!("No more than {} images are allowed.", MAX_AD_IMAGES),
        );
    }
    check_distinct_main_image(form.file("main_image"), gallery, &mut errors);
    errors.into_result()?;

    let (Some(title), Some(description), Some(category), Some(contact_phone)) = (
        fields.title,
        fields.description,
        fields.category,
        fields.contact_phone,
    ) else {
        return Err(ApiError::BadRequest("Missing required fields.".to_string()));
    };
    let price = if category.has_price() {
        fields.price.flatten()
    } else {
        None
    };

    let main_image = save_main_image(&state, form.file("main_image")).await?;
    let gallery_paths = match save_gallery(&state, gallery).await {
        Ok(paths) => paths,
        Err(e) => {
            delete_files(state.media.as_ref(), main_image).await;
            return Err(e);
        }
    };

    let new_ad = NewAdvertisement {
        owner_id: auth.user_id(),
        slug_base: slugify_bounded(&title, SLUG_BASE_MAX, "ad"),
        title,
        description,
        category,
        price,
        location: fields.location.unwrap_or_default(),
        contact_phone,
        contact_email: fields.contact_email.unwrap_or_default(),
        is_active: fields.is_active.unwrap_or(true),
        main_image: main_image.clone(),
    };
    let ad = match state.storage.create_advertisement(new_ad).await {
        Ok(ad) => ad,
        Err(e) => {
            delete_files(state.media.as_ref(), main_image.into_iter().chain(gallery_paths))
                .await;
            return Err(e.into());
        }
    };
    for (order, path) in (0i32..).zip(gallery_paths) {
        state
            .storage
            .add_advertisement_image(ad.id, path, order)
            .await?;
    }
    info!("User {} published ad {}", auth.user_id(), ad.slug);

    Ok((StatusCode::CREATED, Json(ad_response(&state, &ad).await?)))
}

/// PUT/PATCH /ads/{slug} - Update an advertisement
#[utoipa::path(
    patch,
    path = "/ads/{slug}",
    tag = "Advertisements",
    params(("slug" = String, Path, description = "Advertisement slug")),
    responses(
        (status = 200, description = "Advertisement updated", body = AdvertisementResponse),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Advertisement not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_ad(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(slug): Path<String>,
    form: FormPayload,
) -> Result<Json<AdvertisementResponse>, ApiError> {
    let mut ad = load_owned_ad(&state, &auth, &slug).await?;
    let existing = state.storage.list_advertisement_images(ad.id).await?;

    let mut errors = FieldErrors::new();
    let fields = AdFields::parse(&form, false, &mut errors);
    let gallery = form.files("images");
    if existing.len() + gallery.len() > MAX_AD_IMAGES {
        errors.add(
            "images",
            format!(
                "An advertisement can have at most {} images ({} already attached).",
                MAX_AD_IMAGES,
                existing.len()
            ),
        );
    }
    check_distinct_main_image(form.file("main_image"), gallery, &mut errors);
    errors.into_result()?;

    if let Some(title) = fields.title {
        ad.title = title;
    }
    if let Some(description) = fields.description {
        ad.description = description;
    }
    if let Some(category) = fields.category {
        ad.category = category;
    }
    if let Some(price) = fields.price {
        ad.price = price;
    }
    if !ad.category.has_price() {
        ad.price = None;
    }
    if let Some(location) = fields.location {
        ad.location = location;
    }
    if let Some(phone) = fields.contact_phone {
        ad.contact_phone = phone;
    }
    if let Some(email) = fields.contact_email {
        ad.contact_email = email;
    }
    if let Some(is_active) = fields.is_active {
        ad.is_active = is_active;
    }

    let old_main = ad.main_image.clone();
    if let Some(new_main) = save_main_image(&state, form.file("main_image")).await? {
        ad.main_image = Some(new_main);
    } else if form.is_cleared("main_image") {
        ad.main_image = None;
    }
    let gallery_paths = match save_gallery(&state, gallery).await {
        Ok(paths) => paths,
        Err(e) => {
            replace_file(state.media.as_ref(), ad.main_image.as_deref(), old_main.as_deref())
                .await;
            return Err(e);
        }
    };

    let updated = match state.storage.update_advertisement(&ad).await {
        Ok(updated) => updated,
        Err(e) => {
            replace_file(state.media.as_ref(), ad.main_image.as_deref(), old_main.as_deref())
                .await;
            delete_files(state.media.as_ref(), gallery_paths).await;
            return Err(e.into());
        }
    };
    replace_file(
        state.media.as_ref(),
        old_main.as_deref(),
        updated.main_image.as_deref(),
    )
    .await;

    let next_order = existing
        .iter()
        .map(|image| image.sort_order + 1)
        .max()
        .unwrap_or(0);
    for (order, path) in (next_order..).zip(gallery_paths) {
        state
            .storage
            .add_advertisement_image(updated.id, path, order)
            .await?;
    }

    Ok(Json(ad_response(&state, &updated).await?))
}

/// DELETE /ads/{slug} - Delete an advertisement and its images
#[utoipa::path(
    delete,
    path = "/ads/{slug}",
    tag = "Advertisements",
    params(("slug" = String, Path, description = "Advertisement slug")),
    responses(
        (status = 204, description = "Advertisement deleted"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Advertisement not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_ad(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(slug): Path<String>,
) -> Result<StatusCode, ApiError> {
    let ad = load_owned_ad(&state, &auth, &slug).await?;
    let images = state.storage.list_advertisement_images(ad.id).await?;
    state.storage.delete_advertisement(ad.id).await?;

    let paths = ad
        .main_image
        .into_iter()
        .chain(images.into_iter().map(|image| image.image));
    delete_files(state.media.as_ref(), paths).await;
    info!("Deleted ad {}", ad.slug);
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /ads/{slug}/images/{image_id} - Remove one gallery image
#[utoipa::path(
    delete,
    path = "/ads/{slug}/images/{image_id}",
    tag = "Advertisements",
    params(
        ("slug" = String, Path, description = "Advertisement slug"),
        ("image_id" = i64, Path, description = "Gallery image id")
    ),
    responses(
        (status = 204, description = "Image removed"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Advertisement or image not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_ad_image(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((slug, image_id)): Path<(String, i64)>,
) -> Result<StatusCode, ApiError> {
    let ad = load_owned_ad(&state, &auth, &slug).await?;
    let image = state
        .storage
        .get_advertisement_image(ad.id, image_id)
        .await?
        .ok_or_else(ApiError::not_found)?;
    state.storage.delete_advertisement_image(image.id).await?;
    state.media.delete(&image.image).await;
    Ok(StatusCode::NO_CONTENT)
}
