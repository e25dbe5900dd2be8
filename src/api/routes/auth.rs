//! Account and authentication routes.
//!
//! Registration creates an inactive account and emails a verification link.
//! Once verified, a user logs in with email and password and receives a JWT
//! pair:
//! - access tokens authenticate requests (`Authorization: Bearer ...`)
//! - refresh tokens are exchanged for a new pair at `/auth/refresh`

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;
use tracing::{info, warn};
use validator::{Validate, ValidateEmail};

use super::app_state::AppState;
use super::auth_context::AuthContext;
use super::error::{ApiError, FieldErrors};
use super::form::{ApiJson, FormPayload};
use super::users::{clean_name, user_response};
use crate::models::user::{
    ChangePasswordRequest, LoginRequest, LoginResponse, MessageResponse,
    PasswordResetConfirmRequest, PasswordResetRequest, RefreshRequest, TokenResponse,
};
use crate::models::{NewUser, User, UserResponse};
use crate::services::account_service::{
    delete_user_with_media, generate_token, password_reset_ttl, token_expired, verification_ttl,
};
use crate::services::media_service::{delete_files, save_image};
use crate::services::password_service::{hash_password, validate_password, verify_password};

const PASSWORD_RESET_SENT: &str =
    "If an account with this email exists, a password reset link has been sent.";

pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/verify-email/{token}", get(verify_email))
        .route("/login", post(login))
        .route("/refresh", post(refresh_token))
        .route("/password-reset", post(request_password_reset))
        .route("/password-reset/confirm", post(confirm_password_reset))
        .route("/change-password", post(change_password))
}

fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn push_password_errors(errors: &mut FieldErrors, field: &str, password: &str) {
    if let Err(messages) = validate_password(password) {
        for message in messages {
            errors.add(field, message);
        }
    }
}

fn invalid_credentials() -> ApiError {
    ApiError::Unauthorized("No active account found with the given credentials.".to_string())
}

/// POST /auth/register - Create an account and send the verification email
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "Authentication",
    responses(
        (status = 201, description = "Account created; verification email sent", body = UserResponse),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    form: FormPayload,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let mut errors = FieldErrors::new();

    let email = normalize_email(form.text("email").unwrap_or(""));
    if email.is_empty() {
        errors.add("email", "This field is required.");
    } else if !email.validate_email() {
        errors.add("email", "Enter a valid email address.");
    }

    let password = form.text("password").unwrap_or("");
    if password.is_empty() {
        errors.add("password", "This field is required.");
    } else {
        push_password_errors(&mut errors, "password", password);
    }

    let mut names = [String::new(), String::new()];
    for (slot, field) in names.iter_mut().zip(["first_name", "last_name"]) {
        match clean_name(form.text(field).unwrap_or("")) {
            Ok(name) => *slot = name,
            Err(message) => errors.add(field, message),
        }
    }
    errors.into_result()?;

    if state.storage.get_user_by_email(&email).await?.is_some() {
        return Err(ApiError::Conflict(
            "A user with this email already exists.".to_string(),
        ));
    }

    let avatar = match form.file("avatar") {
        Some(file) => Some(
            save_image(state.media.as_ref(), "avatars", &file.file_name, &file.bytes)
                .await
                .map_err(|e| ApiError::upload("avatar", e))?,
        ),
        None => None,
    };

    let [first_name, last_name] = names;
    let token = generate_token();
    let new_user = NewUser {
        email,
        first_name,
        last_name,
        password_hash: hash_password(password).map_err(ApiError::Internal)?,
        avatar: avatar.clone(),
        is_active: false,
        is_staff: false,
        is_superuser: false,
        is_email_verified: false,
        email_verification_token: Some(token.clone()),
        email_verification_sent_at: Some(Utc::now()),
    };
    let user = match state.storage.create_user(new_user).await {
        Ok(user) => user,
        Err(e) => {
            delete_files(state.media.as_ref(), avatar).await;
            return Err(e.into());
        }
    };

    if let Err(e) = state.email.send_verification_email(&user.email, &token).await {
        warn!("Failed to send verification email to {}: {:#}", user.email, e);
    }
    info!("Registered user {}", user.public_id.simple());

    Ok((StatusCode::CREATED, Json(user_response(&state, &user))))
}

/// GET /auth/verify-email/{token} - Activate an account
#[utoipa::path(
    get,
    path = "/auth/verify-email/{token}",
    tag = "Authentication",
    params(("token" = String, Path, description = "Verification token from the email")),
    responses(
        (status = 200, description = "Email verified", body = MessageResponse),
        (status = 404, description = "Unknown token"),
        (status = 410, description = "Token expired; the account was removed")
    )
)]
pub async fn verify_email(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut user = state
        .storage
        .get_user_by_verification_token(&token)
        .await?
        .ok_or_else(|| ApiError::NotFound("Invalid verification token.".to_string()))?;

    if token_expired(user.email_verification_sent_at, verification_ttl(), Utc::now()) {
        delete_user_with_media(state.storage.as_ref(), state.media.as_ref(), &user).await?;
        info!("Verification link expired; removed user {}", user.email);
        return Err(ApiError::Gone(
            "The verification link has expired. Please register again.".to_string(),
        ));
    }

    user.is_active = true;
    user.is_email_verified = true;
    user.email_verification_token = None;
    user.email_verification_sent_at = None;
    state.storage.update_user(&user).await?;
    info!("Email verified for user {}", user.public_id.simple());

    Ok(Json(MessageResponse::new("Email successfully verified.")))
}

/// POST /auth/login - Exchange credentials for a token pair
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Tokens issued", body = LoginResponse),
        (status = 401, description = "Invalid credentials or inactive account")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let email = normalize_email(&request.email);
    let Some(user) = state.storage.get_user_by_email(&email).await? else {
        return Err(invalid_credentials());
    };
    if !user.is_active || !user.is_email_verified {
        return Err(invalid_credentials());
    }
    let matches = verify_password(&request.password, &user.password_hash).map_err(|e| {
        warn!("Password check failed for {}: {}", user.email, e);
        invalid_credentials()
    })?;
    if !matches {
        return Err(invalid_credentials());
    }

    let pair = state
        .jwt
        .generate_token_pair(user.public_id, &user.email)
        .map_err(ApiError::Internal)?;
    info!("User {} logged in", user.public_id.simple());

    Ok(Json(LoginResponse {
        access: pair.access_token,
        refresh: pair.refresh_token,
        user: user_response(&state, &user),
    }))
}

/// POST /auth/refresh - Refresh an access token
#[utoipa::path(
    post,
    path = "/auth/refresh",
    tag = "Authentication",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair", body = TokenResponse),
        (status = 401, description = "Invalid or expired refresh token")
    )
)]
pub async fn refresh_token(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RefreshRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let unauthorized = |e: String| {
        warn!("Refresh token rejected: {}", e);
        ApiError::Unauthorized("Token is invalid or expired.".to_string())
    };
    let claims = state
        .jwt
        .validate_refresh_token(&request.refresh)
        .map_err(unauthorized)?;
    let public_id = claims
        .user_id()
        .ok_or_else(|| unauthorized("malformed subject".to_string()))?;
    let user = state
        .storage
        .get_user_by_public_id(public_id)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(|| unauthorized("user missing or inactive".to_string()))?;

    let pair = state
        .jwt
        .generate_token_pair(user.public_id, &user.email)
        .map_err(ApiError::Internal)?;
    Ok(Json(TokenResponse {
        access: pair.access_token,
        refresh: pair.refresh_token,
    }))
}

/// POST /auth/password-reset - Email a password reset link
#[utoipa::path(
    post,
    path = "/auth/password-reset",
    tag = "Authentication",
    request_body = PasswordResetRequest,
    responses(
        (status = 200, description = "Reset link sent if the account exists", body = MessageResponse),
        (status = 400, description = "Malformed email")
    )
)]
pub async fn request_password_reset(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<PasswordResetRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    request
        .validate()
        .map_err(|e| ApiError::Validation(e.into()))?;

    let email = normalize_email(&request.email);
    if let Some(mut user) = state.storage.get_user_by_email(&email).await?
        && user.is_active
        && user.is_email_verified
    {
        let token = generate_token();
        user.password_reset_token = Some(token.clone());
        user.password_reset_sent_at = Some(Utc::now());
        state.storage.update_user(&user).await?;
        if let Err(e) = state
            .email
            .send_password_reset_email(&user.email, &token)
            .await
        {
            warn!("Failed to send password reset email to {}: {:#}", user.email, e);
        }
    }

    Ok(Json(MessageResponse::new(PASSWORD_RESET_SENT)))
}

/// POST /auth/password-reset/confirm - Set a new password with a reset token
#[utoipa::path(
    post,
    path = "/auth/password-reset/confirm",
    tag = "Authentication",
    request_body = PasswordResetConfirmRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Invalid or expired token, or weak password")
    )
)]
pub async fn confirm_password_reset(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<PasswordResetConfirmRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Some(mut user) = state.storage.get_user_by_reset_token(&request.token).await? else {
        return Err(ApiError::field("token", "Invalid or expired token."));
    };

    if token_expired(user.password_reset_sent_at, password_reset_ttl(), Utc::now()) {
        clear_reset_token(&mut user);
        state.storage.update_user(&user).await?;
        return Err(ApiError::field("token", "Invalid or expired token."));
    }

    let mut errors = FieldErrors::new();
    push_password_errors(&mut errors, "password", &request.password);
    errors.into_result()?;

    user.password_hash = hash_password(&request.password).map_err(ApiError::Internal)?;
    clear_reset_token(&mut user);
    state.storage.update_user(&user).await?;
    info!("Password reset for user {}", user.public_id.simple());

    Ok(Json(MessageResponse::new("Password has been reset.")))
}

fn clear_reset_token(user: &mut User) {
    user.password_reset_token = None;
    user.password_reset_sent_at = None;
}

/// POST /auth/change-password - Change the current user's password
#[utoipa::path(
    post,
    path = "/auth/change-password",
    tag = "Authentication",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Wrong old password or weak new password"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(request): ApiJson<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut user = auth.user;

    let old_matches =
        verify_password(&request.old_password, &user.password_hash).map_err(ApiError::Internal)?;
    if !old_matches {
        return Err(ApiError::field("old_password", "Old password is incorrect."));
    }

    let mut errors = match request.validate() {
        Ok(()) => FieldErrors::new(),
        Err(e) => e.into(),
    };
    if errors.get("new_password").is_none() {
        push_password_errors(&mut errors, "new_password", &request.new_password);
    }
    errors.into_result()?;

    user.password_hash = hash_password(&request.new_password).map_err(ApiError::Internal)?;
    state.storage.update_user(&user).await?;
    info!("Password changed for user {}", user.public_id.simple());

    Ok(Json(MessageResponse::new("Password updated successfully.")))
}
