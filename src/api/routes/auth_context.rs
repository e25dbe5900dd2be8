//! Authentication context extractors.
//!
//! Requests authenticate with `Authorization: Bearer <access token>`. The
//! token subject is the user's public id; the user must still exist and be
//! active.

use super::app_state::AppState;
use super::error::ApiError;
use crate::models::User;
use crate::services::jwt_service::{Claims, JwtService};
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

/// Authentication context extracted from request
#[derive(Clone, Debug)]
pub struct AuthContext {
    pub user: User,
    pub claims: Claims,
}

impl AuthContext {
    pub fn user_id(&self) -> i64 {
        self.user.id
    }

    pub fn is_staff(&self) -> bool {
        self.user.is_staff || self.user.is_superuser
    }
}

/// Authentication that may be absent. A present but invalid token is still
/// rejected with 401.
#[derive(Clone, Debug)]
pub struct OptionalAuthContext(pub Option<AuthContext>);

impl OptionalAuthContext {
    pub fn user(&self) -> Option<&User> {
        self.0.as_ref().map(|auth| &auth.user)
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user().map(|user| user.id)
    }

    pub fn is_staff(&self) -> bool {
        self.0.as_ref().is_some_and(AuthContext::is_staff)
    }
}

fn bearer_token(parts: &Parts) -> Result<Option<&str>, ApiError> {
    let Some(value) = parts.headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| ApiError::Unauthorized("Invalid authorization header.".to_string()))?;
    JwtService::extract_bearer_token(value)
        .map(Some)
        .ok_or_else(|| ApiError::Unauthorized("Invalid authorization header.".to_string()))
}

async fn authenticate(token: &str, state: &AppState) -> Result<AuthContext, ApiError> {
    let claims = state.jwt.validate_access_token(token).map_err(|e| {
        tracing::warn!("JWT validation failed: {}", e);
        ApiError::Unauthorized("Given token not valid for any token type.".to_string())
    })?;

    let Some(public_id) = claims.user_id() else {
        tracing::warn!("JWT has malformed subject claim");
        return Err(ApiError::Unauthorized(
            "Token contained no recognizable user identification.".to_string(),
        ));
    };

    let user = state
        .storage
        .get_user_by_public_id(public_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found.".to_string()))?;
    if !user.is_active {
        return Err(ApiError::Unauthorized("User is inactive.".to_string()));
    }

    Ok(AuthContext { user, claims })
}

impl FromRequestParts<AppState> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?.ok_or_else(|| {
            ApiError::Unauthorized("Authentication credentials were not provided.".to_string())
        })?;
        authenticate(token, state).await
    }
}

impl FromRequestParts<AppState> for OptionalAuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match bearer_token(parts)? {
            Some(token) => Ok(OptionalAuthContext(Some(authenticate(token, state).await?))),
            None => Ok(OptionalAuthContext(None)),
        }
    }
}
