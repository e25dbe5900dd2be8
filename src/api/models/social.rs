use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const DEFAULT_ICON_NAME: &str = "fa-info";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct SocialPhone {
    pub id: i64,
    #[serde(skip)]
    pub social_id: i64,
    pub number: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Social {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub icon_name: String,
    pub created_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub phones: Vec<SocialPhone>,
}

#[derive(Debug, Clone)]
pub struct NewSocial {
    pub title: String,
    pub slug: String,
    pub icon_name: String,
    pub phones: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateSocialRequest {
    pub title: String,
    pub icon_name: Option<String>,
    #[serde(default)]
    pub phones: Vec<String>,
}
