//! Services catalog.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::price::Price;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Service {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub image: Option<String>,
    pub description: String,
    pub price: Price,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewService {
    pub title: String,
    pub slug: String,
    pub image: Option<String>,
    pub description: String,
    pub price: Price,
    pub is_active: bool,
}

/// Sort keys accepted by the `ordering` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServiceOrdering {
    #[default]
    Title,
    TitleDesc,
    Price,
    PriceDesc,
    CreatedAt,
    CreatedAtDesc,
}

impl ServiceOrdering {
    /// Parse `title`, `-price`, `created_at` and friends. Unknown keys fall
    /// back to the default ordering.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("-title") => Self::TitleDesc,
            Some("price") => Self::Price,
            Some("-price") => Self::PriceDesc,
            Some("created_at") => Self::CreatedAt,
            Some("-created_at") => Self::CreatedAtDesc,
            _ => Self::Title,
        }
    }

    pub fn sql(self) -> &'static str {
        match self {
            Self::Title => "title ASC, id ASC",
            Self::TitleDesc => "title DESC, id DESC",
            Self::Price => "price ASC, id ASC",
            Self::PriceDesc => "price DESC, id DESC",
            Self::CreatedAt => "created_at ASC, id ASC",
            Self::CreatedAtDesc => "created_at DESC, id DESC",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ServiceFilter {
    pub is_active: Option<bool>,
    pub search: Option<String>,
    pub ordering: ServiceOrdering,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
pub struct ServiceListQuery {
    /// Staff only; others always see active services
    pub is_active: Option<bool>,
    pub search: Option<String>,
    /// `title`, `price` or `created_at`, optionally prefixed with `-`
    pub ordering: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ServiceListItem {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub short_description: String,
    #[schema(value_type = String, example = "2500.00")]
    pub price: Price,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ServiceResponse {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub image: Option<String>,
    pub description: String,
    #[schema(value_type = String, example = "2500.00")]
    pub price: Price,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
