//! Classified advertisements and their image galleries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use super::price::Price;
use super::user::AuthorSummary;

/// Gallery images allowed per advertisement.
pub const MAX_AD_IMAGES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Sell,
    Buy,
    Free,
    Service,
    Sundry,
    Hire,
    Loss,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Sell,
        Category::Buy,
        Category::Free,
        Category::Service,
        Category::Sundry,
        Category::Hire,
        Category::Loss,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Sell => "sell",
            Category::Buy => "buy",
            Category::Free => "free",
            Category::Service => "service",
            Category::Sundry => "sundry",
            Category::Hire => "hire",
            Category::Loss => "loss",
        }
    }

    /// Human-readable label shown by the client.
    pub fn label(self) -> &'static str {
        match self {
            Category::Sell => "Продаю",
            Category::Buy => "Куплю",
            Category::Free => "Отдам даром",
            Category::Service => "Услуги",
            Category::Sundry => "Разное",
            Category::Hire => "Нужна услуга/работника",
            Category::Loss => "Потеряшки",
        }
    }

    /// Giveaways, lost-and-found and miscellany never carry a price.
    pub fn has_price(self) -> bool {
        !matches!(self, Category::Free | Category::Loss | Category::Sundry)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|category| category.as_str() == raw.trim())
            .ok_or_else(|| "Invalid category.".to_string())
    }
}

impl TryFrom<String> for Category {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Advertisement {
    pub id: i64,
    pub slug: String,
    pub owner_id: i64,
    pub title: String,
    pub description: String,
    #[sqlx(try_from = "String")]
    pub category: Category,
    pub price: Option<Price>,
    pub location: String,
    pub contact_phone: String,
    pub contact_email: String,
    pub is_active: bool,
    pub main_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAdvertisement {
    pub owner_id: i64,
    /// Slugified title; the stored slug is `{slug_base}-{id}`.
    pub slug_base: String,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub price: Option<Price>,
    pub location: String,
    pub contact_phone: String,
    pub contact_email: String,
    pub is_active: bool,
    pub main_image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct AdvertisementImage {
    pub id: i64,
    pub advertisement_id: i64,
    pub image: String,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdvertisementImageResponse {
    pub id: i64,
    pub image: String,
    pub order: i32,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AdvertisementResponse {
    pub id: i64,
    pub slug: String,
    pub user: AuthorSummary,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub category_display: String,
    #[schema(value_type = Option<String>, example = "1500.00")]
    pub price: Option<Price>,
    pub location: String,
    pub contact_phone: String,
    pub contact_email: String,
    pub is_active: bool,
    pub main_image: Option<String>,
    pub images: Vec<AdvertisementImageResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
pub struct AdListQuery {
    pub category: Option<String>,
    /// Public id of the owner
    pub user: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}
