//! Storage trait definitions for the API storage backends.

use crate::models::{
    Advertisement, AdvertisementImage, Category, Comment, NewAdvertisement, NewComment, NewPost,
    NewService, NewSocial, NewUser, Post, PostStats, Service, ServiceFilter, Social, User,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::StorageError;

/// Filters for the advertisement listing.
#[derive(Debug, Clone, Default)]
pub struct AdFilter {
    pub category: Option<Category>,
    pub owner_id: Option<i64>,
}

/// Storage backend trait for database operations.
///
/// Listing methods return the requested window plus the total match count.
/// Deletes cascade to dependent rows; media files are the caller's concern.
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    // Users

    /// Insert a user. Fails with `Conflict` when the email is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, StorageError>;

    async fn get_user(&self, id: i64) -> Result<Option<User>, StorageError>;

    async fn get_user_by_public_id(&self, public_id: Uuid) -> Result<Option<User>, StorageError>;

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StorageError>;

    async fn get_user_by_verification_token(
        &self,
        token: &str,
    ) -> Result<Option<User>, StorageError>;

    async fn get_user_by_reset_token(&self, token: &str) -> Result<Option<User>, StorageError>;

    /// Persist every mutable column of `user` and bump `updated_at`.
    async fn update_user(&self, user: &User) -> Result<User, StorageError>;

    async fn delete_user(&self, id: i64) -> Result<(), StorageError>;

    async fn list_users(
        &self,
        include_superusers: bool,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<User>, usize), StorageError>;

    /// Unverified accounts whose verification email went out before `cutoff`.
    async fn list_unverified_users_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<User>, StorageError>;

    /// Every media path owned by the user: avatar, post images and ad images.
    async fn user_media_paths(&self, user_id: i64) -> Result<Vec<String>, StorageError>;

    // Posts and likes

    async fn create_post(&self, post: NewPost) -> Result<Post, StorageError>;

    async fn get_post_by_public_id(&self, public_id: Uuid) -> Result<Option<Post>, StorageError>;

    async fn update_post(&self, post: &Post) -> Result<Post, StorageError>;

    async fn delete_post(&self, id: i64) -> Result<(), StorageError>;

    /// Newest first.
    async fn list_posts(
        &self,
        author_id: Option<i64>,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<Post>, usize), StorageError>;

    /// Returns false when the like already existed.
    async fn add_like(&self, post_id: i64, user_id: i64) -> Result<bool, StorageError>;

    /// Returns false when there was no like to remove.
    async fn remove_like(&self, post_id: i64, user_id: i64) -> Result<bool, StorageError>;

    async fn post_stats(
        &self,
        post_id: i64,
        viewer_id: Option<i64>,
    ) -> Result<PostStats, StorageError>;

    // Comments

    async fn create_comment(&self, comment: NewComment) -> Result<Comment, StorageError>;

    async fn get_comment(
        &self,
        post_id: i64,
        public_id: Uuid,
    ) -> Result<Option<Comment>, StorageError>;

    async fn update_comment(&self, comment: &Comment) -> Result<Comment, StorageError>;

    async fn delete_comment(&self, id: i64) -> Result<(), StorageError>;

    /// Newest first.
    async fn list_comments(
        &self,
        post_id: i64,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<Comment>, usize), StorageError>;

    // Advertisements

    /// Insert an ad; its slug becomes `{slug_base}-{id}`.
    async fn create_advertisement(
        &self,
        ad: NewAdvertisement,
    ) -> Result<Advertisement, StorageError>;

    async fn get_advertisement_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<Advertisement>, StorageError>;

    async fn update_advertisement(&self, ad: &Advertisement)
    -> Result<Advertisement, StorageError>;

    async fn delete_advertisement(&self, id: i64) -> Result<(), StorageError>;

    /// Newest first.
    async fn list_advertisements(
        &self,
        filter: &AdFilter,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<Advertisement>, usize), StorageError>;

    /// Gallery images in display order.
    async fn list_advertisement_images(
        &self,
        advertisement_id: i64,
    ) -> Result<Vec<AdvertisementImage>, StorageError>;

    async fn add_advertisement_image(
        &self,
        advertisement_id: i64,
        image: String,
        sort_order: i32,
    ) -> Result<AdvertisementImage, StorageError>;

    async fn get_advertisement_image(
        &self,
        advertisement_id: i64,
        image_id: i64,
    ) -> Result<Option<AdvertisementImage>, StorageError>;

    async fn delete_advertisement_image(&self, image_id: i64) -> Result<(), StorageError>;

    // Services

    async fn create_service(&self, service: NewService) -> Result<Service, StorageError>;

    async fn get_service_by_slug(&self, slug: &str) -> Result<Option<Service>, StorageError>;

    async fn service_slug_exists(
        &self,
        slug: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool, StorageError>;

    async fn update_service(&self, service: &Service) -> Result<Service, StorageError>;

    async fn delete_service(&self, id: i64) -> Result<(), StorageError>;

    async fn list_services(
        &self,
        filter: &ServiceFilter,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<Service>, usize), StorageError>;

    // Social directory

    /// All entries with their phones, in random order.
    async fn list_socials(&self) -> Result<Vec<Social>, StorageError>;

    async fn get_social_by_slug(&self, slug: &str) -> Result<Option<Social>, StorageError>;

    async fn create_social(&self, social: NewSocial) -> Result<Social, StorageError>;
}
