//! In-memory storage backend.
//!
//! Used when no `DATABASE_URL` is configured and by the test suite. Mirrors
//! the PostgreSQL backend's uniqueness rules and cascades.

use super::{StorageError, traits::*};
use crate::models::{
    Advertisement, AdvertisementImage, Comment, NewAdvertisement, NewComment, NewPost, NewService,
    NewSocial, NewUser, Post, PostStats, Service, ServiceFilter, ServiceOrdering, Social,
    SocialPhone, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: BTreeMap<i64, User>,
    posts: BTreeMap<i64, Post>,
    likes: BTreeSet<(i64, i64)>,
    comments: BTreeMap<i64, Comment>,
    ads: BTreeMap<i64, Advertisement>,
    ad_images: BTreeMap<i64, AdvertisementImage>,
    services: BTreeMap<i64, Service>,
    socials: BTreeMap<i64, Social>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn remove_post_cascade(&mut self, post_id: i64) {
        self.posts.remove(&post_id);
        self.likes.retain(|(post, _)| *post != post_id);
        self.comments.retain(|_, comment| comment.post_id != post_id);
    }

    fn remove_ad_cascade(&mut self, ad_id: i64) {
        self.ads.remove(&ad_id);
        self.ad_images
            .retain(|_, image| image.advertisement_id != ad_id);
    }
}

/// Storage backend holding everything in process memory.
#[derive(Default)]
pub struct MemoryStorageBackend {
    tables: RwLock<Tables>,
}

impl MemoryStorageBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

fn window<T: Clone>(items: Vec<&T>, limit: usize, offset: usize) -> (Vec<T>, usize) {
    let count = items.len();
    let page = items
        .into_iter()
        .skip(offset)
        .take(limit)
        .cloned()
        .collect();
    (page, count)
}

fn newest_first<T>(items: &mut [&T], key: impl Fn(&T) -> (DateTime<Utc>, i64)) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[async_trait]
impl StorageBackend for MemoryStorageBackend {
    async fn create_user(&self, new: NewUser) -> Result<User, StorageError> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .values()
            .any(|user| user.email.eq_ignore_ascii_case(&new.email))
        {
            return Err(StorageError::Conflict(format!(
                "user with email {} already exists",
                new.email
            )));
        }
        let now = Utc::now();
        let user = User {
            id: tables.next_id(),
            public_id: Uuid::new_v4(),
            email: new.email,
            first_name: new.first_name,
            last_name: new.last_name,
            password_hash: new.password_hash,
            avatar: new.avatar,
            is_active: new.is_active,
            is_staff: new.is_staff,
            is_superuser: new.is_superuser,
            is_email_verified: new.is_email_verified,
            email_verification_token: new.email_verification_token,
            email_verification_sent_at: new.email_verification_sent_at,
            password_reset_token: None,
            password_reset_sent_at: None,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, StorageError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn get_user_by_public_id(&self, public_id: Uuid) -> Result<Option<User>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|user| user.public_id == public_id)
            .cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn get_user_by_verification_token(
        &self,
        token: &str,
    ) -> Result<Option<User>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|user| user.email_verification_token.as_deref() == Some(token))
            .cloned())
    }

    async fn get_user_by_reset_token(&self, token: &str) -> Result<Option<User>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|user| user.password_reset_token.as_deref() == Some(token))
            .cloned())
    }

    async fn update_user(&self, user: &User) -> Result<User, StorageError> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .values()
            .any(|other| other.id != user.id && other.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(StorageError::Conflict(format!(
                "user with email {} already exists",
                user.email
            )));
        }
        let stored = tables
            .users
            .get_mut(&user.id)
            .ok_or_else(|| StorageError::not_found("user", user.public_id))?;
        *stored = User {
            updated_at: Utc::now(),
            ..user.clone()
        };
        Ok(stored.clone())
    }

    async fn delete_user(&self, id: i64) -> Result<(), StorageError> {
        let mut tables = self.tables.write().await;
        if tables.users.remove(&id).is_none() {
            return Err(StorageError::not_found("user", id));
        }
        let posts: Vec<i64> = tables
            .posts
            .values()
            .filter(|post| post.author_id == id)
            .map(|post| post.id)
            .collect();
        for post_id in posts {
            tables.remove_post_cascade(post_id);
        }
        tables.likes.retain(|(_, user)| *user != id);
        tables.comments.retain(|_, comment| comment.author_id != id);
        let ads: Vec<i64> = tables
            .ads
            .values()
            .filter(|ad| ad.owner_id == id)
            .map(|ad| ad.id)
            .collect();
        for ad_id in ads {
            tables.remove_ad_cascade(ad_id);
        }
        Ok(())
    }

    async fn list_users(
        &self,
        include_superusers: bool,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<User>, usize), StorageError> {
        let tables = self.tables.read().await;
        let users: Vec<&User> = tables
            .users
            .values()
            .filter(|user| include_superusers || !user.is_superuser)
            .collect();
        Ok(window(users, limit, offset))
    }

    async fn list_unverified_users_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<User>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .filter(|user| {
                !user.is_email_verified
                    && user
                        .email_verification_sent_at
                        .is_some_and(|sent| sent < cutoff)
            })
            .cloned()
            .collect())
    }

    async fn user_media_paths(&self, user_id: i64) -> Result<Vec<String>, StorageError> {
        let tables = self.tables.read().await;
        let mut paths = Vec::new();
        if let Some(avatar) = tables.users.get(&user_id).and_then(|u| u.avatar.clone()) {
            paths.push(avatar);
        }
        paths.extend(
            tables
                .posts
                .values()
                .filter(|post| post.author_id == user_id)
                .filter_map(|post| post.image.clone()),
        );
        for ad in tables.ads.values().filter(|ad| ad.owner_id == user_id) {
            paths.extend(ad.main_image.clone());
            paths.extend(
                tables
                    .ad_images
                    .values()
                    .filter(|image| image.advertisement_id == ad.id)
                    .map(|image| image.image.clone()),
            );
        }
        Ok(paths)
    }

    async fn create_post(&self, new: NewPost) -> Result<Post, StorageError> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let post = Post {
            id: tables.next_id(),
            public_id: Uuid::new_v4(),
            author_id: new.author_id,
            body: new.body,
            image: new.image,
            edited: false,
            created_at: now,
            updated_at: now,
        };
        tables.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn get_post_by_public_id(&self, public_id: Uuid) -> Result<Option<Post>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .posts
            .values()
            .find(|post| post.public_id == public_id)
            .cloned())
    }

    async fn update_post(&self, post: &Post) -> Result<Post, StorageError> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .posts
            .get_mut(&post.id)
            .ok_or_else(|| StorageError::not_found("post", post.public_id))?;
        *stored = Post {
            updated_at: Utc::now(),
            ..post.clone()
        };
        Ok(stored.clone())
    }

    async fn delete_post(&self, id: i64) -> Result<(), StorageError> {
        let mut tables = self.tables.write().await;
        if !tables.posts.contains_key(&id) {
            return Err(StorageError::not_found("post", id));
        }
        tables.remove_post_cascade(id);
        Ok(())
    }

    async fn list_posts(
        &self,
        author_id: Option<i64>,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<Post>, usize), StorageError> {
        let tables = self.tables.read().await;
        let mut posts: Vec<&Post> = tables
            .posts
            .values()
            .filter(|post| author_id.is_none_or(|author| post.author_id == author))
            .collect();
        newest_first(&mut posts, |post| (post.created_at, post.id));
        Ok(window(posts, limit, offset))
    }

    async fn add_like(&self, post_id: i64, user_id: i64) -> Result<bool, StorageError> {
        Ok(self.tables.write().await.likes.insert((post_id, user_id)))
    }

    async fn remove_like(&self, post_id: i64, user_id: i64) -> Result<bool, StorageError> {
        Ok(self.tables.write().await.likes.remove(&(post_id, user_id)))
    }

    async fn post_stats(
        &self,
        post_id: i64,
        viewer_id: Option<i64>,
    ) -> Result<PostStats, StorageError> {
        let tables = self.tables.read().await;
        Ok(PostStats {
            likes_count: tables
                .likes
                .iter()
                .filter(|(post, _)| *post == post_id)
                .count() as i64,
            comments_count: tables
                .comments
                .values()
                .filter(|comment| comment.post_id == post_id)
                .count() as i64,
            liked: viewer_id.is_some_and(|viewer| tables.likes.contains(&(post_id, viewer))),
        })
    }

    async fn create_comment(&self, new: NewComment) -> Result<Comment, StorageError> {
        let mut tables = self.tables.write().await;
        if !tables.posts.contains_key(&new.post_id) {
            return Err(StorageError::not_found("post", new.post_id));
        }
        let now = Utc::now();
        let comment = Comment {
            id: tables.next_id(),
            public_id: Uuid::new_v4(),
            post_id: new.post_id,
            author_id: new.author_id,
            body: new.body,
            edited: false,
            created_at: now,
            updated_at: now,
        };
        tables.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn get_comment(
        &self,
        post_id: i64,
        public_id: Uuid,
    ) -> Result<Option<Comment>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .comments
            .values()
            .find(|comment| comment.post_id == post_id && comment.public_id == public_id)
            .cloned())
    }

    async fn update_comment(&self, comment: &Comment) -> Result<Comment, StorageError> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .comments
            .get_mut(&comment.id)
            .ok_or_else(|| StorageError::not_found("comment", comment.public_id))?;
        *stored = Comment {
            updated_at: Utc::now(),
            ..comment.clone()
        };
        Ok(stored.clone())
    }

    async fn delete_comment(&self, id: i64) -> Result<(), StorageError> {
        self.tables
            .write()
            .await
            .comments
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StorageError::not_found("comment", id))
    }

    async fn list_comments(
        &self,
        post_id: i64,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<Comment>, usize), StorageError> {
        let tables = self.tables.read().await;
        let mut comments: Vec<&Comment> = tables
            .comments
            .values()
            .filter(|comment| comment.post_id == post_id)
            .collect();
        newest_first(&mut comments, |comment| (comment.created_at, comment.id));
        Ok(window(comments, limit, offset))
    }

    async fn create_advertisement(
        &self,
        new: NewAdvertisement,
    ) -> Result<Advertisement, StorageError> {
        let mut tables = self.tables.write().await;
        let id = tables.next_id();
        let now = Utc::now();
        let ad = Advertisement {
            id,
            slug: format!("{}-{}", new.slug_base, id),
            owner_id: new.owner_id,
            title: new.title,
            description: new.description,
            category: new.category,
            price: new.price,
            location: new.location,
            contact_phone: new.contact_phone,
            contact_email: new.contact_email,
            is_active: new.is_active,
            main_image: new.main_image,
            created_at: now,
            updated_at: now,
        };
        tables.ads.insert(id, ad.clone());
        Ok(ad)
    }

    async fn get_advertisement_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<Advertisement>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables.ads.values().find(|ad| ad.slug == slug).cloned())
    }

    async fn update_advertisement(
        &self,
        ad: &Advertisement,
    ) -> Result<Advertisement, StorageError> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .ads
            .get_mut(&ad.id)
            .ok_or_else(|| StorageError::not_found("advertisement", &ad.slug))?;
        *stored = Advertisement {
            updated_at: Utc::now(),
            ..ad.clone()
        };
        Ok(stored.clone())
    }

    async fn delete_advertisement(&self, id: i64) -> Result<(), StorageError> {
        let mut tables = self.tables.write().await;
        if !tables.ads.contains_key(&id) {
            return Err(StorageError::not_found("advertisement", id));
        }
        tables.remove_ad_cascade(id);
        Ok(())
    }

    async fn list_advertisements(
        &self,
        filter: &AdFilter,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<Advertisement>, usize), StorageError> {
        let tables = self.tables.read().await;
        let mut ads: Vec<&Advertisement> = tables
            .ads
            .values()
            .filter(|ad| filter.category.is_none_or(|category| ad.category == category))
            .filter(|ad| filter.owner_id.is_none_or(|owner| ad.owner_id == owner))
            .collect();
        newest_first(&mut ads, |ad| (ad.created_at, ad.id));
        Ok(window(ads, limit, offset))
    }

    async fn list_advertisement_images(
        &self,
        advertisement_id: i64,
    ) -> Result<Vec<AdvertisementImage>, StorageError> {
        let tables = self.tables.read().await;
        let mut images: Vec<AdvertisementImage> = tables
            .ad_images
            .values()
            .filter(|image| image.advertisement_id == advertisement_id)
            .cloned()
            .collect();
        images.sort_by_key(|image| (image.sort_order, image.id));
        Ok(images)
    }

    async fn add_advertisement_image(
        &self,
        advertisement_id: i64,
        image: String,
        sort_order: i32,
    ) -> Result<AdvertisementImage, StorageError> {
        let mut tables = self.tables.write().await;
        if !tables.ads.contains_key(&advertisement_id) {
            return Err(StorageError::not_found("advertisement", advertisement_id));
        }
        let record = AdvertisementImage {
            id: tables.next_id(),
            advertisement_id,
            image,
            sort_order,
        };
        tables.ad_images.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_advertisement_image(
        &self,
        advertisement_id: i64,
        image_id: i64,
    ) -> Result<Option<AdvertisementImage>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .ad_images
            .get(&image_id)
            .filter(|image| image.advertisement_id == advertisement_id)
            .cloned())
    }

    async fn delete_advertisement_image(&self, image_id: i64) -> Result<(), StorageError> {
        self.tables
            .write()
            .await
            .ad_images
            .remove(&image_id)
            .map(|_| ())
            .ok_or_else(|| StorageError::not_found("advertisement image", image_id))
    }

    async fn create_service(&self, new: NewService) -> Result<Service, StorageError> {
        let mut tables = self.tables.write().await;
        if tables.services.values().any(|s| s.slug == new.slug) {
            return Err(StorageError::Conflict(format!(
                "service with slug {} already exists",
                new.slug
            )));
        }
        let now = Utc::now();
        let service = Service {
            id: tables.next_id(),
            title: new.title,
            slug: new.slug,
            image: new.image,
            description: new.description,
            price: new.price,
            is_active: new.is_active,
            created_at: now,
            updated_at: now,
        };
        tables.services.insert(service.id, service.clone());
        Ok(service)
    }

    async fn get_service_by_slug(&self, slug: &str) -> Result<Option<Service>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables.services.values().find(|s| s.slug == slug).cloned())
    }

    async fn service_slug_exists(
        &self,
        slug: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .services
            .values()
            .any(|s| s.slug == slug && Some(s.id) != exclude_id))
    }

    async fn update_service(&self, service: &Service) -> Result<Service, StorageError> {
        let mut tables = self.tables.write().await;
        if tables
            .services
            .values()
            .any(|s| s.id != service.id && s.slug == service.slug)
        {
            return Err(StorageError::Conflict(format!(
                "service with slug {} already exists",
                service.slug
            )));
        }
        let stored = tables
            .services
            .get_mut(&service.id)
            .ok_or_else(|| StorageError::not_found("service", &service.slug))?;
        *stored = Service {
            updated_at: Utc::now(),
            ..service.clone()
        };
        Ok(stored.clone())
    }

    async fn delete_service(&self, id: i64) -> Result<(), StorageError> {
        self.tables
            .write()
            .await
            .services
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StorageError::not_found("service", id))
    }

    async fn list_services(
        &self,
        filter: &ServiceFilter,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<Service>, usize), StorageError> {
        let tables = self.tables.read().await;
        let needle = filter.search.as_deref().map(str::to_lowercase);
        let mut services: Vec<&Service> = tables
            .services
            .values()
            .filter(|s| filter.is_active.is_none_or(|active| s.is_active == active))
            .filter(|s| {
                needle.as_deref().is_none_or(|needle| {
                    s.title.to_lowercase().contains(needle)
                        || s.description.to_lowercase().contains(needle)
                })
            })
            .collect();
        match filter.ordering {
            ServiceOrdering::Title => services.sort_by(|a, b| (&a.title, a.id).cmp(&(&b.title, b.id))),
            ServiceOrdering::TitleDesc => {
                services.sort_by(|a, b| (&b.title, b.id).cmp(&(&a.title, a.id)))
            }
            ServiceOrdering::Price => services.sort_by_key(|s| (s.price, s.id)),
            ServiceOrdering::PriceDesc => {
                services.sort_by(|a, b| (b.price, b.id).cmp(&(a.price, a.id)))
            }
            ServiceOrdering::CreatedAt => services.sort_by_key(|s| (s.created_at, s.id)),
            ServiceOrdering::CreatedAtDesc => {
                newest_first(&mut services, |s| (s.created_at, s.id))
            }
        }
        Ok(window(services, limit, offset))
    }

    async fn list_socials(&self) -> Result<Vec<Social>, StorageError> {
        let tables = self.tables.read().await;
        let mut socials: Vec<Social> = tables.socials.values().cloned().collect();
        socials.shuffle(&mut rand::thread_rng());
        Ok(socials)
    }

    async fn get_social_by_slug(&self, slug: &str) -> Result<Option<Social>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables.socials.values().find(|s| s.slug == slug).cloned())
    }

    async fn create_social(&self, new: NewSocial) -> Result<Social, StorageError> {
        let mut tables = self.tables.write().await;
        if tables.socials.values().any(|s| s.slug == new.slug) {
            return Err(StorageError::Conflict(format!(
                "social entry with slug {} already exists",
                new.slug
            )));
        }
        let id = tables.next_id();
        let mut phones = Vec::with_capacity(new.phones.len());
        for number in new.phones {
            phones.push(SocialPhone {
                id: tables.next_id(),
                social_id: id,
                number,
            });
        }
        let social = Social {
            id,
            title: new.title,
            slug: new.slug,
            icon_name: new.icon_name,
            created_at: Utc::now(),
            phones,
        };
        tables.socials.insert(id, social.clone());
        Ok(social)
    }
}
