//! PostgreSQL storage backend implementation.
//!
//! Uses sqlx for database operations and implements the StorageBackend trait.

use super::{StorageError, traits::*};
use crate::models::{
    Advertisement, AdvertisementImage, Comment, NewAdvertisement, NewComment, NewPost, NewService,
    NewSocial, NewUser, Post, PostStats, Service, ServiceFilter, Social, SocialPhone, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, public_id, email, first_name, last_name, password_hash, avatar, \
    is_active, is_staff, is_superuser, is_email_verified, email_verification_token, \
    email_verification_sent_at, password_reset_token, password_reset_sent_at, created_at, updated_at";

const POST_COLUMNS: &str =
    "id, public_id, author_id, body, image, edited, created_at, updated_at";

const COMMENT_COLUMNS: &str =
    "id, public_id, post_id, author_id, body, edited, created_at, updated_at";

const AD_COLUMNS: &str = "id, slug, owner_id, title, description, category, price, location, \
    contact_phone, contact_email, is_active, main_image, created_at, updated_at";

const SERVICE_COLUMNS: &str =
    "id, title, slug, image, description, price, is_active, created_at, updated_at";

/// PostgreSQL storage backend implementation.
pub struct PostgresStorageBackend {
    pool: PgPool,
}

impl PostgresStorageBackend {
    /// Create a new PostgreSQL storage backend.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn attach_phones(&self, mut socials: Vec<Social>) -> Result<Vec<Social>, StorageError> {
        let ids: Vec<i64> = socials.iter().map(|s| s.id).collect();
        let phones = sqlx::query_as::<_, SocialPhone>(
            "SELECT id, social_id, number FROM social_phones WHERE social_id = ANY($1) ORDER BY id",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;
        for social in &mut socials {
            social.phones = phones
                .iter()
                .filter(|phone| phone.social_id == social.id)
                .cloned()
                .collect();
        }
        Ok(socials)
    }
}

fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[async_trait]
impl StorageBackend for PostgresStorageBackend {
    async fn create_user(&self, user: NewUser) -> Result<User, StorageError> {
        let sql = format!(
            r#"
            INSERT INTO users (public_id, email, first_name, last_name, password_hash, avatar,
                is_active, is_staff, is_superuser, is_email_verified,
                email_verification_token, email_verification_sent_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {USER_COLUMNS}
            "#
        );
        let created = sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(&user.email)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.password_hash)
            .bind(&user.avatar)
            .bind(user.is_active)
            .bind(user.is_staff)
            .bind(user.is_superuser)
            .bind(user.is_email_verified)
            .bind(&user.email_verification_token)
            .bind(user.email_verification_sent_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, StorageError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_user_by_public_id(&self, public_id: Uuid) -> Result<Option<User>, StorageError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE public_id = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(public_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_user_by_verification_token(
        &self,
        token: &str,
    ) -> Result<Option<User>, StorageError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email_verification_token = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_user_by_reset_token(&self, token: &str) -> Result<Option<User>, StorageError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE password_reset_token = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_user(&self, user: &User) -> Result<User, StorageError> {
        let sql = format!(
            r#"
            UPDATE users SET email = $2, first_name = $3, last_name = $4, password_hash = $5,
                avatar = $6, is_active = $7, is_staff = $8, is_superuser = $9,
                is_email_verified = $10, email_verification_token = $11,
                email_verification_sent_at = $12, password_reset_token = $13,
                password_reset_sent_at = $14, updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(user.id)
            .bind(&user.email)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.password_hash)
            .bind(&user.avatar)
            .bind(user.is_active)
            .bind(user.is_staff)
            .bind(user.is_superuser)
            .bind(user.is_email_verified)
            .bind(&user.email_verification_token)
            .bind(user.email_verification_sent_at)
            .bind(&user.password_reset_token)
            .bind(user.password_reset_sent_at)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StorageError::not_found("user", user.public_id))
    }

    async fn delete_user(&self, id: i64) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("user", id));
        }
        Ok(())
    }

    async fn list_users(
        &self,
        include_superusers: bool,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<User>, usize), StorageError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE ($1 OR NOT is_superuser) ORDER BY id LIMIT $2 OFFSET $3"
        );
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(include_superusers)
            .bind(to_i64(limit))
            .bind(to_i64(offset))
            .fetch_all(&self.pool)
            .await?;
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE ($1 OR NOT is_superuser)")
                .bind(include_superusers)
                .fetch_one(&self.pool)
                .await?;
        Ok((users, count as usize))
    }

    async fn list_unverified_users_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<User>, StorageError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE NOT is_email_verified AND email_verification_sent_at < $1"
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(cutoff)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn user_media_paths(&self, user_id: i64) -> Result<Vec<String>, StorageError> {
        let paths: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT avatar FROM users WHERE id = $1 AND avatar IS NOT NULL
            UNION ALL
            SELECT image FROM posts WHERE author_id = $1 AND image IS NOT NULL
            UNION ALL
            SELECT main_image FROM advertisements WHERE owner_id = $1 AND main_image IS NOT NULL
            UNION ALL
            SELECT ai.image FROM advertisement_images ai
                JOIN advertisements a ON a.id = ai.advertisement_id
                WHERE a.owner_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(paths)
    }

    async fn create_post(&self, post: NewPost) -> Result<Post, StorageError> {
        let sql = format!(
            "INSERT INTO posts (public_id, author_id, body, image) VALUES ($1, $2, $3, $4) RETURNING {POST_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Post>(&sql)
            .bind(Uuid::new_v4())
            .bind(post.author_id)
            .bind(&post.body)
            .bind(&post.image)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn get_post_by_public_id(&self, public_id: Uuid) -> Result<Option<Post>, StorageError> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE public_id = $1");
        Ok(sqlx::query_as::<_, Post>(&sql)
            .bind(public_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_post(&self, post: &Post) -> Result<Post, StorageError> {
        let sql = format!(
            "UPDATE posts SET body = $2, image = $3, edited = $4, updated_at = NOW() WHERE id = $1 RETURNING {POST_COLUMNS}"
        );
        sqlx::query_as::<_, Post>(&sql)
            .bind(post.id)
            .bind(&post.body)
            .bind(&post.image)
            .bind(post.edited)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StorageError::not_found("post", post.public_id))
    }

    async fn delete_post(&self, id: i64) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("post", id));
        }
        Ok(())
    }

    async fn list_posts(
        &self,
        author_id: Option<i64>,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<Post>, usize), StorageError> {
        let sql = format!(
            r#"
            SELECT {POST_COLUMNS} FROM posts
            WHERE ($1::BIGINT IS NULL OR author_id = $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        );
        let posts = sqlx::query_as::<_, Post>(&sql)
            .bind(author_id)
            .bind(to_i64(limit))
            .bind(to_i64(offset))
            .fetch_all(&self.pool)
            .await?;
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM posts WHERE ($1::BIGINT IS NULL OR author_id = $1)",
        )
        .bind(author_id)
        .fetch_one(&self.pool)
        .await?;
        Ok((posts, count as usize))
    }

    async fn add_like(&self, post_id: i64, user_id: i64) -> Result<bool, StorageError> {
        let result = sqlx::query(
            "INSERT INTO post_likes (post_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(post_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn remove_like(&self, post_id: i64, user_id: i64) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM post_likes WHERE post_id = $1 AND user_id = $2")
            .bind(post_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn post_stats(
        &self,
        post_id: i64,
        viewer_id: Option<i64>,
    ) -> Result<PostStats, StorageError> {
        let (likes_count, comments_count, liked): (i64, i64, bool) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM post_likes WHERE post_id = $1),
                (SELECT COUNT(*) FROM comments WHERE post_id = $1),
                EXISTS (SELECT 1 FROM post_likes WHERE post_id = $1 AND user_id = $2)
            "#,
        )
        .bind(post_id)
        .bind(viewer_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(PostStats {
            likes_count,
            comments_count,
            liked,
        })
    }

    async fn create_comment(&self, comment: NewComment) -> Result<Comment, StorageError> {
        let sql = format!(
            "INSERT INTO comments (public_id, post_id, author_id, body) VALUES ($1, $2, $3, $4) RETURNING {COMMENT_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Comment>(&sql)
            .bind(Uuid::new_v4())
            .bind(comment.post_id)
            .bind(comment.author_id)
            .bind(&comment.body)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn get_comment(
        &self,
        post_id: i64,
        public_id: Uuid,
    ) -> Result<Option<Comment>, StorageError> {
        let sql =
            format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE post_id = $1 AND public_id = $2");
        Ok(sqlx::query_as::<_, Comment>(&sql)
            .bind(post_id)
            .bind(public_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_comment(&self, comment: &Comment) -> Result<Comment, StorageError> {
        let sql = format!(
            "UPDATE comments SET body = $2, edited = $3, updated_at = NOW() WHERE id = $1 RETURNING {COMMENT_COLUMNS}"
        );
        sqlx::query_as::<_, Comment>(&sql)
            .bind(comment.id)
            .bind(&comment.body)
            .bind(comment.edited)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StorageError::not_found("comment", comment.public_id))
    }

    async fn delete_comment(&self, id: i64) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("comment", id));
        }
        Ok(())
    }

    async fn list_comments(
        &self,
        post_id: i64,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<Comment>, usize), StorageError> {
        let sql = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE post_id = $1 ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
        );
        let comments = sqlx::query_as::<_, Comment>(&sql)
            .bind(post_id)
            .bind(to_i64(limit))
            .bind(to_i64(offset))
            .fetch_all(&self.pool)
            .await?;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await?;
        Ok((comments, count as usize))
    }

    async fn create_advertisement(
        &self,
        ad: NewAdvertisement,
    ) -> Result<Advertisement, StorageError> {
        let sql = format!(
            r#"
            WITH next AS (SELECT nextval(pg_get_serial_sequence('advertisements', 'id')) AS id)
            INSERT INTO advertisements (id, slug, owner_id, title, description, category, price,
                location, contact_phone, contact_email, is_active, main_image)
            SELECT next.id, $1 || '-' || next.id::TEXT, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11
            FROM next
            RETURNING {AD_COLUMNS}
            "#
        );
        Ok(sqlx::query_as::<_, Advertisement>(&sql)
            .bind(&ad.slug_base)
            .bind(ad.owner_id)
            .bind(&ad.title)
            .bind(&ad.description)
            .bind(ad.category.as_str())
            .bind(ad.price)
            .bind(&ad.location)
            .bind(&ad.contact_phone)
            .bind(&ad.contact_email)
            .bind(ad.is_active)
            .bind(&ad.main_image)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn get_advertisement_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<Advertisement>, StorageError> {
        let sql = format!("SELECT {AD_COLUMNS} FROM advertisements WHERE slug = $1");
        Ok(sqlx::query_as::<_, Advertisement>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_advertisement(
        &self,
        ad: &Advertisement,
    ) -> Result<Advertisement, StorageError> {
        let sql = format!(
            r#"
            UPDATE advertisements SET title = $2, description = $3, category = $4, price = $5,
                location = $6, contact_phone = $7, contact_email = $8, is_active = $9,
                main_image = $10, updated_at = NOW()
            WHERE id = $1
            RETURNING {AD_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Advertisement>(&sql)
            .bind(ad.id)
            .bind(&ad.title)
            .bind(&ad.description)
            .bind(ad.category.as_str())
            .bind(ad.price)
            .bind(&ad.location)
            .bind(&ad.contact_phone)
            .bind(&ad.contact_email)
            .bind(ad.is_active)
            .bind(&ad.main_image)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StorageError::not_found("advertisement", &ad.slug))
    }

    async fn delete_advertisement(&self, id: i64) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM advertisements WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("advertisement", id));
        }
        Ok(())
    }

    async fn list_advertisements(
        &self,
        filter: &AdFilter,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<Advertisement>, usize), StorageError> {
        let sql = format!(
            r#"
            SELECT {AD_COLUMNS} FROM advertisements
            WHERE ($1::TEXT IS NULL OR category = $1) AND ($2::BIGINT IS NULL OR owner_id = $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "#
        );
        let category = filter.category.map(|c| c.as_str());
        let ads = sqlx::query_as::<_, Advertisement>(&sql)
            .bind(category)
            .bind(filter.owner_id)
            .bind(to_i64(limit))
            .bind(to_i64(offset))
            .fetch_all(&self.pool)
            .await?;
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM advertisements WHERE ($1::TEXT IS NULL OR category = $1) AND ($2::BIGINT IS NULL OR owner_id = $2)",
        )
        .bind(category)
        .bind(filter.owner_id)
        .fetch_one(&self.pool)
        .await?;
        Ok((ads, count as usize))
    }

    async fn list_advertisement_images(
        &self,
        advertisement_id: i64,
    ) -> Result<Vec<AdvertisementImage>, StorageError> {
        Ok(sqlx::query_as::<_, AdvertisementImage>(
            "SELECT id, advertisement_id, image, sort_order FROM advertisement_images WHERE advertisement_id = $1 ORDER BY sort_order, id",
        )
        .bind(advertisement_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn add_advertisement_image(
        &self,
        advertisement_id: i64,
        image: String,
        sort_order: i32,
    ) -> Result<AdvertisementImage, StorageError> {
        Ok(sqlx::query_as::<_, AdvertisementImage>(
            "INSERT INTO advertisement_images (advertisement_id, image, sort_order) VALUES ($1, $2, $3) RETURNING id, advertisement_id, image, sort_order",
        )
        .bind(advertisement_id)
        .bind(image)
        .bind(sort_order)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn get_advertisement_image(
        &self,
        advertisement_id: i64,
        image_id: i64,
    ) -> Result<Option<AdvertisementImage>, StorageError> {
        Ok(sqlx::query_as::<_, AdvertisementImage>(
            "SELECT id, advertisement_id, image, sort_order FROM advertisement_images WHERE id = $1 AND advertisement_id = $2",
        )
        .bind(image_id)
        .bind(advertisement_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_advertisement_image(&self, image_id: i64) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM advertisement_images WHERE id = $1")
            .bind(image_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("advertisement image", image_id));
        }
        Ok(())
    }

    async fn create_service(&self, service: NewService) -> Result<Service, StorageError> {
        let sql = format!(
            r#"
            INSERT INTO services (title, slug, image, description, price, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {SERVICE_COLUMNS}
            "#
        );
        Ok(sqlx::query_as::<_, Service>(&sql)
            .bind(&service.title)
            .bind(&service.slug)
            .bind(&service.image)
            .bind(&service.description)
            .bind(service.price)
            .bind(service.is_active)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn get_service_by_slug(&self, slug: &str) -> Result<Option<Service>, StorageError> {
        let sql = format!("SELECT {SERVICE_COLUMNS} FROM services WHERE slug = $1");
        Ok(sqlx::query_as::<_, Service>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn service_slug_exists(
        &self,
        slug: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool, StorageError> {
        Ok(sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM services WHERE slug = $1 AND ($2::BIGINT IS NULL OR id <> $2))",
        )
        .bind(slug)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn update_service(&self, service: &Service) -> Result<Service, StorageError> {
        let sql = format!(
            r#"
            UPDATE services SET title = $2, slug = $3, image = $4, description = $5, price = $6,
                is_active = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING {SERVICE_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Service>(&sql)
            .bind(service.id)
            .bind(&service.title)
            .bind(&service.slug)
            .bind(&service.image)
            .bind(&service.description)
            .bind(service.price)
            .bind(service.is_active)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StorageError::not_found("service", &service.slug))
    }

    async fn delete_service(&self, id: i64) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM services WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("service", id));
        }
        Ok(())
    }

    async fn list_services(
        &self,
        filter: &ServiceFilter,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<Service>, usize), StorageError> {
        const WHERE: &str = "($1::BOOLEAN IS NULL OR is_active = $1) \
            AND ($2::TEXT IS NULL OR title ILIKE $2 OR description ILIKE $2)";
        let pattern = filter.search.as_deref().map(like_pattern);
        let sql = format!(
            "SELECT {SERVICE_COLUMNS} FROM services WHERE {WHERE} ORDER BY {} LIMIT $3 OFFSET $4",
            filter.ordering.sql()
        );
        let services = sqlx::query_as::<_, Service>(&sql)
            .bind(filter.is_active)
            .bind(&pattern)
            .bind(to_i64(limit))
            .bind(to_i64(offset))
            .fetch_all(&self.pool)
            .await?;
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM services WHERE {WHERE}"))
            .bind(filter.is_active)
            .bind(&pattern)
            .fetch_one(&self.pool)
            .await?;
        Ok((services, count as usize))
    }

    async fn list_socials(&self) -> Result<Vec<Social>, StorageError> {
        let socials = sqlx::query_as::<_, Social>(
            "SELECT id, title, slug, icon_name, created_at FROM socials ORDER BY RANDOM()",
        )
        .fetch_all(&self.pool)
        .await?;
        self.attach_phones(socials).await
    }

    async fn get_social_by_slug(&self, slug: &str) -> Result<Option<Social>, StorageError> {
        let social = sqlx::query_as::<_, Social>(
            "SELECT id, title, slug, icon_name, created_at FROM socials WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        match social {
            Some(social) => Ok(self.attach_phones(vec![social]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn create_social(&self, social: NewSocial) -> Result<Social, StorageError> {
        let mut tx = self.pool.begin().await?;
        let mut created = sqlx::query_as::<_, Social>(
            "INSERT INTO socials (title, slug, icon_name) VALUES ($1, $2, $3) RETURNING id, title, slug, icon_name, created_at",
        )
        .bind(&social.title)
        .bind(&social.slug)
        .bind(&social.icon_name)
        .fetch_one(&mut *tx)
        .await?;
        for number in social.phones {
            let phone = sqlx::query_as::<_, SocialPhone>(
                "INSERT INTO social_phones (social_id, number) VALUES ($1, $2) RETURNING id, social_id, number",
            )
            .bind(created.id)
            .bind(number)
            .fetch_one(&mut *tx)
            .await?;
            created.phones.push(phone);
        }
        tx.commit().await?;
        Ok(created)
    }
}
