//! Shared fixtures for the route tests: an in-memory app over a temporary
//! media root, plus helpers to create accounts and images.

#![allow(dead_code)]

use axum_test::TestServer;
use chrono::Utc;
use classifieds_api::config::AppConfig;
use classifieds_api::models::{NewUser, User};
use classifieds_api::routes::{AppState, create_app};
use classifieds_api::services::password_service::hash_password;
use std::io::Cursor;
use tempfile::TempDir;

pub const PASSWORD: &str = "s3cure-enough-pass";

pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub media_dir: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    pub fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let media_dir = TempDir::new().unwrap();
        let mut config = AppConfig::for_media_root(media_dir.path());
        adjust(&mut config);
        let state = AppState::new(config).unwrap();
        let server = TestServer::new(create_app(state.clone())).unwrap();
        Self {
            server,
            state,
            media_dir,
        }
    }

    /// Insert an active, verified account directly into storage.
    pub async fn user(&self, email: &str) -> User {
        self.account(email, false, false).await
    }

    pub async fn staff(&self, email: &str) -> User {
        self.account(email, true, false).await
    }

    pub async fn superuser(&self, email: &str) -> User {
        self.account(email, true, true).await
    }

    async fn account(&self, email: &str, is_staff: bool, is_superuser: bool) -> User {
        self.state
            .storage
            .create_user(NewUser {
                email: email.to_string(),
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
                password_hash: hash_password(PASSWORD).unwrap(),
                avatar: None,
                is_active: true,
                is_staff,
                is_superuser,
                is_email_verified: true,
                email_verification_token: None,
                email_verification_sent_at: Some(Utc::now()),
            })
            .await
            .unwrap()
    }

    /// Bearer access token for `user`.
    pub fn token(&self, user: &User) -> String {
        self.state
            .jwt
            .generate_token_pair(user.public_id, &user.email)
            .unwrap()
            .access_token
    }

    /// Whether a stored media path (as returned in a URL) exists on disk.
    pub fn media_exists(&self, url: &str) -> bool {
        let relative = url
            .strip_prefix(&format!("{}/", self.state.config.media_url))
            .unwrap_or(url);
        self.media_dir.path().join(relative).exists()
    }
}

/// A small valid PNG image.
pub fn png_bytes() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(4, 4, image::Rgb([200, 30, 30]));
    let mut out = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut out), image::ImageOutputFormat::Png)
        .unwrap();
    out
}

pub fn png_part(file_name: &str) -> axum_test::multipart::Part {
    axum_test::multipart::Part::bytes(png_bytes())
        .file_name(file_name)
        .mime_type("image/png")
}
