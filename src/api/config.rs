//! Application configuration loaded from environment variables.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Quota for one sliding-window rate limit scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateQuota {
    pub limit: usize,
    pub window: Duration,
}

/// SMTP settings. An empty host puts the mailer in log-only mode.
#[derive(Debug, Clone, Default)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub is_development: bool,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub access_token_ttl: chrono::Duration,
    pub refresh_token_ttl: chrono::Duration,
    pub media_root: PathBuf,
    pub media_url: String,
    /// Front-end origin used in email links.
    pub public_base_url: String,
    pub smtp: SmtpSettings,
    pub cors_allowed_origins: Vec<String>,
    pub post_rate: RateQuota,
    pub comment_rate: RateQuota,
    pub global_requests_per_minute: u32,
    pub comments_allow_post_author_delete: bool,
    pub page_size: usize,
    pub max_page_size: usize,
}

const DEV_JWT_SECRET: &str = "dev-secret-do-not-use-in-production-change-me-now";

impl AppConfig {
    /// Read configuration from the process environment.
    ///
    /// Fails only when `JWT_SECRET` is missing or shorter than 32 characters
    /// outside development (`APP_ENV=development`).
    pub fn from_env() -> Result<Self, String> {
        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "production".to_string());
        let is_development = app_env.eq_ignore_ascii_case("development");

        let jwt_secret = match std::env::var("JWT_SECRET") {
            Ok(secret) => secret,
            Err(_) if is_development => {
                warn!("JWT_SECRET not set! Using default secret for development. DO NOT USE IN PRODUCTION!");
                DEV_JWT_SECRET.to_string()
            }
            Err(_) => {
                return Err("JWT_SECRET environment variable is required in production".to_string());
            }
        };
        if jwt_secret.len() < 32 {
            if is_development {
                warn!("JWT_SECRET is less than 32 characters. Consider using a longer secret.");
            } else {
                return Err("JWT_SECRET must be at least 32 characters in production".to_string());
            }
        }

        let defaults = Self::default();
        Ok(Self {
            port: env_parse("PORT", defaults.port),
            is_development,
            database_url: env_opt("DATABASE_URL"),
            jwt_secret,
            access_token_ttl: chrono::Duration::minutes(env_parse(
                "ACCESS_TOKEN_TTL_MINUTES",
                defaults.access_token_ttl.num_minutes(),
            )),
            refresh_token_ttl: chrono::Duration::days(env_parse(
                "REFRESH_TOKEN_TTL_DAYS",
                defaults.refresh_token_ttl.num_days(),
            )),
            media_root: env_opt("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.media_root),
            media_url: env_opt("MEDIA_URL").unwrap_or(defaults.media_url),
            public_base_url: env_opt("PUBLIC_BASE_URL").unwrap_or(defaults.public_base_url),
            smtp: SmtpSettings {
                host: env_opt("SMTP_HOST").unwrap_or_default(),
                port: env_parse("SMTP_PORT", 587),
                username: env_opt("SMTP_USERNAME"),
                password: env_opt("SMTP_PASSWORD"),
                from: env_opt("SMTP_FROM").unwrap_or(defaults.smtp.from),
            },
            cors_allowed_origins: env_opt("CORS_ALLOWED_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(str::trim)
                        .filter(|origin| !origin.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            post_rate: RateQuota {
                limit: env_parse("POST_RATE_LIMIT", defaults.post_rate.limit),
                window: Duration::from_secs(env_parse(
                    "POST_RATE_WINDOW_SECS",
                    defaults.post_rate.window.as_secs(),
                )),
            },
            comment_rate: RateQuota {
                limit: env_parse("COMMENT_RATE_LIMIT", defaults.comment_rate.limit),
                window: Duration::from_secs(env_parse(
                    "COMMENT_RATE_WINDOW_SECS",
                    defaults.comment_rate.window.as_secs(),
                )),
            },
            global_requests_per_minute: env_parse(
                "GLOBAL_RATE_LIMIT_PER_MINUTE",
                defaults.global_requests_per_minute,
            ),
            comments_allow_post_author_delete: env_parse(
                "COMMENTS_ALLOW_POST_AUTHOR_DELETE",
                defaults.comments_allow_post_author_delete,
            ),
            page_size: env_parse("PAGE_SIZE", defaults.page_size),
            max_page_size: env_parse("MAX_PAGE_SIZE", defaults.max_page_size),
        })
    }

    /// Development configuration rooted at a media directory, used by tests.
    pub fn for_media_root(media_root: impl Into<PathBuf>) -> Self {
        Self {
            media_root: media_root.into(),
            ..Self::default()
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8081,
            is_development: true,
            database_url: None,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            access_token_ttl: chrono::Duration::days(7),
            refresh_token_ttl: chrono::Duration::days(365),
            media_root: PathBuf::from("media"),
            media_url: "/media".to_string(),
            public_base_url: "http://localhost:3000".to_string(),
            smtp: SmtpSettings {
                port: 587,
                from: "noreply@example.com".to_string(),
                ..SmtpSettings::default()
            },
            cors_allowed_origins: Vec::new(),
            post_rate: RateQuota {
                limit: 5,
                window: Duration::from_secs(60),
            },
            comment_rate: RateQuota {
                limit: 10,
                window: Duration::from_secs(60),
            },
            global_requests_per_minute: 600,
            comments_allow_post_author_delete: false,
            page_size: 15,
            max_page_size: 100,
        }
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    match env_opt(key) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("Invalid value {:?} for {}; using default", raw, key);
            default
        }),
        None => default,
    }
}
