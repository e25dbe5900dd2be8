//! Unit tests for services

use chrono::{Duration, Utc};
use classifieds_api::config::RateQuota;
use classifieds_api::models::Price;
use classifieds_api::services::account_service::{generate_token, password_reset_ttl, token_expired};
use classifieds_api::services::password_service::{hash_password, validate_password, verify_password};
use classifieds_api::services::slug_service::{slugify, slugify_bounded};
use classifieds_api::services::text_service::{make_excerpt, short_description};
use classifieds_api::services::{InMemoryCache, JwtService, SlidingWindowLimiter, TokenType};
use std::sync::Arc;
use uuid::Uuid;

#[test]
fn test_slugs_transliterate_cyrillic() {
    assert_eq!(slugify("Продаю велосипед"), "prodaiu-velosiped");
    assert_eq!(slugify("  Hello,   World!  "), "hello-world");
    assert_eq!(slugify_bounded("!!!", 80, "ad"), "ad");
    let long = slugify_bounded(&"word ".repeat(40), 30, "ad");
    assert!(long.len() <= 30);
    assert!(!long.ends_with('-'));
}

#[test]
fn test_excerpts() {
    assert_eq!(make_excerpt("short   text", 100), "short text");
    let excerpt = make_excerpt(&"alpha ".repeat(30), 20);
    assert!(excerpt.ends_with('…'));
    assert!(excerpt.chars().count() <= 21);

    assert_eq!(short_description("fits", 10), "fits");
    assert_eq!(
        short_description("one two three four", 5),
        "one two..."
    );
}

#[test]
fn test_password_rules_and_hashing() {
    assert!(validate_password("correct horse battery").is_ok());
    let errors = validate_password("123").unwrap_err();
    assert_eq!(errors.len(), 2);

    let hash = hash_password("correct horse battery").unwrap();
    assert!(verify_password("correct horse battery", &hash).unwrap());
    assert!(!verify_password("incorrect horse battery", &hash).unwrap());
}

#[test]
fn test_email_tokens() {
    let first = generate_token();
    assert_eq!(first.len(), 32);
    assert_ne!(first, generate_token());

    let now = Utc::now();
    assert!(!token_expired(
        Some(now - Duration::minutes(59)),
        password_reset_ttl(),
        now
    ));
    assert!(token_expired(
        Some(now - Duration::minutes(61)),
        password_reset_ttl(),
        now
    ));
}

#[test]
fn test_jwt_access_and_refresh() {
    let jwt = JwtService::new("unit-test-secret-that-is-long-enough");
    let user = Uuid::new_v4();
    let pair = jwt.generate_token_pair(user, "a@example.com").unwrap();

    let claims = jwt.validate_access_token(&pair.access_token).unwrap();
    assert_eq!(claims.user_id(), Some(user));
    assert_eq!(claims.token_type, TokenType::Access);
    assert!(jwt.validate_access_token(&pair.refresh_token).is_err());
    assert!(jwt.validate_refresh_token(&pair.refresh_token).is_ok());

    let other = JwtService::new("another-secret-that-is-also-long-enough");
    assert!(other.validate_access_token(&pair.access_token).is_err());
}

#[tokio::test]
async fn test_sliding_window_limiter() {
    let limiter = SlidingWindowLimiter::new(
        Arc::new(InMemoryCache::new()),
        "comments",
        RateQuota {
            limit: 2,
            window: std::time::Duration::from_secs(60),
        },
    );
    let start = 1_000_000;

    assert!(limiter.check_at("7", start).await.is_ok());
    assert!(limiter.check_at("7", start + 10_000).await.is_ok());
    assert_eq!(limiter.check_at("7", start + 20_000).await, Err(40));
    // Keys are independent.
    assert!(limiter.check_at("8", start + 20_000).await.is_ok());
    // The first event leaves the window after 60 seconds.
    assert!(limiter.check_at("7", start + 60_001).await.is_ok());
    assert!(limiter.check_at("7", start + 60_002).await.is_err());
}

#[test]
fn test_prices() {
    let price: Price = "12.5".parse().unwrap();
    assert_eq!(price.cents(), 1250);
    assert_eq!(price.to_string(), "12.50");
    assert_eq!("0.05".parse::<Price>().unwrap(), Price::from_cents(5));
    assert!("-1".parse::<Price>().is_err());
    assert!("1.234".parse::<Price>().is_err());
    assert!("abc".parse::<Price>().is_err());
    assert!("123456789".parse::<Price>().is_err());
}
