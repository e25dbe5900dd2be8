//! Registration, verification, login and password management routes

mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{PASSWORD, TestApp};
use serde_json::{Value, json};

async fn register(app: &TestApp, email: &str) -> axum_test::TestResponse {
    app.server
        .post("/api/v1/auth/register")
        .json(&json!({
            "email": email,
            "password": "correct horse battery",
            "first_name": "<b>Ann</b>",
            "last_name": "Lee",
        }))
        .await
}

async fn verification_token(app: &TestApp, email: &str) -> String {
    app.state
        .storage
        .get_user_by_email(email)
        .await
        .unwrap()
        .unwrap()
        .email_verification_token
        .unwrap()
}

#[tokio::test]
async fn test_register_verify_and_login() {
    let app = TestApp::new();

    let response = register(&app, "Ann@Example.com").await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let user: Value = response.json();
    assert_eq!(user["email"], "ann@example.com");
    assert_eq!(user["first_name"], "Ann");
    assert_eq!(user["is_active"], false);
    assert_eq!(user["is_email_verified"], false);
    assert_eq!(user["id"].as_str().unwrap().len(), 32);

    // Not verified yet.
    let response = app
        .server
        .post("/api/v1/auth/login")
        .json(&json!({"email": "ann@example.com", "password": "correct horse battery"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let token = verification_token(&app, "ann@example.com").await;
    let response = app
        .server
        .get(&format!("/api/v1/auth/verify-email/{}", token))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let stored = app
        .state
        .storage
        .get_user_by_email("ann@example.com")
        .await
        .unwrap()
        .unwrap();
    assert!(stored.is_active);
    assert!(stored.is_email_verified);
    assert!(stored.email_verification_token.is_none());

    let response = app
        .server
        .post("/api/v1/auth/login")
        .json(&json!({"email": "ANN@example.com", "password": "correct horse battery"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    let access = body["access"].as_str().unwrap();
    assert!(body["refresh"].is_string());
    assert_eq!(body["user"]["email"], "ann@example.com");

    let response = app
        .server
        .get("/api/v1/users/me")
        .authorization_bearer(access)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let me: Value = response.json();
    assert_eq!(me["email"], "ann@example.com");
}

#[tokio::test]
async fn test_register_validation() {
    let app = TestApp::new();

    let response = app
        .server
        .post("/api/v1/auth/register")
        .json(&json!({
            "email": "not-an-email",
            "password": "1234",
            "first_name": "",
            "last_name": "Lee",
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["fields"]["email"].is_array());
    assert!(body["fields"]["password"].as_array().unwrap().len() >= 2);
    assert!(body["fields"]["first_name"].is_array());
    assert!(body["fields"].get("last_name").is_none());
}

#[tokio::test]
async fn test_register_duplicate_email_conflicts() {
    let app = TestApp::new();
    app.user("taken@example.com").await;

    let response = register(&app, "TAKEN@example.com").await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_verify_unknown_token() {
    let app = TestApp::new();

    let response = app.server.get("/api/v1/auth/verify-email/nope").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_expired_verification_deletes_account() {
    let app = TestApp::new();
    register(&app, "late@example.com").await;

    let mut user = app
        .state
        .storage
        .get_user_by_email("late@example.com")
        .await
        .unwrap()
        .unwrap();
    user.email_verification_sent_at = Some(Utc::now() - Duration::hours(25));
    app.state.storage.update_user(&user).await.unwrap();
    let token = user.email_verification_token.clone().unwrap();

    let response = app
        .server
        .get(&format!("/api/v1/auth/verify-email/{}", token))
        .await;
    assert_eq!(response.status_code(), StatusCode::GONE);
    assert!(
        app.state
            .storage
            .get_user_by_email("late@example.com")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_login_wrong_password() {
    let app = TestApp::new();
    app.user("bob@example.com").await;

    let response = app
        .server
        .post("/api/v1/auth/login")
        .json(&json!({"email": "bob@example.com", "password": "wrong-password"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let response = app
        .server
        .post("/api/v1/auth/login")
        .json(&json!({"email": "bob@example.com", "password": PASSWORD}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_token() {
    let app = TestApp::new();
    let user = app.user("carol@example.com").await;
    let pair = app
        .state
        .jwt
        .generate_token_pair(user.public_id, &user.email)
        .unwrap();

    let response = app
        .server
        .post("/api/v1/auth/refresh")
        .json(&json!({"refresh": pair.refresh_token}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert!(body["access"].is_string());

    // An access token is not a refresh token.
    let response = app
        .server
        .post("/api/v1/auth/refresh")
        .json(&json!({"refresh": pair.access_token}))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_password_reset_flow() {
    let app = TestApp::new();
    app.user("dave@example.com").await;

    let unknown = app
        .server
        .post("/api/v1/auth/password-reset")
        .json(&json!({"email": "nobody@example.com"}))
        .await;
    let known = app
        .server
        .post("/api/v1/auth/password-reset")
        .json(&json!({"email": "dave@example.com"}))
        .await;
    assert_eq!(unknown.status_code(), StatusCode::OK);
    assert_eq!(known.status_code(), StatusCode::OK);
    assert_eq!(unknown.json::<Value>(), known.json::<Value>());

    let token = app
        .state
        .storage
        .get_user_by_email("dave@example.com")
        .await
        .unwrap()
        .unwrap()
        .password_reset_token
        .unwrap();

    let response = app
        .server
        .post("/api/v1/auth/password-reset/confirm")
        .json(&json!({"token": "bogus", "password": "another good phrase"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = app
        .server
        .post("/api/v1/auth/password-reset/confirm")
        .json(&json!({"token": token, "password": "another good phrase"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    // Tokens are single use.
    let response = app
        .server
        .post("/api/v1/auth/password-reset/confirm")
        .json(&json!({"token": token, "password": "yet another phrase"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = app
        .server
        .post("/api/v1/auth/login")
        .json(&json!({"email": "dave@example.com", "password": "another good phrase"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_expired_password_reset_token() {
    let app = TestApp::new();
    let mut user = app.user("erin@example.com").await;
    user.password_reset_token = Some("expired-token".to_string());
    user.password_reset_sent_at = Some(Utc::now() - Duration::hours(2));
    app.state.storage.update_user(&user).await.unwrap();

    let response = app
        .server
        .post("/api/v1/auth/password-reset/confirm")
        .json(&json!({"token": "expired-token", "password": "another good phrase"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let stored = app.state.storage.get_user(user.id).await.unwrap().unwrap();
    assert!(stored.password_reset_token.is_none());
}

#[tokio::test]
async fn test_change_password() {
    let app = TestApp::new();
    let user = app.user("frank@example.com").await;
    let token = app.token(&user);

    let response = app
        .server
        .post("/api/v1/auth/change-password")
        .authorization_bearer(&token)
        .json(&json!({"old_password": "wrong", "new_password": "brand new phrase"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["fields"]["old_password"].is_array());

    let response = app
        .server
        .post("/api/v1/auth/change-password")
        .authorization_bearer(&token)
        .json(&json!({"old_password": PASSWORD, "new_password": "brand new phrase"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let response = app
        .server
        .post("/api/v1/auth/login")
        .json(&json!({"email": "frank@example.com", "password": "brand new phrase"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_user_profile_permissions() {
    let app = TestApp::new();
    let owner = app.user("gina@example.com").await;
    let other = app.user("hank@example.com").await;
    let admin = app.superuser("root@example.com").await;
    let path = format!("/api/v1/users/{}", owner.public_id.simple());

    let response = app
        .server
        .patch(&path)
        .authorization_bearer(&app.token(&other))
        .json(&json!({"first_name": "Mallory"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let response = app
        .server
        .patch(&path)
        .authorization_bearer(&app.token(&owner))
        .json(&json!({"first_name": "<i>Gina</i>"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["first_name"], "Gina");

    // Superusers are hidden from regular listings.
    let response = app
        .server
        .get("/api/v1/users")
        .authorization_bearer(&app.token(&other))
        .await;
    let listing: Value = response.json();
    assert_eq!(listing["count"], 2);
    let response = app
        .server
        .get("/api/v1/users")
        .authorization_bearer(&app.token(&admin))
        .await;
    let listing: Value = response.json();
    assert_eq!(listing["count"], 3);

    let response = app
        .server
        .delete(&path)
        .authorization_bearer(&app.token(&admin))
        .await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);
    assert!(app.state.storage.get_user(owner.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_avatar_replace_and_clear() {
    let app = TestApp::new();
    let user = app.user("ivy@example.com").await;
    let token = app.token(&user);
    let path = format!("/api/v1/users/{}", user.public_id.simple());

    let form = axum_test::multipart::MultipartForm::new()
        .add_part("avatar", common::png_part("me.png"));
    let response = app
        .server
        .patch(&path)
        .authorization_bearer(&token)
        .multipart(form)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let first = response.json::<Value>()["avatar"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(app.media_exists(&first));

    let form = axum_test::multipart::MultipartForm::new()
        .add_part("avatar", common::png_part("me2.png"));
    let response = app
        .server
        .patch(&path)
        .authorization_bearer(&token)
        .multipart(form)
        .await;
    let second = response.json::<Value>()["avatar"]
        .as_str()
        .unwrap()
        .to_string();
    assert_ne!(first, second);
    assert!(!app.media_exists(&first));
    assert!(app.media_exists(&second));

    let response = app
        .server
        .patch(&path)
        .authorization_bearer(&token)
        .json(&json!({"avatar": null}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response.json::<Value>()["avatar"].is_null());
    assert!(!app.media_exists(&second));
}

#[tokio::test]
async fn test_avatar_rejects_non_image() {
    let app = TestApp::new();
    let user = app.user("jay@example.com").await;

    let form = axum_test::multipart::MultipartForm::new().add_part(
        "avatar",
        axum_test::multipart::Part::bytes(b"plain text".to_vec()).file_name("me.png"),
    );
    let response = app
        .server
        .patch(&format!("/api/v1/users/{}", user.public_id.simple()))
        .authorization_bearer(&app.token(&user))
        .multipart(form)
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["fields"]["avatar"].is_array());
}
