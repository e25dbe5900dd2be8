//! Basic API integration tests

mod common;

use axum::http::{StatusCode, header};
use common::{TestApp, png_bytes};
use serde_json::Value;

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new();

    let response = app.server.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");

    let response = app.server.get("/api/v1/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_openapi_endpoint() {
    let app = TestApp::new();

    let response = app.server.get("/api/v1/openapi.json").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let doc: Value = response.json();
    assert!(doc["paths"]["/posts"].is_object());
    assert!(doc["components"]["securitySchemes"]["bearer_auth"].is_object());
}

#[tokio::test]
async fn test_protected_route_requires_token() {
    let app = TestApp::new();

    let response = app.server.get("/api/v1/users/me").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["status"], 401);
    assert!(body["error"].is_string());

    let response = app
        .server
        .get("/api/v1/users/me")
        .authorization_bearer("not-a-jwt")
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_invalid_token_on_public_route_is_rejected() {
    let app = TestApp::new();

    let response = app.server.get("/api/v1/posts").await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let response = app
        .server
        .get("/api/v1/posts")
        .authorization_bearer("garbage")
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_inactive_user_token_is_rejected() {
    let app = TestApp::new();
    let mut user = app.user("idle@example.com").await;
    let token = app.token(&user);
    user.is_active = false;
    app.state.storage.update_user(&user).await.unwrap();

    let response = app
        .server
        .get("/api/v1/users/me")
        .authorization_bearer(&token)
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = TestApp::new();

    let response = app
        .server
        .post("/api/v1/auth/login")
        .content_type("application/json")
        .bytes("{not json".into())
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_uploaded_media_is_served() {
    let app = TestApp::new();
    let user = app.user("pic@example.com").await;
    let token = app.token(&user);

    let form = axum_test::multipart::MultipartForm::new()
        .add_text("body", "With a picture")
        .add_part("image", common::png_part("pic.png"));
    let response = app
        .server
        .post("/api/v1/posts")
        .authorization_bearer(&token)
        .multipart(form)
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let post: Value = response.json();
    let url = post["image"].as_str().unwrap().to_string();
    assert!(url.starts_with("/media/posts/"));

    let response = app.server.get(&url).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.as_bytes().as_ref(), png_bytes().as_slice());
    assert!(response.headers().contains_key(header::CONTENT_TYPE));
}
