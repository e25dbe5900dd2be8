//! Post publishing, editing, likes and the per-user posting limit

mod common;

use axum::http::{HeaderValue, StatusCode, header};
use axum_test::multipart::MultipartForm;
use common::{TestApp, png_part};
use serde_json::{Value, json};

async fn create_post(app: &TestApp, token: &str, body: &str) -> Value {
    let response = app
        .server
        .post("/api/v1/posts")
        .authorization_bearer(token)
        .json(&json!({ "body": body }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    response.json()
}

#[tokio::test]
async fn test_create_post_sanitizes_body() {
    let app = TestApp::new();
    let author = app.user("author@example.com").await;
    let token = app.token(&author);

    let post = create_post(
        &app,
        &token,
        "<p onclick='x'>Hello <b>world</b></p><script>alert(1)</script>",
    )
    .await;
    assert_eq!(post["body"], "<p>Hello <b>world</b></p>alert(1)");
    assert_eq!(post["short_content"], "Hello worldalert(1)");
    assert_eq!(post["edited"], false);
    assert_eq!(post["liked"], false);
    assert_eq!(post["likes_count"], 0);
    assert_eq!(post["comments_count"], 0);
    assert_eq!(post["author"]["email"], "author@example.com");

    let id = post["id"].as_str().unwrap();
    let response = app.server.get(&format!("/api/v1/posts/{}", id)).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["id"], id);
}

#[tokio::test]
async fn test_create_post_requires_auth() {
    let app = TestApp::new();
    let response = app
        .server
        .post("/api/v1/posts")
        .json(&json!({"body": "hi"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_empty_and_oversized_bodies_rejected() {
    let app = TestApp::new();
    let author = app.user("author@example.com").await;
    let token = app.token(&author);

    for body in [
        json!({"body": ""}),
        json!({"body": "<script></script>   "}),
        json!({}),
        json!({"body": "x".repeat(4097)}),
    ] {
        let response = app
            .server
            .post("/api/v1/posts")
            .authorization_bearer(&token)
            .json(&body)
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        assert!(response.json::<Value>()["fields"]["body"].is_array());
    }
}

#[tokio::test]
async fn test_unknown_post_is_not_found() {
    let app = TestApp::new();
    for id in ["not-a-uuid", "0123456789abcdef0123456789abcdef"] {
        let response = app.server.get(&format!("/api/v1/posts/{}", id)).await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    }
}

#[tokio::test]
async fn test_multibyte_attribute_names_are_dropped() {
    let app = TestApp::new();
    let author = app.user("author@example.com").await;
    let token = app.token(&author);

    let post = create_post(&app, &token, "<p a\u{e9}b=1>привет</p>").await;
    assert_eq!(post["body"], "<p>привет</p>");
}

#[tokio::test]
async fn test_list_posts_with_huge_offset() {
    let app = TestApp::new();
    let author = app.user("author@example.com").await;
    create_post(&app, &app.token(&author), "one").await;

    let response = app
        .server
        .get("/api/v1/posts?offset=18446744073709551615")
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let page: Value = response.json();
    assert_eq!(page["count"], 1);
    assert!(page["results"].as_array().unwrap().is_empty());
    assert!(page["next"].is_null());
    assert!(page["previous"].as_str().unwrap().contains("offset="));
}

#[tokio::test]
async fn test_list_posts_newest_first_and_author_filter() {
    let app = TestApp::new();
    let first = app.user("first@example.com").await;
    let second = app.user("second@example.com").await;
    create_post(&app, &app.token(&first), "one").await;
    create_post(&app, &app.token(&second), "two").await;
    create_post(&app, &app.token(&first), "three").await;

    let response = app.server.get("/api/v1/posts?limit=2").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let page: Value = response.json();
    assert_eq!(page["count"], 3);
    assert_eq!(page["results"][0]["body"], "three");
    assert_eq!(page["results"][1]["body"], "two");
    assert!(page["next"].as_str().unwrap().contains("offset=2"));
    assert!(page["previous"].is_null());

    let response = app
        .server
        .get(&format!("/api/v1/posts?author={}", first.public_id.simple()))
        .await;
    let page: Value = response.json();
    assert_eq!(page["count"], 2);

    let response = app
        .server
        .get("/api/v1/posts?author=0123456789abcdef0123456789abcdef")
        .await;
    let page: Value = response.json();
    assert_eq!(page["count"], 0);
}

#[tokio::test]
async fn test_edit_and_delete_permissions() {
    let app = TestApp::new();
    let author = app.user("author@example.com").await;
    let stranger = app.user("stranger@example.com").await;
    let admin = app.superuser("admin@example.com").await;
    let post = create_post(&app, &app.token(&author), "original").await;
    let path = format!("/api/v1/posts/{}", post["id"].as_str().unwrap());

    let response = app
        .server
        .put(&path)
        .authorization_bearer(&app.token(&stranger))
        .json(&json!({"body": "hijacked"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let response = app
        .server
        .put(&path)
        .authorization_bearer(&app.token(&author))
        .json(&json!({"body": "<i>revised</i>"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let updated: Value = response.json();
    assert_eq!(updated["body"], "<i>revised</i>");
    assert_eq!(updated["edited"], true);

    let response = app
        .server
        .delete(&path)
        .authorization_bearer(&app.token(&stranger))
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let response = app
        .server
        .delete(&path)
        .authorization_bearer(&app.token(&admin))
        .await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);
    assert_eq!(
        app.server.get(&path).await.status_code(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_post_image_lifecycle() {
    let app = TestApp::new();
    let author = app.user("author@example.com").await;
    let token = app.token(&author);

    let form = MultipartForm::new()
        .add_text("body", "with picture")
        .add_part("image", png_part("one.png"));
    let response = app
        .server
        .post("/api/v1/posts")
        .authorization_bearer(&token)
        .multipart(form)
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let post: Value = response.json();
    let first = post["image"].as_str().unwrap().to_string();
    assert!(first.starts_with("/media/posts/"));
    assert!(app.media_exists(&first));
    let path = format!("/api/v1/posts/{}", post["id"].as_str().unwrap());

    let form = MultipartForm::new().add_part("image", png_part("two.png"));
    let response = app
        .server
        .put(&path)
        .authorization_bearer(&token)
        .multipart(form)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let second = response.json::<Value>()["image"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(!app.media_exists(&first));
    assert!(app.media_exists(&second));
    assert_eq!(response.json::<Value>()["body"], "with picture");

    let response = app
        .server
        .delete(&path)
        .authorization_bearer(&token)
        .await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);
    assert!(!app.media_exists(&second));
}

#[tokio::test]
async fn test_like_and_unlike() {
    let app = TestApp::new();
    let author = app.user("author@example.com").await;
    let fan = app.user("fan@example.com").await;
    let post = create_post(&app, &app.token(&author), "like me").await;
    let id = post["id"].as_str().unwrap();
    let fan_token = app.token(&fan);

    let response = app
        .server
        .post(&format!("/api/v1/posts/{}/like", id))
        .authorization_bearer(&fan_token)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let liked: Value = response.json();
    assert_eq!(liked["liked"], true);
    assert_eq!(liked["likes_count"], 1);

    // Liking twice keeps a single like.
    let response = app
        .server
        .post(&format!("/api/v1/posts/{}/like", id))
        .authorization_bearer(&fan_token)
        .await;
    assert_eq!(response.json::<Value>()["likes_count"], 1);

    // Anonymous readers see the count but not a liked flag.
    let response = app.server.get(&format!("/api/v1/posts/{}", id)).await;
    let anonymous: Value = response.json();
    assert_eq!(anonymous["likes_count"], 1);
    assert_eq!(anonymous["liked"], false);

    let response = app
        .server
        .post(&format!("/api/v1/posts/{}/remove_like", id))
        .authorization_bearer(&fan_token)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let unliked: Value = response.json();
    assert_eq!(unliked["liked"], false);
    assert_eq!(unliked["likes_count"], 0);
}

#[tokio::test]
async fn test_cannot_like_own_post() {
    let app = TestApp::new();
    let author = app.user("author@example.com").await;
    let token = app.token(&author);
    let post = create_post(&app, &token, "mine").await;
    let id = post["id"].as_str().unwrap();

    for action in ["like", "toggle-like"] {
        let response = app
            .server
            .post(&format!("/api/v1/posts/{}/{}", id, action))
            .authorization_bearer(&token)
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.json::<Value>()["error"],
            "You cannot like your own post."
        );
    }
}

#[tokio::test]
async fn test_toggle_like() {
    let app = TestApp::new();
    let author = app.user("author@example.com").await;
    let fan = app.user("fan@example.com").await;
    let post = create_post(&app, &app.token(&author), "toggle").await;
    let path = format!("/api/v1/posts/{}/toggle-like", post["id"].as_str().unwrap());
    let token = app.token(&fan);

    let response = app.server.post(&path).authorization_bearer(&token).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        response.json::<Value>(),
        json!({"liked": true, "likes_count": 1})
    );

    let response = app.server.post(&path).authorization_bearer(&token).await;
    assert_eq!(
        response.json::<Value>(),
        json!({"liked": false, "likes_count": 0})
    );
}

#[tokio::test]
async fn test_posting_rate_limit() {
    let app = TestApp::with_config(|config| config.post_rate.limit = 2);
    let author = app.user("author@example.com").await;
    let other = app.user("other@example.com").await;
    let token = app.token(&author);

    create_post(&app, &token, "one").await;
    create_post(&app, &token, "two").await;

    let response = app
        .server
        .post("/api/v1/posts")
        .authorization_bearer(&token)
        .json(&json!({"body": "three"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = response
        .headers()
        .get(header::RETRY_AFTER)
        .unwrap()
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!((1..=60).contains(&retry_after));
    assert!(
        response.json::<Value>()["error"]
            .as_str()
            .unwrap()
            .starts_with("Too many requests")
    );

    // Rejected attempts are not recorded, and the body is not validated first.
    let response = app
        .server
        .post("/api/v1/posts")
        .authorization_bearer(&token)
        .add_header(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("ru-RU,ru;q=0.9,en;q=0.5"),
        )
        .json(&json!({"body": ""}))
        .await;
    assert_eq!(response.status_code(), StatusCode::TOO_MANY_REQUESTS);
    assert!(
        response.json::<Value>()["error"]
            .as_str()
            .unwrap()
            .starts_with("Слишком много запросов")
    );

    // The quota is per user.
    create_post(&app, &app.token(&other), "someone else").await;
}
