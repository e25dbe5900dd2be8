//! Comments on posts: paging, editing and deletion rights

mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::{Value, json};

struct Thread {
    app: TestApp,
    post_author: String,
    commenter: String,
    stranger: String,
    post_id: String,
}

async fn thread_with(app: TestApp) -> Thread {
    let post_author = app.token(&app.user("author@example.com").await);
    let commenter = app.token(&app.user("commenter@example.com").await);
    let stranger = app.token(&app.user("stranger@example.com").await);
    let response = app
        .server
        .post("/api/v1/posts")
        .authorization_bearer(&post_author)
        .json(&json!({"body": "discuss"}))
        .await;
    let post_id = response.json::<Value>()["id"]
        .as_str()
        .unwrap()
        .to_string();
    Thread {
        app,
        post_author,
        commenter,
        stranger,
        post_id,
    }
}

impl Thread {
    fn comments_path(&self) -> String {
        format!("/api/v1/posts/{}/comments", self.post_id)
    }

    async fn comment(&self, token: &str, body: &str) -> Value {
        let response = self
            .app
            .server
            .post(&self.comments_path())
            .authorization_bearer(token)
            .json(&json!({ "body": body }))
            .await;
        assert_eq!(response.status_code(), StatusCode::CREATED);
        response.json()
    }
}

#[tokio::test]
async fn test_create_comment() {
    let thread = thread_with(TestApp::new()).await;

    let comment = thread
        .comment(&thread.commenter, "<b>nice</b><script>x</script>")
        .await;
    assert_eq!(comment["body"], "<b>nice</b>x");
    assert_eq!(comment["post"], thread.post_id.as_str());
    assert_eq!(comment["author"]["email"], "commenter@example.com");
    assert_eq!(comment["edited"], false);

    let response = thread
        .app
        .server
        .get(&format!("/api/v1/posts/{}", thread.post_id))
        .await;
    assert_eq!(response.json::<Value>()["comments_count"], 1);
}

#[tokio::test]
async fn test_comment_validation_and_missing_post() {
    let thread = thread_with(TestApp::new()).await;

    let response = thread
        .app
        .server
        .post(&thread.comments_path())
        .authorization_bearer(&thread.commenter)
        .json(&json!({"body": "  "}))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert!(response.json::<Value>()["fields"]["body"].is_array());

    let response = thread
        .app
        .server
        .post("/api/v1/posts/0123456789abcdef0123456789abcdef/comments")
        .authorization_bearer(&thread.commenter)
        .json(&json!({"body": "hello"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let response = thread
        .app
        .server
        .post(&thread.comments_path())
        .json(&json!({"body": "anonymous"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_comment_pages_default_to_four() {
    let thread = thread_with(TestApp::new()).await;
    for n in 0..6 {
        thread
            .comment(&thread.commenter, &format!("comment {}", n))
            .await;
    }

    let response = thread.app.server.get(&thread.comments_path()).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let page: Value = response.json();
    assert_eq!(page["count"], 6);
    assert_eq!(page["results"].as_array().unwrap().len(), 4);
    assert_eq!(page["results"][0]["body"], "comment 5");
    let next = page["next"].as_str().unwrap();
    assert!(next.contains("limit=4"));
    assert!(next.contains("offset=4"));

    let response = thread
        .app
        .server
        .get(&format!("{}?offset=4", thread.comments_path()))
        .await;
    let page: Value = response.json();
    assert_eq!(page["results"].as_array().unwrap().len(), 2);
    assert!(page["next"].is_null());
    assert!(page["previous"].is_string());

    // Requested sizes are capped.
    let response = thread
        .app
        .server
        .get(&format!("{}?limit=500", thread.comments_path()))
        .await;
    let page: Value = response.json();
    assert_eq!(page["results"].as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn test_edit_comment() {
    let thread = thread_with(TestApp::new()).await;
    let comment = thread.comment(&thread.commenter, "first take").await;
    let path = format!(
        "{}/{}",
        thread.comments_path(),
        comment["id"].as_str().unwrap()
    );

    let response = thread
        .app
        .server
        .patch(&path)
        .authorization_bearer(&thread.stranger)
        .json(&json!({"body": "vandalized"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let response = thread
        .app
        .server
        .put(&path)
        .authorization_bearer(&thread.commenter)
        .json(&json!({"body": "second take"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let edited: Value = response.json();
    assert_eq!(edited["body"], "second take");
    assert_eq!(edited["edited"], true);

    let response = thread.app.server.get(&path).await;
    assert_eq!(response.json::<Value>()["body"], "second take");
}

#[tokio::test]
async fn test_post_author_cannot_delete_by_default() {
    let thread = thread_with(TestApp::new()).await;
    let comment = thread.comment(&thread.commenter, "keep me").await;
    let path = format!(
        "{}/{}",
        thread.comments_path(),
        comment["id"].as_str().unwrap()
    );

    for token in [&thread.post_author, &thread.stranger] {
        let response = thread
            .app
            .server
            .delete(&path)
            .authorization_bearer(token)
            .await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    }

    let response = thread
        .app
        .server
        .delete(&path)
        .authorization_bearer(&thread.commenter)
        .await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);
    assert_eq!(
        thread.app.server.get(&path).await.status_code(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_post_author_may_delete_when_enabled() {
    let app = TestApp::with_config(|config| config.comments_allow_post_author_delete = true);
    let thread = thread_with(app).await;
    let comment = thread.comment(&thread.commenter, "moderate me").await;
    let path = format!(
        "{}/{}",
        thread.comments_path(),
        comment["id"].as_str().unwrap()
    );

    let response = thread
        .app
        .server
        .delete(&path)
        .authorization_bearer(&thread.stranger)
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let response = thread
        .app
        .server
        .delete(&path)
        .authorization_bearer(&thread.post_author)
        .await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_deleting_post_removes_comments() {
    let thread = thread_with(TestApp::new()).await;
    let comment = thread.comment(&thread.commenter, "gone soon").await;

    let response = thread
        .app
        .server
        .delete(&format!("/api/v1/posts/{}", thread.post_id))
        .authorization_bearer(&thread.post_author)
        .await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);

    let response = thread
        .app
        .server
        .get(&format!(
            "{}/{}",
            thread.comments_path(),
            comment["id"].as_str().unwrap()
        ))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_comment_rate_limit() {
    let app = TestApp::with_config(|config| config.comment_rate.limit = 1);
    let thread = thread_with(app).await;
    thread.comment(&thread.commenter, "first").await;

    let response = thread
        .app
        .server
        .post(&thread.comments_path())
        .authorization_bearer(&thread.commenter)
        .json(&json!({"body": "second"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::TOO_MANY_REQUESTS);
}
