//! HTTP surface tests driven through the full router with in-memory ports.

mod support;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use postcache::application::posts::{CachePolicy, Deadline, Traced};
use postcache::infra::http::{ApiState, build_router};

use support::{FlakyCache, MemoryPosts, service};

fn app(posts: &Arc<MemoryPosts>, cache: &Arc<FlakyCache>) -> Router {
    let access = Traced::new(Deadline::new(
        service(posts, cache, CachePolicy::default()),
        Duration::from_secs(5),
    ));
    build_router(ApiState::new(Arc::new(access)))
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request");

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}

async fn create(app: &Router, title: &str, slug: &str) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/v1/posts",
        Some(json!({ "title": title, "slug": slug, "content": "body" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
    body
}

#[tokio::test]
async fn create_then_fetch_by_every_dimension() {
    let posts = MemoryPosts::new();
    let cache = FlakyCache::new();
    let app = app(&posts, &cache);

    let created = create(&app, "Hello World", "hello-world").await;
    let id = created["id"].as_i64().expect("id");

    let (status, by_id) = send(&app, Method::GET, &format!("/api/v1/posts/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_id, created);

    let (status, by_title) = send(
        &app,
        Method::GET,
        "/api/v1/posts/title/Hello%20World",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_title["id"], created["id"]);

    let (status, by_slug) = send(&app, Method::GET, "/api/v1/posts/slug/hello-world", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_slug["slug"], "hello-world");

    let (status, list) = send(&app, Method::GET, "/api/v1/posts", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn create_without_slug_derives_one() {
    let posts = MemoryPosts::new();
    let cache = FlakyCache::new();
    let app = app(&posts, &cache);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/posts",
        Some(json!({ "title": "Rust 基础教程", "content": "body" })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["slug"], "rust-ji-chu-jiao-cheng");
}

#[tokio::test]
async fn missing_post_is_404() {
    let posts = MemoryPosts::new();
    let cache = FlakyCache::new();
    let app = app(&posts, &cache);

    let (status, body) = send(&app, Method::GET, "/api/v1/posts/999", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn malformed_inputs_are_400() {
    let posts = MemoryPosts::new();
    let cache = FlakyCache::new();
    let app = app(&posts, &cache);

    let (status, body) = send(&app, Method::GET, "/api/v1/posts/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_input");

    let (status, body) = send(&app, Method::GET, "/api/v1/posts/-4", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_input");

    for uri in ["/api/v1/posts/title/%FF", "/api/v1/posts/slug/%FF"] {
        let (status, body) = send(&app, Method::GET, uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["error"]["code"], "invalid_input", "{uri}");
    }

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/posts",
        Some(json!({ "title": "", "content": "body" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_input");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/posts",
        Some(json!({ "title": "No content" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn duplicate_slug_is_409() {
    let posts = MemoryPosts::new();
    let cache = FlakyCache::new();
    let app = app(&posts, &cache);
    create(&app, "Hello", "hello").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/posts",
        Some(json!({ "title": "Other", "slug": "hello", "content": "body" })),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "duplicate");
    assert_eq!(body["error"]["hint"], "posts_slug_key");
}

#[tokio::test]
async fn patch_applies_partial_updates() {
    let posts = MemoryPosts::new();
    let cache = FlakyCache::new();
    let app = app(&posts, &cache);
    let created = create(&app, "Hello", "hello").await;
    let id = created["id"].as_i64().expect("id");

    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/api/v1/posts/{id}"),
        Some(json!({ "content": "rewritten" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Hello");
    assert_eq!(body["content"], "rewritten");

    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/api/v1/posts/{id}"),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_input");
}

#[tokio::test]
async fn delete_returns_204_then_404() {
    let posts = MemoryPosts::new();
    let cache = FlakyCache::new();
    let app = app(&posts, &cache);
    let created = create(&app, "Hello", "hello").await;
    let uri = format!("/api/v1/posts/{}", created["id"]);

    send(&app, Method::GET, &uri, None).await;
    let (status, _) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cache_population_failure_is_503() {
    let posts = MemoryPosts::new();
    let cache = FlakyCache::new();
    let app = app(&posts, &cache);
    let created = create(&app, "Hello", "hello").await;
    cache.fail_set(true);

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/v1/posts/{}", created["id"]),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "cache_error");
}

#[tokio::test]
async fn store_failure_is_503() {
    let posts = MemoryPosts::new();
    let cache = FlakyCache::new();
    let app = app(&posts, &cache);
    posts.fail_reads(true);

    let (status, body) = send(&app, Method::GET, "/api/v1/posts/slug/hello", None).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "store_error");
}

#[tokio::test(start_paused = true)]
async fn hung_store_is_504() {
    let posts = MemoryPosts::new();
    let cache = FlakyCache::new();
    let app = app(&posts, &cache);
    posts.stall(true);

    let (status, body) = send(&app, Method::GET, "/api/v1/posts/1", None).await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body["error"]["code"], "deadline_exceeded");
}

#[tokio::test]
async fn healthz_and_request_id() {
    let posts = MemoryPosts::new();
    let cache = FlakyCache::new();
    let app = app(&posts, &cache);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn forwarded_request_id_is_echoed() {
    let posts = MemoryPosts::new();
    let cache = FlakyCache::new();
    let app = app(&posts, &cache);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/posts")
                .header("x-request-id", "trace-abc-123")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.headers()["x-request-id"], "trace-abc-123");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/posts")
                .header("x-request-id", "has spaces")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_ne!(response.headers()["x-request-id"], "has spaces");
}

#[tokio::test]
async fn cors_preflight_is_answered() {
    let posts = MemoryPosts::new();
    let cache = FlakyCache::new();
    let app = app(&posts, &cache);

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/v1/posts")
                .header(header::ORIGIN, "https://example.com")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert!(response.status().is_success());
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|value| value.to_str().ok()),
        Some("*")
    );
}
