use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use snip_core::Storager;
use snip_gateway::{App, AppState};
use snip_generator::HashGenerator;
use snip_storage::worker::DEFAULT_QUEUE_CAPACITY;
use snip_storage::{DeleteWorker, MemoryStorage, StorageError};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const BASE_URL: &str = "http://short.test";

struct TestApp {
    router: Router,
    storage: Arc<dyn Storager>,
}

impl TestApp {
    fn new() -> Self {
        let storage: Arc<dyn Storager> = Arc::new(MemoryStorage::new(HashGenerator::new()));
        let (deletes, _worker) = DeleteWorker::spawn(Arc::clone(&storage), DEFAULT_QUEUE_CAPACITY);
        let router = App::router(AppState::new(Arc::clone(&storage), deletes, BASE_URL));
        Self { router, storage }
    }

    async fn send(&self, method: Method, uri: &str, owner: Option<&str>, body: &str) -> Response {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(owner) = owner {
            request = request.header(header::COOKIE, format!("shortener={owner}"));
        }
        let request = request.body(Body::from(body.to_owned())).unwrap();
        self.router.clone().oneshot(request).await.unwrap()
    }
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn token_of(short_url: &str) -> &str {
    short_url.rsplit('/').next().unwrap()
}

#[tokio::test]
async fn text_shorten_then_conflict() {
    let app = TestApp::new();

    let created = app
        .send(Method::POST, "/", Some("u1"), "http://example.com/a")
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    assert_eq!(
        created.headers()[header::CONTENT_TYPE],
        "text/plain; charset=utf-8"
    );
    let short_url = body_text(created).await;
    assert!(short_url.starts_with("http://short.test/"));

    let conflict = app
        .send(Method::POST, "/", Some("u1"), "http://example.com/a")
        .await;
    assert_eq!(conflict.status(), StatusCode::CONFLICT);
    assert_eq!(body_text(conflict).await, short_url);
}

#[tokio::test]
async fn missing_cookie_is_unauthorized() {
    let app = TestApp::new();

    let response = app
        .send(Method::POST, "/", None, "http://example.com/a")
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.send(Method::GET, "/api/user/urls", None, "").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn empty_body_is_bad_request() {
    let app = TestApp::new();

    let response = app.send(Method::POST, "/", Some("u1"), "   ").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn json_shorten() {
    let app = TestApp::new();
    let body = json!({ "url": "http://example.com/a" }).to_string();

    let created = app
        .send(Method::POST, "/api/shorten", Some("u1"), &body)
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let result = body_json(created).await["result"]
        .as_str()
        .unwrap()
        .to_owned();

    let conflict = app
        .send(Method::POST, "/api/shorten", Some("u2"), &body)
        .await;
    assert_eq!(conflict.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(conflict).await["result"], result.as_str());
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let app = TestApp::new();

    let response = app
        .send(Method::POST, "/api/shorten", Some("u1"), "{not json")
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .send(Method::DELETE, "/api/user/urls", Some("u1"), "{}")
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn batch_shorten_keeps_correlation_ids() {
    let app = TestApp::new();
    let existing = app
        .send(Method::POST, "/", Some("u1"), "http://example.com/a")
        .await;
    let existing = body_text(existing).await;

    let body = json!([
        { "correlation_id": "1", "original_url": "http://example.com/a" },
        { "correlation_id": "2", "original_url": "http://example.com/b" },
    ])
    .to_string();
    let response = app
        .send(Method::POST, "/api/shorten/batch", Some("u1"), &body)
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let items = body_json(response).await;
    let items = items.as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["correlation_id"], "1");
    assert_eq!(items[0]["short_url"], existing.as_str());
    assert_eq!(items[1]["correlation_id"], "2");
    assert_ne!(items[1]["short_url"], existing.as_str());
}

#[tokio::test]
async fn redirects_to_original_url() {
    let app = TestApp::new();
    let short_url = body_text(
        app.send(Method::POST, "/", Some("u1"), "http://example.com/a")
            .await,
    )
    .await;

    let response = app
        .send(Method::GET, &format!("/{}", token_of(&short_url)), None, "")
        .await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.headers()[header::LOCATION], "http://example.com/a");
}

#[tokio::test]
async fn redirect_adds_missing_scheme() {
    let app = TestApp::new();
    let short_url = body_text(app.send(Method::POST, "/", Some("u1"), "example.com/a").await).await;

    let response = app
        .send(Method::GET, &format!("/{}", token_of(&short_url)), None, "")
        .await;
    assert_eq!(response.headers()[header::LOCATION], "http://example.com/a");
}

#[tokio::test]
async fn unknown_and_deleted_tokens() {
    let app = TestApp::new();

    let response = app.send(Method::GET, "/nope", None, "").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let token = app
        .storage
        .insert_url("http://example.com/a", "u1")
        .await
        .unwrap();
    app.storage
        .delete(&[token.as_str().to_owned()], "u1")
        .await
        .unwrap();

    let response = app
        .send(Method::GET, &format!("/{token}"), None, "")
        .await;
    assert_eq!(response.status(), StatusCode::GONE);
}

#[tokio::test]
async fn user_urls_listing() {
    let app = TestApp::new();

    let empty = app.send(Method::GET, "/api/user/urls", Some("u1"), "").await;
    assert_eq!(empty.status(), StatusCode::NO_CONTENT);

    let short_url = body_text(
        app.send(Method::POST, "/", Some("u1"), "http://example.com/a")
            .await,
    )
    .await;
    app.send(Method::POST, "/", Some("u2"), "http://example.com/b")
        .await;

    let listed = app.send(Method::GET, "/api/user/urls", Some("u1"), "").await;
    assert_eq!(listed.status(), StatusCode::OK);
    assert_eq!(
        body_json(listed).await,
        json!([{ "short_url": short_url, "original_url": "http://example.com/a" }])
    );
}

#[tokio::test]
async fn delete_is_accepted_and_applied_in_background() {
    let app = TestApp::new();
    let token = app
        .storage
        .insert_url("http://example.com/a", "u1")
        .await
        .unwrap();

    let body = json!([token.as_str()]).to_string();
    let response = app
        .send(Method::DELETE, "/api/user/urls", Some("u1"), &body)
        .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let mut deleted = false;
    for _ in 0..50 {
        if let Err(StorageError::Deleted(_)) = app.storage.get_full_url(token.as_str()).await {
            deleted = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(deleted, "delete was never applied");
}

#[tokio::test]
async fn ping_and_stats() {
    let app = TestApp::new();

    let response = app.send(Method::GET, "/ping", None, "").await;
    assert_eq!(response.status(), StatusCode::OK);

    app.send(Method::POST, "/", Some("u1"), "http://example.com/a")
        .await;
    app.send(Method::POST, "/", Some("u1"), "http://example.com/b")
        .await;
    app.send(Method::POST, "/", Some("u2"), "http://example.com/c")
        .await;

    let response = app
        .send(Method::GET, "/api/internal/stats", None, "")
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "urls": 3, "users": 2 }));
}
