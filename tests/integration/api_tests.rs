//! API integration tests, driving the router in-process

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use chrono::Duration;
use serde_json::{json, Value};
use tower::ServiceExt;

use biblio_server::{
    api::{self, API_KEY_HEADER},
    config::AppConfig,
    repository::Repository,
    services::clock::ManualClock,
    AppState,
};

const API_KEY: &str = "test-api-key";
const PASSWORD: &str = "MotDePasse123";

struct TestApp {
    router: Router,
    clock: Arc<ManualClock>,
}

impl TestApp {
    fn config(max_requests: usize) -> AppConfig {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = "integration-test-secret".to_string();
        config.auth.hash_memory_kib = 1024;
        config.auth.hash_iterations = 1;
        config.rate_limit.max_requests = max_requests;
        config.rate_limit.api_keys = vec![API_KEY.to_string(), "second-key".to_string()];
        config
    }

    fn new(max_requests: usize) -> Self {
        Self::with_config(Self::config(max_requests))
    }

    fn with_config(config: AppConfig) -> Self {
        let clock = Arc::new(ManualClock::default());
        let state = AppState::new(config, Repository::in_memory(), clock.clone())
            .expect("Failed to build state");

        Self {
            router: api::create_router(state),
            clock,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, headers, body)
    }

    async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, HeaderMap, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(format!("/api/v1{}", uri))
            .header(API_KEY_HEADER, API_KEY);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        self.send(request).await
    }

    async fn register(&self, email: &str, role: &str) -> Value {
        let (status, _, body) = self
            .call(
                Method::POST,
                "/users",
                None,
                Some(json!({
                    "display_name": email,
                    "email": email,
                    "password": PASSWORD,
                    "role": role
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "registration failed: {}", body);
        body
    }

    async fn login(&self, email: &str, password: &str) -> (StatusCode, Value) {
        let form = format!("username={}&password={}", email.replace('@', "%40"), password);
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/token")
            .header(API_KEY_HEADER, API_KEY)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form))
            .expect("Failed to build request");

        let (status, _, body) = self.send(request).await;
        (status, body)
    }

    async fn token_for(&self, email: &str) -> String {
        let (status, body) = self.login(email, PASSWORD).await;
        assert_eq!(status, StatusCode::OK);
        body["access_token"].as_str().expect("No token in response").to_string()
    }
}

#[tokio::test]
async fn test_health_check_needs_no_api_key() {
    let app = TestApp::new(10);
    let request = Request::builder()
        .uri("/api/v1/health")
        .body(Body::empty())
        .unwrap();

    let (status, _, body) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_api_key_is_required() {
    let app = TestApp::new(10);

    let missing = Request::builder().uri("/api/v1/books").body(Body::empty()).unwrap();
    let (status, _, _) = app.send(missing).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let wrong = Request::builder()
        .uri("/api/v1/books")
        .header(API_KEY_HEADER, "nope")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = app.send(wrong).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Invalid API key");
}

#[tokio::test]
async fn test_rate_limit_window() {
    let app = TestApp::new(10);

    for i in 0..10 {
        let (status, _, _) = app.call(Method::GET, "/books", None, None).await;
        assert_eq!(status, StatusCode::OK, "request {} should be admitted", i + 1);
    }

    let (status, headers, _) = app.call(Method::GET, "/books", None, None).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(headers[header::RETRY_AFTER], "60");

    // Another key has its own window
    let other = Request::builder()
        .uri("/api/v1/books")
        .header(API_KEY_HEADER, "second-key")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = app.send(other).await;
    assert_eq!(status, StatusCode::OK);

    app.clock.advance(Duration::seconds(60));
    let (status, _, _) = app.call(Method::GET, "/books", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_book_listing_and_search() {
    let app = TestApp::new(100);

    let (status, _, body) = app.call(Method::GET, "/books", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0], json!({"id": 1, "title": "Le Petit Prince"}));

    let (_, _, body) = app.call(Method::GET, "/books?format=detailed", None, None).await;
    assert_eq!(body[2]["author"], "George Orwell");

    let (status, _, body) = app.call(Method::GET, "/books/search?q=potter", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(1));

    let (status, _, _) = app.call(Method::GET, "/books/search?q=", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = app.call(Method::GET, "/books/42", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_writes_require_a_token() {
    let app = TestApp::new(100);
    let book = json!({
        "title": "Dune",
        "author": "Frank Herbert",
        "isbn": "978-0-441-17271-9",
        "year": 1965,
        "genre": "science-fiction"
    });

    let (status, headers, _) = app.call(Method::POST, "/books", None, Some(book.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(headers[header::WWW_AUTHENTICATE], "Bearer");

    let (status, _, _) = app
        .call(Method::POST, "/books", Some("garbage"), Some(book.clone()))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    app.register("reader@example.com", "member").await;
    let token = app.token_for("reader@example.com").await;

    let (status, _, body) = app.call(Method::POST, "/books", Some(&token), Some(book)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["id"], 4);

    let (status, _, body) = app
        .call(
            Method::PUT,
            "/books/4",
            Some(&token),
            Some(json!({"title": "Dune Messiah", "author": "Frank Herbert", "isbn": "978-0-441-17269-6"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Dune Messiah");
}

#[tokio::test]
async fn test_login_failures() {
    let app = TestApp::new(100);
    app.register("reader@example.com", "member").await;

    let (status, body) = app.login("reader@example.com", "WrongPass9").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Incorrect username or password");

    let (status, _) = app.login("nobody@example.com", PASSWORD).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.login("reader@example.com", PASSWORD).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");
}

#[tokio::test]
async fn test_token_expires_after_thirty_minutes() {
    let app = TestApp::new(100);
    app.register("reader@example.com", "member").await;
    let token = app.token_for("reader@example.com").await;

    app.clock.advance(Duration::minutes(29));
    let (status, _, _) = app.call(Method::GET, "/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    app.clock.advance(Duration::minutes(1));
    let (status, _, body) = app.call(Method::GET, "/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Token has expired");
}

#[tokio::test]
async fn test_roles_end_to_end() {
    let app = TestApp::new(100);

    let member = app.register("member@example.com", "member").await;
    assert_eq!(member["id"], 1);
    assert!(member.get("password_hash").is_none());

    let (status, _, _) = app
        .call(
            Method::POST,
            "/users",
            None,
            Some(json!({
                "display_name": "Copycat",
                "email": "member@example.com",
                "password": PASSWORD
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let member_token = app.token_for("member@example.com").await;
    let (status, _, body) = app.call(Method::GET, "/users/me", Some(&member_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "member@example.com");
    assert_eq!(body["role"], "member");

    let (status, _, _) = app.call(Method::DELETE, "/books/1", Some(&member_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _, _) = app.call(Method::GET, "/users", Some(&member_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = app.register("admin@example.com", "admin").await;
    assert_eq!(admin["id"], 2);
    let admin_token = app.token_for("admin@example.com").await;

    let (status, _, _) = app.call(Method::DELETE, "/books/1", Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _, _) = app.call(Method::DELETE, "/books/1", Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, body) = app.call(Method::GET, "/users", Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(2));

    // Members read only their own record; admins read any
    let (status, _, _) = app.call(Method::GET, "/users/1", Some(&member_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, _) = app.call(Method::GET, "/users/2", Some(&member_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _, _) = app.call(Method::GET, "/users/1", Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, _) = app.call(Method::GET, "/users/99", Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_closed_admin_registration() {
    let mut config = TestApp::config(100);
    config.auth.open_admin_registration = false;
    let app = TestApp::with_config(config);

    let (status, _, body) = app
        .call(
            Method::POST,
            "/users",
            None,
            Some(json!({
                "display_name": "Boss",
                "email": "boss@example.com",
                "password": PASSWORD,
                "role": "admin"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Only administrators can create administrator accounts");

    let member = app.register("member@example.com", "member").await;
    assert_eq!(member["id"], 1);
}

#[test]
fn test_state_requires_secret_and_keys() {
    let clock = Arc::new(ManualClock::default());

    let mut config = AppConfig::default();
    config.rate_limit.api_keys = vec![API_KEY.to_string()];
    assert!(AppState::new(config, Repository::in_memory(), clock.clone()).is_err());

    let mut config = AppConfig::default();
    config.auth.jwt_secret = "secret".to_string();
    assert!(AppState::new(config, Repository::in_memory(), clock).is_err());
}
