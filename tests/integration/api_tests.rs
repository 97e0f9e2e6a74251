//! API integration tests
//!
//! The full router driven in-process over the in-memory store.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use biblio_server::{
    api,
    config::{AppConfig, StorageBackend},
    repository::Repository,
    services::Services,
    AppState,
};

const ADMIN_EMAIL: &str = "admin@biblio.test";
const ADMIN_PASSWORD: &str = "admin-password";

async fn app() -> Router {
    let mut config = AppConfig::default();
    config.database.backend = StorageBackend::Memory;
    config.auth.jwt_secret = "integration-secret".to_string();
    config.auth.admin_email = Some(ADMIN_EMAIL.to_string());
    config.auth.admin_password = Some(ADMIN_PASSWORD.to_string());

    let services = Services::new(Repository::in_memory(), &config);
    services
        .users
        .ensure_admin()
        .await
        .expect("Failed to provision admin");

    api::create_router(AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    })
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .expect("Failed to build request");

    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("Failed to send request");

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Failed to parse response")
    };
    (status, body)
}

async fn login(app: &Router, email: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);
    body["token"].as_str().expect("No token in response").to_string()
}

/// Returns (token, user id)
async fn signup(app: &Router, email: &str) -> (String, String) {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/v1/auth/signup",
        None,
        Some(json!({ "name": "Reader", "email": email, "password": "reader-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "signup failed: {}", body);
    (
        body["token"].as_str().expect("No token").to_string(),
        body["user"]["id"].as_str().expect("No user id").to_string(),
    )
}

async fn create_book(app: &Router, admin: &str, title: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/v1/books",
        Some(admin),
        Some(json!({
            "title": title,
            "author": "N. K. Jemisin",
            "published_at": "2015-08-04",
            "image_url": "/covers/fifth-season.jpg"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create book failed: {}", body);
    body["id"].as_str().expect("No book id").to_string()
}

#[tokio::test]
async fn test_health_check() {
    let app = app().await;

    let (status, body) = send(&app, Method::GET, "/api/v1/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app, Method::GET, "/api/v1/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_signup_and_me() {
    let app = app().await;
    let (token, user_id) = signup(&app, "reader@biblio.test").await;

    let (status, body) = send(&app, Method::GET, "/api/v1/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], user_id.as_str());
    assert_eq!(body["role"], "USER");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/auth/signup",
        None,
        Some(json!({ "email": "Reader@Biblio.test", "password": "another-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Duplicate");
}

#[tokio::test]
async fn test_login_invalid_credentials() {
    let app = app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({ "email": ADMIN_EMAIL, "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "NotAuthorized");
}

#[tokio::test]
async fn test_requests_without_token_are_rejected() {
    let app = app().await;

    let (status, _) = send(&app, Method::GET, "/api/v1/books", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::GET, "/api/v1/books", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_only_admins_manage_the_catalog() {
    let app = app().await;
    let (reader, _) = signup(&app, "reader@biblio.test").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/books",
        Some(&reader),
        Some(json!({ "title": "x", "author": "y", "published_at": "2000-01-01" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], 2);
}

#[tokio::test]
async fn test_catalog_crud() {
    let app = app().await;
    let admin = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let book_id = create_book(&app, &admin, "The Fifth Season").await;

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/v1/books/{}", book_id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "The Fifth Season");
    assert_eq!(body["is_available"], true);

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/v1/books/{}", book_id),
        Some(&admin),
        Some(json!({
            "title": "The Obelisk Gate",
            "author": "N. K. Jemisin",
            "published_at": "2016-08-16"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "The Obelisk Gate");

    let (status, body) = send(&app, Method::GET, "/api/v1/books", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(1));

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/v1/books/{}", book_id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/v1/books/{}", book_id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NoSuchData");
}

#[tokio::test]
async fn test_invalid_book_is_rejected() {
    let app = app().await;
    let admin = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/books",
        Some(&admin),
        Some(json!({
            "title": "",
            "author": "Someone",
            "published_at": "2000-01-01"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");
}

#[tokio::test]
async fn test_loan_lifecycle() {
    let app = app().await;
    let admin = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let book_id = create_book(&app, &admin, "The Fifth Season").await;
    let (reader, reader_id) = signup(&app, "reader@biblio.test").await;
    let (other, _) = signup(&app, "other@biblio.test").await;

    // Borrow
    let (status, loan) = send(
        &app,
        Method::POST,
        "/api/v1/loans",
        Some(&reader),
        Some(json!({ "book_id": book_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", loan);
    assert_eq!(loan["book_id"], book_id.as_str());
    assert_eq!(loan["user_id"], reader_id.as_str());
    let loan_id = loan["id"].as_str().expect("No loan id").to_string();

    let (_, book) = send(
        &app,
        Method::GET,
        &format!("/api/v1/books/{}", book_id),
        Some(&reader),
        None,
    )
    .await;
    assert_eq!(book["is_available"], false);

    // Someone else cannot borrow it
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/loans",
        Some(&other),
        Some(json!({ "book_id": book_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "BookUnavailable");

    // Nor delete it while on loan
    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/v1/books/{}", book_id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Nor see or return someone else's loan
    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/api/v1/loans/{}", loan_id),
        Some(&other),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/v1/loans/{}/return", loan_id),
        Some(&other),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The borrower sees it among their loans
    let (status, loans) = send(&app, Method::GET, "/api/v1/loans", Some(&reader), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(loans[0]["id"], loan_id.as_str());
    assert_eq!(loans[0]["is_overdue"], false);

    // Return
    let (status, returned) = send(
        &app,
        Method::POST,
        &format!("/api/v1/loans/{}/return", loan_id),
        Some(&reader),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(returned["return_date"].is_string());

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/v1/loans/{}/return", loan_id),
        Some(&reader),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "AlreadyReturned");

    let (_, book) = send(
        &app,
        Method::GET,
        &format!("/api/v1/books/{}", book_id),
        Some(&reader),
        None,
    )
    .await;
    assert_eq!(book["is_available"], true);

    // Admins can list any user's loans, readers cannot
    let (status, loans) = send(
        &app,
        Method::GET,
        &format!("/api/v1/users/{}/loans", reader_id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(loans.as_array().map(Vec::len), Some(1));

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/api/v1/users/{}/loans", reader_id),
        Some(&other),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_borrow_unknown_book() {
    let app = app().await;
    let (reader, _) = signup(&app, "reader@biblio.test").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/loans",
        Some(&reader),
        Some(json!({ "book_id": "nonexistent-book" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 4);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/loans/missing/return",
        Some(&reader),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
