//! Common test utilities for integration tests
//!
//! Builds routers over each store and drives them with `oneshot`.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use issue_tracker::adapters::http::build_router;
use issue_tracker::adapters::memory::InMemoryIssueStore;
use issue_tracker::adapters::sqlite::{create_migrated_test_pool, SqliteIssueStore};
use issue_tracker::{IssueService, IssueStore};

pub const TIMEOUT: Duration = Duration::from_secs(10);

/// Router over an arbitrary store.
pub fn app_with_store(store: Arc<dyn IssueStore>) -> Router {
    build_router(IssueService::new(store), TIMEOUT)
}

pub fn memory_app() -> Router {
    app_with_store(Arc::new(InMemoryIssueStore::new()))
}

/// Router over a migrated in-memory SQLite database.
///
/// The pool is returned so the database outlives the test body.
pub async fn sqlite_app() -> (Router, SqlitePool) {
    let pool = create_migrated_test_pool()
        .await
        .expect("failed to create test database");
    let app = app_with_store(Arc::new(SqliteIssueStore::new(pool.clone())));
    (app, pool)
}

/// One router per store implementation, labelled for assertion messages.
pub async fn all_apps() -> Vec<(&'static str, Router, Option<SqlitePool>)> {
    let (sqlite, pool) = sqlite_app().await;
    vec![("memory", memory_app(), None), ("sqlite", sqlite, Some(pool))]
}

/// A response decoded for assertions.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub text: String,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.text)
            .unwrap_or_else(|e| panic!("response is not JSON ({e}): {}", self.text))
    }
}

pub async fn send_request(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("router is infallible");

    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("failed to read body")
        .to_bytes();

    TestResponse {
        status,
        content_type,
        text: String::from_utf8_lossy(&bytes).into_owned(),
    }
}

pub async fn send_json(app: &Router, method: Method, uri: &str, body: &Value) -> TestResponse {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("valid request");
    send_request(app, request).await
}

pub async fn send_form(app: &Router, method: Method, uri: &str, form: &str) -> TestResponse {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form.to_owned()))
        .expect("valid request");
    send_request(app, request).await
}

pub async fn get(app: &Router, uri: &str) -> TestResponse {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .expect("valid request");
    send_request(app, request).await
}

/// List issues and return the decoded array.
pub async fn list(app: &Router, uri: &str) -> Vec<Value> {
    let response = get(app, uri).await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.text);
    match response.json() {
        Value::Array(items) => items,
        other => panic!("expected an array, got {other}"),
    }
}

/// Create an issue with the required fields plus `extra`, returning it.
pub async fn create_issue(app: &Router, project: &str, title: &str, extra: Value) -> Value {
    let mut body = json!({
        "issue_title": title,
        "issue_text": "Steps to reproduce",
        "created_by": "alice",
    });
    if let (Value::Object(body), Value::Object(extra)) = (&mut body, extra) {
        body.extend(extra);
    }

    let response = send_json(app, Method::POST, &format!("/api/issues/{project}"), &body).await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.text);
    response.json()
}

pub fn id_of(issue: &Value) -> String {
    issue["_id"]
        .as_str()
        .expect("issue should carry a string _id")
        .to_owned()
}
