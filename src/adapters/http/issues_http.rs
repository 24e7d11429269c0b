//! Issues HTTP server.
//!
//! Exposes the project-scoped issue collection under `/api/issues/{project}`.
//! Validation outcomes are always HTTP 200 with an `error` key; only storage
//! failures while listing or creating escalate to HTTP 500.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use super::body::IssueBody;
use crate::domain::models::ServerConfig;
use crate::services::issue_service::ERR_REQUIRED_FIELDS;
use crate::services::{CreateOutcome, IssueReply, IssueService};

const ERR_LIST_FAILED: &str = "could not retrieve issues";
const ERR_CREATE_FAILED: &str = "could not create issue";

/// Configuration for the issues HTTP server.
#[derive(Debug, Clone)]
pub struct IssuesHttpConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Requests running longer than this are answered with 408.
    pub request_timeout: Duration,
}

impl Default for IssuesHttpConfig {
    fn default() -> Self {
        Self::from(&ServerConfig::default())
    }
}

impl From<&ServerConfig> for IssuesHttpConfig {
    fn from(server: &ServerConfig) -> Self {
        Self {
            host: server.host.clone(),
            port: server.port,
            request_timeout: Duration::from_secs(server.request_timeout_secs),
        }
    }
}

/// Error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into() }
    }
}

/// Issues HTTP Server.
pub struct IssuesHttpServer {
    config: IssuesHttpConfig,
    service: IssueService,
}

impl IssuesHttpServer {
    pub fn new(service: IssueService, config: IssuesHttpConfig) -> Self {
        Self { config, service }
    }

    /// Build the router.
    pub fn router(&self) -> Router {
        build_router(self.service.clone(), self.config.request_timeout)
    }

    /// Start the server with a shutdown signal.
    pub async fn serve_with_shutdown<F>(
        self,
        shutdown: F,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port).parse()?;
        let router = self.router();

        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Issues HTTP server listening on {}", listener.local_addr()?);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;
        Ok(())
    }
}

/// Assemble the issue routes, health check and fallback around `service`.
pub fn build_router(service: IssueService, request_timeout: Duration) -> Router {
    Router::new()
        .route(
            "/api/issues/{project}",
            get(list_issues)
                .post(create_issue)
                .put(update_issue)
                .delete(delete_issue),
        )
        .route("/health", get(health_check))
        .fallback(not_found)
        .with_state(service)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
}

// Handler functions

async fn health_check() -> &'static str {
    "OK"
}

async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        "Not Found",
    )
        .into_response()
}

fn server_error(message: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(message)),
    )
        .into_response()
}

async fn list_issues(
    State(service): State<IssueService>,
    Path(project): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    match service.list(&project, params).await {
        Ok(issues) => Json(issues).into_response(),
        Err(e) => {
            error!(project = %project, error = %e, "failed to list issues");
            server_error(ERR_LIST_FAILED)
        }
    }
}

async fn create_issue(
    State(service): State<IssueService>,
    Path(project): Path<String>,
    IssueBody(body): IssueBody,
) -> Response {
    match service.create(&project, &body).await {
        Ok(CreateOutcome::Created(issue)) => Json(issue).into_response(),
        Ok(CreateOutcome::MissingRequiredFields) => {
            Json(IssueReply::failure(ERR_REQUIRED_FIELDS, None)).into_response()
        }
        Err(e) => {
            error!(project = %project, error = %e, "failed to create issue");
            server_error(ERR_CREATE_FAILED)
        }
    }
}

async fn update_issue(
    State(service): State<IssueService>,
    Path(project): Path<String>,
    IssueBody(body): IssueBody,
) -> Json<IssueReply> {
    Json(service.update(&project, body).await)
}

async fn delete_issue(
    State(service): State<IssueService>,
    Path(project): Path<String>,
    IssueBody(body): IssueBody,
) -> Json<IssueReply> {
    Json(service.delete(&project, body).await)
}
