//! HTTP adapter exposing the issue service.

pub mod body;
pub mod issues_http;

pub use body::{InvalidBody, IssueBody};
pub use issues_http::{build_router, ErrorResponse, IssuesHttpConfig, IssuesHttpServer};
