//! Issue Tracker - project-scoped issue tracking over a document store
//!
//! Issues live in a single collection, partitioned by project name. The HTTP
//! API under `/api/issues/{project}` lists, creates, updates and deletes them.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Issue model, filter and update rules, store port
//! - **Service Layer** (`services`): Request semantics and reply shapes
//! - **Adapters** (`adapters`): axum HTTP server, SQLite and in-memory stores
//! - **Infrastructure Layer** (`infrastructure`): Configuration and logging
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use issue_tracker::adapters::http::build_router;
//! use issue_tracker::adapters::memory::InMemoryIssueStore;
//! use issue_tracker::IssueService;
//!
//! # async fn example() -> std::io::Result<()> {
//! let service = IssueService::new(Arc::new(InMemoryIssueStore::new()));
//! let router = build_router(service, Duration::from_secs(10));
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//! axum::serve(listener, router).await
//! # }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::models::{
    Config, DocumentId, IssueDocument, IssueFilter, IssueUpdate, IssueView, LoggingConfig,
    NewIssue, ServerConfig, StorageBackend, StorageConfig,
};
pub use domain::ports::IssueStore;
pub use domain::{DomainError, DomainResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{CreateOutcome, IssueReply, IssueService};
