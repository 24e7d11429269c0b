pub mod config;
pub mod filter;
pub mod issue;

pub use config::{Config, LoggingConfig, ServerConfig, StorageBackend, StorageConfig};
pub use filter::{FilterValue, IssueFilter, IssueUpdate};
pub use issue::{fields, DocumentId, IssueDocument, IssueView, NewIssue};
