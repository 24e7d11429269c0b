//! Port trait definitions (Hexagonal Architecture)
//!
//! - `IssueStore`: the document collection holding issues
//!
//! The issue service depends only on these traits, so the `SQLite` and
//! in-memory stores are interchangeable.

pub mod issue_store;

pub use issue_store::IssueStore;
