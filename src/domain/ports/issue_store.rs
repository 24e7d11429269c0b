//! Issue store port (trait) for dependency injection.
//!
//! Defines the document-store contract the issue service runs against.
//! Services depend on this trait, not on a concrete store.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{DocumentId, IssueDocument, IssueFilter, IssueUpdate, NewIssue};

/// The `issues` collection of a document store.
///
/// Implementations must make `find_one_and_update` and `delete_one` atomic
/// per document: a concurrent caller observes either the whole change or
/// none of it. Callers never retry; a failure is reported once.
#[async_trait]
pub trait IssueStore: Send + Sync {
    /// Validate a client-supplied identifier and coerce it into this store's
    /// native form.
    ///
    /// # Returns
    /// - `Some(DocumentId)` if `raw` is well-formed for this store
    /// - `None` otherwise; such an identifier can match no document
    fn parse_id(&self, raw: &str) -> Option<DocumentId>;

    /// Returns every document matching `filter`, in insertion order.
    async fn find(&self, filter: &IssueFilter) -> DomainResult<Vec<IssueDocument>>;

    /// Inserts a new issue and returns it with its store-assigned identifier.
    async fn insert_one(&self, issue: NewIssue) -> DomainResult<IssueDocument>;

    /// Merges `update` into the single document matching `filter`.
    ///
    /// # Returns
    /// - `Some(document)` with the updated document if one matched
    /// - `None` if nothing matched
    async fn find_one_and_update(
        &self,
        filter: &IssueFilter,
        update: &IssueUpdate,
    ) -> DomainResult<Option<IssueDocument>>;

    /// Deletes the single document matching `filter`.
    ///
    /// Returns the number of documents removed (0 or 1).
    async fn delete_one(&self, filter: &IssueFilter) -> DomainResult<u64>;
}
