//! In-memory issue store.

use async_trait::async_trait;
use uuid::Uuid;

use crate::adapters::parse_uuid_id;
use crate::domain::errors::DomainResult;
use crate::domain::models::issue::merge_patch;
use crate::domain::models::{DocumentId, IssueDocument, IssueFilter, IssueUpdate, NewIssue};
use crate::domain::ports::IssueStore;

/// Process-local issue store.
///
/// Documents are kept in insertion order behind a single lock, which makes
/// every update and delete atomic per document.
#[derive(Debug, Default)]
pub struct InMemoryIssueStore {
    documents: tokio::sync::RwLock<Vec<IssueDocument>>,
}

impl InMemoryIssueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

#[async_trait]
impl IssueStore for InMemoryIssueStore {
    fn parse_id(&self, raw: &str) -> Option<DocumentId> {
        parse_uuid_id(raw)
    }

    async fn find(&self, filter: &IssueFilter) -> DomainResult<Vec<IssueDocument>> {
        let documents = self.documents.read().await;
        Ok(documents
            .iter()
            .filter(|doc| filter.matches(doc))
            .cloned()
            .collect())
    }

    async fn insert_one(&self, issue: NewIssue) -> DomainResult<IssueDocument> {
        let document = IssueDocument::new(
            DocumentId::new(Uuid::new_v4().to_string()),
            issue.to_fields(),
        );
        self.documents.write().await.push(document.clone());
        Ok(document)
    }

    async fn find_one_and_update(
        &self,
        filter: &IssueFilter,
        update: &IssueUpdate,
    ) -> DomainResult<Option<IssueDocument>> {
        let mut documents = self.documents.write().await;
        let Some(document) = documents.iter_mut().find(|doc| filter.matches(doc)) else {
            return Ok(None);
        };

        let patch = update.patch_for(&document.fields);
        merge_patch(&mut document.fields, &patch);
        Ok(Some(document.clone()))
    }

    async fn delete_one(&self, filter: &IssueFilter) -> DomainResult<u64> {
        let mut documents = self.documents.write().await;
        match documents.iter().position(|doc| filter.matches(doc)) {
            Some(index) => {
                documents.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }
}
