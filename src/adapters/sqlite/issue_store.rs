//! SQLite implementation of the IssueStore.
//!
//! Each issue is one JSON document in the `issues` table. `project` and `id`
//! are real columns so scoping and addressing use the index; the remaining
//! field constraints of a filter are checked with `IssueFilter::matches`,
//! exactly as the in-memory store does.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::adapters::parse_uuid_id;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::issue::format_timestamp;
use crate::domain::models::{DocumentId, IssueDocument, IssueFilter, IssueUpdate, NewIssue};
use crate::domain::ports::IssueStore;

/// Read-then-write rounds an update may take before giving up.
const MAX_UPDATE_ATTEMPTS: usize = 8;

#[derive(Clone)]
pub struct SqliteIssueStore {
    pool: SqlitePool,
}

impl SqliteIssueStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Identify the single document a mutation should touch.
    ///
    /// A plain `(id, project)` filter needs no read; anything with field
    /// constraints resolves to the first matching document.
    async fn resolve_target(&self, filter: &IssueFilter) -> DomainResult<Option<DocumentId>> {
        if let (Some(id), true) = (filter.id(), filter.fields().is_empty()) {
            return Ok(Some(id.clone()));
        }

        Ok(self.find(filter).await?.into_iter().next().map(|doc| doc.id))
    }
}

#[async_trait]
impl IssueStore for SqliteIssueStore {
    fn parse_id(&self, raw: &str) -> Option<DocumentId> {
        parse_uuid_id(raw)
    }

    async fn find(&self, filter: &IssueFilter) -> DomainResult<Vec<IssueDocument>> {
        let rows: Vec<IssueRow> = match filter.id() {
            Some(id) => {
                sqlx::query_as(
                    "SELECT id, document FROM issues WHERE project = ? AND id = ? ORDER BY rowid",
                )
                .bind(filter.project())
                .bind(id.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as("SELECT id, document FROM issues WHERE project = ? ORDER BY rowid")
                    .bind(filter.project())
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        let mut documents = Vec::with_capacity(rows.len());
        for row in rows {
            let document = IssueDocument::try_from(row)?;
            if filter.matches(&document) {
                documents.push(document);
            }
        }
        Ok(documents)
    }

    async fn insert_one(&self, issue: NewIssue) -> DomainResult<IssueDocument> {
        let id = DocumentId::new(Uuid::new_v4().to_string());
        let fields = issue.to_fields();
        let document_json = serde_json::to_string(&fields)?;

        sqlx::query("INSERT INTO issues (id, project, document, created_on) VALUES (?, ?, ?, ?)")
            .bind(id.as_str())
            .bind(&issue.project)
            .bind(&document_json)
            .bind(format_timestamp(&issue.created_on))
            .execute(&self.pool)
            .await?;

        Ok(IssueDocument::new(id, fields))
    }

    async fn find_one_and_update(
        &self,
        filter: &IssueFilter,
        update: &IssueUpdate,
    ) -> DomainResult<Option<IssueDocument>> {
        let Some(id) = self.resolve_target(filter).await? else {
            return Ok(None);
        };

        // The patch depends on the stored timestamps, so it is applied only
        // if the document is unchanged since it was read.
        for _ in 0..MAX_UPDATE_ATTEMPTS {
            let current: Option<IssueRow> =
                sqlx::query_as("SELECT id, document FROM issues WHERE id = ? AND project = ?")
                    .bind(id.as_str())
                    .bind(filter.project())
                    .fetch_optional(&self.pool)
                    .await?;
            let Some(current) = current else {
                return Ok(None);
            };

            let raw_document = current.document.clone();
            let current = IssueDocument::try_from(current)?;
            let patch_json = serde_json::to_string(&update.patch_for(&current.fields))?;

            let row: Option<IssueRow> = sqlx::query_as(
                r#"UPDATE issues SET document = json_patch(document, ?)
                   WHERE id = ? AND project = ? AND document = ?
                   RETURNING id, document"#,
            )
            .bind(&patch_json)
            .bind(id.as_str())
            .bind(filter.project())
            .bind(&raw_document)
            .fetch_optional(&self.pool)
            .await?;

            if let Some(row) = row {
                return IssueDocument::try_from(row).map(Some);
            }
            tracing::debug!(id = %id, "document changed during update, retrying");
        }

        Err(DomainError::Storage(format!(
            "update of {id} lost {MAX_UPDATE_ATTEMPTS} races to concurrent writers"
        )))
    }

    async fn delete_one(&self, filter: &IssueFilter) -> DomainResult<u64> {
        let Some(id) = self.resolve_target(filter).await? else {
            return Ok(0);
        };

        let result = sqlx::query("DELETE FROM issues WHERE id = ? AND project = ?")
            .bind(id.as_str())
            .bind(filter.project())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[derive(sqlx::FromRow)]
struct IssueRow {
    id: String,
    document: String,
}

impl TryFrom<IssueRow> for IssueDocument {
    type Error = DomainError;

    fn try_from(row: IssueRow) -> Result<Self, Self::Error> {
        match serde_json::from_str::<Value>(&row.document)? {
            Value::Object(fields) => Ok(Self::new(DocumentId::new(row.id), fields)),
            other => Err(DomainError::InvalidDocument {
                id: row.id,
                reason: format!("expected a JSON object, found {}", json_kind(&other)),
            }),
        }
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
