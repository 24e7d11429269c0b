//! Issue service: list, create, update and delete issues within a project.
//!
//! Every operation turns loosely typed request input into a filter or update
//! for the [`IssueStore`] and maps the store's answer to a reply.
//!
//! List and create surface storage failures as `Err` so the HTTP layer can
//! answer with a server error. Update and delete never fail: storage errors
//! are logged and folded into the same `{error, _id}` reply a missing issue
//! produces.

use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::domain::errors::DomainResult;
use crate::domain::models::issue::{is_truthy, truthy_text};
use crate::domain::models::{fields, IssueDocument, IssueFilter, IssueUpdate, IssueView, NewIssue};
use crate::domain::ports::IssueStore;

pub const ERR_REQUIRED_FIELDS: &str = "required field(s) missing";
pub const ERR_MISSING_ID: &str = "missing _id";
pub const ERR_NO_UPDATE_FIELDS: &str = "no update field(s) sent";
pub const ERR_COULD_NOT_UPDATE: &str = "could not update";
pub const ERR_COULD_NOT_DELETE: &str = "could not delete";
pub const RESULT_UPDATED: &str = "successfully updated";
pub const RESULT_DELETED: &str = "successfully deleted";

/// Body of an update or delete reply, always sent with HTTP 200.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum IssueReply {
    Success {
        result: &'static str,
        #[serde(rename = "_id")]
        id: Value,
    },
    Failure {
        error: &'static str,
        #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
        id: Option<Value>,
    },
}

impl IssueReply {
    pub const fn success(result: &'static str, id: Value) -> Self {
        Self::Success { result, id }
    }

    pub const fn failure(error: &'static str, id: Option<Value>) -> Self {
        Self::Failure { error, id }
    }

    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Result of a create request that reached validation.
#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome {
    Created(IssueView),
    MissingRequiredFields,
}

/// The issue request handler shared by every HTTP route.
#[derive(Clone)]
pub struct IssueService {
    store: Arc<dyn IssueStore>,
}

impl IssueService {
    pub fn new(store: Arc<dyn IssueStore>) -> Self {
        Self { store }
    }

    /// List the issues of `project` matching the query parameters.
    ///
    /// An identifier parameter the store rejects yields an empty list, not
    /// an error.
    pub async fn list(
        &self,
        project: &str,
        params: Vec<(String, String)>,
    ) -> DomainResult<Vec<IssueView>> {
        let Some(filter) =
            IssueFilter::from_query(project, params, |raw| self.store.parse_id(raw))
        else {
            debug!(project, "identifier filter cannot match any issue");
            return Ok(Vec::new());
        };

        let documents = self.store.find(&filter).await?;
        debug!(project, count = documents.len(), "listed issues");

        Ok(documents.iter().map(IssueDocument::to_view).collect())
    }

    /// Create an issue in `project` from a request body.
    pub async fn create(
        &self,
        project: &str,
        body: &Map<String, Value>,
    ) -> DomainResult<CreateOutcome> {
        let required = |field: &str| truthy_text(body.get(field));
        let (Some(title), Some(text), Some(created_by)) = (
            required(fields::ISSUE_TITLE),
            required(fields::ISSUE_TEXT),
            required(fields::CREATED_BY),
        ) else {
            debug!(project, "create rejected: required field(s) missing");
            return Ok(CreateOutcome::MissingRequiredFields);
        };

        let issue = NewIssue::new(project, title, text, created_by, Utc::now())
            .with_assigned_to(required(fields::ASSIGNED_TO).unwrap_or_default())
            .with_status_text(required(fields::STATUS_TEXT).unwrap_or_default());

        let document = self.store.insert_one(issue).await?;
        info!(project, id = %document.id, "issue created");

        Ok(CreateOutcome::Created(document.to_view()))
    }

    /// Apply the non-empty fields of `body` to the issue it identifies.
    pub async fn update(&self, project: &str, mut body: Map<String, Value>) -> IssueReply {
        let Some(raw_id) = take_id(&mut body) else {
            return IssueReply::failure(ERR_MISSING_ID, None);
        };

        let Some(id) = raw_id.as_str().and_then(|raw| self.store.parse_id(raw)) else {
            debug!(project, id = %raw_id, "update rejected: malformed identifier");
            return IssueReply::failure(ERR_COULD_NOT_UPDATE, Some(raw_id));
        };

        let Some(update) = IssueUpdate::from_candidates(body, Utc::now()) else {
            return IssueReply::failure(ERR_NO_UPDATE_FIELDS, Some(raw_id));
        };

        let filter = IssueFilter::by_id(project, id);
        match self.store.find_one_and_update(&filter, &update).await {
            Ok(Some(document)) => {
                info!(project, id = %document.id, "issue updated");
                IssueReply::success(RESULT_UPDATED, raw_id)
            }
            Ok(None) => {
                debug!(project, id = %raw_id, "update matched no issue");
                IssueReply::failure(ERR_COULD_NOT_UPDATE, Some(raw_id))
            }
            Err(err) => {
                error!(project, id = %raw_id, error = %err, "failed to update issue");
                IssueReply::failure(ERR_COULD_NOT_UPDATE, Some(raw_id))
            }
        }
    }

    /// Remove the issue identified by `body` from `project`.
    pub async fn delete(&self, project: &str, mut body: Map<String, Value>) -> IssueReply {
        let Some(raw_id) = take_id(&mut body) else {
            return IssueReply::failure(ERR_MISSING_ID, None);
        };

        let Some(id) = raw_id.as_str().and_then(|raw| self.store.parse_id(raw)) else {
            debug!(project, id = %raw_id, "delete rejected: malformed identifier");
            return IssueReply::failure(ERR_COULD_NOT_DELETE, Some(raw_id));
        };

        let filter = IssueFilter::by_id(project, id);
        match self.store.delete_one(&filter).await {
            Ok(0) => {
                debug!(project, id = %raw_id, "delete matched no issue");
                IssueReply::failure(ERR_COULD_NOT_DELETE, Some(raw_id))
            }
            Ok(_) => {
                info!(project, id = %raw_id, "issue deleted");
                IssueReply::success(RESULT_DELETED, raw_id)
            }
            Err(err) => {
                error!(project, id = %raw_id, error = %err, "failed to delete issue");
                IssueReply::failure(ERR_COULD_NOT_DELETE, Some(raw_id))
            }
        }
    }
}

/// Remove the identifier keys from `body`, returning the identifier if it is
/// truthy. `_id` takes precedence over its `id` alias.
fn take_id(body: &mut Map<String, Value>) -> Option<Value> {
    let primary = body.remove(fields::ID);
    let alias = body.remove(fields::ID_ALIAS);

    [primary, alias]
        .into_iter()
        .flatten()
        .find(is_truthy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryIssueStore;
    use crate::domain::errors::DomainError;
    use crate::domain::models::DocumentId;
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;

    fn service() -> IssueService {
        IssueService::new(Arc::new(InMemoryIssueStore::new()))
    }

    fn body(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    async fn create(service: &IssueService, project: &str, title: &str) -> IssueView {
        let outcome = service
            .create(
                project,
                &body(json!({
                    "issue_title": title,
                    "issue_text": "text",
                    "created_by": "tester"
                })),
            )
            .await
            .expect("create should not fail");

        match outcome {
            CreateOutcome::Created(view) => view,
            CreateOutcome::MissingRequiredFields => panic!("required fields were present"),
        }
    }

    /// Store whose every operation fails, for the error-channel tests.
    struct FailingStore;

    #[async_trait]
    impl IssueStore for FailingStore {
        fn parse_id(&self, raw: &str) -> Option<DocumentId> {
            Some(DocumentId::new(raw))
        }

        async fn find(&self, _filter: &IssueFilter) -> DomainResult<Vec<IssueDocument>> {
            Err(DomainError::Storage("connection reset".to_string()))
        }

        async fn insert_one(&self, _issue: NewIssue) -> DomainResult<IssueDocument> {
            Err(DomainError::Storage("connection reset".to_string()))
        }

        async fn find_one_and_update(
            &self,
            _filter: &IssueFilter,
            _update: &IssueUpdate,
        ) -> DomainResult<Option<IssueDocument>> {
            Err(DomainError::Storage("connection reset".to_string()))
        }

        async fn delete_one(&self, _filter: &IssueFilter) -> DomainResult<u64> {
            Err(DomainError::Storage("connection reset".to_string()))
        }
    }

    #[tokio::test]
    async fn test_create_applies_defaults() {
        let service = service();
        let view = create(&service, "apitest", "Title").await;

        assert_eq!(view.open, Some(json!(true)));
        assert_eq!(view.assigned_to, json!(""));
        assert_eq!(view.status_text, json!(""));
        assert_eq!(view.created_on, view.updated_on);
        assert!(!view.id.is_empty());
    }

    #[tokio::test]
    async fn test_create_missing_required_field() {
        let service = service();
        for missing in ["issue_title", "issue_text", "created_by"] {
            let mut fields = body(json!({
                "issue_title": "Title",
                "issue_text": "text",
                "created_by": "tester"
            }));
            fields.insert(missing.to_string(), json!(""));

            let outcome = service.create("apitest", &fields).await.unwrap();
            assert_eq!(outcome, CreateOutcome::MissingRequiredFields, "{missing}");
        }
    }

    #[tokio::test]
    async fn test_list_is_scoped_to_project() {
        let service = service();
        create(&service, "alpha", "A").await;
        create(&service, "beta", "B").await;

        let issues = service.list("alpha", Vec::new()).await.unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_title, Some(json!("A")));
    }

    #[tokio::test]
    async fn test_list_invalid_id_is_empty() {
        let service = service();
        create(&service, "alpha", "A").await;

        let issues = service
            .list("alpha", vec![("_id".to_string(), "nope".to_string())])
            .await
            .unwrap();
        assert!(issues.is_empty());
    }

    #[tokio::test]
    async fn test_update_error_shapes() {
        let service = service();
        let created = create(&service, "alpha", "A").await;

        assert_eq!(
            service.update("alpha", body(json!({"issue_text": "x"}))).await,
            IssueReply::failure(ERR_MISSING_ID, None)
        );
        assert_eq!(
            service.update("alpha", body(json!({"_id": "bogus", "issue_text": "x"}))).await,
            IssueReply::failure(ERR_COULD_NOT_UPDATE, Some(json!("bogus")))
        );
        assert_eq!(
            service.update("alpha", body(json!({"_id": created.id, "issue_text": ""}))).await,
            IssueReply::failure(ERR_NO_UPDATE_FIELDS, Some(json!(created.id)))
        );
    }

    #[tokio::test]
    async fn test_update_refreshes_updated_on() {
        let service = service();
        let created = create(&service, "alpha", "A").await;
        tokio::time::sleep(Duration::from_millis(5)).await;

        let reply = service
            .update("alpha", body(json!({"_id": created.id, "open": "false"})))
            .await;
        assert_eq!(reply, IssueReply::success(RESULT_UPDATED, json!(created.id)));

        let issues = service.list("alpha", Vec::new()).await.unwrap();
        let updated_on = issues[0].updated_on.clone().unwrap();
        let created_on = issues[0].created_on.clone().unwrap();
        assert!(updated_on.as_str().unwrap() > created_on.as_str().unwrap());
        assert_eq!(issues[0].open, Some(json!(false)));
    }

    #[tokio::test]
    async fn test_update_keeps_required_fields_sent_as_null() {
        let service = service();
        let created = create(&service, "alpha", "A").await;

        let reply = service
            .update(
                "alpha",
                body(json!({
                    "_id": created.id,
                    "issue_title": null,
                    "created_by": null,
                    "issue_text": "new"
                })),
            )
            .await;
        assert_eq!(reply, IssueReply::success(RESULT_UPDATED, json!(created.id)));

        let issues = service.list("alpha", Vec::new()).await.unwrap();
        assert_eq!(issues[0].issue_title, Some(json!("A")));
        assert_eq!(issues[0].created_by, Some(json!("tester")));
        assert_eq!(issues[0].issue_text, Some(json!("new")));

        let nulls_only = service
            .update(
                "alpha",
                body(json!({"_id": created.id, "issue_title": null, "issue_text": null})),
            )
            .await;
        assert_eq!(
            nulls_only,
            IssueReply::failure(ERR_NO_UPDATE_FIELDS, Some(json!(created.id)))
        );
    }

    #[tokio::test]
    async fn test_update_with_only_updated_on_uses_server_stamp() {
        let service = service();
        let created = create(&service, "alpha", "A").await;

        let reply = service
            .update(
                "alpha",
                body(json!({"_id": created.id, "updated_on": "1999-01-01T00:00:00Z"})),
            )
            .await;
        assert_eq!(reply, IssueReply::success(RESULT_UPDATED, json!(created.id)));

        let issues = service.list("alpha", Vec::new()).await.unwrap();
        let updated_on = issues[0].updated_on.clone().unwrap();
        let created_on = issues[0].created_on.clone().unwrap();
        assert_ne!(updated_on, json!("1999-01-01T00:00:00Z"));
        assert!(updated_on.as_str().unwrap() > created_on.as_str().unwrap());
    }

    #[tokio::test]
    async fn test_update_accepts_id_alias() {
        let service = service();
        let created = create(&service, "alpha", "A").await;

        let reply = service
            .update("alpha", body(json!({"id": created.id, "status_text": "done"})))
            .await;
        assert!(reply.is_success());
    }

    #[tokio::test]
    async fn test_cross_project_update_and_delete_fail() {
        let service = service();
        let created = create(&service, "alpha", "A").await;

        let update = service
            .update("beta", body(json!({"_id": created.id, "issue_text": "x"})))
            .await;
        assert_eq!(
            update,
            IssueReply::failure(ERR_COULD_NOT_UPDATE, Some(json!(created.id)))
        );

        let delete = service.delete("beta", body(json!({"_id": created.id}))).await;
        assert_eq!(
            delete,
            IssueReply::failure(ERR_COULD_NOT_DELETE, Some(json!(created.id)))
        );
    }

    #[tokio::test]
    async fn test_delete_twice() {
        let service = service();
        let created = create(&service, "alpha", "A").await;

        let first = service.delete("alpha", body(json!({"_id": created.id}))).await;
        assert_eq!(first, IssueReply::success(RESULT_DELETED, json!(created.id)));

        let second = service.delete("alpha", body(json!({"_id": created.id}))).await;
        assert_eq!(
            second,
            IssueReply::failure(ERR_COULD_NOT_DELETE, Some(json!(created.id)))
        );
    }

    #[tokio::test]
    async fn test_delete_missing_id() {
        let service = service();
        assert_eq!(
            service.delete("alpha", Map::new()).await,
            IssueReply::failure(ERR_MISSING_ID, None)
        );
        assert_eq!(
            service.delete("alpha", body(json!({"_id": ""}))).await,
            IssueReply::failure(ERR_MISSING_ID, None)
        );
    }

    #[tokio::test]
    async fn test_storage_errors_surface_on_list_and_create() {
        let service = IssueService::new(Arc::new(FailingStore));

        assert!(service.list("alpha", Vec::new()).await.is_err());
        let created = service
            .create(
                "alpha",
                &body(json!({"issue_title": "A", "issue_text": "B", "created_by": "C"})),
            )
            .await;
        assert!(created.is_err());
    }

    #[tokio::test]
    async fn test_storage_errors_fold_on_update_and_delete() {
        let service = IssueService::new(Arc::new(FailingStore));

        let update = service
            .update("alpha", body(json!({"_id": "abc", "issue_text": "x"})))
            .await;
        assert_eq!(update, IssueReply::failure(ERR_COULD_NOT_UPDATE, Some(json!("abc"))));

        let delete = service.delete("alpha", body(json!({"_id": "abc"}))).await;
        assert_eq!(delete, IssueReply::failure(ERR_COULD_NOT_DELETE, Some(json!("abc"))));
    }

    #[test]
    fn test_reply_serialization() {
        let success = serde_json::to_value(IssueReply::success(RESULT_DELETED, json!("abc"))).unwrap();
        assert_eq!(success, json!({"result": "successfully deleted", "_id": "abc"}));

        let missing = serde_json::to_value(IssueReply::failure(ERR_MISSING_ID, None)).unwrap();
        assert_eq!(missing, json!({"error": "missing _id"}));
    }
}
