//! Issue domain model.
//!
//! A stored issue is a document: a store-assigned [`DocumentId`] plus an open
//! JSON object of fields. Updates are permissive and may add fields the
//! schema never names, so the body stays a map rather than a fixed struct.
//! [`IssueView`] is the projection clients receive.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Field names used on the wire and inside stored documents.
pub mod fields {
    pub const ID: &str = "_id";
    /// Accepted as an input alias for [`ID`].
    pub const ID_ALIAS: &str = "id";
    pub const PROJECT: &str = "project";
    pub const ISSUE_TITLE: &str = "issue_title";
    pub const ISSUE_TEXT: &str = "issue_text";
    pub const CREATED_BY: &str = "created_by";
    pub const ASSIGNED_TO: &str = "assigned_to";
    pub const STATUS_TEXT: &str = "status_text";
    pub const CREATED_ON: &str = "created_on";
    pub const UPDATED_ON: &str = "updated_on";
    pub const OPEN: &str = "open";
}

/// Store-native identifier of an issue document.
///
/// Only a store constructs one, either when inserting or when it accepts a
/// client-supplied string through `IssueStore::parse_id`. The inner string
/// is the store's canonical rendering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(canonical: impl Into<String>) -> Self {
        Self(canonical.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored issue.
#[derive(Debug, Clone, PartialEq)]
pub struct IssueDocument {
    pub id: DocumentId,
    pub fields: Map<String, Value>,
}

impl IssueDocument {
    pub fn new(id: DocumentId, fields: Map<String, Value>) -> Self {
        Self { id, fields }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// The project this document belongs to, if the field holds a string.
    pub fn project(&self) -> Option<&str> {
        self.get(fields::PROJECT).and_then(Value::as_str)
    }

    /// Project the document into the shape returned to clients.
    ///
    /// `assigned_to` and `status_text` fall back to `""` when absent or
    /// falsy; the other projected fields are passed through untouched and
    /// omitted when the document lacks them.
    pub fn to_view(&self) -> IssueView {
        let passthrough = |field: &str| self.get(field).cloned();
        let or_empty = |field: &str| match self.get(field) {
            Some(value) if is_truthy(value) => value.clone(),
            _ => Value::String(String::new()),
        };

        IssueView {
            id: self.id.to_string(),
            issue_title: passthrough(fields::ISSUE_TITLE),
            issue_text: passthrough(fields::ISSUE_TEXT),
            created_on: passthrough(fields::CREATED_ON),
            updated_on: passthrough(fields::UPDATED_ON),
            created_by: passthrough(fields::CREATED_BY),
            assigned_to: or_empty(fields::ASSIGNED_TO),
            open: passthrough(fields::OPEN),
            status_text: or_empty(fields::STATUS_TEXT),
        }
    }
}

/// An issue about to be inserted, with every default already applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIssue {
    pub project: String,
    pub issue_title: String,
    pub issue_text: String,
    pub created_by: String,
    pub assigned_to: String,
    pub status_text: String,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
    pub open: bool,
}

impl NewIssue {
    /// Build an open issue stamped with `now` for both timestamps.
    pub fn new(
        project: impl Into<String>,
        issue_title: impl Into<String>,
        issue_text: impl Into<String>,
        created_by: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            project: project.into(),
            issue_title: issue_title.into(),
            issue_text: issue_text.into(),
            created_by: created_by.into(),
            assigned_to: String::new(),
            status_text: String::new(),
            created_on: now,
            updated_on: now,
            open: true,
        }
    }

    pub fn with_assigned_to(mut self, assigned_to: impl Into<String>) -> Self {
        self.assigned_to = assigned_to.into();
        self
    }

    pub fn with_status_text(mut self, status_text: impl Into<String>) -> Self {
        self.status_text = status_text.into();
        self
    }

    /// Render as the field map a store persists.
    pub fn to_fields(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(fields::PROJECT.into(), Value::String(self.project.clone()));
        map.insert(fields::ISSUE_TITLE.into(), Value::String(self.issue_title.clone()));
        map.insert(fields::ISSUE_TEXT.into(), Value::String(self.issue_text.clone()));
        map.insert(fields::CREATED_BY.into(), Value::String(self.created_by.clone()));
        map.insert(fields::ASSIGNED_TO.into(), Value::String(self.assigned_to.clone()));
        map.insert(fields::STATUS_TEXT.into(), Value::String(self.status_text.clone()));
        map.insert(
            fields::CREATED_ON.into(),
            Value::String(format_timestamp(&self.created_on)),
        );
        map.insert(
            fields::UPDATED_ON.into(),
            Value::String(format_timestamp(&self.updated_on)),
        );
        map.insert(fields::OPEN.into(), Value::Bool(self.open));
        map
    }
}

/// Issue as rendered to clients by list and create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueView {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_title: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_text: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_on: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<Value>,
    #[serde(default)]
    pub assigned_to: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open: Option<Value>,
    #[serde(default)]
    pub status_text: Value,
}

/// Render a timestamp the way documents store it.
///
/// Fixed microsecond width, so lexical order matches chronological order.
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// The later of `now` and one microsecond past each stored timestamp.
///
/// Values that are missing or not RFC 3339 are skipped.
pub fn next_timestamp<'a>(
    now: DateTime<Utc>,
    prior: impl IntoIterator<Item = Option<&'a Value>>,
) -> DateTime<Utc> {
    prior
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .filter_map(|text| DateTime::parse_from_rfc3339(text).ok())
        .map(|at| at.with_timezone(&Utc) + Duration::microseconds(1))
        .fold(now, std::cmp::max)
}

/// Loose truthiness of a client-supplied value.
///
/// `null`, `false`, `0` and `""` are falsy; everything else is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Read a required text field from a loosely typed body.
///
/// Strings are taken as-is, truthy numbers and `true` by their text form.
/// Falsy values and structured values count as absent.
pub fn truthy_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        scalar @ (Value::Number(_) | Value::Bool(true)) if is_truthy(scalar) => {
            Some(scalar.to_string())
        }
        _ => None,
    }
}

/// Coerce a client-supplied `open` value to a boolean.
///
/// Only the exact string `"true"` (or a JSON `true`) yields `true`; any other
/// value, typos included, yields `false`.
pub fn coerce_open(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::String(text) => text == "true",
        _ => false,
    }
}

/// Apply `patch` onto `target` with JSON merge-patch (RFC 7396) rules.
///
/// A `null` removes the key, objects merge recursively, anything else
/// replaces. Matches SQLite's `json_patch` so both stores agree.
pub fn merge_patch(target: &mut Map<String, Value>, patch: &Map<String, Value>) {
    for (key, value) in patch {
        match value {
            Value::Null => {
                target.remove(key);
            }
            Value::Object(inner) => {
                let entry = target
                    .entry(key.clone())
                    .or_insert_with(|| Value::Object(Map::new()));
                if !entry.is_object() {
                    *entry = Value::Object(Map::new());
                }
                if let Value::Object(existing) = entry {
                    merge_patch(existing, inner);
                }
            }
            other => {
                target.insert(key.clone(), other.clone());
            }
        }
    }
}
