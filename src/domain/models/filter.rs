//! Filter and update-set construction.
//!
//! Translates loosely typed request input into the equality filter and
//! merge-patch update a document store understands. Both shipped stores match
//! documents through [`IssueFilter::matches`], so filter semantics live here
//! rather than in each adapter.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::issue::{
    coerce_open, fields, format_timestamp, next_timestamp, DocumentId, IssueDocument,
};

/// Value a single field constraint compares against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    /// Matches only a JSON string with identical contents.
    Text(String),
    /// Matches only a JSON boolean.
    Bool(bool),
}

impl FilterValue {
    pub fn matches(&self, value: Option<&Value>) -> bool {
        match (self, value) {
            (Self::Text(expected), Some(Value::String(actual))) => expected == actual,
            (Self::Bool(expected), Some(Value::Bool(actual))) => expected == actual,
            _ => false,
        }
    }
}

/// Equality filter over issue documents, always scoped to one project.
///
/// Field constraints are a permissive map: any client-supplied field name is
/// accepted and compared verbatim against the stored document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueFilter {
    project: String,
    id: Option<DocumentId>,
    fields: BTreeMap<String, FilterValue>,
}

impl IssueFilter {
    pub fn for_project(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            id: None,
            fields: BTreeMap::new(),
        }
    }

    /// Filter addressing exactly one document within a project.
    pub fn by_id(project: impl Into<String>, id: DocumentId) -> Self {
        Self::for_project(project).with_id(id)
    }

    pub fn with_id(mut self, id: DocumentId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: FilterValue) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Build a list filter from query parameters.
    ///
    /// Empty values are skipped. The identifier parameter is validated with
    /// `parse_id`; an identifier the store rejects can match nothing, which
    /// is signalled by returning `None`. `open` is coerced to a boolean.
    /// Everything else becomes a string equality constraint, and a repeated
    /// key keeps its last value.
    pub fn from_query<I, F>(project: &str, params: I, parse_id: F) -> Option<Self>
    where
        I: IntoIterator<Item = (String, String)>,
        F: Fn(&str) -> Option<DocumentId>,
    {
        let mut filter = Self::for_project(project);

        for (key, value) in params {
            if value.is_empty() {
                continue;
            }

            match key.as_str() {
                fields::ID | fields::ID_ALIAS => {
                    filter.id = Some(parse_id(&value)?);
                }
                fields::OPEN => {
                    let open = coerce_open(&Value::String(value));
                    filter.fields.insert(key, FilterValue::Bool(open));
                }
                _ => {
                    filter.fields.insert(key, FilterValue::Text(value));
                }
            }
        }

        Some(filter)
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn id(&self) -> Option<&DocumentId> {
        self.id.as_ref()
    }

    pub fn fields(&self) -> &BTreeMap<String, FilterValue> {
        &self.fields
    }

    /// Whether `document` satisfies every constraint of this filter.
    pub fn matches(&self, document: &IssueDocument) -> bool {
        if document.project() != Some(self.project.as_str()) {
            return false;
        }

        if let Some(id) = &self.id {
            if &document.id != id {
                return false;
            }
        }

        self.fields
            .iter()
            .all(|(name, expected)| expected.matches(document.get(name)))
    }
}

/// Keys a client may never write through an update.
const PROTECTED_FIELDS: [&str; 4] = [
    fields::ID,
    fields::ID_ALIAS,
    fields::PROJECT,
    fields::CREATED_ON,
];

/// Fields every stored issue keeps; a `null` for one of them is ignored.
const REQUIRED_FIELDS: [&str; 3] = [fields::ISSUE_TITLE, fields::ISSUE_TEXT, fields::CREATED_BY];

/// Partial update applied as a JSON merge-patch.
#[derive(Debug, Clone, PartialEq)]
pub struct IssueUpdate {
    set: Map<String, Value>,
    stamped_at: DateTime<Utc>,
}

impl IssueUpdate {
    /// Build the update-set from candidate body fields.
    ///
    /// Empty strings mean "leave untouched" and are dropped, as are the
    /// protected structural keys and `null` for a required field. Returns
    /// `None` when nothing is left to write. Otherwise `open` is coerced to a
    /// boolean and `updated_on` is stamped with `now`, replacing any
    /// client-supplied value.
    pub fn from_candidates(candidates: Map<String, Value>, now: DateTime<Utc>) -> Option<Self> {
        let mut set: Map<String, Value> = candidates
            .into_iter()
            .filter(|(key, value)| is_writable(key, value))
            .collect();

        if set.is_empty() {
            return None;
        }

        if let Some(open) = set.get_mut(fields::OPEN) {
            *open = Value::Bool(coerce_open(open));
        }

        set.insert(
            fields::UPDATED_ON.to_string(),
            Value::String(format_timestamp(&now)),
        );

        Some(Self { set, stamped_at: now })
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.set
    }

    /// The patch to merge into a document whose current fields are `current`.
    ///
    /// `updated_on` is moved forward when needed so it lands strictly after
    /// the document's stored timestamps, even if the clock went backwards.
    /// Stores call this inside their atomic update.
    pub fn patch_for(&self, current: &Map<String, Value>) -> Map<String, Value> {
        let stamp = next_timestamp(
            self.stamped_at,
            [current.get(fields::UPDATED_ON), current.get(fields::CREATED_ON)],
        );

        let mut patch = self.set.clone();
        patch.insert(
            fields::UPDATED_ON.to_string(),
            Value::String(format_timestamp(&stamp)),
        );
        patch
    }
}

fn is_writable(key: &str, value: &Value) -> bool {
    if PROTECTED_FIELDS.contains(&key) || value.as_str() == Some("") {
        return false;
    }
    !(value.is_null() && REQUIRED_FIELDS.contains(&key))
}
