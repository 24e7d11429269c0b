//! Infrastructure adapters for external systems.

pub mod http;
pub mod memory;
pub mod sqlite;

use uuid::Uuid;

use crate::domain::models::DocumentId;

/// Accept a client-supplied id if it is a UUID, in canonical lowercase form.
///
/// Both stores mint v4 UUIDs, so anything else can never address a document.
pub fn parse_uuid_id(raw: &str) -> Option<DocumentId> {
    Uuid::parse_str(raw.trim())
        .ok()
        .map(|id| DocumentId::new(id.hyphenated().to_string()))
}
