//! Request body extraction for the issue routes.
//!
//! Clients send either JSON objects or HTML-form encoded bodies. Both end up
//! as one JSON object map; form values are always strings.

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde_json::{Map, Value};

use super::issues_http::ErrorResponse;

/// A request body decoded into a JSON object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IssueBody(pub Map<String, Value>);

/// Rejection for a body that could not be decoded.
#[derive(Debug)]
pub struct InvalidBody;

impl IntoResponse for InvalidBody {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("invalid request body")),
        )
            .into_response()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Json,
    Form,
    Other,
}

impl BodyKind {
    fn from_content_type(content_type: Option<&str>) -> Self {
        let Some(content_type) = content_type else {
            return Self::Json;
        };
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if essence == "application/x-www-form-urlencoded" {
            Self::Form
        } else if essence == "application/json" || essence.ends_with("+json") {
            Self::Json
        } else {
            Self::Other
        }
    }
}

impl<S> FromRequest<S> for IssueBody
where
    S: Send + Sync,
{
    type Rejection = InvalidBody;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let kind = BodyKind::from_content_type(
            req.headers()
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok()),
        );
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|_| InvalidBody)?;

        decode(kind, &bytes).map(Self).ok_or(InvalidBody)
    }
}

fn decode(kind: BodyKind, bytes: &[u8]) -> Option<Map<String, Value>> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Some(Map::new());
    }

    match kind {
        BodyKind::Json => match serde_json::from_slice(bytes).ok()? {
            Value::Object(map) => Some(map),
            _ => None,
        },
        BodyKind::Form => {
            let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(bytes).ok()?;
            Some(
                pairs
                    .into_iter()
                    .map(|(key, value)| (key, Value::String(value)))
                    .collect(),
            )
        }
        // Bodies of any other media type are not read.
        BodyKind::Other => Some(Map::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_body_kind_from_content_type() {
        assert_eq!(BodyKind::from_content_type(None), BodyKind::Json);
        assert_eq!(
            BodyKind::from_content_type(Some("application/json; charset=utf-8")),
            BodyKind::Json
        );
        assert_eq!(
            BodyKind::from_content_type(Some("application/merge-patch+json")),
            BodyKind::Json
        );
        assert_eq!(
            BodyKind::from_content_type(Some("Application/X-WWW-Form-Urlencoded")),
            BodyKind::Form
        );
        assert_eq!(BodyKind::from_content_type(Some("text/plain")), BodyKind::Other);
    }

    #[test]
    fn test_decode_json_object() {
        let map = decode(BodyKind::Json, br#"{"_id": "abc", "open": false}"#).unwrap();
        assert_eq!(map.get("_id"), Some(&json!("abc")));
        assert_eq!(map.get("open"), Some(&json!(false)));
    }

    #[test]
    fn test_decode_rejects_non_object_json() {
        assert!(decode(BodyKind::Json, b"[1, 2, 3]").is_none());
        assert!(decode(BodyKind::Json, b"\"text\"").is_none());
        assert!(decode(BodyKind::Json, b"{not json").is_none());
    }

    #[test]
    fn test_decode_form_last_value_wins() {
        let map = decode(
            BodyKind::Form,
            b"issue_title=Broken+build&open=true&open=false&assigned_to=",
        )
        .unwrap();
        assert_eq!(map.get("issue_title"), Some(&json!("Broken build")));
        assert_eq!(map.get("open"), Some(&json!("false")));
        assert_eq!(map.get("assigned_to"), Some(&json!("")));
    }

    #[test]
    fn test_decode_empty_body() {
        assert_eq!(decode(BodyKind::Json, b""), Some(Map::new()));
        assert_eq!(decode(BodyKind::Form, b"  \n"), Some(Map::new()));
    }

    #[test]
    fn test_decode_ignores_other_media_types() {
        assert_eq!(decode(BodyKind::Other, b"hello"), Some(Map::new()));
    }
}
