//! Finding the id of a newly created document.
//!
//! Blob providers differ in where they report it: a dedicated header, the
//! `Location` header, or the response body.

use reqwest::header::{HeaderMap, LOCATION};
use serde_json::Value;

/// Header carrying the id of a created document.
pub const ID_HEADER: &str = "x-jsonblob-id";

/// Returns the id of a created document from the response headers or body.
///
/// Checks, in order: the id header, the last path segment of `Location`,
/// and an `id` field in a JSON body.
pub fn discover_document_id(headers: &HeaderMap, body: &str) -> Option<String> {
    header_id(headers)
        .or_else(|| location_id(headers))
        .or_else(|| body_id(body))
}

fn header_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

fn location_id(headers: &HeaderMap) -> Option<String> {
    let location = headers.get(LOCATION)?.to_str().ok()?;
    let path = location.split(['?', '#']).next()?;
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

fn body_id(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("id")? {
        Value::String(id) if !id.trim().is_empty() => Some(id.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
