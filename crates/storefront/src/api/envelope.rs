//! Response-shape handling.
//!
//! The backend wraps payloads in `{success, message?, ...}` envelopes but is
//! not consistent about where the payload lives: a product list may arrive as
//! a bare array, `{products: [...]}`, `{data: [...]}` or
//! `{data: {products: [...]}}`. These helpers dig the payload out.

use serde_json::Value;

/// Key under which every envelope may nest its payload.
const DATA_KEY: &str = "data";

/// Whether the body is an envelope reporting `success: false`.
#[must_use]
pub fn is_failure(body: &Value) -> bool {
    matches!(body.get("success"), Some(Value::Bool(false)))
}

/// Human-readable message carried by an envelope, if any.
#[must_use]
pub fn message(body: &Value) -> Option<String> {
    ["message", "error"]
        .iter()
        .find_map(|key| match body.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_owned()),
            Some(Value::Object(inner)) => inner
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_owned),
            _ => None,
        })
}

/// Extract a list stored under one of `keys` (or `data`), at any nesting.
#[must_use]
pub fn extract_list(body: Value, keys: &[&str]) -> Option<Vec<Value>> {
    match body {
        Value::Array(items) => Some(items),
        Value::Object(mut map) => keys
            .iter()
            .copied()
            .chain(std::iter::once(DATA_KEY))
            .find_map(|key| map.remove(key).and_then(|inner| extract_list(inner, keys))),
        _ => None,
    }
}

/// Extract a single record stored under one of `keys` (or `data`).
///
/// An object that itself carries an `id` is taken to be the record.
#[must_use]
pub fn extract_record(body: Value, keys: &[&str]) -> Option<Value> {
    match body {
        Value::Object(map) if map.contains_key("id") => Some(Value::Object(map)),
        Value::Object(mut map) => keys
            .iter()
            .copied()
            .chain(std::iter::once(DATA_KEY))
            .find_map(|key| {
                map.remove(key)
                    .filter(Value::is_object)
                    .and_then(|inner| extract_record(inner, keys))
            }),
        _ => None,
    }
}
