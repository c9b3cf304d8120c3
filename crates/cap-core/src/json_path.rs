//! Dot-path addressing into JSON values.
//!
//! Query constraints address document fields as `"user.id"` — each
//! segment descends one level into a JSON object. The in-memory
//! document store walks values with [`lookup`]; the Postgres backend
//! translates the same path into a JSONB extraction predicate via
//! [`segments`].

use serde_json::Value;

/// Resolve a dot-path against a JSON value.
///
/// Returns `None` if any segment is missing or the current value is not
/// an object. Array indexing is deliberately unsupported — the query
/// surface addresses object fields only.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in segments(path) {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Split a dot-path into its segments, trimming surrounding whitespace.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.trim().split('.')
}
