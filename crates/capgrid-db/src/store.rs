//! Document store contract.

use async_trait::async_trait;
use cap_core::{CapabilityResult, Scope};
use serde_json::Value;

use crate::types::{DocRecord, QueryOptions};

/// Scoped JSON document storage.
///
/// Implementations must agree on absence: `get`, `patch`, and `replace`
/// of an id not present in scope return `NotFound`. `delete` returns
/// `false` instead — deleting is idempotent.
#[async_trait]
pub trait DocStore: Send + Sync {
    async fn get(&self, scope: &Scope, id: &str) -> CapabilityResult<DocRecord>;

    /// Query a table. Options are validated before calling this, so the
    /// backend only ever sees `eq` constraints.
    async fn query(
        &self,
        scope: &Scope,
        table: &str,
        options: &QueryOptions,
    ) -> CapabilityResult<Vec<DocRecord>>;

    /// Insert a new document with a freshly minted id.
    async fn insert(&self, scope: &Scope, table: &str, value: Value)
    -> CapabilityResult<DocRecord>;

    /// Shallow-merge `value` into the stored document (object-on-object);
    /// non-object values fall back to replacement.
    async fn patch(&self, scope: &Scope, id: &str, value: Value) -> CapabilityResult<DocRecord>;

    /// Replace the stored value wholesale.
    async fn replace(&self, scope: &Scope, id: &str, value: Value) -> CapabilityResult<DocRecord>;

    /// Delete a document. `false` when absent, idempotently.
    async fn delete(&self, scope: &Scope, id: &str) -> CapabilityResult<bool>;
}

/// Shallow merge used by `patch` on both backends.
pub(crate) fn merge_shallow(existing: &Value, patch: Value) -> Value {
    match (existing, patch) {
        (Value::Object(base), Value::Object(overlay)) => {
            let mut merged = base.clone();
            for (k, v) in overlay {
                merged.insert(k, v);
            }
            Value::Object(merged)
        }
        (_, patch) => patch,
    }
}
