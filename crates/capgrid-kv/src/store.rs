//! KV store contract.

use async_trait::async_trait;
use cap_core::{CapabilityResult, Scope};
use serde_json::Value;

/// Scoped key-value storage with optional per-entry TTL.
///
/// Implementations must never leak entries across scopes. TTL entries
/// behave as absent once expired; whether the bytes are reclaimed
/// eagerly or lazily is a backend detail.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Fetch a value. Absent or expired keys are a `NotFound` error.
    async fn get(&self, scope: &Scope, key: &str) -> CapabilityResult<Value>;

    /// Store a value, optionally expiring after `ttl_seconds`.
    async fn set(
        &self,
        scope: &Scope,
        key: &str,
        value: Value,
        ttl_seconds: Option<u64>,
    ) -> CapabilityResult<()>;

    /// Delete a key. Returns `false` (not an error) when absent,
    /// idempotently.
    async fn del(&self, scope: &Scope, key: &str) -> CapabilityResult<bool>;

    /// Bulk fetch. Positional `None` for absent keys — the one place
    /// absence is not an error, because bulk lookups are sparse by
    /// design.
    async fn mget(&self, scope: &Scope, keys: &[String]) -> CapabilityResult<Vec<Option<Value>>>;
}
