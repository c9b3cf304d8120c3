//! In-memory KV backend for tests and development.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use cap_core::{CapabilityError, CapabilityResult, Scope};
use serde_json::Value;

use crate::store::KvStore;

struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Single reader/writer lock over a scope-partitioned map. Backs tests
/// and dev only, not the production path.
///
/// TTL is enforced lazily: expired entries behave as absent and are
/// pruned the next time a write lock touches them.
#[derive(Default)]
pub struct MemoryKvStore {
    entries: RwLock<HashMap<(Scope, String), Entry>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, scope: &Scope, key: &str) -> CapabilityResult<Value> {
        let now = Instant::now();
        let map_key = (scope.clone(), key.to_string());
        {
            let entries = self.entries.read().expect("kv lock poisoned");
            match entries.get(&map_key) {
                Some(entry) if !entry.expired(now) => return Ok(entry.value.clone()),
                Some(_) => {} // expired, prune below
                None => return Err(CapabilityError::not_found(format!("kv key {key:?}"))),
            }
        }
        self.entries
            .write()
            .expect("kv lock poisoned")
            .remove(&map_key);
        Err(CapabilityError::not_found(format!("kv key {key:?}")))
    }

    async fn set(
        &self,
        scope: &Scope,
        key: &str,
        value: Value,
        ttl_seconds: Option<u64>,
    ) -> CapabilityResult<()> {
        let expires_at = ttl_seconds.map(|secs| Instant::now() + Duration::from_secs(secs));
        self.entries
            .write()
            .expect("kv lock poisoned")
            .insert((scope.clone(), key.to_string()), Entry { value, expires_at });
        Ok(())
    }

    async fn del(&self, scope: &Scope, key: &str) -> CapabilityResult<bool> {
        let mut entries = self.entries.write().expect("kv lock poisoned");
        match entries.remove(&(scope.clone(), key.to_string())) {
            Some(entry) => Ok(!entry.expired(Instant::now())),
            None => Ok(false),
        }
    }

    async fn mget(&self, scope: &Scope, keys: &[String]) -> CapabilityResult<Vec<Option<Value>>> {
        let now = Instant::now();
        let entries = self.entries.read().expect("kv lock poisoned");
        Ok(keys
            .iter()
            .map(|key| {
                entries
                    .get(&(scope.clone(), key.clone()))
                    .filter(|entry| !entry.expired(now))
                    .map(|entry| entry.value.clone())
            })
            .collect())
    }
}
