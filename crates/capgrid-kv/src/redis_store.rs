//! Redis KV backend.

use async_trait::async_trait;
use cap_core::{CapabilityError, CapabilityResult, Scope};
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use serde_json::Value;
use tracing::debug;

use crate::store::KvStore;

/// Redis-backed KV store.
///
/// Consumes an already-initialized [`ConnectionManager`] owned by the
/// host application; this crate never manages connection lifecycle or
/// credentials. Keys are namespaced `applet:{tenant}:{applet}:{key}`
/// and TTL is enforced natively via `SET ... EX`.
#[derive(Clone)]
pub struct RedisKvStore {
    conn: ConnectionManager,
}

impl RedisKvStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    fn scoped_key(scope: &Scope, key: &str) -> String {
        format!("applet:{}:{}:{}", scope.tenant_id, scope.applet_id, key)
    }
}

fn wrap(op: &str, err: redis::RedisError) -> CapabilityError {
    CapabilityError::internal(format!("redis {op}: {err}"))
}

fn decode(raw: &str) -> CapabilityResult<Value> {
    serde_json::from_str(raw)
        .map_err(|e| CapabilityError::internal(format!("decode kv payload: {e}")))
}

#[async_trait]
impl KvStore for RedisKvStore {
    async fn get(&self, scope: &Scope, key: &str) -> CapabilityResult<Value> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn
            .get(Self::scoped_key(scope, key))
            .await
            .map_err(|e| wrap("get", e))?;
        match raw {
            Some(payload) => decode(&payload),
            None => Err(CapabilityError::not_found(format!("kv key {key:?}"))),
        }
    }

    async fn set(
        &self,
        scope: &Scope,
        key: &str,
        value: Value,
        ttl_seconds: Option<u64>,
    ) -> CapabilityResult<()> {
        let payload = value.to_string();
        let scoped = Self::scoped_key(scope, key);
        let mut conn = self.conn.clone();
        match ttl_seconds {
            Some(secs) => conn
                .set_ex::<_, _, ()>(&scoped, payload, secs)
                .await
                .map_err(|e| wrap("set_ex", e))?,
            None => conn
                .set::<_, _, ()>(&scoped, payload)
                .await
                .map_err(|e| wrap("set", e))?,
        }
        debug!(%scope, key, ttl = ?ttl_seconds, "kv set");
        Ok(())
    }

    async fn del(&self, scope: &Scope, key: &str) -> CapabilityResult<bool> {
        let mut conn = self.conn.clone();
        let removed: i64 = conn
            .del(Self::scoped_key(scope, key))
            .await
            .map_err(|e| wrap("del", e))?;
        Ok(removed > 0)
    }

    async fn mget(&self, scope: &Scope, keys: &[String]) -> CapabilityResult<Vec<Option<Value>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let scoped: Vec<String> = keys.iter().map(|k| Self::scoped_key(scope, k)).collect();
        let mut conn = self.conn.clone();
        let raw: Vec<Option<String>> = conn.mget(&scoped).await.map_err(|e| wrap("mget", e))?;
        raw.into_iter()
            .map(|slot| slot.as_deref().map(decode).transpose())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_carry_the_full_scope_namespace() {
        let scope = Scope::new("t-42", "bichat");
        assert_eq!(
            RedisKvStore::scoped_key(&scope, "session"),
            "applet:t-42:bichat:session"
        );
    }
}
