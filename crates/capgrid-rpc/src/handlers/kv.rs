//! `{applet}.kv.{op}` handlers.

use std::sync::Arc;

use async_trait::async_trait;
use cap_core::{CapabilityResult, Scope};
use capgrid_kv::KvStore;
use serde::Deserialize;
use serde_json::Value;

use super::parse_params;
use crate::registry::{Registry, RegistryError, RpcHandler};

#[derive(Clone, Copy)]
enum KvOp {
    Get,
    Set,
    Del,
    Mget,
}

struct KvMethod {
    store: Arc<dyn KvStore>,
    op: KvOp,
}

#[derive(Deserialize)]
struct KeyParams {
    key: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetParams {
    key: String,
    value: Value,
    #[serde(default)]
    ttl_seconds: Option<u64>,
}

#[derive(Deserialize)]
struct MgetParams {
    keys: Vec<String>,
}

#[async_trait]
impl RpcHandler for KvMethod {
    async fn handle(&self, scope: &Scope, params: Value) -> CapabilityResult<Value> {
        match self.op {
            KvOp::Get => {
                let p: KeyParams = parse_params(params)?;
                self.store.get(scope, &p.key).await
            }
            KvOp::Set => {
                let p: SetParams = parse_params(params)?;
                self.store.set(scope, &p.key, p.value, p.ttl_seconds).await?;
                Ok(Value::Null)
            }
            KvOp::Del => {
                let p: KeyParams = parse_params(params)?;
                Ok(Value::Bool(self.store.del(scope, &p.key).await?))
            }
            KvOp::Mget => {
                let p: MgetParams = parse_params(params)?;
                let values = self.store.mget(scope, &p.keys).await?;
                Ok(Value::Array(
                    values
                        .into_iter()
                        .map(|v| v.unwrap_or(Value::Null))
                        .collect(),
                ))
            }
        }
    }
}

pub fn register(
    registry: &mut Registry,
    applet: &str,
    store: Arc<dyn KvStore>,
) -> Result<(), RegistryError> {
    for (name, op) in [
        ("kv.get", KvOp::Get),
        ("kv.set", KvOp::Set),
        ("kv.del", KvOp::Del),
        ("kv.mget", KvOp::Mget),
    ] {
        registry.register_server_only(
            applet,
            name,
            Arc::new(KvMethod {
                store: store.clone(),
                op,
            }),
        )?;
    }
    Ok(())
}

// ── Tests ───────────────────────────────────────────────────────────────
