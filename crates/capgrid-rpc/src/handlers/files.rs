//! `{applet}.files.{op}` handlers. Bytes travel base64-encoded in the
//! JSON envelope.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use cap_core::{CapabilityError, CapabilityResult, Scope};
use capgrid_files::FileStore;
use serde::Deserialize;
use serde_json::Value;

use super::{parse_params, to_json};
use crate::registry::{Registry, RegistryError, RpcHandler};

#[derive(Clone, Copy)]
enum FilesOp {
    Store,
    Get,
    Delete,
}

struct FilesMethod {
    store: Arc<FileStore>,
    op: FilesOp,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreParams {
    name: String,
    content_type: String,
    bytes: String,
}

#[derive(Deserialize)]
struct IdParams {
    id: String,
}

#[async_trait]
impl RpcHandler for FilesMethod {
    async fn handle(&self, scope: &Scope, params: Value) -> CapabilityResult<Value> {
        match self.op {
            FilesOp::Store => {
                let p: StoreParams = parse_params(params)?;
                let bytes = B64
                    .decode(&p.bytes)
                    .map_err(|e| CapabilityError::invalid(format!("bytes is not base64: {e}")))?;
                to_json(&self.store.store(scope, &p.name, &p.content_type, bytes).await?)
            }
            FilesOp::Get => {
                let p: IdParams = parse_params(params)?;
                to_json(&self.store.get(scope, &p.id).await?)
            }
            FilesOp::Delete => {
                let p: IdParams = parse_params(params)?;
                Ok(Value::Bool(self.store.delete(scope, &p.id).await?))
            }
        }
    }
}

pub fn register(
    registry: &mut Registry,
    applet: &str,
    store: Arc<FileStore>,
) -> Result<(), RegistryError> {
    for (name, op) in [
        ("files.store", FilesOp::Store),
        ("files.get", FilesOp::Get),
        ("files.delete", FilesOp::Delete),
    ] {
        registry.register_server_only(
            applet,
            name,
            Arc::new(FilesMethod {
                store: store.clone(),
                op,
            }),
        )?;
    }
    Ok(())
}

// ── Tests ───────────────────────────────────────────────────────────────
