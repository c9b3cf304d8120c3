//! `{applet}.ws.publish` handler.

use std::sync::Arc;

use async_trait::async_trait;
use cap_core::{CapabilityResult, Scope};
use capgrid_ws::WsHub;
use serde::Deserialize;
use serde_json::{Value, json};

use super::parse_params;
use crate::registry::{Registry, RegistryError, RpcHandler};

struct WsPublish {
    hub: Arc<WsHub>,
}

#[derive(Deserialize)]
struct PublishParams {
    channel: String,
    #[serde(default)]
    payload: Value,
}

#[async_trait]
impl RpcHandler for WsPublish {
    async fn handle(&self, scope: &Scope, params: Value) -> CapabilityResult<Value> {
        let p: PublishParams = parse_params(params)?;
        let delivered = self.hub.publish(scope, &p.channel, &p.payload);
        Ok(json!({ "delivered": delivered }))
    }
}

pub fn register(
    registry: &mut Registry,
    applet: &str,
    hub: Arc<WsHub>,
) -> Result<(), RegistryError> {
    registry.register_server_only(applet, "ws.publish", Arc::new(WsPublish { hub }))
}

// ── Tests ───────────────────────────────────────────────────────────────
