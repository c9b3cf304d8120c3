//! `{applet}.secrets.get` handler.
//!
//! Only `get` is on the RPC surface. The admin mutations on
//! [`SecretStore`] stay host-side so applets can never write or
//! enumerate secrets.

use std::sync::Arc;

use async_trait::async_trait;
use cap_core::{CapabilityResult, Scope};
use capgrid_secrets::SecretStore;
use serde::Deserialize;
use serde_json::Value;

use super::parse_params;
use crate::registry::{Registry, RegistryError, RpcHandler};

struct SecretsGet {
    store: Arc<dyn SecretStore>,
}

#[derive(Deserialize)]
struct GetParams {
    name: String,
}

#[async_trait]
impl RpcHandler for SecretsGet {
    async fn handle(&self, scope: &Scope, params: Value) -> CapabilityResult<Value> {
        let p: GetParams = parse_params(params)?;
        // Secrets are applet-scoped; the tenant plays no part here.
        let value = self.store.get(&scope.applet_id, &p.name).await?;
        Ok(Value::String(value))
    }
}

pub fn register(
    registry: &mut Registry,
    applet: &str,
    store: Arc<dyn SecretStore>,
) -> Result<(), RegistryError> {
    registry.register_server_only(applet, "secrets.get", Arc::new(SecretsGet { store }))
}

// ── Tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD as B64;
    use capgrid_secrets::{MemorySecretStore, SecretCipher};
    use serde_json::json;

    fn store() -> Arc<dyn SecretStore> {
        let cipher = SecretCipher::from_base64_key(&B64.encode([3u8; 32])).unwrap();
        Arc::new(MemorySecretStore::new(cipher))
    }

    #[tokio::test]
    async fn get_resolves_by_applet_regardless_of_tenant() {
        let store = store();
        store.set("crm", "api-key", "sk-123").await.unwrap();
        let handler = SecretsGet { store };
        for tenant in ["acme", "globex"] {
            let value = handler
                .handle(&Scope::new(tenant, "crm"), json!({"name": "api-key"}))
                .await
                .unwrap();
            assert_eq!(value, json!("sk-123"));
        }
    }

    #[tokio::test]
    async fn absent_secret_is_not_found_never_null() {
        let handler = SecretsGet { store: store() };
        let err = handler
            .handle(&Scope::new("acme", "crm"), json!({"name": "missing"}))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
