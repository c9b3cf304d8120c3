//! Method registry.
//!
//! Maps `{applet}.{capability}.{op}` names to handlers. Populated once
//! at startup, read-only afterwards, so lookups take no lock.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use cap_core::{CapabilityResult, Scope};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Where a method may be invoked from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Reachable from client-originated calls and internal ones.
    Public,
    /// Reachable only via the internal entry point. On the public
    /// transport these answer "Method not found" so their existence
    /// leaks nothing.
    ServerOnly,
}

/// A registered RPC method body. Params arrive untyped; handlers
/// validate them and shape the result.
#[async_trait]
pub trait RpcHandler: Send + Sync {
    async fn handle(&self, scope: &Scope, params: Value) -> CapabilityResult<Value>;
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("method {0:?} is already registered")]
    DuplicateMethod(String),
}

pub(crate) struct Registration {
    pub applet_id: String,
    pub visibility: Visibility,
    pub handler: Arc<dyn RpcHandler>,
}

/// Startup-time method table. The applet id is bound at registration,
/// so dispatch only needs the tenant header to build a full [`Scope`].
#[derive(Default)]
pub struct Registry {
    methods: HashMap<String, Registration>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `{applet}.{method}` as publicly callable.
    pub fn register(
        &mut self,
        applet: &str,
        method: &str,
        handler: Arc<dyn RpcHandler>,
    ) -> Result<(), RegistryError> {
        self.insert(applet, method, Visibility::Public, handler)
    }

    /// Registers `{applet}.{method}` as server-only.
    pub fn register_server_only(
        &mut self,
        applet: &str,
        method: &str,
        handler: Arc<dyn RpcHandler>,
    ) -> Result<(), RegistryError> {
        self.insert(applet, method, Visibility::ServerOnly, handler)
    }

    fn insert(
        &mut self,
        applet: &str,
        method: &str,
        visibility: Visibility,
        handler: Arc<dyn RpcHandler>,
    ) -> Result<(), RegistryError> {
        let name = format!("{applet}.{method}");
        if self.methods.contains_key(&name) {
            return Err(RegistryError::DuplicateMethod(name));
        }
        debug!(method = %name, ?visibility, "registered rpc method");
        self.methods.insert(
            name,
            Registration {
                applet_id: applet.to_string(),
                visibility,
                handler,
            },
        );
        Ok(())
    }

    pub(crate) fn lookup(&self, method: &str) -> Option<&Registration> {
        self.methods.get(method)
    }

    /// Registered method names, for startup logging.
    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }
}

// ── Tests ───────────────────────────────────────────────────────────────
