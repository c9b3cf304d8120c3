//! Capability handlers: thin adapters from untyped RPC params onto the
//! store traits. Every method here is registered server-only; applet
//! code reaches them through the internal transport.

pub mod db;
pub mod files;
pub mod jobs;
pub mod kv;
pub mod secrets;
pub mod ws;

use std::sync::Arc;

use cap_core::{CapabilityError, CapabilityResult};
use capgrid_db::DocStore;
use capgrid_files::FileStore;
use capgrid_jobs::JobStore;
use capgrid_kv::KvStore;
use capgrid_secrets::SecretStore;
use capgrid_ws::WsHub;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::registry::{Registry, RegistryError};

/// Everything one applet gets registered against.
#[derive(Clone)]
pub struct CapabilitySet {
    pub kv: Arc<dyn KvStore>,
    pub db: Arc<dyn DocStore>,
    pub jobs: Arc<dyn JobStore>,
    pub secrets: Arc<dyn SecretStore>,
    pub files: Arc<FileStore>,
    pub ws: Arc<WsHub>,
}

/// Registers the full `{applet}.{capability}.{op}` surface for one applet.
pub fn register_applet(
    registry: &mut Registry,
    applet: &str,
    caps: &CapabilitySet,
) -> Result<(), RegistryError> {
    kv::register(registry, applet, caps.kv.clone())?;
    db::register(registry, applet, caps.db.clone())?;
    jobs::register(registry, applet, caps.jobs.clone())?;
    secrets::register(registry, applet, caps.secrets.clone())?;
    files::register(registry, applet, caps.files.clone())?;
    ws::register(registry, applet, caps.ws.clone())?;
    Ok(())
}

/// Parses RPC params into a typed struct. Null params are treated as
/// an empty object so no-argument methods accept `"params": null`.
pub(crate) fn parse_params<T: DeserializeOwned>(params: Value) -> CapabilityResult<T> {
    let params = match params {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };
    serde_json::from_value(params)
        .map_err(|e| CapabilityError::invalid(format!("invalid params: {e}")))
}

pub(crate) fn to_json<T: Serialize>(value: &T) -> CapabilityResult<Value> {
    serde_json::to_value(value)
        .map_err(|e| CapabilityError::internal(format!("result serialization: {e}")))
}
