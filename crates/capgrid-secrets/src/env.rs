//! Environment-variable secret backend for development.
//!
//! Values live in plaintext env vars named
//! `IOTA_APPLET_SECRET_{APPLET}_{NAME}` where both segments are
//! uppercased and every non-alphanumeric byte becomes `_`.

use async_trait::async_trait;
use cap_core::{CapabilityError, CapabilityResult};

use crate::store::SecretStore;

const ENV_PREFIX: &str = "IOTA_APPLET_SECRET_";

/// Read-only store backed by process environment variables.
#[derive(Clone, Default)]
pub struct EnvSecretStore;

impl EnvSecretStore {
    pub fn new() -> Self {
        Self
    }
}

fn normalize(segment: &str) -> String {
    segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Env var name for `(applet, name)`.
pub fn env_var_name(applet: &str, name: &str) -> String {
    format!("{ENV_PREFIX}{}_{}", normalize(applet), normalize(name))
}

#[async_trait]
impl SecretStore for EnvSecretStore {
    async fn get(&self, applet: &str, name: &str) -> CapabilityResult<String> {
        let var = env_var_name(applet, name);
        std::env::var(&var)
            .map_err(|_| CapabilityError::not_found(format!("secret {applet:?}/{name:?}")))
    }

    async fn set(&self, _applet: &str, _name: &str, _plaintext: &str) -> CapabilityResult<()> {
        Err(CapabilityError::invalid(
            "env secret store is read-only; set the variable in the environment",
        ))
    }

    async fn list(&self, applet: &str) -> CapabilityResult<Vec<String>> {
        let prefix = format!("{ENV_PREFIX}{}_", normalize(applet));
        let mut names: Vec<String> = std::env::vars()
            .filter_map(|(k, _)| k.strip_prefix(&prefix).map(str::to_string))
            .collect();
        names.sort();
        Ok(names)
    }

    async fn delete(&self, _applet: &str, _name: &str) -> CapabilityResult<bool> {
        Err(CapabilityError::invalid(
            "env secret store is read-only; unset the variable in the environment",
        ))
    }
}

// ── Tests ───────────────────────────────────────────────────────────────
