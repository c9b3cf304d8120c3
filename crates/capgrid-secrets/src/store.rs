//! Secret store contract.
//!
//! Secrets are deliberately applet-scoped rather than tenant-scoped:
//! they hold shared configuration such as third-party API keys, not
//! tenant data. Only `get` is exposed on the applet RPC surface; the
//! admin mutations are reserved for host-side tooling.

use async_trait::async_trait;
use cap_core::CapabilityResult;

#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetches and decrypts a secret. Absent names are a NotFound
    /// error, never a silent null.
    async fn get(&self, applet: &str, name: &str) -> CapabilityResult<String>;

    /// Encrypts and stores a secret, overwriting any previous value.
    async fn set(&self, applet: &str, name: &str, plaintext: &str) -> CapabilityResult<()>;

    /// Lists secret names (never values) for an applet, sorted.
    async fn list(&self, applet: &str) -> CapabilityResult<Vec<String>>;

    /// Deletes a secret. Returns `false` for unknown names, idempotently.
    async fn delete(&self, applet: &str, name: &str) -> CapabilityResult<bool>;
}
