//! capgrid-secrets — applet-scoped secret values, AES-256-GCM at rest.
//!
//! Secrets are shared applet configuration (API keys and the like),
//! not tenant data, so the store keys are `(applet, name)` with no
//! tenant component. The applet RPC surface exposes only `get`; the
//! admin mutations on [`SecretStore`] belong to host-side tooling.

pub mod cipher;
pub mod env;
pub mod memory;
pub mod postgres;
pub mod store;

pub use cipher::SecretCipher;
pub use env::EnvSecretStore;
pub use memory::MemorySecretStore;
pub use postgres::PostgresSecretStore;
pub use store::SecretStore;
