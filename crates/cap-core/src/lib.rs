//! cap-core — shared types for the capgrid applet capability broker.
//!
//! Every capability crate builds on three things defined here:
//!
//! - [`Scope`] — the `(tenant, applet)` pair that partitions all
//!   stateful capability data. Stores key their maps by the struct
//!   itself, never by a concatenated string, so ids containing a
//!   separator cannot collide across scopes.
//! - [`CapabilityError`] — the uniform error taxonomy (`Invalid`,
//!   `NotFound`, `Internal`) every backend maps into, so the RPC
//!   dispatcher can tell absence apart from failure without knowing
//!   which backend produced it.
//! - [`json_path`] — dot-path addressing into JSON values, shared by
//!   the in-memory document store and query validation.

pub mod error;
pub mod json_path;
pub mod scope;

pub use error::{CapabilityError, CapabilityResult};
pub use scope::{Scope, TENANT_HEADER};

/// Mint a globally unique record id.
///
/// UUIDv4 keeps ids opaque and collision-free across stores without
/// coordinating counters between backends.
pub fn new_record_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
