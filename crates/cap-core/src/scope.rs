//! Tenant/applet scope — the partition key for all capability state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// HTTP header carrying the tenant id on production requests.
pub const TENANT_HEADER: &str = "X-Iota-Tenant-Id";

/// The `(tenant, applet)` pair partitioning all stateful capability data.
///
/// A fixed-arity struct rather than a `tenant::applet` string: map-based
/// stores use `Scope` directly as a key, so ids that happen to contain a
/// separator character cannot alias another scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    pub tenant_id: String,
    pub applet_id: String,
}

impl Scope {
    pub fn new(tenant_id: impl Into<String>, applet_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            applet_id: applet_id.into(),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.tenant_id, self.applet_id)
    }
}
