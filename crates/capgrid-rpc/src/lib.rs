//! capgrid-rpc — the applet-facing RPC surface.
//!
//! Three layers:
//!
//! - [`envelope`] — the `{id, method, params}` wire format and its
//!   result/error responses.
//! - [`registry`] — the startup-time method table mapping
//!   `{applet}.{capability}.{op}` onto [`registry::RpcHandler`]
//!   trait objects, with public/server-only visibility.
//! - [`dispatch`] — axum entry points `/rpc` and `/internal/rpc`
//!   sharing one [`Dispatcher`], including batch dispatch and the
//!   request body cap.
//!
//! [`handlers`] adapts each capability store onto the registry; hosts
//! call [`handlers::register_applet`] per configured applet.

pub mod dispatch;
pub mod envelope;
pub mod handlers;
pub mod registry;

pub use dispatch::{DEFAULT_BODY_LIMIT, Dispatcher, Transport, build_router};
pub use envelope::{RpcErrorBody, RpcRequest, RpcResponse};
pub use handlers::{CapabilitySet, register_applet};
pub use registry::{Registry, RegistryError, RpcHandler, Visibility};
