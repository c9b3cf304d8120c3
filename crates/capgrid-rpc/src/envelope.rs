//! JSON-RPC style wire envelope.
//!
//! Requests are `{id, method, params}`. Responses always carry
//! `jsonrpc: "2.0"` and either `result` or `error: {code, message}`.
//! Protocol-level failures use the numeric JSON-RPC codes; application
//! failures use the capability string codes so clients can branch on
//! them without parsing messages.

use cap_core::CapabilityError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

pub const CODE_INVALID_REQUEST: i64 = -32600;
pub const CODE_METHOD_NOT_FOUND: i64 = -32601;
pub const CODE_INTERNAL: i64 = -32603;
pub const CODE_PARSE_ERROR: i64 = -32700;

/// Incoming call envelope. `id` is echoed back verbatim.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// Error code: numeric for protocol errors, string for application errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorCode {
    Protocol(i64),
    Application(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcErrorBody {
    pub code: ErrorCode,
    pub message: String,
}

impl RpcErrorBody {
    pub fn protocol(code: i64, message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Protocol(code),
            message: message.into(),
        }
    }

    /// Application failure. Internal details are withheld from the wire.
    pub fn application(err: &CapabilityError) -> Self {
        Self {
            code: ErrorCode::Application(err.code().to_string()),
            message: err.public_message(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    pub id: Value,
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorBody>,
}

impl RpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            id,
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: RpcErrorBody) -> Self {
        Self {
            id,
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(error),
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────
