//! HTTP entry point and envelope dispatch.
//!
//! Two mounts share one dispatcher: `/rpc` for client-originated
//! traffic and `/internal/rpc` for server-side callers. Transport
//! problems (unparseable body, malformed envelope, oversized body)
//! answer 4xx; once an envelope is well-formed, every outcome is
//! HTTP 200 with `result` or `error` populated.

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use cap_core::{CapabilityError, Scope, TENANT_HEADER};
use serde_json::Value;
use tracing::{debug, warn};

use crate::envelope::{
    CODE_INVALID_REQUEST, CODE_METHOD_NOT_FOUND, CODE_PARSE_ERROR, RpcErrorBody, RpcRequest,
    RpcResponse,
};
use crate::registry::{Registry, Visibility};

pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

const METHOD_NOT_FOUND: &str = "Method not found";

/// Which entry point a call arrived through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Public,
    Internal,
}

pub struct Dispatcher {
    registry: Registry,
    body_limit: usize,
}

impl Dispatcher {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    pub fn with_body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = bytes;
        self
    }

    /// Dispatches one well-formed envelope.
    pub async fn dispatch(
        &self,
        transport: Transport,
        tenant: Option<&str>,
        req: RpcRequest,
    ) -> RpcResponse {
        let Some(registration) = self.registry.lookup(&req.method) else {
            return RpcResponse::failure(
                req.id,
                RpcErrorBody::protocol(CODE_METHOD_NOT_FOUND, METHOD_NOT_FOUND),
            );
        };
        // Server-only methods are indistinguishable from absent ones
        // on the public transport.
        if registration.visibility == Visibility::ServerOnly && transport == Transport::Public {
            return RpcResponse::failure(
                req.id,
                RpcErrorBody::protocol(CODE_METHOD_NOT_FOUND, METHOD_NOT_FOUND),
            );
        }
        let tenant = match tenant {
            Some(t) if !t.trim().is_empty() => t.trim(),
            _ => {
                let err =
                    CapabilityError::invalid(format!("missing {TENANT_HEADER} header"));
                return RpcResponse::failure(req.id, RpcErrorBody::application(&err));
            }
        };
        let scope = Scope::new(tenant, registration.applet_id.clone());
        match registration.handler.handle(&scope, req.params).await {
            Ok(result) => RpcResponse::success(req.id, result),
            Err(err) => {
                // Full detail stays in the logs; the wire gets the
                // public message only.
                if err.is_not_found() {
                    debug!(%scope, method = %req.method, error = %err, "rpc not found");
                } else {
                    warn!(%scope, method = %req.method, error = %err, "rpc failed");
                }
                RpcResponse::failure(req.id, RpcErrorBody::application(&err))
            }
        }
    }

    /// Parses a raw body and dispatches it, element-wise for batches.
    pub async fn dispatch_body(
        &self,
        transport: Transport,
        tenant: Option<&str>,
        body: &[u8],
    ) -> (StatusCode, Value) {
        let parsed: Value = match serde_json::from_slice(body) {
            Ok(v) => v,
            Err(e) => {
                let resp = RpcResponse::failure(
                    Value::Null,
                    RpcErrorBody::protocol(CODE_PARSE_ERROR, format!("Parse error: {e}")),
                );
                return (StatusCode::BAD_REQUEST, to_value(resp));
            }
        };
        match parsed {
            Value::Array(envelopes) => {
                if envelopes.is_empty() {
                    let resp = RpcResponse::failure(
                        Value::Null,
                        RpcErrorBody::protocol(CODE_INVALID_REQUEST, "empty batch"),
                    );
                    return (StatusCode::BAD_REQUEST, to_value(resp));
                }
                let mut responses = Vec::with_capacity(envelopes.len());
                for envelope in envelopes {
                    responses.push(to_value(
                        self.dispatch_envelope(transport, tenant, envelope).await,
                    ));
                }
                (StatusCode::OK, Value::Array(responses))
            }
            single => {
                let resp = self.dispatch_envelope(transport, tenant, single).await;
                let status = match &resp.error {
                    Some(e) if e.code == crate::envelope::ErrorCode::Protocol(CODE_INVALID_REQUEST) => {
                        StatusCode::BAD_REQUEST
                    }
                    _ => StatusCode::OK,
                };
                (status, to_value(resp))
            }
        }
    }

    async fn dispatch_envelope(
        &self,
        transport: Transport,
        tenant: Option<&str>,
        envelope: Value,
    ) -> RpcResponse {
        // Preserve the caller's id even when the rest is malformed.
        let id = envelope.get("id").cloned().unwrap_or(Value::Null);
        match serde_json::from_value::<RpcRequest>(envelope) {
            Ok(req) => self.dispatch(transport, tenant, req).await,
            Err(e) => RpcResponse::failure(
                id,
                RpcErrorBody::protocol(CODE_INVALID_REQUEST, format!("Invalid Request: {e}")),
            ),
        }
    }

    async fn handle_http(&self, transport: Transport, headers: &HeaderMap, body: Body) -> Response {
        // Bounded read: the stream is abandoned as soon as the cap is
        // crossed, an oversized body is never buffered whole.
        let body = match axum::body::to_bytes(body, self.body_limit).await {
            Ok(bytes) => bytes,
            Err(_) => {
                let resp = RpcResponse::failure(
                    Value::Null,
                    RpcErrorBody::protocol(
                        CODE_INVALID_REQUEST,
                        format!("request body exceeds {} bytes", self.body_limit),
                    ),
                );
                return (StatusCode::PAYLOAD_TOO_LARGE, Json(resp)).into_response();
            }
        };
        let tenant = headers
            .get(TENANT_HEADER)
            .and_then(|v| v.to_str().ok());
        let (status, payload) = self.dispatch_body(transport, tenant, &body).await;
        (status, Json(payload)).into_response()
    }
}

fn to_value(resp: RpcResponse) -> Value {
    // RpcResponse serialization cannot fail, its fields are Values.
    serde_json::to_value(resp).unwrap_or(Value::Null)
}

async fn public_rpc(
    State(dispatcher): State<Arc<Dispatcher>>,
    headers: HeaderMap,
    body: Body,
) -> Response {
    dispatcher.handle_http(Transport::Public, &headers, body).await
}

async fn internal_rpc(
    State(dispatcher): State<Arc<Dispatcher>>,
    headers: HeaderMap,
    body: Body,
) -> Response {
    dispatcher.handle_http(Transport::Internal, &headers, body).await
}

/// Routes `/rpc` and `/internal/rpc` onto a shared dispatcher. The
/// dispatcher reads the body itself through its cap, so oversized
/// bodies are cut off mid-stream and still answer with an RPC error
/// envelope.
pub fn build_router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .route("/rpc", post(public_rpc))
        .route("/internal/rpc", post(internal_rpc))
        .with_state(dispatcher)
}

// ── Tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RpcHandler;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use cap_core::CapabilityResult;
    use serde_json::json;
    use tower::ServiceExt;

    struct Echo;

    #[async_trait]
    impl RpcHandler for Echo {
        async fn handle(&self, scope: &Scope, params: Value) -> CapabilityResult<Value> {
            Ok(json!({"tenant": scope.tenant_id, "applet": scope.applet_id, "params": params}))
        }
    }

    struct AlwaysMissing;

    #[async_trait]
    impl RpcHandler for AlwaysMissing {
        async fn handle(&self, _scope: &Scope, _params: Value) -> CapabilityResult<Value> {
            Err(CapabilityError::not_found("doc"))
        }
    }

    fn dispatcher() -> Arc<Dispatcher> {
        let mut registry = Registry::new();
        registry.register("crm", "echo", Arc::new(Echo)).unwrap();
        registry
            .register_server_only("crm", "kv.get", Arc::new(Echo))
            .unwrap();
        registry
            .register("crm", "missing", Arc::new(AlwaysMissing))
            .unwrap();
        Arc::new(Dispatcher::new(registry))
    }

    async fn call(router: Router, path: &str, tenant: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json");
        if let Some(t) = tenant {
            builder = builder.header(TENANT_HEADER, t);
        }
        let request = builder.body(Body::from(body.to_string())).unwrap();
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn public_call_round_trips() {
        let router = build_router(dispatcher());
        let (status, body) = call(
            router,
            "/rpc",
            Some("acme"),
            json!({"id": 1, "method": "crm.echo", "params": {"x": 1}}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"]["tenant"], json!("acme"));
        assert_eq!(body["result"]["applet"], json!("crm"));
        assert_eq!(body["result"]["params"], json!({"x": 1}));
    }

    #[tokio::test]
    async fn server_only_is_hidden_on_public_transport() {
        let router = build_router(dispatcher());
        let (status, body) = call(
            router.clone(),
            "/rpc",
            Some("acme"),
            json!({"id": 1, "method": "crm.kv.get", "params": {"key": "k"}}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["error"]["code"], json!(-32601));
        assert_eq!(body["error"]["message"], json!("Method not found"));

        // Identical shape to a genuinely unknown method.
        let (_, unknown) = call(
            router.clone(),
            "/rpc",
            Some("acme"),
            json!({"id": 1, "method": "crm.no.such", "params": {}}),
        )
        .await;
        assert_eq!(body["error"], unknown["error"]);

        // Internal transport reaches it.
        let (_, internal) = call(
            router,
            "/internal/rpc",
            Some("acme"),
            json!({"id": 1, "method": "crm.kv.get", "params": {}}),
        )
        .await;
        assert!(internal.get("result").is_some());
    }

    #[tokio::test]
    async fn missing_tenant_header_is_an_application_error() {
        let router = build_router(dispatcher());
        let (status, body) = call(
            router,
            "/rpc",
            None,
            json!({"id": 7, "method": "crm.echo", "params": {}}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], json!(7));
        assert_eq!(body["error"]["code"], json!("invalid"));
    }

    #[tokio::test]
    async fn application_not_found_is_http_200() {
        let router = build_router(dispatcher());
        let (status, body) = call(
            router,
            "/rpc",
            Some("acme"),
            json!({"id": 1, "method": "crm.missing", "params": {}}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["error"]["code"], json!("not_found"));
    }

    #[tokio::test]
    async fn batch_is_answered_element_wise() {
        let router = build_router(dispatcher());
        let (status, body) = call(
            router,
            "/rpc",
            Some("acme"),
            json!([
                {"id": 1, "method": "crm.echo", "params": 1},
                {"id": 2, "method": "crm.no.such", "params": null},
                {"id": 3, "params": "no method field"}
            ]),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let batch = body.as_array().unwrap();
        assert_eq!(batch.len(), 3);
        assert_eq!(batch[0]["result"]["params"], json!(1));
        assert_eq!(batch[1]["error"]["code"], json!(-32601));
        assert_eq!(batch[2]["id"], json!(3));
        assert_eq!(batch[2]["error"]["code"], json!(-32600));
    }

    #[tokio::test]
    async fn unparseable_body_is_400() {
        let router = build_router(dispatcher());
        let request = Request::builder()
            .method("POST")
            .uri("/rpc")
            .header(TENANT_HEADER, "acme")
            .body(Body::from("{not json"))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn non_envelope_json_is_400() {
        let router = build_router(dispatcher());
        let (status, body) = call(router, "/rpc", Some("acme"), json!("just a string")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], json!(-32600));
    }

    #[tokio::test]
    async fn oversized_body_is_413_with_envelope() {
        let mut registry = Registry::new();
        registry.register("crm", "echo", Arc::new(Echo)).unwrap();
        let dispatcher = Arc::new(Dispatcher::new(registry).with_body_limit(64));
        let router = build_router(dispatcher);
        let big = "x".repeat(128);
        let (status, body) = call(
            router,
            "/rpc",
            Some("acme"),
            json!({"id": 1, "method": "crm.echo", "params": big}),
        )
        .await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["error"]["code"], json!(-32600));
    }

    #[tokio::test]
    async fn oversized_stream_is_cut_off_at_the_cap() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        use futures::StreamExt;

        let mut registry = Registry::new();
        registry.register("crm", "echo", Arc::new(Echo)).unwrap();
        let dispatcher = Arc::new(Dispatcher::new(registry).with_body_limit(64));
        let router = build_router(dispatcher);

        // 4096 chunks of 1 KiB against a 64-byte cap. The counter shows
        // how much of the stream the server actually pulled.
        let consumed = Arc::new(AtomicUsize::new(0));
        let counter = consumed.clone();
        let chunks = futures::stream::iter(0..4096).map(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, std::io::Error>(axum::body::Bytes::from(vec![b'x'; 1024]))
        });

        let request = Request::builder()
            .method("POST")
            .uri("/rpc")
            .header(TENANT_HEADER, "acme")
            .body(Body::from_stream(chunks))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(
            consumed.load(Ordering::SeqCst) < 8,
            "server kept reading past the body cap"
        );
    }
}
