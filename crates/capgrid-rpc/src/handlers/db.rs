//! `{applet}.db.{op}` handlers.

use std::sync::Arc;

use async_trait::async_trait;
use cap_core::{CapabilityResult, Scope};
use capgrid_db::{DocStore, QueryOptions};
use serde::Deserialize;
use serde_json::Value;

use super::{parse_params, to_json};
use crate::registry::{Registry, RegistryError, RpcHandler};

#[derive(Clone, Copy)]
enum DbOp {
    Get,
    Query,
    Insert,
    Patch,
    Replace,
    Delete,
}

struct DbMethod {
    store: Arc<dyn DocStore>,
    op: DbOp,
}

#[derive(Deserialize)]
struct IdParams {
    id: String,
}

#[derive(Deserialize)]
struct QueryParams {
    table: String,
    #[serde(default)]
    opts: Option<Value>,
}

#[derive(Deserialize)]
struct InsertParams {
    table: String,
    value: Value,
}

#[derive(Deserialize)]
struct UpdateParams {
    id: String,
    value: Value,
}

#[async_trait]
impl RpcHandler for DbMethod {
    async fn handle(&self, scope: &Scope, params: Value) -> CapabilityResult<Value> {
        match self.op {
            DbOp::Get => {
                let p: IdParams = parse_params(params)?;
                to_json(&self.store.get(scope, &p.id).await?)
            }
            DbOp::Query => {
                let p: QueryParams = parse_params(params)?;
                // Validation happens here, before the backend sees anything.
                let options = QueryOptions::from_value(p.opts.as_ref())?;
                to_json(&self.store.query(scope, &p.table, &options).await?)
            }
            DbOp::Insert => {
                let p: InsertParams = parse_params(params)?;
                to_json(&self.store.insert(scope, &p.table, p.value).await?)
            }
            DbOp::Patch => {
                let p: UpdateParams = parse_params(params)?;
                to_json(&self.store.patch(scope, &p.id, p.value).await?)
            }
            DbOp::Replace => {
                let p: UpdateParams = parse_params(params)?;
                to_json(&self.store.replace(scope, &p.id, p.value).await?)
            }
            DbOp::Delete => {
                let p: IdParams = parse_params(params)?;
                Ok(Value::Bool(self.store.delete(scope, &p.id).await?))
            }
        }
    }
}

pub fn register(
    registry: &mut Registry,
    applet: &str,
    store: Arc<dyn DocStore>,
) -> Result<(), RegistryError> {
    for (name, op) in [
        ("db.get", DbOp::Get),
        ("db.query", DbOp::Query),
        ("db.insert", DbOp::Insert),
        ("db.patch", DbOp::Patch),
        ("db.replace", DbOp::Replace),
        ("db.delete", DbOp::Delete),
    ] {
        registry.register_server_only(
            applet,
            name,
            Arc::new(DbMethod {
                store: store.clone(),
                op,
            }),
        )?;
    }
    Ok(())
}

// ── Tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use capgrid_db::MemoryDocStore;
    use serde_json::json;

    fn method(store: Arc<dyn DocStore>, op: DbOp) -> DbMethod {
        DbMethod { store, op }
    }

    #[tokio::test]
    async fn insert_then_query_by_nested_field() {
        let store: Arc<dyn DocStore> = Arc::new(MemoryDocStore::new());
        let scope = Scope::new("acme", "crm");
        method(store.clone(), DbOp::Insert)
            .handle(
                &scope,
                json!({"table": "messages", "value": {"text": "hello", "meta": {"lang": "en"}}}),
            )
            .await
            .unwrap();
        method(store.clone(), DbOp::Insert)
            .handle(&scope, json!({"table": "messages", "value": {"text": "other"}}))
            .await
            .unwrap();

        let result = method(store, DbOp::Query)
            .handle(
                &scope,
                json!({
                    "table": "messages",
                    "opts": {"filters": [{"field": "meta.lang", "op": "eq", "value": "en"}]}
                }),
            )
            .await
            .unwrap();
        let rows = result.as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["value"]["text"], json!("hello"));
    }

    #[tokio::test]
    async fn neq_is_rejected_before_the_store_runs() {
        let store: Arc<dyn DocStore> = Arc::new(MemoryDocStore::new());
        let err = method(store, DbOp::Query)
            .handle(
                &Scope::new("acme", "crm"),
                json!({
                    "table": "messages",
                    "opts": {"filters": [{"field": "text", "op": "neq", "value": "hello"}]}
                }),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid");
    }

    #[tokio::test]
    async fn record_shape_is_camel_case_on_the_wire() {
        let store: Arc<dyn DocStore> = Arc::new(MemoryDocStore::new());
        let record = method(store, DbOp::Insert)
            .handle(
                &Scope::new("acme", "crm"),
                json!({"table": "messages", "value": {"text": "hi"}}),
            )
            .await
            .unwrap();
        assert!(record.get("createdAt").is_some());
        assert!(record.get("updatedAt").is_some());
        assert_eq!(record["table"], json!("messages"));
    }
}
