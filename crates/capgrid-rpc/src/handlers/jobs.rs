//! `{applet}.jobs.{op}` handlers.

use std::sync::Arc;

use async_trait::async_trait;
use cap_core::{CapabilityResult, Scope};
use capgrid_jobs::JobStore;
use serde::Deserialize;
use serde_json::Value;

use super::{parse_params, to_json};
use crate::registry::{Registry, RegistryError, RpcHandler};

#[derive(Clone, Copy)]
enum JobsOp {
    Enqueue,
    Schedule,
    List,
    Cancel,
}

struct JobsMethod {
    store: Arc<dyn JobStore>,
    op: JobsOp,
}

#[derive(Deserialize)]
struct EnqueueParams {
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Deserialize)]
struct ScheduleParams {
    cron: String,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Deserialize)]
struct CancelParams {
    id: String,
}

#[async_trait]
impl RpcHandler for JobsMethod {
    async fn handle(&self, scope: &Scope, params: Value) -> CapabilityResult<Value> {
        match self.op {
            JobsOp::Enqueue => {
                let p: EnqueueParams = parse_params(params)?;
                to_json(&self.store.enqueue(scope, &p.method, p.params).await?)
            }
            JobsOp::Schedule => {
                let p: ScheduleParams = parse_params(params)?;
                to_json(&self.store.schedule(scope, &p.cron, &p.method, p.params).await?)
            }
            JobsOp::List => to_json(&self.store.list(scope).await?),
            JobsOp::Cancel => {
                let p: CancelParams = parse_params(params)?;
                Ok(Value::Bool(self.store.cancel(scope, &p.id).await?))
            }
        }
    }
}

pub fn register(
    registry: &mut Registry,
    applet: &str,
    store: Arc<dyn JobStore>,
) -> Result<(), RegistryError> {
    for (name, op) in [
        ("jobs.enqueue", JobsOp::Enqueue),
        ("jobs.schedule", JobsOp::Schedule),
        ("jobs.list", JobsOp::List),
        ("jobs.cancel", JobsOp::Cancel),
    ] {
        registry.register_server_only(
            applet,
            name,
            Arc::new(JobsMethod {
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
    use capgrid_jobs::MemoryJobStore;
    use serde_json::json;

    fn method(store: Arc<dyn JobStore>, op: JobsOp) -> JobsMethod {
        JobsMethod { store, op }
    }

    #[tokio::test]
    async fn enqueue_list_cancel_flow() {
        let store: Arc<dyn JobStore> = Arc::new(MemoryJobStore::new());
        let scope = Scope::new("acme", "crm");
        let job = method(store.clone(), JobsOp::Enqueue)
            .handle(&scope, json!({"method": "crm.reports.build", "params": {"month": 2}}))
            .await
            .unwrap();
        assert_eq!(job["status"], json!("queued"));
        assert_eq!(job["type"], json!("one_off"));

        let listed = method(store.clone(), JobsOp::List)
            .handle(&scope, Value::Null)
            .await
            .unwrap();
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let id = job["id"].as_str().unwrap();
        let canceled = method(store.clone(), JobsOp::Cancel)
            .handle(&scope, json!({"id": id}))
            .await
            .unwrap();
        assert_eq!(canceled, json!(true));
        let again = method(store, JobsOp::Cancel)
            .handle(&scope, json!({"id": id}))
            .await
            .unwrap();
        assert_eq!(again, json!(false));
    }

    #[tokio::test]
    async fn schedule_rejects_bad_cron() {
        let store: Arc<dyn JobStore> = Arc::new(MemoryJobStore::new());
        let err = method(store, JobsOp::Schedule)
            .handle(
                &Scope::new("acme", "crm"),
                json!({"cron": "not-a-cron", "method": "crm.tick", "params": null}),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid");
    }

    #[tokio::test]
    async fn schedule_reports_next_run() {
        let store: Arc<dyn JobStore> = Arc::new(MemoryJobStore::new());
        let job = method(store, JobsOp::Schedule)
            .handle(
                &Scope::new("acme", "crm"),
                json!({"cron": "*/5 * * * *", "method": "crm.tick", "params": null}),
            )
            .await
            .unwrap();
        assert_eq!(job["status"], json!("scheduled"));
        assert!(job.get("nextRunAt").is_some());
    }
}
