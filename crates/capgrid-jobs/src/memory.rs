//! In-memory job store for tests and development.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use cap_core::{CapabilityError, CapabilityResult, Scope};
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::cron_expr;
use crate::store::{ClaimedJob, JobOutcome, JobStore};
use crate::types::{JobRecord, JobStatus, JobType};

/// Reader/writer lock over a scope-partitioned map of job records.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<Scope, HashMap<String, JobRecord>>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn save(&self, scope: &Scope, record: JobRecord) {
        self.jobs
            .write()
            .expect("jobs lock poisoned")
            .entry(scope.clone())
            .or_default()
            .insert(record.id.clone(), record);
    }
}

fn new_record(
    job_type: JobType,
    cron: Option<String>,
    method: &str,
    params: Value,
    status: JobStatus,
) -> JobRecord {
    let now = Utc::now();
    JobRecord {
        id: cap_core::new_record_id(),
        job_type,
        cron,
        method: method.to_string(),
        params,
        status,
        next_run_at: None,
        last_run_at: None,
        last_status: None,
        last_error: None,
        created_at: now,
        updated_at: now,
    }
}

fn due(record: &JobRecord, now: DateTime<Utc>) -> bool {
    match record.job_type {
        JobType::OneOff => record.status == JobStatus::Queued,
        JobType::Scheduled => {
            record.status == JobStatus::Scheduled
                && record.next_run_at.is_some_and(|at| at <= now)
        }
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn enqueue(
        &self,
        scope: &Scope,
        method: &str,
        params: Value,
    ) -> CapabilityResult<JobRecord> {
        let record = new_record(JobType::OneOff, None, method, params, JobStatus::Queued);
        self.save(scope, record.clone());
        Ok(record)
    }

    async fn schedule(
        &self,
        scope: &Scope,
        cron: &str,
        method: &str,
        params: Value,
    ) -> CapabilityResult<JobRecord> {
        let next = cron_expr::next_run(cron, Utc::now())?;
        let mut record = new_record(
            JobType::Scheduled,
            Some(cron.to_string()),
            method,
            params,
            JobStatus::Scheduled,
        );
        record.next_run_at = Some(next);
        self.save(scope, record.clone());
        Ok(record)
    }

    async fn list(&self, scope: &Scope) -> CapabilityResult<Vec<JobRecord>> {
        let jobs = self.jobs.read().expect("jobs lock poisoned");
        let mut records: Vec<JobRecord> = jobs
            .get(scope)
            .map(|scoped| scoped.values().cloned().collect())
            .unwrap_or_default();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn cancel(&self, scope: &Scope, id: &str) -> CapabilityResult<bool> {
        let mut jobs = self.jobs.write().expect("jobs lock poisoned");
        let Some(record) = jobs.get_mut(scope).and_then(|scoped| scoped.get_mut(id)) else {
            return Ok(false);
        };
        if record.status == JobStatus::Canceled {
            return Ok(false);
        }
        record.status = JobStatus::Canceled;
        record.next_run_at = None;
        record.updated_at = Utc::now();
        Ok(true)
    }

    async fn claim_due(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> CapabilityResult<Vec<ClaimedJob>> {
        let mut jobs = self.jobs.write().expect("jobs lock poisoned");
        let mut claimed = Vec::new();
        for (scope, scoped) in jobs.iter_mut() {
            for record in scoped.values_mut() {
                if claimed.len() >= limit {
                    return Ok(claimed);
                }
                if due(record, now) {
                    record.status = JobStatus::Running;
                    record.last_status = Some(JobStatus::Running);
                    record.last_error = None;
                    record.updated_at = now;
                    claimed.push(ClaimedJob {
                        scope: scope.clone(),
                        record: record.clone(),
                    });
                }
            }
        }
        Ok(claimed)
    }

    async fn mark_run(
        &self,
        scope: &Scope,
        id: &str,
        outcome: JobOutcome,
        next_run_at: Option<DateTime<Utc>>,
    ) -> CapabilityResult<()> {
        let mut jobs = self.jobs.write().expect("jobs lock poisoned");
        let record = jobs
            .get_mut(scope)
            .and_then(|scoped| scoped.get_mut(id))
            .ok_or_else(|| CapabilityError::not_found(format!("job {id:?}")))?;
        let now = Utc::now();
        let (last_status, last_error) = match outcome {
            JobOutcome::Completed => (JobStatus::Completed, None),
            JobOutcome::Failed { error } => (JobStatus::Failed, Some(error)),
        };
        record.status = match record.job_type {
            // Recurring jobs go back to waiting for their next slot.
            JobType::Scheduled if next_run_at.is_some() => JobStatus::Scheduled,
            _ => last_status,
        };
        record.next_run_at = next_run_at;
        record.last_run_at = Some(now);
        record.last_status = Some(last_status);
        record.last_error = last_error;
        record.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scope(tenant: &str) -> Scope {
        Scope::new(tenant, "bichat")
    }

    #[tokio::test]
    async fn enqueue_list_cancel_end_to_end() {
        let store = MemoryJobStore::new();
        let s = scope("t1");
        let job = store
            .enqueue(&s, "bichat.digest.send", json!({"hour": 9}))
            .await
            .unwrap();

        let listed = store.list(&s).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].status, JobStatus::Queued);
        assert_eq!(listed[0].params, json!({"hour": 9}));

        assert!(store.cancel(&s, &job.id).await.unwrap());
        assert_eq!(store.list(&s).await.unwrap()[0].status, JobStatus::Canceled);
        // Second cancel reports false, not an error.
        assert!(!store.cancel(&s, &job.id).await.unwrap());
    }

    #[tokio::test]
    async fn cancel_unknown_job_is_false() {
        let store = MemoryJobStore::new();
        assert!(!store.cancel(&scope("t1"), "ghost").await.unwrap());
    }

    #[tokio::test]
    async fn schedule_computes_next_run_and_rejects_garbage() {
        let store = MemoryJobStore::new();
        let s = scope("t1");
        let before = Utc::now();
        let job = store
            .schedule(&s, "*/5 * * * *", "bichat.digest.send", json!(null))
            .await
            .unwrap();
        assert_eq!(job.status, JobStatus::Scheduled);
        let next = job.next_run_at.unwrap();
        assert!(next > before);
        assert_eq!(next.timestamp() % 300, 0);

        let err = store
            .schedule(&s, "not-a-cron", "m", json!(null))
            .await
            .unwrap_err();
        assert!(matches!(err, CapabilityError::Invalid(_)));
        // Nothing was stored for the rejected expression.
        assert_eq!(store.list(&s).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn list_is_newest_first_and_tenant_isolated() {
        let store = MemoryJobStore::new();
        let a = scope("tenant-a");
        let b = scope("tenant-b");
        store.enqueue(&a, "first", json!(null)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        store.enqueue(&a, "second", json!(null)).await.unwrap();
        store.enqueue(&b, "other", json!(null)).await.unwrap();

        let jobs = store.list(&a).await.unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].method, "second");
        assert_eq!(store.list(&b).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn claim_skips_canceled_and_undue_jobs() {
        let store = MemoryJobStore::new();
        let s = scope("t1");
        let queued = store.enqueue(&s, "run-me", json!(null)).await.unwrap();
        let canceled = store.enqueue(&s, "skip-me", json!(null)).await.unwrap();
        store.cancel(&s, &canceled.id).await.unwrap();
        // Recurring job whose next slot is in the future.
        store
            .schedule(&s, "0 0 * * *", "later", json!(null))
            .await
            .unwrap();

        let claimed = store.claim_due(Utc::now(), 16).await.unwrap();
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].record.id, queued.id);
        assert_eq!(claimed[0].record.status, JobStatus::Running);

        // Claiming again finds nothing: the job is running now.
        assert!(store.claim_due(Utc::now(), 16).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn mark_run_reschedules_recurring_and_finishes_one_off() {
        let store = MemoryJobStore::new();
        let s = scope("t1");
        let one_off = store.enqueue(&s, "once", json!(null)).await.unwrap();
        store
            .mark_run(&s, &one_off.id, JobOutcome::Completed, None)
            .await
            .unwrap();
        let jobs = store.list(&s).await.unwrap();
        assert_eq!(jobs[0].status, JobStatus::Completed);
        assert!(jobs[0].last_run_at.is_some());

        let recurring = store
            .schedule(&s, "*/5 * * * *", "again", json!(null))
            .await
            .unwrap();
        let next = cron_expr::next_run("*/5 * * * *", Utc::now()).unwrap();
        store
            .mark_run(
                &s,
                &recurring.id,
                JobOutcome::Failed {
                    error: "boom".into(),
                },
                Some(next),
            )
            .await
            .unwrap();
        let record = store
            .list(&s)
            .await
            .unwrap()
            .into_iter()
            .find(|j| j.id == recurring.id)
            .unwrap();
        assert_eq!(record.status, JobStatus::Scheduled);
        assert_eq!(record.last_status, Some(JobStatus::Failed));
        assert_eq!(record.last_error.as_deref(), Some("boom"));
        assert_eq!(record.next_run_at, Some(next));
    }
}
