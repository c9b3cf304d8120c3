//! Job store contract.

use async_trait::async_trait;
use cap_core::{CapabilityResult, Scope};
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::types::JobRecord;

/// A due job handed to the poller. Carries its scope because the poller
/// claims across all tenants and applets.
#[derive(Debug, Clone)]
pub struct ClaimedJob {
    pub scope: Scope,
    pub record: JobRecord,
}

/// Outcome of a poller-driven run.
#[derive(Debug, Clone)]
pub enum JobOutcome {
    Completed,
    Failed { error: String },
}

/// Scoped job records plus the claim contract the external poller
/// consumes. This trait never executes jobs.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Create a one-off job (`status = queued`).
    async fn enqueue(&self, scope: &Scope, method: &str, params: Value)
    -> CapabilityResult<JobRecord>;

    /// Create a recurring job (`status = scheduled`) with `nextRunAt`
    /// computed from the cron expression relative to UTC-now. Invalid
    /// expressions are rejected here, before anything is stored.
    async fn schedule(
        &self,
        scope: &Scope,
        cron_expr: &str,
        method: &str,
        params: Value,
    ) -> CapabilityResult<JobRecord>;

    /// All jobs in scope, newest first.
    async fn list(&self, scope: &Scope) -> CapabilityResult<Vec<JobRecord>>;

    /// Idempotent cancel: flips status to `canceled` and clears
    /// `nextRunAt`. Unknown or already-canceled jobs return `false`,
    /// never an error.
    async fn cancel(&self, scope: &Scope, id: &str) -> CapabilityResult<bool>;

    /// Poller contract: atomically flip up to `limit` due jobs to
    /// `running` and return them. A one-off job is due while `queued`;
    /// a recurring job is due while `scheduled` with `nextRunAt <= now`.
    async fn claim_due(&self, now: DateTime<Utc>, limit: usize)
    -> CapabilityResult<Vec<ClaimedJob>>;

    /// Poller contract: record a run outcome. Recurring jobs pass the
    /// recomputed `next_run_at` and return to `scheduled`; one-off jobs
    /// become `completed`/`failed` terminally.
    async fn mark_run(
        &self,
        scope: &Scope,
        id: &str,
        outcome: JobOutcome,
        next_run_at: Option<DateTime<Utc>>,
    ) -> CapabilityResult<()>;
}
