//! Postgres job store.
//!
//! Claiming uses `FOR UPDATE SKIP LOCKED` inside a single
//! statement so concurrent pollers never hand the same job out twice.

use async_trait::async_trait;
use cap_core::{CapabilityError, CapabilityResult, Scope};
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};
use tracing::debug;

use crate::cron_expr;
use crate::store::{ClaimedJob, JobOutcome, JobStore};
use crate::types::{JobRecord, JobStatus, JobType};

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS applet_jobs (
    id          TEXT PRIMARY KEY,
    tenant_id   TEXT NOT NULL,
    applet_id   TEXT NOT NULL,
    job_type    TEXT NOT NULL,
    cron_expr   TEXT,
    method      TEXT NOT NULL,
    params      JSONB NOT NULL,
    status      TEXT NOT NULL,
    next_run_at TIMESTAMPTZ,
    last_run_at TIMESTAMPTZ,
    last_status TEXT,
    last_error  TEXT,
    created_at  TIMESTAMPTZ NOT NULL,
    updated_at  TIMESTAMPTZ NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_applet_jobs_due
    ON applet_jobs (status, next_run_at, created_at);
CREATE INDEX IF NOT EXISTS idx_applet_jobs_scope
    ON applet_jobs (tenant_id, applet_id, created_at);
"#;

const RECORD_COLUMNS: &str = "id, tenant_id, applet_id, job_type, cron_expr, method, params, \
     status, next_run_at, last_run_at, last_status, last_error, created_at, updated_at";

/// Postgres-backed job store. Consumes a host-owned [`PgPool`].
#[derive(Clone)]
pub struct PostgresJobStore {
    pool: PgPool,
}

struct JobRow {
    scope: Scope,
    record: JobRecord,
}

fn decode_err(what: &str, detail: String) -> sqlx::Error {
    sqlx::Error::Decode(format!("{what}: {detail}").into())
}

impl FromRow<'_, PgRow> for JobRow {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        let job_type: String = row.try_get("job_type")?;
        let status: String = row.try_get("status")?;
        let last_status: Option<String> = row.try_get("last_status")?;
        Ok(JobRow {
            scope: Scope::new(
                row.try_get::<String, _>("tenant_id")?,
                row.try_get::<String, _>("applet_id")?,
            ),
            record: JobRecord {
                id: row.try_get("id")?,
                job_type: job_type
                    .parse::<JobType>()
                    .map_err(|e| decode_err("job_type", e))?,
                cron: row.try_get("cron_expr")?,
                method: row.try_get("method")?,
                params: row.try_get("params")?,
                status: status
                    .parse::<JobStatus>()
                    .map_err(|e| decode_err("status", e))?,
                next_run_at: row.try_get("next_run_at")?,
                last_run_at: row.try_get("last_run_at")?,
                last_status: last_status
                    .map(|s| s.parse::<JobStatus>())
                    .transpose()
                    .map_err(|e| decode_err("last_status", e))?,
                last_error: row.try_get("last_error")?,
                created_at: row.try_get("created_at")?,
                updated_at: row.try_get("updated_at")?,
            },
        })
    }
}

fn wrap(op: &str, err: sqlx::Error) -> CapabilityError {
    CapabilityError::internal(format!("postgres {op}: {err}"))
}

impl PostgresJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the backing table and indexes if absent.
    pub async fn ensure_schema(&self) -> CapabilityResult<()> {
        sqlx::raw_sql(SCHEMA_SQL)
            .execute(&self.pool)
            .await
            .map_err(|e| wrap("ensure schema", e))?;
        Ok(())
    }

    async fn insert(
        &self,
        scope: &Scope,
        job_type: JobType,
        cron: Option<&str>,
        method: &str,
        params: Value,
        status: JobStatus,
        next_run_at: Option<DateTime<Utc>>,
    ) -> CapabilityResult<JobRecord> {
        let sql = format!(
            "INSERT INTO applet_jobs \
                 (id, tenant_id, applet_id, job_type, cron_expr, method, params, status, \
                  next_run_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW(), NOW()) \
             RETURNING {RECORD_COLUMNS}"
        );
        let row: JobRow = sqlx::query_as(&sql)
            .bind(cap_core::new_record_id())
            .bind(&scope.tenant_id)
            .bind(&scope.applet_id)
            .bind(job_type.as_str())
            .bind(cron)
            .bind(method)
            .bind(params)
            .bind(status.as_str())
            .bind(next_run_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| wrap("insert job", e))?;
        Ok(row.record)
    }
}

#[async_trait]
impl JobStore for PostgresJobStore {
    async fn enqueue(
        &self,
        scope: &Scope,
        method: &str,
        params: Value,
    ) -> CapabilityResult<JobRecord> {
        self.insert(
            scope,
            JobType::OneOff,
            None,
            method,
            params,
            JobStatus::Queued,
            None,
        )
        .await
    }

    async fn schedule(
        &self,
        scope: &Scope,
        cron: &str,
        method: &str,
        params: Value,
    ) -> CapabilityResult<JobRecord> {
        // Validate the expression before touching the database.
        let next = cron_expr::next_run(cron, Utc::now())?;
        self.insert(
            scope,
            JobType::Scheduled,
            Some(cron),
            method,
            params,
            JobStatus::Scheduled,
            Some(next),
        )
        .await
    }

    async fn list(&self, scope: &Scope) -> CapabilityResult<Vec<JobRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM applet_jobs \
             WHERE tenant_id = $1 AND applet_id = $2 \
             ORDER BY created_at DESC"
        );
        let rows: Vec<JobRow> = sqlx::query_as(&sql)
            .bind(&scope.tenant_id)
            .bind(&scope.applet_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| wrap("list jobs", e))?;
        Ok(rows.into_iter().map(|r| r.record).collect())
    }

    async fn cancel(&self, scope: &Scope, id: &str) -> CapabilityResult<bool> {
        let result = sqlx::query(
            "UPDATE applet_jobs \
             SET status = 'canceled', next_run_at = NULL, updated_at = NOW() \
             WHERE tenant_id = $1 AND applet_id = $2 AND id = $3 AND status <> 'canceled'",
        )
        .bind(&scope.tenant_id)
        .bind(&scope.applet_id)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| wrap("cancel job", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn claim_due(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> CapabilityResult<Vec<ClaimedJob>> {
        let sql = format!(
            "WITH due AS ( \
                 SELECT id FROM applet_jobs \
                 WHERE (status = 'queued' AND job_type = 'one_off') \
                    OR (status = 'scheduled' AND job_type = 'scheduled' \
                        AND next_run_at IS NOT NULL AND next_run_at <= $1) \
                 ORDER BY created_at \
                 LIMIT $2 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             UPDATE applet_jobs j \
             SET status = 'running', last_status = 'running', last_error = NULL, \
                 updated_at = NOW() \
             FROM due WHERE j.id = due.id \
             RETURNING {RECORD_COLUMNS}"
        );
        let rows: Vec<JobRow> = sqlx::query_as(&sql)
            .bind(now)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| wrap("claim due jobs", e))?;
        debug!(claimed = rows.len(), "claimed due jobs");
        Ok(rows
            .into_iter()
            .map(|r| ClaimedJob {
                scope: r.scope,
                record: r.record,
            })
            .collect())
    }

    async fn mark_run(
        &self,
        scope: &Scope,
        id: &str,
        outcome: JobOutcome,
        next_run_at: Option<DateTime<Utc>>,
    ) -> CapabilityResult<()> {
        let (last_status, last_error) = match &outcome {
            JobOutcome::Completed => (JobStatus::Completed, None),
            JobOutcome::Failed { error } => (JobStatus::Failed, Some(error.as_str())),
        };
        let result = sqlx::query(
            "UPDATE applet_jobs \
             SET status = CASE \
                     WHEN job_type = 'scheduled' AND $4::timestamptz IS NOT NULL \
                     THEN 'scheduled' ELSE $5 END, \
                 next_run_at = $4, \
                 last_run_at = NOW(), \
                 last_status = $5, \
                 last_error = $6, \
                 updated_at = NOW() \
             WHERE tenant_id = $1 AND applet_id = $2 AND id = $3",
        )
        .bind(&scope.tenant_id)
        .bind(&scope.applet_id)
        .bind(id)
        .bind(next_run_at)
        .bind(last_status.as_str())
        .bind(last_error)
        .execute(&self.pool)
        .await
        .map_err(|e| wrap("mark job run", e))?;
        if result.rows_affected() == 0 {
            return Err(CapabilityError::not_found(format!("job {id:?}")));
        }
        Ok(())
    }
}
