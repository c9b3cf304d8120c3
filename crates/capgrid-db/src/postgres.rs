//! Postgres document store.
//!
//! Documents live in one JSONB-valued table with explicit scope
//! columns; every statement carries the scope in its predicate, so a
//! record can never be read or mutated from outside its scope. All
//! mutations are single statements (`INSERT ... RETURNING`,
//! `UPDATE ... RETURNING`) — no cross-statement transactions.

use async_trait::async_trait;
use cap_core::{CapabilityError, CapabilityResult, Scope, json_path};
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};
use tracing::debug;

use crate::store::DocStore;
use crate::types::{DocRecord, Order, QueryOptions};

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS applet_documents (
    id         TEXT PRIMARY KEY,
    tenant_id  TEXT NOT NULL,
    applet_id  TEXT NOT NULL,
    table_name TEXT NOT NULL,
    value      JSONB NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_applet_documents_scope_table
    ON applet_documents (tenant_id, applet_id, table_name, updated_at);
"#;

/// Postgres-backed document store.
///
/// Consumes an already-initialized [`PgPool`] owned by the host
/// application.
#[derive(Clone)]
pub struct PostgresDocStore {
    pool: PgPool,
}

struct DocRow(DocRecord);

impl FromRow<'_, PgRow> for DocRow {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(DocRow(DocRecord {
            id: row.try_get("id")?,
            table: row.try_get("table_name")?,
            value: row.try_get("value")?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
        }))
    }
}

fn wrap(op: &str, err: sqlx::Error) -> CapabilityError {
    CapabilityError::internal(format!("postgres {op}: {err}"))
}

/// Text rendering a constraint value the way `#>>` renders JSONB leaves.
/// Validation only admits scalars here, where the renderings agree.
fn constraint_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl PostgresDocStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the backing table and index if absent.
    pub async fn ensure_schema(&self) -> CapabilityResult<()> {
        sqlx::raw_sql(SCHEMA_SQL)
            .execute(&self.pool)
            .await
            .map_err(|e| wrap("ensure schema", e))?;
        Ok(())
    }

    async fn update_returning(
        &self,
        scope: &Scope,
        id: &str,
        value_expr: &str,
        value: Value,
    ) -> CapabilityResult<DocRecord> {
        let sql = format!(
            "UPDATE applet_documents \
             SET value = {value_expr}, updated_at = NOW() \
             WHERE tenant_id = $1 AND applet_id = $2 AND id = $3 \
             RETURNING id, table_name, value, created_at, updated_at"
        );
        let row: Option<DocRow> = sqlx::query_as(&sql)
            .bind(&scope.tenant_id)
            .bind(&scope.applet_id)
            .bind(id)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| wrap("update document", e))?;
        row.map(|r| r.0)
            .ok_or_else(|| CapabilityError::not_found(format!("document {id:?}")))
    }
}

#[async_trait]
impl DocStore for PostgresDocStore {
    async fn get(&self, scope: &Scope, id: &str) -> CapabilityResult<DocRecord> {
        let row: Option<DocRow> = sqlx::query_as(
            "SELECT id, table_name, value, created_at, updated_at \
             FROM applet_documents \
             WHERE tenant_id = $1 AND applet_id = $2 AND id = $3",
        )
        .bind(&scope.tenant_id)
        .bind(&scope.applet_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| wrap("get document", e))?;
        row.map(|r| r.0)
            .ok_or_else(|| CapabilityError::not_found(format!("document {id:?}")))
    }

    async fn query(
        &self,
        scope: &Scope,
        table: &str,
        options: &QueryOptions,
    ) -> CapabilityResult<Vec<DocRecord>> {
        // Reject unsupported operators before any I/O.
        options.validate()?;

        let mut sql = String::from(
            "SELECT id, table_name, value, created_at, updated_at \
             FROM applet_documents \
             WHERE tenant_id = $1 AND applet_id = $2 AND table_name = $3",
        );
        // Each constraint becomes a bound JSONB path extraction; the
        // path segments travel as a text[] parameter, never interpolated.
        let mut paths: Vec<Vec<String>> = Vec::new();
        let mut texts: Vec<String> = Vec::new();
        let mut arg = 4;
        for constraint in options.constraints() {
            sql.push_str(&format!(" AND value #>> ${arg}::text[] = ${}", arg + 1));
            paths.push(
                json_path::segments(&constraint.field)
                    .map(str::to_string)
                    .collect(),
            );
            texts.push(constraint_text(&constraint.value));
            arg += 2;
        }
        sql.push_str(match options.order {
            Order::Asc => " ORDER BY updated_at ASC",
            Order::Desc => " ORDER BY updated_at DESC",
        });
        if let Some(limit) = options.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        let mut query = sqlx::query_as::<_, DocRow>(&sql)
            .bind(&scope.tenant_id)
            .bind(&scope.applet_id)
            .bind(table);
        for (path, text) in paths.into_iter().zip(texts) {
            query = query.bind(path).bind(text);
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| wrap("query documents", e))?;
        debug!(%scope, table, hits = rows.len(), "document query");
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    async fn insert(
        &self,
        scope: &Scope,
        table: &str,
        value: Value,
    ) -> CapabilityResult<DocRecord> {
        let row: DocRow = sqlx::query_as(
            "INSERT INTO applet_documents \
                 (id, tenant_id, applet_id, table_name, value, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, NOW(), NOW()) \
             RETURNING id, table_name, value, created_at, updated_at",
        )
        .bind(cap_core::new_record_id())
        .bind(&scope.tenant_id)
        .bind(&scope.applet_id)
        .bind(table)
        .bind(value)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| wrap("insert document", e))?;
        Ok(row.0)
    }

    async fn patch(&self, scope: &Scope, id: &str, value: Value) -> CapabilityResult<DocRecord> {
        // Shallow object merge in a single statement; non-objects replace.
        self.update_returning(
            scope,
            id,
            "CASE WHEN jsonb_typeof(value) = 'object' AND jsonb_typeof($4::jsonb) = 'object' \
                  THEN value || $4::jsonb ELSE $4::jsonb END",
            value,
        )
        .await
    }

    async fn replace(&self, scope: &Scope, id: &str, value: Value) -> CapabilityResult<DocRecord> {
        self.update_returning(scope, id, "$4::jsonb", value).await
    }

    async fn delete(&self, scope: &Scope, id: &str) -> CapabilityResult<bool> {
        let result = sqlx::query(
            "DELETE FROM applet_documents \
             WHERE tenant_id = $1 AND applet_id = $2 AND id = $3",
        )
        .bind(&scope.tenant_id)
        .bind(&scope.applet_id)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| wrap("delete document", e))?;
        Ok(result.rows_affected() > 0)
    }
}
