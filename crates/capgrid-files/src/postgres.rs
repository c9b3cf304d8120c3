//! Postgres file metadata backend.

use async_trait::async_trait;
use cap_core::{CapabilityError, CapabilityResult, Scope};
use sqlx::PgPool;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};

use crate::meta::{FileMetaStore, not_found};
use crate::types::FileRecord;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS applet_files (
    id           TEXT PRIMARY KEY,
    tenant_id    TEXT NOT NULL,
    applet_id    TEXT NOT NULL,
    name         TEXT NOT NULL,
    content_type TEXT NOT NULL,
    size_bytes   BIGINT NOT NULL,
    storage_path TEXT NOT NULL,
    created_at   TIMESTAMPTZ NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_applet_files_scope
    ON applet_files (tenant_id, applet_id);
"#;

pub struct PostgresFileMetaStore {
    pool: PgPool,
}

struct FileRow(FileRecord);

impl FromRow<'_, PgRow> for FileRow {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(FileRow(FileRecord {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            content_type: row.try_get("content_type")?,
            size: row.try_get::<i64, _>("size_bytes")? as u64,
            path: row.try_get("storage_path")?,
            created_at: row.try_get("created_at")?,
        }))
    }
}

fn wrap(op: &str, err: sqlx::Error) -> CapabilityError {
    CapabilityError::internal(format!("postgres {op}: {err}"))
}

impl PostgresFileMetaStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(&self) -> CapabilityResult<()> {
        sqlx::raw_sql(SCHEMA_SQL)
            .execute(&self.pool)
            .await
            .map_err(|e| wrap("ensure schema", e))?;
        Ok(())
    }
}

#[async_trait]
impl FileMetaStore for PostgresFileMetaStore {
    async fn insert(&self, scope: &Scope, record: &FileRecord) -> CapabilityResult<()> {
        sqlx::query(
            "INSERT INTO applet_files \
                 (id, tenant_id, applet_id, name, content_type, size_bytes, storage_path, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(&record.id)
        .bind(&scope.tenant_id)
        .bind(&scope.applet_id)
        .bind(&record.name)
        .bind(&record.content_type)
        .bind(record.size as i64)
        .bind(&record.path)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| wrap("insert file", e))?;
        Ok(())
    }

    async fn get(&self, scope: &Scope, id: &str) -> CapabilityResult<FileRecord> {
        let row: Option<FileRow> = sqlx::query_as(
            "SELECT id, name, content_type, size_bytes, storage_path, created_at \
             FROM applet_files \
             WHERE tenant_id = $1 AND applet_id = $2 AND id = $3",
        )
        .bind(&scope.tenant_id)
        .bind(&scope.applet_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| wrap("get file", e))?;
        row.map(|r| r.0).ok_or_else(|| not_found(id))
    }

    async fn delete(&self, scope: &Scope, id: &str) -> CapabilityResult<bool> {
        let result = sqlx::query(
            "DELETE FROM applet_files WHERE tenant_id = $1 AND applet_id = $2 AND id = $3",
        )
        .bind(&scope.tenant_id)
        .bind(&scope.applet_id)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| wrap("delete file", e))?;
        Ok(result.rows_affected() > 0)
    }
}
