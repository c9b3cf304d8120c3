//! Postgres secret store. Rows hold ciphertext only; the master key
//! never leaves the process.

use async_trait::async_trait;
use cap_core::{CapabilityError, CapabilityResult};
use sqlx::PgPool;
use sqlx::Row;

use crate::cipher::SecretCipher;
use crate::store::SecretStore;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS applet_secrets (
    applet_name TEXT NOT NULL,
    name        TEXT NOT NULL,
    cipher_text TEXT NOT NULL,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (applet_name, name)
);
"#;

pub struct PostgresSecretStore {
    pool: PgPool,
    cipher: SecretCipher,
}

fn wrap(op: &str, err: sqlx::Error) -> CapabilityError {
    CapabilityError::internal(format!("postgres {op}: {err}"))
}

impl PostgresSecretStore {
    pub fn new(pool: PgPool, cipher: SecretCipher) -> Self {
        Self { pool, cipher }
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
impl SecretStore for PostgresSecretStore {
    async fn get(&self, applet: &str, name: &str) -> CapabilityResult<String> {
        let row = sqlx::query(
            "SELECT cipher_text FROM applet_secrets WHERE applet_name = $1 AND name = $2",
        )
        .bind(applet)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| wrap("get secret", e))?;
        let row = row
            .ok_or_else(|| CapabilityError::not_found(format!("secret {applet:?}/{name:?}")))?;
        let ciphertext: String = row.try_get("cipher_text").map_err(|e| wrap("get secret", e))?;
        self.cipher.decrypt(&ciphertext)
    }

    async fn set(&self, applet: &str, name: &str, plaintext: &str) -> CapabilityResult<()> {
        let ciphertext = self.cipher.encrypt(plaintext)?;
        sqlx::query(
            "INSERT INTO applet_secrets (applet_name, name, cipher_text) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (applet_name, name) \
             DO UPDATE SET cipher_text = EXCLUDED.cipher_text, updated_at = NOW()",
        )
        .bind(applet)
        .bind(name)
        .bind(ciphertext)
        .execute(&self.pool)
        .await
        .map_err(|e| wrap("set secret", e))?;
        Ok(())
    }

    async fn list(&self, applet: &str) -> CapabilityResult<Vec<String>> {
        let rows = sqlx::query("SELECT name FROM applet_secrets WHERE applet_name = $1 ORDER BY name")
            .bind(applet)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| wrap("list secrets", e))?;
        rows.into_iter()
            .map(|r| r.try_get::<String, _>("name").map_err(|e| wrap("list secrets", e)))
            .collect()
    }

    async fn delete(&self, applet: &str, name: &str) -> CapabilityResult<bool> {
        let result =
            sqlx::query("DELETE FROM applet_secrets WHERE applet_name = $1 AND name = $2")
                .bind(applet)
                .bind(name)
                .execute(&self.pool)
                .await
                .map_err(|e| wrap("delete secret", e))?;
        Ok(result.rows_affected() > 0)
    }
}
