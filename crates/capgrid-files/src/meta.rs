//! File metadata store contract plus the in-memory backend.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use cap_core::{CapabilityError, CapabilityResult, Scope};
use chrono::Utc;

use crate::types::FileRecord;

/// Durable record of a stored blob. The blob itself lives in the
/// object store; this trait owns only the row.
#[async_trait]
pub trait FileMetaStore: Send + Sync {
    async fn insert(&self, scope: &Scope, record: &FileRecord) -> CapabilityResult<()>;

    async fn get(&self, scope: &Scope, id: &str) -> CapabilityResult<FileRecord>;

    /// Removes the row. Returns `false` when no row existed.
    async fn delete(&self, scope: &Scope, id: &str) -> CapabilityResult<bool>;
}

pub(crate) fn not_found(id: &str) -> CapabilityError {
    CapabilityError::not_found(format!("file {id:?}"))
}

/// In-memory metadata backend for tests and dev profiles.
#[derive(Default)]
pub struct MemoryFileMetaStore {
    records: RwLock<HashMap<Scope, HashMap<String, FileRecord>>>,
}

impl MemoryFileMetaStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FileMetaStore for MemoryFileMetaStore {
    async fn insert(&self, scope: &Scope, record: &FileRecord) -> CapabilityResult<()> {
        let mut records = self.records.write().unwrap();
        records
            .entry(scope.clone())
            .or_default()
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn get(&self, scope: &Scope, id: &str) -> CapabilityResult<FileRecord> {
        let records = self.records.read().unwrap();
        records
            .get(scope)
            .and_then(|m| m.get(id))
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    async fn delete(&self, scope: &Scope, id: &str) -> CapabilityResult<bool> {
        let mut records = self.records.write().unwrap();
        Ok(records
            .get_mut(scope)
            .and_then(|m| m.remove(id))
            .is_some())
    }
}

// ── Tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> FileRecord {
        FileRecord {
            id: id.to_string(),
            name: "report.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            size: 3,
            path: format!("acme/crm/{id}/report.pdf"),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn insert_get_round_trip() {
        let store = MemoryFileMetaStore::new();
        let scope = Scope::new("acme", "crm");
        let rec = record("f1");
        store.insert(&scope, &rec).await.unwrap();
        assert_eq!(store.get(&scope, "f1").await.unwrap(), rec);
    }

    #[tokio::test]
    async fn tenants_are_isolated() {
        let store = MemoryFileMetaStore::new();
        store.insert(&Scope::new("acme", "crm"), &record("f1")).await.unwrap();
        let err = store.get(&Scope::new("globex", "crm"), "f1").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = MemoryFileMetaStore::new();
        let scope = Scope::new("acme", "crm");
        store.insert(&scope, &record("f1")).await.unwrap();
        assert!(store.delete(&scope, "f1").await.unwrap());
        assert!(!store.delete(&scope, "f1").await.unwrap());
    }
}
