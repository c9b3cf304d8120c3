//! Blob + metadata orchestration.
//!
//! The blob is written first and the metadata row second, so a crash
//! between the two leaves an orphaned blob rather than a dangling row.
//! On a metadata failure the blob is rolled back best-effort.

use std::sync::Arc;

use cap_core::{CapabilityError, CapabilityResult, Scope, new_record_id};
use chrono::Utc;
use object_store::ObjectStore;
use object_store::path::Path as ObjectPath;
use tracing::{debug, warn};

use crate::meta::FileMetaStore;
use crate::sanitize::sanitize_name;
use crate::types::FileRecord;

pub struct FileStore {
    objects: Arc<dyn ObjectStore>,
    meta: Arc<dyn FileMetaStore>,
}

fn wrap(op: &str, err: object_store::Error) -> CapabilityError {
    CapabilityError::internal(format!("object store {op}: {err}"))
}

impl FileStore {
    pub fn new(objects: Arc<dyn ObjectStore>, meta: Arc<dyn FileMetaStore>) -> Self {
        Self { objects, meta }
    }

    /// Stores a blob under `{tenant}/{applet}/{id}/{name}` and records
    /// its metadata. The client-supplied name is reduced to a safe
    /// basename before it reaches the storage key.
    pub async fn store(
        &self,
        scope: &Scope,
        name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> CapabilityResult<FileRecord> {
        let name = sanitize_name(name)?;
        let id = new_record_id();
        let key = format!("{}/{}/{id}/{name}", scope.tenant_id, scope.applet_id);
        let location = ObjectPath::from(key.as_str());
        let size = bytes.len() as u64;

        self.objects
            .put(&location, bytes.into())
            .await
            .map_err(|e| wrap("put", e))?;

        let record = FileRecord {
            id,
            name,
            content_type: content_type.to_string(),
            size,
            path: key,
            created_at: Utc::now(),
        };
        if let Err(err) = self.meta.insert(scope, &record).await {
            // Roll the blob back so a failed store leaves nothing behind.
            if let Err(del_err) = self.objects.delete(&location).await {
                warn!(%scope, path = %record.path, error = %del_err,
                      "orphaned blob after metadata failure");
            }
            return Err(err);
        }
        debug!(%scope, id = %record.id, path = %record.path, size, "stored file");
        Ok(record)
    }

    /// Fetches file metadata. Absent ids are a NotFound error.
    pub async fn get(&self, scope: &Scope, id: &str) -> CapabilityResult<FileRecord> {
        self.meta.get(scope, id).await
    }

    /// Deletes the blob first, then the row. An already-absent blob is
    /// fine; any other object-store failure leaves the row in place so
    /// the file stays discoverable. Returns `false` for unknown ids.
    pub async fn delete(&self, scope: &Scope, id: &str) -> CapabilityResult<bool> {
        let record = match self.meta.get(scope, id).await {
            Ok(record) => record,
            Err(err) if err.is_not_found() => return Ok(false),
            Err(err) => return Err(err),
        };
        let location = ObjectPath::from(record.path.as_str());
        match self.objects.delete(&location).await {
            Ok(()) => {}
            Err(object_store::Error::NotFound { .. }) => {}
            Err(err) => return Err(wrap("delete", err)),
        }
        self.meta.delete(scope, id).await
    }
}

// ── Tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::MemoryFileMetaStore;
    use async_trait::async_trait;
    use object_store::local::LocalFileSystem;
    use object_store::memory::InMemory;

    fn memory_store() -> (FileStore, Arc<InMemory>) {
        let objects = Arc::new(InMemory::new());
        let store = FileStore::new(objects.clone(), Arc::new(MemoryFileMetaStore::new()));
        (store, objects)
    }

    fn scope() -> Scope {
        Scope::new("acme", "crm")
    }

    #[tokio::test]
    async fn store_then_get_metadata() {
        let (store, objects) = memory_store();
        let rec = store
            .store(&scope(), "report.pdf", "application/pdf", b"%PDF".to_vec())
            .await
            .unwrap();
        assert_eq!(rec.name, "report.pdf");
        assert_eq!(rec.size, 4);
        assert_eq!(rec.path, format!("acme/crm/{}/report.pdf", rec.id));
        assert_eq!(store.get(&scope(), &rec.id).await.unwrap(), rec);

        let blob = objects
            .get(&ObjectPath::from(rec.path.as_str()))
            .await
            .unwrap()
            .bytes()
            .await
            .unwrap();
        assert_eq!(blob.as_ref(), b"%PDF");
    }

    #[tokio::test]
    async fn traversal_names_are_confined_to_scope_prefix() {
        let (store, _) = memory_store();
        let rec = store
            .store(&scope(), "../../etc/passwd", "text/plain", b"x".to_vec())
            .await
            .unwrap();
        assert_eq!(rec.name, "passwd");
        assert_eq!(rec.path, format!("acme/crm/{}/passwd", rec.id));
        assert!(!rec.path.contains(".."));
    }

    async fn list_all(store: &dyn ObjectStore) -> Vec<object_store::ObjectMeta> {
        use futures::TryStreamExt;
        store.list(None).try_collect().await.unwrap()
    }

    #[tokio::test]
    async fn empty_basename_is_rejected_before_any_write() {
        let (store, objects) = memory_store();
        assert!(store.store(&scope(), "../..", "text/plain", vec![]).await.is_err());
        assert!(list_all(objects.as_ref()).await.is_empty());
    }

    #[tokio::test]
    async fn delete_removes_blob_and_row() {
        let (store, objects) = memory_store();
        let rec = store
            .store(&scope(), "a.txt", "text/plain", b"hi".to_vec())
            .await
            .unwrap();
        assert!(store.delete(&scope(), &rec.id).await.unwrap());
        assert!(!store.delete(&scope(), &rec.id).await.unwrap());
        assert!(matches!(
            objects.get(&ObjectPath::from(rec.path.as_str())).await,
            Err(object_store::Error::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn metadata_failure_rolls_back_blob() {
        struct FailingMeta;
        #[async_trait]
        impl FileMetaStore for FailingMeta {
            async fn insert(&self, _: &Scope, _: &FileRecord) -> CapabilityResult<()> {
                Err(CapabilityError::internal("row unavailable"))
            }
            async fn get(&self, _: &Scope, _: &str) -> CapabilityResult<FileRecord> {
                Err(CapabilityError::not_found("file"))
            }
            async fn delete(&self, _: &Scope, _: &str) -> CapabilityResult<bool> {
                Ok(false)
            }
        }

        let objects = Arc::new(InMemory::new());
        let store = FileStore::new(objects.clone(), Arc::new(FailingMeta));
        assert!(store
            .store(&scope(), "a.txt", "text/plain", b"hi".to_vec())
            .await
            .is_err());
        assert!(
            list_all(objects.as_ref()).await.is_empty(),
            "blob survived a failed store"
        );
    }

    #[tokio::test]
    async fn local_filesystem_backend_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let objects = Arc::new(LocalFileSystem::new_with_prefix(dir.path()).unwrap());
        let store = FileStore::new(objects, Arc::new(MemoryFileMetaStore::new()));
        let rec = store
            .store(&scope(), "notes.txt", "text/plain", b"local".to_vec())
            .await
            .unwrap();
        assert!(dir
            .path()
            .join("acme/crm")
            .join(&rec.id)
            .join("notes.txt")
            .exists());
    }
}
