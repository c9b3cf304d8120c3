use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// File metadata as surfaced to applets. `path` is the storage key
/// inside the object store, always under the owning scope's prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: String,
    pub name: String,
    pub content_type: String,
    pub size: u64,
    pub path: String,
    pub created_at: DateTime<Utc>,
}
