//! capgrid-files — scoped blob storage for applets.
//!
//! Blobs live in an [`object_store::ObjectStore`] (memory, local
//! filesystem, or S3, constructed by the host); metadata rows live in
//! a [`meta::FileMetaStore`]. [`FileStore`] ties the two together and
//! owns the write/rollback ordering between them.

pub mod meta;
pub mod postgres;
pub mod sanitize;
pub mod store;
pub mod types;

pub use meta::{FileMetaStore, MemoryFileMetaStore};
pub use postgres::PostgresFileMetaStore;
pub use store::FileStore;
pub use types::FileRecord;
