//! capgrid-kv — scoped key-value storage for applets.
//!
//! Two interchangeable backends behind [`KvStore`]:
//!
//! - [`MemoryKvStore`] for tests and development, keyed by
//!   `(Scope, key)` with lazy TTL expiry on read.
//! - [`RedisKvStore`] for production, namespacing keys as
//!   `applet:{tenant}:{applet}:{key}` with native `EX` expiry.
//!
//! Absent (or expired) keys surface as `NotFound` from `get`; `mget` is
//! the one deliberately sparse lookup and returns positional `None`s.

pub mod memory;
pub mod redis_store;
pub mod store;

pub use memory::MemoryKvStore;
pub use redis_store::RedisKvStore;
pub use store::KvStore;
