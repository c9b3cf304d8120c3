//! capgrid-db — the document store capability.
//!
//! Scoped JSON documents in named tables with a deliberately small
//! query algebra: equality predicates over dot-path fields, ordering by
//! `updatedAt`, and a result limit. Any other operator is rejected
//! before touching storage — a safety restriction, not an omission.
//!
//! Backends behind [`DocStore`]:
//!
//! - [`MemoryDocStore`] — reader/writer lock over a scope-partitioned
//!   map, for tests and development.
//! - [`PostgresDocStore`] — JSONB rows, single-statement mutations
//!   (`INSERT ... RETURNING`, `UPDATE ... RETURNING`).
//!
//! Both agree on absence: `get`/`patch`/`replace` of an id not in scope
//! is a `NotFound` error, never a null success.

pub mod memory;
pub mod postgres;
pub mod store;
pub mod types;

pub use memory::MemoryDocStore;
pub use postgres::PostgresDocStore;
pub use store::DocStore;
pub use types::{DocRecord, Order, QueryConstraint, QueryOptions};
