//! capgrid-jobs — job scheduling records for applets.
//!
//! This capability owns record state and `nextRunAt` arithmetic only.
//! It never executes anything: an external poller claims due jobs via
//! [`JobStore::claim_due`] and invokes the target RPC method itself,
//! reporting outcomes back through [`JobStore::mark_run`].
//!
//! Cron arithmetic is the pure function [`cron_expr::next_run`]:
//! standard 5-field expressions plus `@hourly`-style descriptors,
//! evaluated against UTC.

pub mod cron_expr;
pub mod memory;
pub mod postgres;
pub mod store;
pub mod types;

pub use memory::MemoryJobStore;
pub use postgres::PostgresJobStore;
pub use store::{ClaimedJob, JobOutcome, JobStore};
pub use types::{JobRecord, JobStatus, JobType};
