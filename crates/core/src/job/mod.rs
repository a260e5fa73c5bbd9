//! Scrape jobs and their storage.
//!
//! A [`ScrapeJob`] is created per run and carries the run's concurrency
//! limit, upload flag and progress counters. The persisted `Stopped` status
//! doubles as the external cancellation signal for a running scrape.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteJobStore;
pub use store::{CreateJobRequest, JobStore, JobStoreError};
pub use types::{JobStatus, ScrapeJob};
