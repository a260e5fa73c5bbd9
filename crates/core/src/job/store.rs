//! Job storage trait.

use thiserror::Error;

use super::types::{JobStatus, ScrapeJob};

/// Errors from job storage operations.
#[derive(Debug, Error)]
pub enum JobStoreError {
    #[error("job not found: {0}")]
    NotFound(i64),

    #[error("database error: {0}")]
    Database(String),
}

/// Request to create a new scrape job.
#[derive(Debug, Clone)]
pub struct CreateJobRequest {
    pub concurrency: usize,
    pub auto_upload: bool,
}

/// Trait for scrape-job storage backends.
pub trait JobStore: Send + Sync {
    /// Create a new job in `Pending` status.
    fn create(&self, request: CreateJobRequest) -> Result<ScrapeJob, JobStoreError>;

    /// Get a job by id.
    fn get(&self, id: i64) -> Result<Option<ScrapeJob>, JobStoreError>;

    /// Update a job's status.
    fn set_status(&self, id: i64, status: JobStatus) -> Result<(), JobStoreError>;

    /// Atomically add to the job's progress counters.
    fn increment_counters(&self, id: i64, events: u64, tickets: u64)
        -> Result<(), JobStoreError>;
}
