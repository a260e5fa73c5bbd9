//! Types for the scrape orchestrator.

use std::time::Instant;
use thiserror::Error;

use crate::marketplace::RawSeat;

/// Errors that can occur during a scrape run.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Job not found.
    #[error("job not found: {0}")]
    JobNotFound(i64),

    /// Event is missing the id its source requires.
    #[error("missing required id for event: {0}")]
    MissingEventId(String),

    /// Event store error.
    #[error("event store error: {0}")]
    EventStore(#[from] crate::event::EventStoreError),

    /// Job store error.
    #[error("job store error: {0}")]
    JobStore(#[from] crate::job::JobStoreError),

    /// Failed to write the output artifact.
    #[error("output error: {0}")]
    Output(String),
}

/// First-pass capture held between double-check passes.
///
/// In-memory only: a restart between passes simply re-defers the event.
#[derive(Debug, Clone)]
pub(crate) struct StagedScrape {
    pub seats: Vec<RawSeat>,
    pub captured_at: Instant,
    pub processed: bool,
}
