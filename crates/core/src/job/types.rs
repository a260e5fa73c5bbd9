//! Types for scrape jobs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a scrape job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    /// Written externally to request cancellation of a running scrape.
    Stopped,
    Completed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Stopped => "stopped",
            JobStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "running" => Some(JobStatus::Running),
            "stopped" => Some(JobStatus::Stopped),
            "completed" => Some(JobStatus::Completed),
            _ => None,
        }
    }
}

/// A single scrape run with its progress counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeJob {
    pub id: i64,
    pub status: JobStatus,
    /// Worker-pool size for this run.
    pub concurrency: usize,
    /// Upload the output artifact once the run completes.
    pub auto_upload: bool,
    pub events_processed: u64,
    pub tickets_found: u64,
    /// Scheduler cadence; written by the external scheduler, opaque here.
    pub interval_minutes: Option<i64>,
    /// Scheduler bookkeeping; written by the external scheduler, opaque here.
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
