//! Scrape orchestrator implementation.
//!
//! One [`ScrapeRunner::run`] call processes every eligible event over a
//! bounded worker pool. Cancellation is cooperative: a local atomic flag
//! plus the job's persisted `Stopped` status, polled at the start of every
//! per-event task and every item of the completion loop. In-flight network
//! calls are never hard-killed; they run into their own timeouts.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::event::{EventSource, EventStore, TrackedEvent};
use crate::job::{JobStatus, JobStore, ScrapeJob};
use crate::marketplace::{MarketplaceApi, RawSeat};
use crate::metrics;
use crate::queue_platform::QueuePlatformApi;
use crate::upload::Uploader;

use super::config::ScraperConfig;
use super::inventory::{build_rows, CanonicalInventoryRow};
use super::output::write_artifact;
use super::types::{ScrapeError, StagedScrape};

type StagingMap = Arc<Mutex<HashMap<String, StagedScrape>>>;

/// Everything one pooled unit of work needs, captured explicitly instead of
/// reaching into ambient state.
#[derive(Clone)]
struct TaskContext {
    config: ScraperConfig,
    event_store: Arc<dyn EventStore>,
    job_store: Arc<dyn JobStore>,
    marketplace: Arc<dyn MarketplaceApi>,
    queue_platform: Arc<dyn QueuePlatformApi>,
    stop_requested: Arc<AtomicBool>,
    staged: StagingMap,
}

/// The scrape orchestrator.
pub struct ScrapeRunner {
    config: ScraperConfig,
    event_store: Arc<dyn EventStore>,
    job_store: Arc<dyn JobStore>,
    marketplace: Arc<dyn MarketplaceApi>,
    queue_platform: Arc<dyn QueuePlatformApi>,
    uploader: Arc<dyn Uploader>,
    stop_requested: Arc<AtomicBool>,
    /// First-pass captures for double-check events, keyed by
    /// "{source}_{marketplace id}". Per-instance; lost on restart.
    staged: StagingMap,
}

impl ScrapeRunner {
    pub fn new(
        config: ScraperConfig,
        event_store: Arc<dyn EventStore>,
        job_store: Arc<dyn JobStore>,
        marketplace: Arc<dyn MarketplaceApi>,
        queue_platform: Arc<dyn QueuePlatformApi>,
        uploader: Arc<dyn Uploader>,
    ) -> Self {
        Self {
            config,
            event_store,
            job_store,
            marketplace,
            queue_platform,
            uploader,
            stop_requested: Arc::new(AtomicBool::new(false)),
            staged: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Signal the running scrape to stop at its next checkpoint.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }

    /// Whether a stop has been requested, locally or through the job's
    /// persisted status.
    pub fn should_stop(&self, job_id: i64) -> bool {
        stop_observed(&self.stop_requested, &self.job_store, job_id)
    }

    fn task_context(&self) -> TaskContext {
        TaskContext {
            config: self.config.clone(),
            event_store: Arc::clone(&self.event_store),
            job_store: Arc::clone(&self.job_store),
            marketplace: Arc::clone(&self.marketplace),
            queue_platform: Arc::clone(&self.queue_platform),
            stop_requested: Arc::clone(&self.stop_requested),
            staged: Arc::clone(&self.staged),
        }
    }

    /// Run one scrape over all eligible events.
    ///
    /// Returns `(true, Some(artifact))` when rows were collected and written;
    /// `(false, None)` when nothing was collected or the run was stopped.
    pub async fn run(&self, job: &ScrapeJob) -> Result<(bool, Option<PathBuf>), ScrapeError> {
        self.stop_requested.store(false, Ordering::SeqCst);

        let concurrency = if job.concurrency > 0 {
            job.concurrency
        } else {
            self.config.default_concurrency
        };
        info!(
            job_id = job.id,
            concurrency,
            auto_upload = job.auto_upload,
            "starting scrape run"
        );
        self.job_store.set_status(job.id, JobStatus::Running)?;

        let mut events = self.event_store.list_eligible(EventSource::QueuePlatform)?;
        events.extend(
            self.event_store
                .list_eligible(EventSource::PrimaryMarketplace)?,
        );

        if events.is_empty() {
            warn!("no eligible events found");
            self.job_store.set_status(job.id, JobStatus::Completed)?;
            return Ok((false, None));
        }

        let total = events.len();
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let mut tasks: JoinSet<(String, Vec<CanonicalInventoryRow>)> = JoinSet::new();

        for event in events {
            let ctx = self.task_context();
            let semaphore = Arc::clone(&semaphore);
            let job_id = job.id;

            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (event.name, Vec::new());
                };
                if stop_observed(&ctx.stop_requested, &ctx.job_store, job_id) {
                    debug!(event = %event.name, "stop observed, skipping event");
                    return (event.name, Vec::new());
                }
                let rows = ctx.process_event(&event).await;
                (event.name, rows)
            });
        }

        let mut all_rows: Vec<CanonicalInventoryRow> = Vec::new();
        let mut processed = 0usize;

        while let Some(joined) = tasks.join_next().await {
            if self.should_stop(job.id) {
                info!("stop requested, terminating scrape run");
                tasks.abort_all();
                self.job_store.set_status(job.id, JobStatus::Stopped)?;
                return Ok((false, None));
            }

            match joined {
                Ok((event_name, rows)) => {
                    processed += 1;
                    if !rows.is_empty() {
                        info!(event = %event_name, seats = rows.len(), "found seats");
                        metrics::SEATS_FOUND.inc_by(rows.len() as u64);
                    }
                    self.job_store
                        .increment_counters(job.id, 1, rows.len() as u64)?;
                    metrics::EVENTS_PROCESSED.inc();
                    all_rows.extend(rows);

                    debug!(
                        processed,
                        total,
                        progress_pct = (processed as f64 / total as f64) * 100.0,
                        "scrape progress"
                    );
                }
                Err(e) => {
                    error!(error = %e, "event task failed");
                }
            }
        }

        if self.should_stop(job.id) {
            info!("stop requested, terminating scrape run");
            self.job_store.set_status(job.id, JobStatus::Stopped)?;
            return Ok((false, None));
        }

        if all_rows.is_empty() {
            warn!("no data collected");
            self.job_store.set_status(job.id, JobStatus::Completed)?;
            return Ok((false, None));
        }

        let path = write_artifact(&self.config.output_dir, &all_rows, chrono::Local::now())?;

        if job.auto_upload {
            let (success, message) = self.uploader.upload(&path).await;
            if success {
                info!(message = %message, "artifact uploaded");
            } else {
                error!(message = %message, "artifact upload failed");
            }
        }

        self.job_store.set_status(job.id, JobStatus::Completed)?;
        Ok((true, Some(path)))
    }
}

impl TaskContext {
    fn stop_flag(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    /// Process one event, isolating failures at the per-event boundary.
    async fn process_event(&self, event: &TrackedEvent) -> Vec<CanonicalInventoryRow> {
        match self.dispatch(event).await {
            Ok(rows) => rows,
            Err(e) => {
                error!(event = %event.name, error = %e, "error processing event");
                Vec::new()
            }
        }
    }

    async fn dispatch(
        &self,
        event: &TrackedEvent,
    ) -> Result<Vec<CanonicalInventoryRow>, ScrapeError> {
        match event.source {
            EventSource::QueuePlatform => self.process_queue_platform_event(event).await,
            EventSource::PrimaryMarketplace
                if event.double_check && !event.first_scrape_completed =>
            {
                self.process_double_check_event(event).await
            }
            EventSource::PrimaryMarketplace => self.process_primary_event(event).await,
        }
    }

    async fn process_primary_event(
        &self,
        event: &TrackedEvent,
    ) -> Result<Vec<CanonicalInventoryRow>, ScrapeError> {
        let marketplace_id = event
            .marketplace_id
            .as_deref()
            .ok_or_else(|| ScrapeError::MissingEventId(event.name.clone()))?;

        let seats = self.marketplace.get_seats(marketplace_id).await;
        Ok(build_rows(event, &seats, || self.stop_flag()))
    }

    async fn process_queue_platform_event(
        &self,
        event: &TrackedEvent,
    ) -> Result<Vec<CanonicalInventoryRow>, ScrapeError> {
        let (show_id, queue_event_id) = match (&event.show_id, &event.queue_event_id) {
            (Some(show_id), Some(queue_event_id)) => (show_id.as_str(), queue_event_id.as_str()),
            _ => return Err(ScrapeError::MissingEventId(event.name.clone())),
        };

        // Rule lookup failures degrade to "no rules" rather than dropping
        // the event.
        let rules = match self.event_store.keyword_rules(event.id) {
            Ok(rules) => rules,
            Err(e) => {
                error!(event = %event.name, error = %e, "failed to fetch keyword rules");
                Default::default()
            }
        };

        let excluded = self
            .event_store
            .excluded_seats(&event.name, event.venue.as_deref().unwrap_or(""))?;

        let seats = self
            .queue_platform
            .get_seats(show_id, queue_event_id, &rules, &excluded)
            .await;
        Ok(build_rows(event, &seats, || self.stop_flag()))
    }

    /// Two-pass double-check protocol.
    ///
    /// The first encounter captures the seats and yields nothing; the event
    /// is revisited by a later run. Once the cooldown has elapsed, a second
    /// fetch runs and only seats present in both passes survive. The delay
    /// is a stateless elapsed-time check, never a sleep inside a worker.
    async fn process_double_check_event(
        &self,
        event: &TrackedEvent,
    ) -> Result<Vec<CanonicalInventoryRow>, ScrapeError> {
        let marketplace_id = event
            .marketplace_id
            .as_deref()
            .ok_or_else(|| ScrapeError::MissingEventId(event.name.clone()))?;

        let key = format!("{}_{}", event.source.as_str(), marketplace_id);

        let staged = {
            let staged = self.staged.lock().unwrap();
            staged
                .get(&key)
                .map(|entry| (entry.captured_at, entry.processed))
        };

        let Some((captured_at, processed)) = staged else {
            info!(event = %event.name, "first pass for double-check event");
            let first = self.marketplace.get_seats(marketplace_id).await;
            if first.is_empty() {
                // Nothing to stage; the next run starts over.
                return Ok(Vec::new());
            }
            self.staged.lock().unwrap().insert(
                key,
                StagedScrape {
                    seats: first,
                    captured_at: Instant::now(),
                    processed: false,
                },
            );
            return Ok(Vec::new());
        };

        if processed {
            return Ok(Vec::new());
        }

        let delay = Duration::from_secs(self.config.double_check_delay_secs);
        if captured_at.elapsed() < delay {
            debug!(event = %event.name, "double-check cooldown not elapsed");
            return Ok(Vec::new());
        }

        info!(event = %event.name, "second pass for double-check event");
        let second = self.marketplace.get_seats(marketplace_id).await;

        let first = match self.staged.lock().unwrap().get(&key) {
            Some(entry) => entry.seats.clone(),
            None => return Ok(Vec::new()),
        };
        let stable = intersect_scrapes(&first, second);

        self.event_store.mark_first_scrape_completed(event.id)?;
        if let Some(entry) = self.staged.lock().unwrap().get_mut(&key) {
            entry.processed = true;
        }

        debug!(
            event = %event.name,
            first = first.len(),
            stable = stable.len(),
            "double-check comparison complete"
        );
        Ok(build_rows(event, &stable, || self.stop_flag()))
    }
}

fn stop_observed(flag: &AtomicBool, job_store: &Arc<dyn JobStore>, job_id: i64) -> bool {
    if flag.load(Ordering::SeqCst) {
        return true;
    }
    match job_store.get(job_id) {
        Ok(Some(job)) => job.status == JobStatus::Stopped,
        Ok(None) => false,
        Err(e) => {
            warn!(error = %e, "failed to read job status");
            false
        }
    }
}

/// Keep only seats whose identity (section, row, seats, price) appears in
/// both passes, taking the second pass's data.
fn intersect_scrapes(first: &[RawSeat], second: Vec<RawSeat>) -> Vec<RawSeat> {
    let first_keys: HashSet<String> = first.iter().map(|seat| seat.ticket_key()).collect();

    second
        .into_iter()
        .filter(|seat| first_keys.contains(&seat.ticket_key()))
        .collect()
}
