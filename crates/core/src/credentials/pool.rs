//! Credential pool implementation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::Rng;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::metrics;

use super::config::CredentialPoolConfig;
use super::store::CredentialStore;
use super::types::{CredentialError, CredentialRecord, HeaderBundle, HeaderFetcher};

/// Snapshot of the pool for the control surface.
#[derive(Debug, Clone, Serialize)]
pub struct PoolStatus {
    /// Active, unexpired records in the store.
    pub active: usize,
    /// Bundles currently held in the in-memory cache.
    pub cached: usize,
    /// Whether the maintenance loop is running.
    pub maintenance_running: bool,
}

type Cache = Arc<Mutex<Vec<CredentialRecord>>>;

/// Shared pool of authenticated header bundles.
///
/// One instance per process, shared via `Arc` by every client that talks to
/// the marketplace. The in-memory cache is loaded from the store at
/// construction and refreshed whenever it runs dry; all cache mutations and
/// the check-count-then-insert replenish sequence are mutually exclusive so
/// concurrent workers cannot race deactivation or over-fetch.
pub struct CredentialPool {
    config: CredentialPoolConfig,
    store: Arc<dyn CredentialStore>,
    fetcher: Arc<dyn HeaderFetcher>,
    cache: Cache,
    replenish_lock: Arc<tokio::sync::Mutex<()>>,
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl CredentialPool {
    /// Create a new pool, seeding the cache from the store.
    pub fn new(
        config: CredentialPoolConfig,
        store: Arc<dyn CredentialStore>,
        fetcher: Arc<dyn HeaderFetcher>,
    ) -> Self {
        let cache = match store.active_records(config.max_age_hours) {
            Ok(records) => {
                info!(count = records.len(), "loaded credential bundles");
                records
            }
            Err(e) => {
                warn!(error = %e, "failed to load credential bundles");
                Vec::new()
            }
        };

        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            store,
            fetcher,
            cache: Arc::new(Mutex::new(cache)),
            replenish_lock: Arc::new(tokio::sync::Mutex::new(())),
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            task: Mutex::new(None),
        }
    }

    /// Serve one bundle, chosen uniformly at random from the cache.
    ///
    /// An empty cache is reloaded from the store first; if it is still empty
    /// the hardcoded fallback bundle is served instead of blocking.
    pub fn acquire(&self) -> HeaderBundle {
        let record = {
            let mut cache = self.cache.lock().unwrap();
            if cache.is_empty() {
                match self.store.active_records(self.config.max_age_hours) {
                    Ok(records) => *cache = records,
                    Err(e) => warn!(error = %e, "failed to refresh credential cache"),
                }
            }
            if cache.is_empty() {
                None
            } else {
                let idx = rand::thread_rng().gen_range(0..cache.len());
                Some(cache[idx].clone())
            }
        };

        match record {
            Some(record) => {
                if let Err(e) = self.store.touch_used(record.id) {
                    warn!(error = %e, id = record.id, "failed to stamp credential use");
                }
                record.bundle.with_correlation_id()
            }
            None => {
                debug!("credential cache empty, serving fallback bundle");
                HeaderBundle::fallback().with_correlation_id()
            }
        }
    }

    /// Report a successful request made with the bundle.
    pub fn report_success(&self, bundle: &HeaderBundle) {
        let Some(cookie) = bundle.cookie() else {
            return; // fallback bundle, nothing to track
        };

        match self.store.find_active_by_cookie(cookie) {
            Ok(Some(record)) => {
                if let Err(e) = self.store.touch_used(record.id) {
                    warn!(error = %e, id = record.id, "failed to stamp credential use");
                }
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "failed to look up credential"),
        }
    }

    /// Report a failed request made with the bundle. At the configured
    /// failure count the record is deactivated and evicted from the cache.
    pub fn report_failure(&self, bundle: &HeaderBundle) {
        let Some(cookie) = bundle.cookie() else {
            return; // fallback bundle, nothing to track
        };

        let record = match self.store.find_active_by_cookie(cookie) {
            Ok(Some(record)) => record,
            Ok(None) => {
                // Already deactivated by a concurrent worker; make sure the
                // cache agrees.
                evict(&self.cache, cookie);
                return;
            }
            Err(e) => {
                warn!(error = %e, "failed to look up credential");
                return;
            }
        };

        match self.store.record_failure(record.id, self.config.max_failures) {
            Ok(failures) if failures >= self.config.max_failures => {
                warn!(
                    id = record.id,
                    failures, "credential deactivated after repeated failures"
                );
                evict(&self.cache, cookie);
                metrics::CREDENTIALS_EVICTED.inc();
            }
            Ok(failures) => {
                debug!(id = record.id, failures, "credential failure recorded");
            }
            Err(e) => warn!(error = %e, id = record.id, "failed to record credential failure"),
        }
    }

    /// Fetch one new bundle from the header-fetch service and persist it.
    ///
    /// A bundle whose cookie matches an already-active record is rejected as
    /// a duplicate and the existing record is returned instead. The whole
    /// sequence runs under a lock so the background loop and manual triggers
    /// cannot overshoot the pool target together.
    pub async fn replenish(&self) -> Result<CredentialRecord, CredentialError> {
        Self::replenish_locked(
            &self.store,
            &self.fetcher,
            &self.cache,
            &self.replenish_lock,
        )
        .await
    }

    /// Delete persisted records older than the configured maximum age.
    pub fn sweep_expired(&self) -> Result<usize, CredentialError> {
        Self::sweep(&self.config, &self.store, &self.cache)
    }

    /// Active, unexpired records in the store.
    pub fn active_count(&self) -> Result<usize, CredentialError> {
        self.store.active_count(self.config.max_age_hours)
    }

    /// Snapshot for the control surface.
    pub fn status(&self) -> PoolStatus {
        PoolStatus {
            active: self.active_count().unwrap_or(0),
            cached: self.cache.lock().unwrap().len(),
            maintenance_running: self.running.load(Ordering::Relaxed),
        }
    }

    /// Start the background maintenance loop.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("credential maintenance loop already running");
            return;
        }

        let config = self.config.clone();
        let store = Arc::clone(&self.store);
        let fetcher = Arc::clone(&self.fetcher);
        let cache = Arc::clone(&self.cache);
        let replenish_lock = Arc::clone(&self.replenish_lock);
        let running = Arc::clone(&self.running);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let handle = tokio::spawn(async move {
            info!("credential maintenance loop started");
            loop {
                let jitter = if config.check_jitter_secs > 0 {
                    rand::thread_rng().gen_range(0..=config.check_jitter_secs)
                } else {
                    0
                };
                let interval = Duration::from_secs(config.check_interval_secs + jitter);

                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("credential maintenance loop received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                        Self::maintenance_cycle(
                            &config,
                            &store,
                            &fetcher,
                            &cache,
                            &replenish_lock,
                            &running,
                        )
                        .await;
                    }
                }
            }
            info!("credential maintenance loop stopped");
        });

        *self.task.lock().unwrap() = Some(handle);
    }

    /// Stop the maintenance loop, waiting a bounded time for it to finish.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }

        let _ = self.shutdown_tx.send(());
        let handle = self.task.lock().unwrap().take();
        if let Some(handle) = handle {
            if tokio::time::timeout(Duration::from_secs(10), handle)
                .await
                .is_err()
            {
                warn!("credential maintenance loop did not stop in time");
            }
        }
    }

    async fn replenish_locked(
        store: &Arc<dyn CredentialStore>,
        fetcher: &Arc<dyn HeaderFetcher>,
        cache: &Cache,
        replenish_lock: &tokio::sync::Mutex<()>,
    ) -> Result<CredentialRecord, CredentialError> {
        let _guard = replenish_lock.lock().await;

        let bundle = fetcher.fetch().await?;
        let cookie = bundle.cookie().ok_or(CredentialError::MissingCookie)?;

        if let Some(existing) = store.find_active_by_cookie(cookie)? {
            debug!(id = existing.id, "fetched duplicate cookie, keeping existing record");
            return Ok(existing);
        }

        let record = store.insert(bundle)?;
        info!(id = record.id, "added credential bundle");
        cache.lock().unwrap().push(record.clone());
        Ok(record)
    }

    fn sweep(
        config: &CredentialPoolConfig,
        store: &Arc<dyn CredentialStore>,
        cache: &Cache,
    ) -> Result<usize, CredentialError> {
        let swept = store.delete_older_than(config.max_age_hours)?;
        if swept > 0 {
            let cutoff = chrono::Utc::now() - chrono::Duration::hours(config.max_age_hours);
            cache
                .lock()
                .unwrap()
                .retain(|record| record.created_at > cutoff);
        }
        Ok(swept)
    }

    /// One maintenance cycle: sweep expired records, then top the pool back
    /// up if the active count fell below the refresh threshold. Errors are
    /// logged and never terminate the loop.
    async fn maintenance_cycle(
        config: &CredentialPoolConfig,
        store: &Arc<dyn CredentialStore>,
        fetcher: &Arc<dyn HeaderFetcher>,
        cache: &Cache,
        replenish_lock: &tokio::sync::Mutex<()>,
        running: &Arc<AtomicBool>,
    ) {
        match Self::sweep(config, store, cache) {
            Ok(swept) if swept > 0 => info!(swept, "swept expired credentials"),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "credential sweep failed"),
        }

        let active = match store.active_count(config.max_age_hours) {
            Ok(active) => active,
            Err(e) => {
                warn!(error = %e, "failed to count active credentials");
                return;
            }
        };
        debug!(active, min = config.min_headers, "credential pool level");

        if active >= config.refresh_threshold {
            return;
        }

        let needed = config.min_headers.saturating_sub(active);
        info!(active, needed, "replenishing credential pool");

        for _ in 0..needed {
            if !running.load(Ordering::Relaxed) {
                break;
            }

            // Another caller may have topped the pool up in the meantime.
            match store.active_count(config.max_age_hours) {
                Ok(active) if active >= config.min_headers => break,
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "failed to count active credentials");
                    break;
                }
            }

            if let Err(e) =
                Self::replenish_locked(store, fetcher, cache, replenish_lock).await
            {
                warn!(error = %e, "credential replenish failed");
            }

            tokio::time::sleep(Duration::from_secs(config.fetch_delay_secs)).await;
        }
    }
}

fn evict(cache: &Cache, cookie: &str) {
    cache
        .lock()
        .unwrap()
        .retain(|record| record.bundle.cookie() != Some(cookie));
}
