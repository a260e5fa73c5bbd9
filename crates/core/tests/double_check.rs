//! Double-check protocol integration tests.
//!
//! The two-pass protocol runs across separate `run()` calls on the same
//! runner instance: the first pass stages seats in memory and yields
//! nothing; a later run performs the second pass once the cooldown has
//! elapsed and keeps only the seats present in both passes.

use std::sync::Arc;

use tempfile::TempDir;

use stubhound_core::{
    testing::{fixtures, MockMarketplace, MockQueuePlatform, MockUploader},
    CreateJobRequest, EventStore, JobStore, MarketplaceApi, NewTrackedEvent, QueuePlatformApi,
    ScrapeJob, ScrapeRunner, ScraperConfig, SqliteEventStore, SqliteJobStore, Uploader,
};

struct TestHarness {
    event_store: Arc<SqliteEventStore>,
    job_store: Arc<SqliteJobStore>,
    marketplace: Arc<MockMarketplace>,
    _output_dir: TempDir,
    runner: Arc<ScrapeRunner>,
}

impl TestHarness {
    /// Build a harness whose runner uses the given double-check cooldown.
    fn with_delay(delay_secs: u64) -> Self {
        let event_store = Arc::new(SqliteEventStore::in_memory().expect("event store"));
        let job_store = Arc::new(SqliteJobStore::in_memory().expect("job store"));
        let marketplace = Arc::new(MockMarketplace::new());
        let output_dir = TempDir::new().expect("temp dir");

        let config = ScraperConfig {
            output_dir: output_dir.path().to_path_buf(),
            double_check_delay_secs: delay_secs,
            ..Default::default()
        };

        let runner = Arc::new(ScrapeRunner::new(
            config,
            Arc::clone(&event_store) as Arc<dyn EventStore>,
            Arc::clone(&job_store) as Arc<dyn JobStore>,
            Arc::clone(&marketplace) as Arc<dyn MarketplaceApi>,
            Arc::new(MockQueuePlatform::new()) as Arc<dyn QueuePlatformApi>,
            Arc::new(MockUploader::new()) as Arc<dyn Uploader>,
        ));

        Self {
            event_store,
            job_store,
            marketplace,
            _output_dir: output_dir,
            runner,
        }
    }

    fn seed_double_check_event(&self) -> i64 {
        let mut event: NewTrackedEvent = fixtures::new_primary_event("EV1", "M1");
        event.double_check = true;
        self.event_store.insert(event).unwrap().id
    }

    fn new_job(&self) -> ScrapeJob {
        self.job_store
            .create(CreateJobRequest {
                concurrency: 2,
                auto_upload: false,
            })
            .unwrap()
    }
}

#[tokio::test]
async fn test_two_pass_flow_keeps_stable_seats() {
    let harness = TestHarness::with_delay(0);
    let event_id = harness.seed_double_check_event();

    let s1 = fixtures::raw_seat("Orchestra", "A", "1,2", 100.0);
    let s2 = fixtures::raw_seat("Orchestra", "A", "3,4", 100.0);
    let s3 = fixtures::raw_seat("Mezzanine", "B", "5,6", 80.0);
    let s4 = fixtures::raw_seat("Balcony", "C", "7,8", 60.0);

    harness
        .marketplace
        .queue_seats("M1", vec![s1, s2.clone(), s3.clone()]);
    harness.marketplace.queue_seats("M1", vec![s2, s3, s4]);

    // First run: first pass only, nothing emitted, flag untouched.
    let (success, artifact) = harness.runner.run(&harness.new_job()).await.unwrap();
    assert!(!success);
    assert!(artifact.is_none());
    assert!(
        !harness
            .event_store
            .get(event_id)
            .unwrap()
            .unwrap()
            .first_scrape_completed
    );

    // Second run: cooldown elapsed (0s), intersection survives.
    let (success, artifact) = harness.runner.run(&harness.new_job()).await.unwrap();
    assert!(success);

    let rows: Vec<stubhound_core::CanonicalInventoryRow> =
        csv::Reader::from_path(artifact.unwrap())
            .unwrap()
            .deserialize()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
    assert_eq!(rows.len(), 2);
    let mut sections: Vec<_> = rows.iter().map(|r| r.seats.clone()).collect();
    sections.sort();
    assert_eq!(sections, vec!["3,4", "5,6"]);

    assert!(
        harness
            .event_store
            .get(event_id)
            .unwrap()
            .unwrap()
            .first_scrape_completed
    );
    assert_eq!(harness.marketplace.seat_calls().len(), 2);
}

#[tokio::test]
async fn test_premature_second_pass_yields_nothing() {
    let harness = TestHarness::with_delay(3600);
    let event_id = harness.seed_double_check_event();

    harness
        .marketplace
        .set_seats("M1", vec![fixtures::raw_seat("Orchestra", "A", "1,2", 100.0)]);

    // First pass stages the seats.
    let (success, _) = harness.runner.run(&harness.new_job()).await.unwrap();
    assert!(!success);
    assert_eq!(harness.marketplace.seat_calls().len(), 1);

    // Cooldown not elapsed: no fetch, no rows, no side effects.
    let (success, artifact) = harness.runner.run(&harness.new_job()).await.unwrap();
    assert!(!success);
    assert!(artifact.is_none());
    assert_eq!(harness.marketplace.seat_calls().len(), 1);
    assert!(
        !harness
            .event_store
            .get(event_id)
            .unwrap()
            .unwrap()
            .first_scrape_completed
    );
}

#[tokio::test]
async fn test_empty_first_pass_is_not_staged() {
    let harness = TestHarness::with_delay(3600);
    let event_id = harness.seed_double_check_event();

    // No seats configured: the first pass comes back empty.
    let (success, _) = harness.runner.run(&harness.new_job()).await.unwrap();
    assert!(!success);
    assert_eq!(harness.marketplace.seat_calls().len(), 1);

    // Nothing was staged, so the next run performs a fresh first pass.
    harness.runner.run(&harness.new_job()).await.unwrap();
    assert_eq!(harness.marketplace.seat_calls().len(), 2);
    assert!(
        !harness
            .event_store
            .get(event_id)
            .unwrap()
            .unwrap()
            .first_scrape_completed
    );
}

#[tokio::test]
async fn test_completed_event_uses_single_fetch_path() {
    let harness = TestHarness::with_delay(0);
    let event_id = harness.seed_double_check_event();

    harness
        .marketplace
        .queue_seats("M1", vec![fixtures::raw_seat("Orchestra", "A", "1,2", 100.0)]);
    harness
        .marketplace
        .queue_seats("M1", vec![fixtures::raw_seat("Orchestra", "A", "1,2", 100.0)]);
    harness
        .marketplace
        .set_seats("M1", vec![fixtures::raw_seat("Balcony", "Z", "9", 40.0)]);

    // Two runs complete the double-check.
    harness.runner.run(&harness.new_job()).await.unwrap();
    harness.runner.run(&harness.new_job()).await.unwrap();
    assert!(
        harness
            .event_store
            .get(event_id)
            .unwrap()
            .unwrap()
            .first_scrape_completed
    );

    // Third run takes the regular single-fetch branch.
    let (success, artifact) = harness.runner.run(&harness.new_job()).await.unwrap();
    assert!(success);
    let rows: Vec<stubhound_core::CanonicalInventoryRow> =
        csv::Reader::from_path(artifact.unwrap())
            .unwrap()
            .deserialize()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].section, "Balcony");
}
