//! Credential pool integration tests.

use std::sync::Arc;
use std::time::Duration;

use stubhound_core::{
    testing::{fixtures, MockHeaderFetcher},
    CredentialError, CredentialPool, CredentialPoolConfig, CredentialStore, HttpHeaderFetcher,
    SqliteCredentialStore,
};

fn pool_with(
    config: CredentialPoolConfig,
) -> (
    Arc<CredentialPool>,
    Arc<SqliteCredentialStore>,
    Arc<MockHeaderFetcher>,
) {
    let store = Arc::new(SqliteCredentialStore::in_memory().expect("credential store"));
    let fetcher = Arc::new(MockHeaderFetcher::new());
    let pool = Arc::new(CredentialPool::new(
        config,
        Arc::clone(&store) as Arc<dyn CredentialStore>,
        Arc::clone(&fetcher) as _,
    ));
    (pool, store, fetcher)
}

#[tokio::test]
async fn test_three_failures_evict_bundle_for_good() {
    let (pool, store, fetcher) = pool_with(CredentialPoolConfig::default());
    fetcher.queue_cookie("session=abc");
    pool.replenish().await.unwrap();

    let bundle = pool.acquire();
    assert_eq!(bundle.cookie(), Some("session=abc"));

    pool.report_failure(&bundle);
    pool.report_failure(&bundle);
    // Two failures: still served.
    assert_eq!(pool.acquire().cookie(), Some("session=abc"));

    pool.report_failure(&bundle);
    // Third failure: deactivated, evicted, never served again.
    assert!(pool.acquire().cookie().is_none());
    assert_eq!(store.active_count(24).unwrap(), 0);
    assert!(store.find_active_by_cookie("session=abc").unwrap().is_none());
}

#[tokio::test]
async fn test_replenish_rejects_duplicate_cookie() {
    let (pool, store, fetcher) = pool_with(CredentialPoolConfig::default());
    fetcher.queue_cookie("session=dup");
    fetcher.queue_cookie("session=dup");

    let first = pool.replenish().await.unwrap();
    let second = pool.replenish().await.unwrap();

    // The duplicate is not inserted; the existing record comes back.
    assert_eq!(first.id, second.id);
    assert_eq!(store.active_count(24).unwrap(), 1);
}

#[tokio::test]
async fn test_acquire_rotates_across_bundles() {
    let (pool, _store, fetcher) = pool_with(CredentialPoolConfig::default());
    fetcher.queue_cookie("session=a");
    fetcher.queue_cookie("session=b");
    pool.replenish().await.unwrap();
    pool.replenish().await.unwrap();

    let mut seen = std::collections::HashSet::new();
    for _ in 0..50 {
        if let Some(cookie) = pool.acquire().cookie().map(str::to_string) {
            seen.insert(cookie);
        }
    }
    assert_eq!(seen.len(), 2);
}

#[tokio::test]
async fn test_acquire_reloads_cache_from_store() {
    let (pool, store, _fetcher) = pool_with(CredentialPoolConfig::default());

    // Pool was constructed against an empty store; records arrive later
    // (e.g. written by another process sharing the database).
    store.insert(fixtures::header_bundle("session=late")).unwrap();

    assert_eq!(pool.acquire().cookie(), Some("session=late"));
}

#[tokio::test]
async fn test_sweep_deletes_expired_records() {
    let (pool, store, _fetcher) = pool_with(CredentialPoolConfig::default());

    store
        .insert_created_at(
            fixtures::header_bundle("session=old"),
            chrono::Utc::now() - chrono::Duration::hours(25),
        )
        .unwrap();
    store.insert(fixtures::header_bundle("session=fresh")).unwrap();

    assert_eq!(pool.sweep_expired().unwrap(), 1);
    assert_eq!(store.active_count(24).unwrap(), 1);
}

#[tokio::test]
async fn test_unconfigured_fetcher_degrades_to_fallback() {
    let config = CredentialPoolConfig::default();
    let store = Arc::new(SqliteCredentialStore::in_memory().unwrap());
    let pool = CredentialPool::new(
        config.clone(),
        Arc::clone(&store) as Arc<dyn CredentialStore>,
        Arc::new(HttpHeaderFetcher::new(&config)) as _,
    );

    let err = pool.replenish().await.unwrap_err();
    assert!(matches!(err, CredentialError::NotConfigured));

    // Degraded, not blocked: requests still get a bundle.
    let bundle = pool.acquire();
    assert!(bundle.cookie().is_none());
    assert!(bundle.headers().contains_key("User-Agent"));
}

#[tokio::test]
async fn test_maintenance_loop_tops_up_and_stops() {
    let config = CredentialPoolConfig {
        min_headers: 3,
        refresh_threshold: 2,
        check_interval_secs: 0,
        check_jitter_secs: 0,
        fetch_delay_secs: 0,
        ..Default::default()
    };
    let (pool, store, fetcher) = pool_with(config);

    pool.start();
    tokio::time::sleep(Duration::from_millis(300)).await;
    pool.stop().await;

    assert!(store.active_count(24).unwrap() >= 3);
    assert!(fetcher.fetch_count() >= 3);
    assert!(!pool.status().maintenance_running);

    // Loop has joined: no further fetches happen.
    let count = fetcher.fetch_count();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(fetcher.fetch_count(), count);
}
