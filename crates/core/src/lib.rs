pub mod config;
pub mod credentials;
pub mod event;
pub mod job;
pub mod marketplace;
pub mod metrics;
pub mod queue_platform;
pub mod scraper;
pub mod testing;
pub mod upload;

pub use config::{load_config, load_config_from_str, Config, ConfigError, DatabaseConfig};
pub use credentials::{
    CredentialError, CredentialPool, CredentialPoolConfig, CredentialRecord, CredentialStore,
    HeaderBundle, HeaderFetcher, HttpHeaderFetcher, PoolStatus, SqliteCredentialStore,
};
pub use event::{
    EventSource, EventStore, EventStoreError, ExcludedSeats, KeywordRules, NewTrackedEvent,
    SqliteEventStore, TrackedEvent,
};
pub use job::{CreateJobRequest, JobStatus, JobStore, JobStoreError, ScrapeJob, SqliteJobStore};
pub use marketplace::{
    DiscoveredEvent, MarketplaceApi, MarketplaceConfig, PrimaryMarketplaceClient, RawSeat, SeatFees,
};
pub use queue_platform::QueuePlatformApi;
pub use scraper::{inventory_id, CanonicalInventoryRow, ScrapeError, ScrapeRunner, ScraperConfig};
pub use upload::Uploader;
