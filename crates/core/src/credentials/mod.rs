//! Anti-bot credential pool.
//!
//! Marketplace requests are made with rotating bundles of session headers
//! fetched from an external header-fetch service. The [`CredentialPool`]
//! keeps a cache of active bundles, serves them at random, evicts bundles
//! that keep failing, and runs a background maintenance loop that sweeps
//! expired records and tops the pool back up to its configured minimum.

mod config;
mod fetcher;
mod pool;
mod sqlite_store;
mod store;
mod types;

pub use config::CredentialPoolConfig;
pub use fetcher::HttpHeaderFetcher;
pub use pool::{CredentialPool, PoolStatus};
pub use sqlite_store::SqliteCredentialStore;
pub use store::CredentialStore;
pub use types::{CredentialError, CredentialRecord, HeaderBundle, HeaderFetcher};
