//! Test doubles and fixtures.
//!
//! Mock implementations of every trait seam, with canned results, recorded
//! calls and injectable failures. Shipped as a public module so integration
//! tests (and embedding consumers' tests) can reuse them.

pub mod fixtures;
mod mock_header_fetcher;
mod mock_marketplace;
mod mock_queue_platform;
mod mock_uploader;

pub use mock_header_fetcher::MockHeaderFetcher;
pub use mock_marketplace::MockMarketplace;
pub use mock_queue_platform::{MockQueuePlatform, RecordedSeatRequest};
pub use mock_uploader::MockUploader;
