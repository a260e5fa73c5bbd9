//! Primary-marketplace client.
//!
//! Paginated event discovery and seat-quote retrieval against the primary
//! ticket marketplace, using rotating credential bundles from the pool.
//! Fetches that exhaust their retries yield empty results rather than errors:
//! an empty page means "no data this cycle", never "no inventory".

mod client;
mod config;
mod types;

pub use client::PrimaryMarketplaceClient;
pub use config::MarketplaceConfig;
pub use types::{DiscoveredEvent, MarketplaceApi, RawSeat, SeatFees};
