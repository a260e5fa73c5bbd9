//! Queue-platform collaborator interface.
//!
//! The queue-based marketplace is scraped by a separate client that applies
//! keyword rules and venue seat exclusions upstream; the core only consumes
//! its seat lists through this trait. Same failure contract as the primary
//! marketplace: exhausted retries yield an empty list, never an error.

use async_trait::async_trait;

use crate::event::{ExcludedSeats, KeywordRules};
use crate::marketplace::RawSeat;

/// Trait for the queue-platform seat source.
#[async_trait]
pub trait QueuePlatformApi: Send + Sync {
    /// Fetch all currently listed seats for a performance, with keyword
    /// rules and excluded seats applied upstream.
    async fn get_seats(
        &self,
        show_id: &str,
        event_id: &str,
        rules: &KeywordRules,
        excluded_seats: &ExcludedSeats,
    ) -> Vec<RawSeat>;
}
