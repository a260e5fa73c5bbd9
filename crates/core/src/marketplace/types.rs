//! Types for the marketplace clients.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// An event found by discovery search, ready for registration as a
/// [`TrackedEvent`](crate::event::TrackedEvent) by the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredEvent {
    /// Marketplace-native id extracted from the event's canonical URL.
    /// Empty when the URL carried no recognizable id.
    pub marketplace_id: String,
    pub name: String,
    pub city: String,
    /// Local performance date.
    pub date: NaiveDate,
    /// Local performance time, "HH:MM". Empty when the upstream omits it.
    pub time: String,
    pub venue: String,
    /// Suggested list-price multiplier for new events.
    pub markup: f64,
}

/// Named fee components attached to a seat quote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SeatFees {
    #[serde(default)]
    pub convenience: f64,
    #[serde(default)]
    pub concierge: f64,
    #[serde(default)]
    pub order: f64,
}

impl SeatFees {
    pub fn total(&self) -> f64 {
        self.convenience + self.concierge + self.order
    }
}

/// One listed seat group as returned by a marketplace, before
/// transformation into a canonical inventory row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSeat {
    pub section: String,
    pub row: String,
    /// Comma-separated seat numbers.
    pub seats: String,
    pub price: f64,
    pub face_value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fees: Option<SeatFees>,
}

impl RawSeat {
    /// Identity used to compare seats across double-check passes.
    pub fn ticket_key(&self) -> String {
        format!(
            "{}_{}_{}_{}",
            self.section, self.row, self.seats, self.price
        )
    }
}

/// Trait for the primary-marketplace API.
///
/// Both operations are infallible by contract: a unit of work that exhausts
/// its retries yields an empty (or partial) result and logs the reason.
#[async_trait]
pub trait MarketplaceApi: Send + Sync {
    /// Search events by name and city within an inclusive date window.
    async fn search(
        &self,
        name: &str,
        city: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Vec<DiscoveredEvent>;

    /// Fetch all currently listed seats for an event.
    async fn get_seats(&self, event_id: &str) -> Vec<RawSeat>;
}
