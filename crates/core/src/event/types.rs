//! Types for tracked events.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Which marketplace an event is scraped from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    PrimaryMarketplace,
    QueuePlatform,
}

impl EventSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventSource::PrimaryMarketplace => "primary_marketplace",
            EventSource::QueuePlatform => "queue_platform",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "primary_marketplace" => Some(EventSource::PrimaryMarketplace),
            "queue_platform" => Some(EventSource::QueuePlatform),
            _ => None,
        }
    }
}

/// Per-event keyword rules (rule type -> keyword), applied upstream by the
/// queue-platform collaborator.
pub type KeywordRules = HashMap<String, String>;

/// Excluded seats per "{section}_{row}" key.
pub type ExcludedSeats = HashMap<String, HashSet<String>>;

/// A show/event monitored for sellable seat inventory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedEvent {
    pub id: i64,
    pub source: EventSource,
    /// Business identifier used in inventory ids and output rows.
    pub external_id: String,
    /// Primary-marketplace native id (required when source is PrimaryMarketplace).
    pub marketplace_id: Option<String>,
    /// Queue-platform show id (required when source is QueuePlatform).
    pub show_id: Option<String>,
    /// Queue-platform event id (required when source is QueuePlatform).
    pub queue_event_id: Option<String>,
    pub name: String,
    pub city: Option<String>,
    /// Local performance date.
    pub date: NaiveDate,
    /// Local performance time, "HH:MM".
    pub time: String,
    pub venue: Option<String>,
    /// List-price multiplier applied to the raw seat price.
    pub markup: f64,
    pub stock_type: Option<String>,
    pub in_hand: Option<String>,
    pub in_hand_date: Option<NaiveDate>,
    /// Require seats to survive two passes before trusting them.
    pub double_check: bool,
    /// Set once the double-check second pass has run.
    pub first_scrape_completed: bool,
}

impl TrackedEvent {
    /// Whether the id fields required by this event's source are present.
    pub fn has_required_ids(&self) -> bool {
        match self.source {
            EventSource::PrimaryMarketplace => self.marketplace_id.is_some(),
            EventSource::QueuePlatform => self.show_id.is_some() && self.queue_event_id.is_some(),
        }
    }

    /// ISO date-time of the performance, "YYYY-MM-DDTHH:MM:00".
    pub fn event_datetime(&self) -> String {
        format!("{}T{}:00", self.date.format("%Y-%m-%d"), self.time)
    }
}
