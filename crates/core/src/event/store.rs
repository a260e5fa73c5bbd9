//! Event storage trait.

use chrono::NaiveDate;
use thiserror::Error;

use super::types::{EventSource, ExcludedSeats, KeywordRules, TrackedEvent};

/// Errors from event storage operations.
#[derive(Debug, Error)]
pub enum EventStoreError {
    #[error("event not found: {0}")]
    NotFound(i64),

    #[error("database error: {0}")]
    Database(String),
}

/// Request to register a new tracked event.
#[derive(Debug, Clone)]
pub struct NewTrackedEvent {
    pub source: EventSource,
    pub external_id: String,
    pub marketplace_id: Option<String>,
    pub show_id: Option<String>,
    pub queue_event_id: Option<String>,
    pub name: String,
    pub city: Option<String>,
    pub date: NaiveDate,
    pub time: String,
    pub venue: Option<String>,
    pub markup: f64,
    pub stock_type: Option<String>,
    pub in_hand: Option<String>,
    pub in_hand_date: Option<NaiveDate>,
    pub double_check: bool,
}

/// Trait for tracked-event storage backends.
pub trait EventStore: Send + Sync {
    /// Register a new event. Events are normally created by the dashboard;
    /// the core uses this for imports and tests.
    fn insert(&self, event: NewTrackedEvent) -> Result<TrackedEvent, EventStoreError>;

    /// Get an event by id.
    fn get(&self, id: i64) -> Result<Option<TrackedEvent>, EventStoreError>;

    /// List events of the given source whose required id fields are present.
    fn list_eligible(&self, source: EventSource) -> Result<Vec<TrackedEvent>, EventStoreError>;

    /// Mark the double-check second pass as done for an event.
    fn mark_first_scrape_completed(&self, id: i64) -> Result<(), EventStoreError>;

    /// Keyword rules attached to an event (rule type -> keyword).
    fn keyword_rules(&self, event_id: i64) -> Result<KeywordRules, EventStoreError>;

    /// Active seat-exclusion sets for (event name, venue name), keyed by
    /// "{section}_{row}".
    fn excluded_seats(
        &self,
        event_name: &str,
        venue_name: &str,
    ) -> Result<ExcludedSeats, EventStoreError>;
}
