//! Tracked events and their storage.
//!
//! A [`TrackedEvent`] is a show being monitored for sellable seat inventory.
//! Events are created externally (dashboard, discovery import); the core only
//! reads them and flips `first_scrape_completed`. The store also serves two
//! read-only collaborator tables: per-event keyword rules and venue-level
//! seat-exclusion sets.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteEventStore;
pub use store::{EventStore, EventStoreError, NewTrackedEvent};
pub use types::{EventSource, ExcludedSeats, KeywordRules, TrackedEvent};
