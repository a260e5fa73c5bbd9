//! Shared test fixtures.

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::credentials::HeaderBundle;
use crate::event::{EventSource, NewTrackedEvent, TrackedEvent};
use crate::marketplace::RawSeat;

/// A raw seat with sensible defaults (face value = 80% of price, no fees).
pub fn raw_seat(section: &str, row: &str, seats: &str, price: f64) -> RawSeat {
    RawSeat {
        section: section.to_string(),
        row: row.to_string(),
        seats: seats.to_string(),
        price,
        face_value: price * 0.8,
        fees: None,
    }
}

/// A header bundle carrying the given session cookie.
pub fn header_bundle(cookie: &str) -> HeaderBundle {
    let mut headers = HashMap::new();
    headers.insert("Cookie".to_string(), cookie.to_string());
    headers.insert("User-Agent".to_string(), "fixture-agent".to_string());
    HeaderBundle::new(headers).expect("fixture bundle carries a cookie")
}

fn base_new_event(source: EventSource, external_id: &str) -> NewTrackedEvent {
    NewTrackedEvent {
        source,
        external_id: external_id.to_string(),
        marketplace_id: None,
        show_id: None,
        queue_event_id: None,
        name: format!("Event {}", external_id),
        city: Some("New York".to_string()),
        date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        time: "19:30".to_string(),
        venue: Some("Test Hall".to_string()),
        markup: 1.6,
        stock_type: None,
        in_hand: None,
        in_hand_date: None,
        double_check: false,
    }
}

/// A new primary-marketplace event ready for insertion.
pub fn new_primary_event(external_id: &str, marketplace_id: &str) -> NewTrackedEvent {
    let mut event = base_new_event(EventSource::PrimaryMarketplace, external_id);
    event.marketplace_id = Some(marketplace_id.to_string());
    event
}

/// A new queue-platform event ready for insertion.
pub fn new_queue_event(external_id: &str, show_id: &str, queue_event_id: &str) -> NewTrackedEvent {
    let mut event = base_new_event(EventSource::QueuePlatform, external_id);
    event.show_id = Some(show_id.to_string());
    event.queue_event_id = Some(queue_event_id.to_string());
    event
}

/// A standalone primary-marketplace event (not persisted).
pub fn primary_event(external_id: &str, marketplace_id: &str) -> TrackedEvent {
    let new = new_primary_event(external_id, marketplace_id);
    TrackedEvent {
        id: 0,
        source: new.source,
        external_id: new.external_id,
        marketplace_id: new.marketplace_id,
        show_id: new.show_id,
        queue_event_id: new.queue_event_id,
        name: new.name,
        city: new.city,
        date: new.date,
        time: new.time,
        venue: new.venue,
        markup: new.markup,
        stock_type: new.stock_type,
        in_hand: new.in_hand,
        in_hand_date: new.in_hand_date,
        double_check: new.double_check,
        first_scrape_completed: false,
    }
}
