//! Mock marketplace for testing.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::marketplace::{DiscoveredEvent, MarketplaceApi, RawSeat};

/// Mock implementation of the [`MarketplaceApi`] trait.
///
/// Seat results can be configured statically per event id, or queued as
/// one-shot responses (consumed in order before the static result) to drive
/// multi-pass scenarios like the double-check protocol. All calls are
/// recorded for assertions.
#[derive(Default)]
pub struct MockMarketplace {
    seats: Mutex<HashMap<String, Vec<RawSeat>>>,
    queued_seats: Mutex<HashMap<String, VecDeque<Vec<RawSeat>>>>,
    search_results: Mutex<Vec<DiscoveredEvent>>,
    seat_calls: Mutex<Vec<String>>,
    search_calls: Mutex<Vec<String>>,
    seat_delay_ms: AtomicU64,
}

impl MockMarketplace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the static seat result for an event id.
    pub fn set_seats(&self, event_id: &str, seats: Vec<RawSeat>) {
        self.seats
            .lock()
            .unwrap()
            .insert(event_id.to_string(), seats);
    }

    /// Queue a one-shot seat result for an event id, consumed before the
    /// static result.
    pub fn queue_seats(&self, event_id: &str, seats: Vec<RawSeat>) {
        self.queued_seats
            .lock()
            .unwrap()
            .entry(event_id.to_string())
            .or_default()
            .push_back(seats);
    }

    /// Set the result returned by every search.
    pub fn set_search_results(&self, results: Vec<DiscoveredEvent>) {
        *self.search_results.lock().unwrap() = results;
    }

    /// Simulate network latency on every `get_seats` call.
    pub fn set_seat_delay(&self, delay: Duration) {
        self.seat_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Event ids passed to `get_seats`, in call order.
    pub fn seat_calls(&self) -> Vec<String> {
        self.seat_calls.lock().unwrap().clone()
    }

    /// Queries passed to `search`, in call order.
    pub fn search_calls(&self) -> Vec<String> {
        self.search_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MarketplaceApi for MockMarketplace {
    async fn search(
        &self,
        name: &str,
        _city: &str,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> Vec<DiscoveredEvent> {
        self.search_calls.lock().unwrap().push(name.to_string());
        self.search_results.lock().unwrap().clone()
    }

    async fn get_seats(&self, event_id: &str) -> Vec<RawSeat> {
        self.seat_calls.lock().unwrap().push(event_id.to_string());

        let delay_ms = self.seat_delay_ms.load(Ordering::SeqCst);
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }

        if let Some(queue) = self.queued_seats.lock().unwrap().get_mut(event_id) {
            if let Some(seats) = queue.pop_front() {
                return seats;
            }
        }

        self.seats
            .lock()
            .unwrap()
            .get(event_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[tokio::test]
    async fn test_static_and_queued_seats() {
        let mock = MockMarketplace::new();
        mock.set_seats("E1", vec![fixtures::raw_seat("A", "1", "1,2", 10.0)]);
        mock.queue_seats("E1", vec![]);

        // Queued result first, then the static one.
        assert!(mock.get_seats("E1").await.is_empty());
        assert_eq!(mock.get_seats("E1").await.len(), 1);

        // Unknown event id yields empty.
        assert!(mock.get_seats("E2").await.is_empty());

        assert_eq!(mock.seat_calls(), vec!["E1", "E1", "E2"]);
    }
}
