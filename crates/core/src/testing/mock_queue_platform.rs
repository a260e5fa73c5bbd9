//! Mock queue-platform client for testing.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::event::{ExcludedSeats, KeywordRules};
use crate::marketplace::RawSeat;
use crate::queue_platform::QueuePlatformApi;

/// A recorded `get_seats` call for assertions.
#[derive(Debug, Clone)]
pub struct RecordedSeatRequest {
    pub show_id: String,
    pub event_id: String,
    pub rules: KeywordRules,
    pub excluded_seats: ExcludedSeats,
}

/// Mock implementation of the [`QueuePlatformApi`] trait.
#[derive(Default)]
pub struct MockQueuePlatform {
    seats: Mutex<Vec<RawSeat>>,
    requests: Mutex<Vec<RecordedSeatRequest>>,
}

impl MockQueuePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the seats returned by every `get_seats` call.
    pub fn set_seats(&self, seats: Vec<RawSeat>) {
        *self.seats.lock().unwrap() = seats;
    }

    /// Recorded calls, in order.
    pub fn requests(&self) -> Vec<RecordedSeatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueuePlatformApi for MockQueuePlatform {
    async fn get_seats(
        &self,
        show_id: &str,
        event_id: &str,
        rules: &KeywordRules,
        excluded_seats: &ExcludedSeats,
    ) -> Vec<RawSeat> {
        self.requests.lock().unwrap().push(RecordedSeatRequest {
            show_id: show_id.to_string(),
            event_id: event_id.to_string(),
            rules: rules.clone(),
            excluded_seats: excluded_seats.clone(),
        });
        self.seats.lock().unwrap().clone()
    }
}
