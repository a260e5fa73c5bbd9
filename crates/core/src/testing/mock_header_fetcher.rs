//! Mock header-fetch service for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::credentials::{CredentialError, HeaderBundle, HeaderFetcher};
use crate::testing::fixtures;

enum QueuedResponse {
    Bundle(HeaderBundle),
    Error(String),
}

/// Mock implementation of the [`HeaderFetcher`] trait.
///
/// Responses can be queued (bundles or errors, consumed in order); once the
/// queue is empty each fetch yields a fresh bundle with a unique cookie, so
/// replenish loops always make progress unless told otherwise.
#[derive(Default)]
pub struct MockHeaderFetcher {
    responses: Mutex<VecDeque<QueuedResponse>>,
    fetch_count: AtomicUsize,
    generated: AtomicUsize,
}

impl MockHeaderFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a bundle with the given cookie.
    pub fn queue_cookie(&self, cookie: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(QueuedResponse::Bundle(fixtures::header_bundle(cookie)));
    }

    /// Queue a fetch failure.
    pub fn queue_error(&self, message: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(QueuedResponse::Error(message.to_string()));
    }

    /// Number of fetches performed.
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HeaderFetcher for MockHeaderFetcher {
    async fn fetch(&self) -> Result<HeaderBundle, CredentialError> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);

        match self.responses.lock().unwrap().pop_front() {
            Some(QueuedResponse::Bundle(bundle)) => Ok(bundle),
            Some(QueuedResponse::Error(message)) => Err(CredentialError::FetchFailed(message)),
            None => {
                let n = self.generated.fetch_add(1, Ordering::SeqCst);
                Ok(fixtures::header_bundle(&format!("session=mock-{}", n)))
            }
        }
    }
}
