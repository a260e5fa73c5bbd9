//! Types for the credential pool.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Header key carrying the session cookie.
pub const COOKIE_HEADER: &str = "Cookie";

/// Header stamped with a fresh uuid on every served bundle.
pub const CORRELATION_HEADER: &str = "X-Correlation-Id";

/// Errors from credential operations.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("header bundle is missing a session cookie")]
    MissingCookie,

    #[error("header-fetch service is not configured")]
    NotConfigured,

    #[error("header fetch failed: {0}")]
    FetchFailed(String),

    #[error("header-fetch service rejected the request: {0}")]
    FetchRejected(String),

    #[error("database error: {0}")]
    Database(String),
}

/// A validated bundle of HTTP headers impersonating a marketplace session.
///
/// Bundles built through [`HeaderBundle::new`] always carry a non-empty
/// session cookie; the cookie doubles as the bundle's identity for failure
/// reporting and duplicate rejection. The [`HeaderBundle::fallback`] bundle
/// is the one exception: generic browser headers with no cookie, served when
/// the pool is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderBundle {
    headers: HashMap<String, String>,
}

impl HeaderBundle {
    /// Build a bundle, rejecting header maps without a session cookie.
    pub fn new(headers: HashMap<String, String>) -> Result<Self, CredentialError> {
        match headers.get(COOKIE_HEADER) {
            Some(cookie) if !cookie.trim().is_empty() => Ok(Self { headers }),
            _ => Err(CredentialError::MissingCookie),
        }
    }

    /// Generic browser headers used when no authenticated bundle is
    /// available. Degraded mode: requests still go out, without a session.
    pub fn fallback() -> Self {
        let headers = [
            (
                "User-Agent",
                "Mozilla/5.0 (X11; Linux x86_64; rv:133.0) Gecko/20100101 Firefox/133.0",
            ),
            ("Accept", "*/*"),
            ("Accept-Language", "en-US,en;q=0.5"),
            ("Accept-Encoding", "gzip, deflate, br, zstd"),
            ("Connection", "keep-alive"),
            ("Sec-Fetch-Dest", "empty"),
            ("Sec-Fetch-Mode", "cors"),
            ("Sec-Fetch-Site", "same-site"),
            ("Pragma", "no-cache"),
            ("Cache-Control", "no-cache"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self { headers }
    }

    /// The session cookie, if any. `None` only for the fallback bundle.
    pub fn cookie(&self) -> Option<&str> {
        self.headers
            .get(COOKIE_HEADER)
            .map(String::as_str)
            .filter(|c| !c.trim().is_empty())
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Stamp a fresh correlation id onto the bundle.
    pub fn with_correlation_id(mut self) -> Self {
        self.headers.insert(
            CORRELATION_HEADER.to_string(),
            uuid::Uuid::new_v4().to_string(),
        );
        self
    }
}

/// A persisted credential bundle with its rotation bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub id: i64,
    pub bundle: HeaderBundle,
    pub created_at: DateTime<Utc>,
    pub last_used: Option<DateTime<Utc>>,
    pub failures: u32,
    pub active: bool,
}

/// Response shape of the external header-fetch service.
#[derive(Debug, Deserialize)]
pub struct HeaderFetchResponse {
    pub success: bool,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Trait for the external header-fetch service.
#[async_trait]
pub trait HeaderFetcher: Send + Sync {
    /// Fetch one fresh header bundle.
    async fn fetch(&self) -> Result<HeaderBundle, CredentialError>;
}
