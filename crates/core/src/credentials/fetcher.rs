//! HTTP implementation of the header-fetch service client.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::metrics;

use super::config::CredentialPoolConfig;
use super::types::{CredentialError, HeaderBundle, HeaderFetchResponse, HeaderFetcher};

/// Client for the external header-fetch service.
///
/// The service returns `{success, headers, error?}`; a response without a
/// non-empty `Cookie` header is unusable and rejected. When the service URL
/// or key is not configured, every fetch fails with `NotConfigured` and the
/// pool degrades to fallback-only mode.
pub struct HttpHeaderFetcher {
    client: Client,
    url: Option<String>,
    api_key: Option<String>,
}

impl HttpHeaderFetcher {
    pub fn new(config: &CredentialPoolConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            url: config.fetch_url.clone(),
            api_key: config.fetch_api_key.clone(),
        }
    }
}

#[async_trait]
impl HeaderFetcher for HttpHeaderFetcher {
    async fn fetch(&self) -> Result<HeaderBundle, CredentialError> {
        let (url, api_key) = match (&self.url, &self.api_key) {
            (Some(url), Some(api_key)) => (url, api_key),
            _ => return Err(CredentialError::NotConfigured),
        };

        let endpoint = format!("{}/api/headers", url.trim_end_matches('/'));
        debug!(endpoint = %endpoint, "fetching header bundle");

        let response = self
            .client
            .get(&endpoint)
            .header("X-API-Key", api_key)
            .send()
            .await
            .map_err(|e| {
                metrics::CREDENTIAL_FETCHES.with_label_values(&["error"]).inc();
                CredentialError::FetchFailed(e.to_string())
            })?;

        if !response.status().is_success() {
            metrics::CREDENTIAL_FETCHES.with_label_values(&["error"]).inc();
            return Err(CredentialError::FetchFailed(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let body: HeaderFetchResponse = response.json().await.map_err(|e| {
            metrics::CREDENTIAL_FETCHES.with_label_values(&["error"]).inc();
            CredentialError::FetchFailed(format!("unexpected response shape: {}", e))
        })?;

        if !body.success {
            metrics::CREDENTIAL_FETCHES
                .with_label_values(&["rejected"])
                .inc();
            return Err(CredentialError::FetchRejected(
                body.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }

        let bundle = HeaderBundle::new(body.headers)?;
        metrics::CREDENTIAL_FETCHES.with_label_values(&["ok"]).inc();
        Ok(bundle)
    }
}
