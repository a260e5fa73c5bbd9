//! Credential pool configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the credential pool and its maintenance loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialPoolConfig {
    /// Base URL of the header-fetch service. When unset the pool runs in
    /// fallback-only mode and never replenishes.
    #[serde(default)]
    pub fetch_url: Option<String>,

    /// API key for the header-fetch service.
    #[serde(default)]
    pub fetch_api_key: Option<String>,

    /// Target number of active bundles the maintenance loop tops up to.
    #[serde(default = "default_min_headers")]
    pub min_headers: usize,

    /// Replenishing starts once the active count drops below this.
    #[serde(default = "default_refresh_threshold")]
    pub refresh_threshold: usize,

    /// Maintenance loop interval in seconds.
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,

    /// Random jitter added to each maintenance interval, in seconds.
    #[serde(default = "default_check_jitter")]
    pub check_jitter_secs: u64,

    /// Header-fetch request timeout in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Delay between consecutive fetches within one maintenance cycle.
    #[serde(default = "default_fetch_delay")]
    pub fetch_delay_secs: u64,

    /// Failures after which a bundle is deactivated and evicted.
    #[serde(default = "default_max_failures")]
    pub max_failures: u32,

    /// Bundles older than this are expired and swept.
    #[serde(default = "default_max_age_hours")]
    pub max_age_hours: i64,
}

fn default_min_headers() -> usize {
    20
}

fn default_refresh_threshold() -> usize {
    10
}

fn default_check_interval() -> u64 {
    300
}

fn default_check_jitter() -> u64 {
    30
}

fn default_fetch_timeout() -> u64 {
    120
}

fn default_fetch_delay() -> u64 {
    2
}

fn default_max_failures() -> u32 {
    3
}

fn default_max_age_hours() -> i64 {
    24
}

impl Default for CredentialPoolConfig {
    fn default() -> Self {
        Self {
            fetch_url: None,
            fetch_api_key: None,
            min_headers: default_min_headers(),
            refresh_threshold: default_refresh_threshold(),
            check_interval_secs: default_check_interval(),
            check_jitter_secs: default_check_jitter(),
            fetch_timeout_secs: default_fetch_timeout(),
            fetch_delay_secs: default_fetch_delay(),
            max_failures: default_max_failures(),
            max_age_hours: default_max_age_hours(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CredentialPoolConfig::default();
        assert!(config.fetch_url.is_none());
        assert_eq!(config.min_headers, 20);
        assert_eq!(config.refresh_threshold, 10);
        assert_eq!(config.check_interval_secs, 300);
        assert_eq!(config.fetch_timeout_secs, 120);
        assert_eq!(config.max_failures, 3);
        assert_eq!(config.max_age_hours, 24);
    }

    #[test]
    fn test_deserialize_partial() {
        let toml = r#"
            fetch_url = "https://headers.example.com"
            fetch_api_key = "key"
            refresh_threshold = 4
        "#;
        let config: CredentialPoolConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.fetch_url.as_deref(), Some("https://headers.example.com"));
        assert_eq!(config.refresh_threshold, 4);
        assert_eq!(config.min_headers, 20);
    }
}
