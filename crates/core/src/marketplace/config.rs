//! Marketplace client configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the primary-marketplace client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketplaceConfig {
    /// Event discovery endpoint.
    pub discovery_url: String,

    /// Seat-quote (quickpicks) endpoint base.
    pub quickpicks_url: String,

    /// Public API key sent with seat-quote requests.
    #[serde(default)]
    pub api_key: Option<String>,

    /// API secret sent with seat-quote requests.
    #[serde(default)]
    pub api_secret: Option<String>,

    /// Consumer key sent with discovery requests.
    #[serde(default)]
    pub consumer_key: Option<String>,

    /// Discovery page size.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Seat-quote page size (offset/limit pagination).
    #[serde(default = "default_seat_page_limit")]
    pub seat_page_limit: u32,

    /// Attempts per page before giving up on the unit of work.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_page_size() -> u32 {
    200
}

fn default_seat_page_limit() -> u32 {
    40
}

fn default_max_retries() -> u32 {
    3
}

fn default_timeout() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_minimal() {
        let toml = r#"
            discovery_url = "https://discovery.example.com/v2/events"
            quickpicks_url = "https://quotes.example.com/api"
        "#;
        let config: MarketplaceConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.page_size, 200);
        assert_eq!(config.seat_page_limit, 40);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.timeout_secs, 30);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_deserialize_full() {
        let toml = r#"
            discovery_url = "https://discovery.example.com/v2/events"
            quickpicks_url = "https://quotes.example.com/api"
            api_key = "k"
            api_secret = "s"
            consumer_key = "ck"
            page_size = 100
            seat_page_limit = 20
            max_retries = 5
            timeout_secs = 10
        "#;
        let config: MarketplaceConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.page_size, 100);
        assert_eq!(config.seat_page_limit, 20);
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.timeout_secs, 10);
    }
}
