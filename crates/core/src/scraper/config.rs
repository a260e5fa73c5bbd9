//! Scraper configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the scrape orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// Directory the CSV artifacts are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Worker-pool size used when a job does not specify one.
    #[serde(default = "default_concurrency")]
    pub default_concurrency: usize,

    /// Cooldown between the two double-check passes, in seconds.
    #[serde(default = "default_double_check_delay")]
    pub double_check_delay_secs: u64,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_concurrency() -> usize {
    5
}

fn default_double_check_delay() -> u64 {
    1200
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            default_concurrency: default_concurrency(),
            double_check_delay_secs: default_double_check_delay(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ScraperConfig::default();
        assert_eq!(config.output_dir, PathBuf::from("output"));
        assert_eq!(config.default_concurrency, 5);
        assert_eq!(config.double_check_delay_secs, 1200);
    }

    #[test]
    fn test_deserialize_partial() {
        let toml = r#"
            double_check_delay_secs = 900
        "#;
        let config: ScraperConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.double_check_delay_secs, 900);
        assert_eq!(config.default_concurrency, 5);
    }
}
