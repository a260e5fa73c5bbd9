use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::credentials::CredentialPoolConfig;
use crate::marketplace::MarketplaceConfig;
use crate::scraper::ScraperConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub credentials: CredentialPoolConfig,
    pub marketplace: MarketplaceConfig,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("stubhound.db")
}
