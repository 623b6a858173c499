//! Rate feed configuration.

use serde::Deserialize;

use crate::adapter::outbound::rates::DEFAULT_TTL_SECS;

/// `[rates]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RatesConfig {
    /// Run the HTTP poller. Disable when another process fills the cache.
    pub enabled: bool,
    pub source_url: String,
    pub poll_interval_secs: u64,
    /// How long a bucket stays in the cache.
    pub ttl_secs: i64,
}

impl Default for RatesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            source_url: "https://min-api.cryptocompare.com".to_string(),
            poll_interval_secs: 5,
            ttl_secs: DEFAULT_TTL_SECS,
        }
    }
}
