//! Canonical test configurations.
//!
//! Single source of truth for settings used across tests.

use std::time::Duration;

use crate::application::race::RaceSettings;
use crate::infrastructure::config::settings::Config;

/// Race settings with a one-minute race and no lobby seeding.
pub fn settings() -> RaceSettings {
    RaceSettings {
        duration: 60,
        fill_wait: Duration::from_secs(5),
        update_interval: Duration::from_secs(5),
        finalize_grace: 5,
        finalize_retry: Duration::from_secs(5),
        finalize_max_attempts: 3,
        rate_publish_delay: Duration::from_secs(6),
        seat_counts: Vec::new(),
        ..RaceSettings::default()
    }
}

/// Default config with the network poller off.
pub fn offline() -> Config {
    let mut config = Config::default();
    config.rates.enabled = false;
    config
}
