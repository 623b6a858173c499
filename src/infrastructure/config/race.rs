//! Race lifecycle configuration.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::application::race::RaceSettings;
use crate::error::{ConfigError, Result};

/// `[race]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    /// Race length in seconds.
    pub duration_secs: i64,
    /// Wait after the last join before bots fill the track.
    pub fill_wait_secs: u64,
    pub update_interval_secs: u64,
    /// Seconds after the race end before standings are finalized.
    pub finalize_grace_secs: i64,
    pub finalize_retry_secs: u64,
    pub finalize_max_attempts: u32,
    /// How often overdue active tracks are swept.
    pub sweep_interval_secs: u64,
    pub rate_publish_delay_secs: u64,
    pub prize: Decimal,
    pub seat_counts: Vec<usize>,
    pub tracks_per_seat_count: usize,
    pub default_bet: Decimal,
    pub max_listed_tracks: usize,
    pub write_retry_limit: u32,
}

impl Default for RaceConfig {
    fn default() -> Self {
        let s = RaceSettings::default();
        Self {
            duration_secs: s.duration,
            fill_wait_secs: s.fill_wait.as_secs(),
            update_interval_secs: s.update_interval.as_secs(),
            finalize_grace_secs: s.finalize_grace,
            finalize_retry_secs: s.finalize_retry.as_secs(),
            finalize_max_attempts: s.finalize_max_attempts,
            sweep_interval_secs: 30,
            rate_publish_delay_secs: s.rate_publish_delay.as_secs(),
            prize: s.prize,
            seat_counts: s.seat_counts,
            tracks_per_seat_count: s.tracks_per_seat_count,
            default_bet: s.default_bet,
            max_listed_tracks: s.max_listed_tracks,
            write_retry_limit: s.write_retry_limit,
        }
    }
}

fn positive(field: &'static str, ok: bool) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field,
            reason: "must be greater than 0".to_string(),
        }
        .into())
    }
}

impl RaceConfig {
    /// # Errors
    ///
    /// [`ConfigError::InvalidValue`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        positive("duration_secs", self.duration_secs > 0)?;
        positive("update_interval_secs", self.update_interval_secs > 0)?;
        positive("finalize_max_attempts", self.finalize_max_attempts > 0)?;
        positive("sweep_interval_secs", self.sweep_interval_secs > 0)?;
        positive("write_retry_limit", self.write_retry_limit > 0)?;
        positive("max_listed_tracks", self.max_listed_tracks > 0)?;
        if self.finalize_grace_secs < 0 {
            return Err(ConfigError::InvalidValue {
                field: "finalize_grace_secs",
                reason: "must be 0 or greater".to_string(),
            }
            .into());
        }
        if self.prize < Decimal::ZERO || self.default_bet < Decimal::ZERO {
            return Err(ConfigError::InvalidValue {
                field: "prize",
                reason: "prize and default_bet must be 0 or greater".to_string(),
            }
            .into());
        }
        if self.seat_counts.iter().any(|&n| n == 0) {
            return Err(ConfigError::InvalidValue {
                field: "seat_counts",
                reason: "every seat count must be at least 1".to_string(),
            }
            .into());
        }
        Ok(())
    }

    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    #[must_use]
    pub fn settings(&self) -> RaceSettings {
        RaceSettings {
            duration: self.duration_secs,
            fill_wait: Duration::from_secs(self.fill_wait_secs),
            update_interval: Duration::from_secs(self.update_interval_secs),
            finalize_grace: self.finalize_grace_secs,
            finalize_retry: Duration::from_secs(self.finalize_retry_secs),
            finalize_max_attempts: self.finalize_max_attempts,
            rate_publish_delay: Duration::from_secs(self.rate_publish_delay_secs),
            prize: self.prize,
            seat_counts: self.seat_counts.clone(),
            tracks_per_seat_count: self.tracks_per_seat_count,
            default_bet: self.default_bet,
            max_listed_tracks: self.max_listed_tracks,
            write_retry_limit: self.write_retry_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_settings_defaults() {
        let settings = RaceConfig::default().settings();
        assert_eq!(settings.duration, 300);
        assert_eq!(settings.finalize_grace, 5);
        assert_eq!(settings.seat_counts, [2, 4, 6]);
    }

    #[test]
    fn zero_duration_is_rejected() {
        let config = RaceConfig {
            duration_secs: 0,
            ..RaceConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
