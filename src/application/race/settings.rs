//! Tunables of the race lifecycle.

use std::time::Duration;

use rust_decimal::Decimal;

/// Runtime settings consumed by the coordinator.
///
/// Built from [`RaceConfig`](crate::infrastructure::config::race::RaceConfig).
#[derive(Debug, Clone)]
pub struct RaceSettings {
    /// Race length in seconds.
    pub duration: i64,
    /// How long a forming track waits for humans before bots fill it.
    pub fill_wait: Duration,
    /// Cadence of `positionUpdate` broadcasts.
    pub update_interval: Duration,
    /// Seconds after `end` before a race is finalized.
    pub finalize_grace: i64,
    /// Delay before retrying a finalize that found no rates.
    pub finalize_retry: Duration,
    pub finalize_max_attempts: u32,
    /// Delay after a start/end bucket before its rates are published on-chain.
    pub rate_publish_delay: Duration,
    /// Amount paid to each winner.
    pub prize: Decimal,
    /// Seat counts the lobby keeps open tracks for.
    pub seat_counts: Vec<usize>,
    pub tracks_per_seat_count: usize,
    pub default_bet: Decimal,
    pub max_listed_tracks: usize,
    /// Compare-and-swap attempts before a contended write gives up.
    pub write_retry_limit: u32,
}

impl Default for RaceSettings {
    fn default() -> Self {
        Self {
            duration: 300,
            fill_wait: Duration::from_secs(5),
            update_interval: Duration::from_secs(5),
            finalize_grace: 5,
            finalize_retry: Duration::from_secs(5),
            finalize_max_attempts: 5,
            rate_publish_delay: Duration::from_secs(6),
            prize: Decimal::new(1, 1),
            seat_counts: vec![2, 4, 6],
            tracks_per_seat_count: 1,
            default_bet: Decimal::new(1, 2),
            max_listed_tracks: 1000,
            write_retry_limit: 5,
        }
    }
}
