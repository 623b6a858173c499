//! Time bucket arithmetic.
//!
//! Every rate lookup and every job delay is expressed in terms of
//! 5-second buckets. [`align_to_bucket`] is the only place that rounds.

use std::time::Duration;

/// Width of one rate bucket in seconds.
pub const BUCKET_SECS: i64 = 5;

/// Round a unix timestamp (seconds) up to the next multiple of [`BUCKET_SECS`].
///
/// Timestamps already on a boundary are returned unchanged.
#[must_use]
pub const fn align_to_bucket(ts: i64) -> i64 {
    let rem = ts.rem_euclid(BUCKET_SECS);
    if rem == 0 {
        ts
    } else {
        ts + (BUCKET_SECS - rem)
    }
}

/// Most recent bucket strictly before the one `ts` falls into.
///
/// The rate poller stores prices under the bucket it is about to close, so
/// this is the newest bucket that is guaranteed to be complete at `ts`.
#[must_use]
pub const fn last_settled_bucket(ts: i64) -> i64 {
    align_to_bucket(ts) - BUCKET_SECS
}

/// Delay from `now` until `target`, saturating at zero.
#[must_use]
pub fn delay_until(now: i64, target: i64) -> Duration {
    Duration::from_secs(u64::try_from(target - now).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aligned_timestamps_are_unchanged() {
        assert_eq!(align_to_bucket(1_700_000_000), 1_700_000_000);
        assert_eq!(align_to_bucket(0), 0);
    }

    #[test]
    fn unaligned_timestamps_round_up() {
        assert_eq!(align_to_bucket(1_700_000_001), 1_700_000_005);
        assert_eq!(align_to_bucket(1_700_000_004), 1_700_000_005);
        assert_eq!(align_to_bucket(-3), 0);
    }

    #[test]
    fn settled_bucket_trails_the_open_one() {
        assert_eq!(last_settled_bucket(1_700_000_000), 1_699_999_995);
        assert_eq!(last_settled_bucket(1_700_000_003), 1_700_000_000);
    }

    #[test]
    fn delay_until_saturates_in_the_past() {
        assert_eq!(delay_until(100, 90), Duration::ZERO);
        assert_eq!(delay_until(100, 108), Duration::from_secs(8));
    }
}
