//! Clock implementations.

use tokio::time::Instant;

use crate::port::Clock;

/// Wall clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Clock that follows tokio's timer.
///
/// Reports `origin` plus the tokio time elapsed since construction, so it
/// advances together with `tokio::time::pause`/`advance` in tests and stays
/// consistent with the scheduler's sleeps.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    origin: i64,
    anchor: Instant,
}

impl TokioClock {
    #[must_use]
    pub fn new(origin: i64) -> Self {
        Self {
            origin,
            anchor: Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> i64 {
        let elapsed = i64::try_from(self.anchor.elapsed().as_secs()).unwrap_or(i64::MAX);
        self.origin.saturating_add(elapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn tokio_clock_follows_paused_time() {
        let clock = TokioClock::new(1_000);
        assert_eq!(clock.now(), 1_000);
        tokio::time::advance(Duration::from_millis(5_500)).await;
        assert_eq!(clock.now(), 1_005);
    }

    #[test]
    fn system_clock_is_after_2020() {
        assert!(SystemClock.now() > 1_577_836_800);
    }
}
