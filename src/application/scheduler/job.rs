//! Job kinds and their typed payloads.

use crate::domain::{JobId, TrackId};

/// Re-check a forming track after the fill-wait delay and backfill bots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitForFill {
    pub track_id: TrackId,
    /// Seat count when the job was scheduled. Backfill only runs if no
    /// one has joined since.
    pub seen_players: usize,
}

/// Broadcast provisional standings of an active track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodicUpdate {
    pub track_id: TrackId,
}

/// Score and close an active track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finalize {
    pub track_id: TrackId,
    /// The periodic-update job to stop, if one was scheduled.
    pub periodic_job: Option<JobId>,
    /// 1 for the first run; bumped on every rate-unavailable retry.
    pub attempt: u32,
}

/// Publish the rate snapshot of one bucket on-chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRates {
    pub track_id: TrackId,
    pub bucket: i64,
}

/// Every kind of job the scheduler runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobKind {
    WaitForFill(WaitForFill),
    PeriodicUpdate(PeriodicUpdate),
    Finalize(Finalize),
    PublishRates(PublishRates),
}

impl JobKind {
    /// Stable name used in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::WaitForFill(_) => "wait_for_fill",
            Self::PeriodicUpdate(_) => "periodic_update",
            Self::Finalize(_) => "finalize",
            Self::PublishRates(_) => "publish_rates",
        }
    }

    #[must_use]
    pub fn track_id(&self) -> &TrackId {
        match self {
            Self::WaitForFill(j) => &j.track_id,
            Self::PeriodicUpdate(j) => &j.track_id,
            Self::Finalize(j) => &j.track_id,
            Self::PublishRates(j) => &j.track_id,
        }
    }
}

/// A job whose timer has elapsed, ready for its handler.
#[derive(Debug, Clone)]
pub struct FiredJob {
    pub id: JobId,
    pub kind: JobKind,
}
