//! In-process delayed and repeating job execution.
//!
//! [`JobScheduler`] owns one timer task per job. When a timer elapses the
//! job is pushed onto the work queue, and [`JobQueue::run`] hands each fired
//! job to a [`JobHandler`] in its own task. Handler errors and panics are
//! logged with the track id and job kind and never reach the caller.
//!
//! Cancellation is best-effort: a job already on the queue still runs, so
//! handlers must re-read state before acting.

mod job;

pub use job::{Finalize, FiredJob, JobKind, PeriodicUpdate, PublishRates, WaitForFill};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, warn};

use crate::domain::time::{align_to_bucket, delay_until};
use crate::domain::{JobId, TrackId};
use crate::error::Result;
use crate::port::Clock;

/// Runs fired jobs.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: FiredJob) -> Result<()>;
}

struct Entry {
    name: &'static str,
    track_id: TrackId,
    cancel: watch::Sender<bool>,
}

struct Inner {
    jobs: DashMap<JobId, Entry>,
    queue: mpsc::UnboundedSender<FiredJob>,
    clock: Arc<dyn Clock>,
}

/// Handle used to schedule and cancel jobs. Cheap to clone.
#[derive(Clone)]
pub struct JobScheduler {
    inner: Arc<Inner>,
}

impl JobScheduler {
    /// Create a scheduler and the queue its jobs fire into.
    pub fn new(clock: Arc<dyn Clock>) -> (Self, JobQueue) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            inner: Arc::new(Inner {
                jobs: DashMap::new(),
                queue: tx,
                clock,
            }),
        };
        (scheduler, JobQueue { rx })
    }

    /// Fire `kind` once after `delay`.
    pub fn schedule_once(&self, kind: JobKind, delay: Duration) -> JobId {
        let (id, mut cancelled) = self.register(&kind);
        let inner = Arc::clone(&self.inner);
        let job_id = id.clone();

        debug!(job = kind.name(), track_id = %kind.track_id(), delay_ms = delay.as_millis() as u64, "Job scheduled");
        tokio::spawn(async move {
            tokio::select! {
                () = tokio::time::sleep(delay) => {
                    if inner.jobs.remove(&job_id).is_some() {
                        let _ = inner.queue.send(FiredJob { id: job_id, kind });
                    }
                }
                _ = cancelled.changed() => {}
            }
        });
        id
    }

    /// Fire `kind` every `every`, starting at the next bucket boundary, until
    /// the clock passes `until` (unix seconds).
    pub fn schedule_repeating(&self, kind: JobKind, every: Duration, until: i64) -> JobId {
        let (id, mut cancelled) = self.register(&kind);
        let inner = Arc::clone(&self.inner);
        let job_id = id.clone();

        let now = inner.clock.now();
        let first = Instant::now() + delay_until(now, align_to_bucket(now));
        debug!(job = kind.name(), track_id = %kind.track_id(), until, "Repeating job scheduled");

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(first, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if inner.clock.now() > until || !inner.jobs.contains_key(&job_id) {
                            break;
                        }
                        let fired = FiredJob { id: job_id.clone(), kind: kind.clone() };
                        if inner.queue.send(fired).is_err() {
                            break;
                        }
                    }
                    _ = cancelled.changed() => break,
                }
            }
            inner.jobs.remove(&job_id);
        });
        id
    }

    /// Cancel a job. Returns `false` if it had already fired, finished or
    /// been cancelled.
    pub fn cancel(&self, id: &JobId) -> bool {
        match self.inner.jobs.remove(id) {
            Some((_, entry)) => {
                let _ = entry.cancel.send(true);
                debug!(job = entry.name, track_id = %entry.track_id, "Job cancelled");
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn is_scheduled(&self, id: &JobId) -> bool {
        self.inner.jobs.contains_key(id)
    }

    /// Number of jobs whose timers are still running.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner.jobs.len()
    }

    /// Whether `track_id` has a live job named `name`.
    #[must_use]
    pub fn has_job(&self, track_id: &TrackId, name: &str) -> bool {
        self.inner
            .jobs
            .iter()
            .any(|e| &e.track_id == track_id && e.name == name)
    }

    fn register(&self, kind: &JobKind) -> (JobId, watch::Receiver<bool>) {
        let id = JobId::new();
        let (tx, rx) = watch::channel(false);
        self.inner.jobs.insert(
            id.clone(),
            Entry {
                name: kind.name(),
                track_id: kind.track_id().clone(),
                cancel: tx,
            },
        );
        (id, rx)
    }
}

/// Receiving end of the work queue.
pub struct JobQueue {
    rx: mpsc::UnboundedReceiver<FiredJob>,
}

impl JobQueue {
    /// Next fired job. `None` once every scheduler handle is dropped.
    pub async fn next(&mut self) -> Option<FiredJob> {
        self.rx.recv().await
    }

    /// Dispatch fired jobs to `handler` until shutdown.
    pub async fn run(mut self, handler: Arc<dyn JobHandler>, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                job = self.rx.recv() => {
                    let Some(job) = job else { break };
                    tokio::spawn(dispatch(Arc::clone(&handler), job));
                }
                result = shutdown.changed() => {
                    if result.is_err() || *shutdown.borrow() {
                        debug!("Job queue stopping");
                        break;
                    }
                }
            }
        }
    }
}

/// Run one job in its own task so a panic is contained and logged.
pub async fn dispatch(handler: Arc<dyn JobHandler>, job: FiredJob) {
    let name = job.kind.name();
    let track_id = job.kind.track_id().clone();
    let handle = tokio::spawn(async move { handler.handle(job).await });
    match handle.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(track_id = %track_id, job = name, error = %e, "Job failed"),
        Err(e) if e.is_panic() => error!(track_id = %track_id, job = name, "Job panicked"),
        Err(e) => warn!(track_id = %track_id, job = name, error = %e, "Job aborted"),
    }
}
