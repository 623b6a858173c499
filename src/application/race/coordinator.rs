//! Race coordinator: wires the state machine, scheduler, scoring, backfill
//! and chain mirror together and exposes the race API.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};

use super::backfill::{BotBackfill, BotPool, RaceEntry};
use super::machine::{Activation, Finish, RaceMachine};
use super::scoreboard::{final_standings, Scoreboard};
use super::settings::RaceSettings;
use crate::application::chain::ChainGateway;
use crate::application::scheduler::{
    Finalize, FiredJob, JobHandler, JobKind, JobScheduler, PeriodicUpdate, PublishRates,
    WaitForFill,
};
use crate::domain::time::{align_to_bucket, delay_until, last_settled_bucket};
use crate::domain::{
    AssetMix, ChainAccount, Portfolio, RewardPolicy, Standing, Track, TrackId, TrackKind,
    TrackStatus, User,
};
use crate::error::{RaceError, Result};
use crate::port::outbound::transport::{user_room, LOBBY_ROOM};
use crate::port::{
    AssetInput, ChainClient, Clock, EventSink, JoinedTrack, PlayerPosition, PortfolioStore,
    RaceApi, RaceCall, RaceEvent, RaceInit, RateCache, TrackStore, TxHash, UserDirectory,
};

/// Outbound ports the coordinator depends on.
#[derive(Clone)]
pub struct RacePorts {
    pub tracks: Arc<dyn TrackStore>,
    pub portfolios: Arc<dyn PortfolioStore>,
    pub users: Arc<dyn UserDirectory>,
    pub rates: Arc<dyn RateCache>,
    pub chain: Arc<dyn ChainClient>,
    pub events: Arc<dyn EventSink>,
    pub clock: Arc<dyn Clock>,
}

/// What [`RaceCoordinator::recover`] found on startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Recovery {
    /// Active tracks whose jobs were scheduled again.
    pub resumed: usize,
    /// Awaiting tracks that got a new fill-wait countdown or were started.
    pub forming: usize,
}

pub struct RaceCoordinator {
    machine: RaceMachine,
    scoreboard: Scoreboard,
    backfill: BotBackfill,
    tracks: Arc<dyn TrackStore>,
    portfolios: Arc<dyn PortfolioStore>,
    rates: Arc<dyn RateCache>,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
    chain: ChainGateway,
    scheduler: JobScheduler,
    reward: RewardPolicy,
    settings: RaceSettings,
}

impl RaceCoordinator {
    /// `owner` signs backend-originated chain calls.
    pub fn new(
        ports: RacePorts,
        owner: ChainAccount,
        scheduler: JobScheduler,
        settings: RaceSettings,
    ) -> Self {
        let machine = RaceMachine::new(
            Arc::clone(&ports.tracks),
            Arc::clone(&ports.portfolios),
            Arc::clone(&ports.clock),
            settings.write_retry_limit,
        );
        let scoreboard = Scoreboard::new(Arc::clone(&ports.portfolios), Arc::clone(&ports.rates));
        let backfill = BotBackfill::new(BotPool::new(ports.users), Arc::clone(&ports.tracks));

        Self {
            machine,
            scoreboard,
            backfill,
            tracks: ports.tracks,
            portfolios: ports.portfolios,
            rates: ports.rates,
            events: ports.events,
            clock: ports.clock,
            chain: ChainGateway::new(ports.chain, owner),
            scheduler,
            reward: RewardPolicy::new(settings.prize),
            settings,
        }
    }

    #[must_use]
    pub fn scheduler(&self) -> &JobScheduler {
        &self.scheduler
    }

    #[must_use]
    pub fn settings(&self) -> &RaceSettings {
        &self.settings
    }

    /// Mirror a call on-chain. Failures are logged; the off-chain state
    /// stays authoritative.
    async fn mirror(&self, from: Option<&ChainAccount>, call: RaceCall) {
        let method = call.method();
        let result = match from {
            Some(account) => self.chain.submit(account, call).await,
            None => self.chain.submit_as_owner(call).await,
        };
        if let Err(e) = result {
            warn!(method, error = %e, "Chain mirror failed");
        }
    }

    /// Seat a player, mirror the join on-chain and start the race if this
    /// join completed it. Shared by humans and bots.
    async fn enter_race(&self, user: &User, track_id: &TrackId, mix: AssetMix, lane: u8) -> Result<Track> {
        let seated = self.machine.join(user, track_id, mix.clone(), lane).await?;

        self.mirror(
            Some(&user.account),
            RaceCall::JoinTrack {
                track_id: track_id.clone(),
                bet_amount: seated.bet_amount,
            },
        )
        .await;
        self.mirror(
            Some(&user.account),
            RaceCall::SetPortfolio {
                track_id: track_id.clone(),
                assets: mix.assets().to_vec(),
            },
        )
        .await;

        self.events
            .emit(
                &track_id.room(),
                RaceEvent::JoinedTrack(JoinedTrack {
                    track_id: track_id.to_string(),
                    user_id: user.id.clone(),
                    fuel: mix.assets().to_vec(),
                    ship: lane,
                }),
            )
            .await;
        info!(track_id = %track_id, user_id = %user.id, bot = user.is_bot, seats = seated.num_players, "Player joined");

        // The seat is already stored; a failed activation check is retried
        // by the fill-wait countdown or on recovery.
        match self.machine.try_activate(track_id).await {
            Ok(Activation::Activated(active)) => {
                self.start_race(&active).await;
                Ok(active)
            }
            Ok(Activation::NotReady(track) | Activation::AlreadyActive(track)) => Ok(track),
            Err(e) => {
                error!(track_id = %track_id, user_id = %user.id, error = %e, "Activation check failed after join");
                Ok(seated)
            }
        }
    }

    /// Schedule the jobs of a freshly activated track and announce it.
    ///
    /// Called only by the caller that performed the activation.
    async fn start_race(&self, track: &Track) {
        self.schedule_race_jobs(track);
        self.scheduler.schedule_once(
            JobKind::PublishRates(PublishRates {
                track_id: track.id.clone(),
                bucket: track.start,
            }),
            delay_until(self.clock.now(), track.start) + self.settings.rate_publish_delay,
        );

        self.events
            .emit(&track.id.room(), RaceEvent::Start(RaceInit::from_track(track)))
            .await;
        self.mirror(
            None,
            RaceCall::StartTrack {
                track_id: track.id.clone(),
                start: track.start,
            },
        )
        .await;
    }

    /// Periodic update and finalize for an active track.
    fn schedule_race_jobs(&self, track: &Track) {
        let finalize_at = track.end + self.settings.finalize_grace;
        let periodic = self.scheduler.schedule_repeating(
            JobKind::PeriodicUpdate(PeriodicUpdate {
                track_id: track.id.clone(),
            }),
            self.settings.update_interval,
            finalize_at,
        );
        self.scheduler.schedule_once(
            JobKind::Finalize(Finalize {
                track_id: track.id.clone(),
                periodic_job: Some(periodic),
                attempt: 1,
            }),
            delay_until(self.clock.now(), finalize_at),
        );
        debug!(track_id = %track.id, finalize_at, "Race jobs scheduled");
    }

    async fn create(&self, bet_amount: Decimal, max_players: usize, creator: Option<&User>) -> Result<Track> {
        let kind = if creator.is_some() {
            TrackKind::User
        } else {
            TrackKind::Backend
        };
        let track = self
            .machine
            .create(
                bet_amount,
                max_players,
                self.settings.duration,
                kind,
                creator.map(|u| u.id.clone()),
            )
            .await?;

        match creator {
            Some(user) => {
                self.mirror(
                    Some(&user.account),
                    RaceCall::CreateTrack {
                        track_id: track.id.clone(),
                        bet_amount,
                    },
                )
                .await;
            }
            None => {
                self.mirror(
                    None,
                    RaceCall::CreateTrackFromBackend {
                        track_id: track.id.clone(),
                        bet_amount,
                        max_players,
                        duration: track.duration,
                    },
                )
                .await;
            }
        }
        Ok(track)
    }

    async fn broadcast_lobby(&self) {
        match self.tracks.list(self.settings.max_listed_tracks).await {
            Ok(tracks) => self.events.emit(LOBBY_ROOM, RaceEvent::InitTracks(tracks)).await,
            Err(e) => warn!(error = %e, "Failed to list tracks for lobby refresh"),
        }
    }

    async fn on_wait_for_fill(&self, job: WaitForFill) -> Result<()> {
        let Some(track) = self.tracks.get(&job.track_id).await? else {
            warn!(track_id = %job.track_id, "Fill-wait fired for unknown track");
            return Ok(());
        };
        if track.status != TrackStatus::Awaiting {
            debug!(track_id = %track.id, status = %track.status, "Track no longer forming");
            return Ok(());
        }
        if track.is_full() {
            // Every seat is taken but the joiner's activation did not land.
            if let Activation::Activated(active) = self.machine.try_activate(&track.id).await? {
                self.start_race(&active).await;
            }
            return Ok(());
        }
        if track.num_players != job.seen_players {
            debug!(track_id = %track.id, seen = job.seen_players, now = track.num_players, "Players joined since countdown");
            return Ok(());
        }

        self.backfill.fill(&track.id, self).await?;
        if let Some(t) = self.tracks.get(&track.id).await? {
            if t.status == TrackStatus::Awaiting && t.is_full() {
                self.schedule_fill_wait(&t);
            }
        }
        self.broadcast_lobby().await;
        Ok(())
    }

    async fn on_periodic_update(&self, job: PeriodicUpdate) -> Result<()> {
        let Some(track) = self.tracks.get(&job.track_id).await? else {
            return Ok(());
        };
        if track.status != TrackStatus::Active {
            return Ok(());
        }

        // The current bucket is still filling; score against the last complete one.
        let bucket = last_settled_bucket(self.clock.now()).clamp(track.start, track.end);
        let scored = match self.scoreboard.standings(&track, bucket).await {
            Ok(scored) => scored,
            Err(e) if matches!(e.as_race(), Some(RaceError::RateUnavailable { .. })) => {
                debug!(track_id = %track.id, bucket, "Rates not ready, skipping update");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let positions = scored
            .standings
            .iter()
            .enumerate()
            .map(|(position, s)| PlayerPosition {
                id: s.user_id.clone(),
                position,
                score: s.score,
                currencies: scored.end_rates.clone(),
                currencies_start: scored.start_rates.clone(),
            })
            .collect();
        self.events
            .emit(&track.id.room(), RaceEvent::PositionUpdate(positions))
            .await;
        Ok(())
    }

    async fn on_finalize(&self, job: Finalize) -> Result<()> {
        let Some(track) = self.tracks.get(&job.track_id).await? else {
            warn!(track_id = %job.track_id, "Finalize fired for unknown track");
            return Ok(());
        };
        if track.status != TrackStatus::Active {
            debug!(track_id = %track.id, status = %track.status, "Finalize skipped");
            if let Some(periodic) = &job.periodic_job {
                self.scheduler.cancel(periodic);
            }
            return Ok(());
        }

        let scored = match self.scoreboard.standings(&track, track.end).await {
            Ok(scored) => scored,
            Err(e) if matches!(e.as_race(), Some(RaceError::RateUnavailable { .. })) => {
                if job.attempt < self.settings.finalize_max_attempts {
                    warn!(track_id = %track.id, attempt = job.attempt, error = %e, "Finalize postponed");
                    self.scheduler.schedule_once(
                        JobKind::Finalize(Finalize {
                            attempt: job.attempt + 1,
                            ..job
                        }),
                        self.settings.finalize_retry,
                    );
                    return Ok(());
                }
                error!(track_id = %track.id, attempts = job.attempt, error = %e, "Finalize gave up; track remains active");
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        if let Some(periodic) = &job.periodic_job {
            self.scheduler.cancel(periodic);
        }

        let finals = final_standings(&track, &scored.standings, &self.reward);
        match self.machine.finish(&track.id, finals.clone()).await? {
            Finish::Finished(finished) => {
                self.events
                    .emit(&finished.id.room(), RaceEvent::GameOver(finals))
                    .await;
                self.scheduler.schedule_once(
                    JobKind::PublishRates(PublishRates {
                        track_id: finished.id.clone(),
                        bucket: finished.end,
                    }),
                    self.settings.rate_publish_delay,
                );
                info!(track_id = %finished.id, players = finished.winners.len(), "Race finalized");
            }
            Finish::AlreadyFinished => {
                debug!(track_id = %track.id, "Race already finalized elsewhere");
            }
        }
        Ok(())
    }

    async fn on_publish_rates(&self, job: PublishRates) -> Result<()> {
        let rates = self
            .rates
            .get(job.bucket)
            .await?
            .ok_or_else(|| RaceError::rate_unavailable(job.bucket))?;
        self.chain
            .submit_as_owner(RaceCall::SetRates {
                bucket: job.bucket,
                rates,
            })
            .await?;
        debug!(track_id = %job.track_id, bucket = job.bucket, "Rates published");
        Ok(())
    }

    /// Finalize active tracks whose finalize time has passed without a live
    /// finalize job. Returns how many were finalized.
    ///
    /// # Errors
    ///
    /// Storage failures while listing tracks.
    pub async fn sweep(&self) -> Result<usize> {
        let now = self.clock.now();
        let mut finalized = 0;
        for track in self.tracks.list_by_status(TrackStatus::Active).await? {
            if now < track.end + self.settings.finalize_grace
                || self.scheduler.has_job(&track.id, "finalize")
            {
                continue;
            }
            warn!(track_id = %track.id, end = track.end, "Overdue track found by sweep");
            let job = Finalize {
                track_id: track.id.clone(),
                periodic_job: None,
                attempt: 1,
            };
            match self.on_finalize(job).await {
                Ok(()) => finalized += 1,
                Err(e) => error!(track_id = %track.id, error = %e, "Sweep finalize failed"),
            }
        }
        Ok(finalized)
    }

    /// Rebuild in-process jobs from stored tracks after a restart.
    ///
    /// # Errors
    ///
    /// Storage failures while listing tracks.
    pub async fn recover(&self) -> Result<Recovery> {
        let mut recovery = Recovery::default();
        let now = self.clock.now();

        for track in self.tracks.list_by_status(TrackStatus::Active).await? {
            if now < track.end + self.settings.finalize_grace {
                self.schedule_race_jobs(&track);
                recovery.resumed += 1;
            }
        }

        for track in self.tracks.list_by_status(TrackStatus::Awaiting).await? {
            match self.machine.try_activate(&track.id).await? {
                Activation::Activated(active) => {
                    self.start_race(&active).await;
                    recovery.forming += 1;
                }
                Activation::NotReady(t) if t.num_players > 0 => {
                    self.schedule_fill_wait(&t);
                    recovery.forming += 1;
                }
                _ => {}
            }
        }

        info!(resumed = recovery.resumed, forming = recovery.forming, "Race state recovered");
        Ok(recovery)
    }

    fn schedule_fill_wait(&self, track: &Track) {
        self.scheduler.schedule_once(
            JobKind::WaitForFill(WaitForFill {
                track_id: track.id.clone(),
                seen_players: track.num_players,
            }),
            self.settings.fill_wait,
        );
    }
}

#[async_trait]
impl RaceEntry for RaceCoordinator {
    async fn enter(&self, user: &User, track_id: &TrackId, mix: AssetMix, lane: u8) -> Result<Track> {
        self.enter_race(user, track_id, mix, lane).await
    }
}

#[async_trait]
impl JobHandler for RaceCoordinator {
    async fn handle(&self, job: FiredJob) -> Result<()> {
        match job.kind {
            JobKind::WaitForFill(j) => self.on_wait_for_fill(j).await,
            JobKind::PeriodicUpdate(j) => self.on_periodic_update(j).await,
            JobKind::Finalize(j) => self.on_finalize(j).await,
            JobKind::PublishRates(j) => self.on_publish_rates(j).await,
        }
    }
}

#[async_trait]
impl RaceApi for RaceCoordinator {
    async fn get_tracks(&self) -> Result<Vec<Track>> {
        let awaiting = self.tracks.list_by_status(TrackStatus::Awaiting).await?;
        for &seats in &self.settings.seat_counts {
            let open = awaiting
                .iter()
                .filter(|t| t.kind == TrackKind::Backend && t.max_players == seats)
                .count();
            for _ in open..self.settings.tracks_per_seat_count {
                self.create(self.settings.default_bet, seats, None).await?;
            }
        }
        self.tracks.list(self.settings.max_listed_tracks).await
    }

    async fn join_track(
        &self,
        user: &User,
        track_id: &TrackId,
        assets: AssetInput,
        lane: u8,
    ) -> Result<Track> {
        let mix = {
            let mut rng = rand::thread_rng();
            assets.into_mix(&mut rng)
        };
        let result = match mix {
            Ok(mix) => self.enter_race(user, track_id, mix, lane).await,
            Err(e) => Err(RaceError::from(e).into()),
        };

        match result {
            Ok(track) => {
                if track.status == TrackStatus::Awaiting {
                    self.schedule_fill_wait(&track);
                }
                Ok(track)
            }
            Err(e) => {
                info!(track_id = %track_id, user_id = %user.id, error = %e, "Join rejected");
                self.events
                    .emit(
                        &user_room(&user.id),
                        RaceEvent::Error {
                            message: e.to_string(),
                        },
                    )
                    .await;
                Err(e)
            }
        }
    }

    async fn load_track(&self, _user: &User, track_id: &TrackId) -> Result<RaceInit> {
        let track = self.machine.get(track_id).await?;
        if track.status != TrackStatus::Active {
            return Err(RaceError::TrackNotActive(track_id.clone()).into());
        }
        Ok(RaceInit::from_track(&track))
    }

    async fn internal_create_track(&self, bet_amount: Decimal, max_players: usize) -> Result<Track> {
        self.create(bet_amount, max_players, None).await
    }

    async fn create_track(&self, user: &User, bet_amount: Decimal, max_players: usize) -> Result<Track> {
        self.create(bet_amount, max_players, Some(user)).await
    }

    async fn get_stats(&self, track_id: &TrackId, end: Option<i64>) -> Result<Vec<Standing>> {
        let track = self.machine.get(track_id).await?;
        if track.status == TrackStatus::Awaiting {
            return Err(RaceError::TrackNotActive(track_id.clone()).into());
        }
        let bucket = align_to_bucket(end.unwrap_or(track.end));
        Ok(self.scoreboard.standings(&track, bucket).await?.standings)
    }

    async fn get_portfolio(&self, user: &User, track_id: &TrackId) -> Result<Option<Portfolio>> {
        self.machine.get(track_id).await?;
        self.portfolios.get(track_id, &user.id).await
    }

    async fn get_tracks_by_user(&self, user: &User) -> Result<Vec<Track>> {
        self.tracks.tracks_by_creator(&user.id).await
    }

    async fn get_rewards(&self, user: &User, track_id: &TrackId) -> Result<TxHash> {
        let track = self.machine.get(track_id).await?;
        if track.status != TrackStatus::Finished {
            return Err(RaceError::RewardsUnavailable {
                track_id: track_id.clone(),
                reason: format!("status is {}", track.status),
            }
            .into());
        }
        if !track.has_member(&user.id) {
            return Err(RaceError::RewardsUnavailable {
                track_id: track_id.clone(),
                reason: format!("user {} did not race", user.id),
            }
            .into());
        }

        let hash = self
            .chain
            .submit(
                &user.account,
                RaceCall::WithdrawRewards {
                    track_id: track_id.clone(),
                },
            )
            .await?;
        info!(track_id = %track_id, user_id = %user.id, tx = %hash, "Reward withdrawal submitted");
        Ok(hash)
    }
}
