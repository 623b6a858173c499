mod support;

use std::sync::Arc;

use racetrack::adapter::outbound::clock::TokioClock;
use racetrack::adapter::outbound::memory::MemoryStore;
use racetrack::adapter::outbound::rates::MemoryRateCache;
use racetrack::adapter::outbound::sqlite::{create_pool, run_migrations, SqliteStore};
use racetrack::application::race::{RaceCoordinator, RacePorts};
use racetrack::application::scheduler::JobScheduler;
use racetrack::domain::TrackStatus;
use racetrack::port::{PortfolioStore, RaceApi, TrackStore};
use racetrack::testkit::chain::FakeChain;
use racetrack::testkit::config::settings;
use racetrack::testkit::domain::user;
use racetrack::testkit::events::RecordingSink;
use racetrack::testkit::race::{owner, ORIGIN};
use rust_decimal_macros::dec;
use support::btc_eth;
use tempfile::TempDir;

fn open(dir: &TempDir) -> Arc<SqliteStore> {
    let path = dir.path().join("races.db");
    let pool = create_pool(&path.to_string_lossy()).expect("create pool");
    run_migrations(&pool).expect("migrate");
    Arc::new(SqliteStore::new(pool))
}

fn coordinator(store: Arc<SqliteStore>) -> RaceCoordinator {
    let clock = Arc::new(TokioClock::new(ORIGIN));
    let (scheduler, _queue) = JobScheduler::new(clock.clone());
    let ports = RacePorts {
        tracks: store.clone(),
        portfolios: store,
        users: Arc::new(MemoryStore::new()),
        rates: Arc::new(MemoryRateCache::default()),
        chain: Arc::new(FakeChain::new()),
        events: Arc::new(RecordingSink::new()),
        clock,
    };
    RaceCoordinator::new(ports, owner(), scheduler, settings())
}

#[tokio::test(start_paused = true)]
async fn race_state_survives_reopening_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let track_id = {
        let race = coordinator(open(&dir));
        let a = user("a");
        let b = user("b");
        let track = race.create_track(&a, dec!(2.5), 2).await.unwrap();
        race.join_track(&a, &track.id, btc_eth(30, 70), 0).await.unwrap();
        let active = race.join_track(&b, &track.id, btc_eth(60, 40), 1).await.unwrap();
        assert_eq!(active.status, TrackStatus::Active);
        track.id
    };

    let store = open(&dir);
    let stored = TrackStore::get(store.as_ref(), &track_id).await.unwrap().unwrap();
    assert_eq!(stored.status, TrackStatus::Active);
    assert_eq!(stored.bet_amount, dec!(2.5));
    assert_eq!(stored.players.len(), 2);
    assert_eq!(stored.start, ORIGIN);

    let portfolios = store.list_for_track(&track_id).await.unwrap();
    assert_eq!(portfolios.len(), 2);
    assert_eq!(portfolios[0].user_id.as_str(), "a");

    let recovered = coordinator(store).recover().await.unwrap();
    assert_eq!(recovered.resumed, 1);
}

#[tokio::test]
async fn user_cannot_wait_in_two_tracks() {
    let dir = tempfile::tempdir().unwrap();
    let race = coordinator(open(&dir));
    let a = user("a");

    let first = race.internal_create_track(dec!(1), 3).await.unwrap();
    let second = race.internal_create_track(dec!(1), 3).await.unwrap();
    race.join_track(&a, &first.id, btc_eth(50, 50), 0).await.unwrap();

    let err = race
        .join_track(&a, &second.id, btc_eth(50, 50), 0)
        .await
        .unwrap_err();
    assert!(err.as_race().is_some());

    let store = open(&dir);
    let stray = PortfolioStore::get(store.as_ref(), &second.id, &a.id).await.unwrap();
    assert!(stray.is_none());
}
