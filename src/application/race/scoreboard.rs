//! Standings computed from stored portfolios and cached rates.

use std::sync::Arc;

use crate::domain::score::{rank, winner_count};
use crate::domain::{FinalStanding, RateSnapshot, Ratios, RewardPolicy, Standing, Track};
use crate::error::{RaceError, Result};
use crate::port::{PortfolioStore, RateCache};

/// Ranked standings plus the snapshots they were computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct Scored {
    pub standings: Vec<Standing>,
    pub start_rates: RateSnapshot,
    pub end_rates: RateSnapshot,
}

pub struct Scoreboard {
    portfolios: Arc<dyn PortfolioStore>,
    rates: Arc<dyn RateCache>,
}

impl Scoreboard {
    pub fn new(portfolios: Arc<dyn PortfolioStore>, rates: Arc<dyn RateCache>) -> Self {
        Self { portfolios, rates }
    }

    async fn snapshot(&self, bucket: i64) -> Result<RateSnapshot> {
        self.rates
            .get(bucket)
            .await?
            .ok_or_else(|| RaceError::rate_unavailable(bucket).into())
    }

    /// Rank every portfolio of `track` between its start bucket and `end_bucket`.
    ///
    /// # Errors
    ///
    /// [`RaceError::RateUnavailable`] when either snapshot is missing or
    /// lacks a ticker someone holds.
    pub async fn standings(&self, track: &Track, end_bucket: i64) -> Result<Scored> {
        let start_rates = self.snapshot(track.start).await?;
        let end_rates = self.snapshot(end_bucket).await?;
        let ratios = Ratios::between(&start_rates, &end_rates);

        let portfolios = self.portfolios.list_for_track(&track.id).await?;
        let mut standings = portfolios
            .iter()
            .map(|p| {
                Ok(Standing {
                    user_id: p.user_id.clone(),
                    score: ratios.score(&p.assets, end_bucket)?,
                })
            })
            .collect::<std::result::Result<Vec<_>, RaceError>>()?;
        rank(&mut standings);

        Ok(Scored {
            standings,
            start_rates,
            end_rates,
        })
    }
}

/// Turn ranked standings into the result attached to a finished track.
#[must_use]
pub fn final_standings(track: &Track, ranked: &[Standing], policy: &RewardPolicy) -> Vec<FinalStanding> {
    let winners = winner_count(ranked);
    ranked
        .iter()
        .enumerate()
        .map(|(position, s)| {
            let player = track.players.iter().find(|p| p.id == s.user_id);
            FinalStanding {
                id: s.user_id.clone(),
                position,
                name: player.map(|p| p.name.clone()).unwrap_or_default(),
                score: s.score,
                result: s.score - 100.0,
                prize: policy.prize_for(position < winners),
                lane: player.map_or(0, |p| p.lane),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::outbound::memory::MemoryStore;
    use crate::adapter::outbound::rates::MemoryRateCache;
    use crate::domain::{Portfolio, Ticker, TrackKind, UserId};
    use crate::testkit::domain::{mix, player};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    const START: i64 = 1_700_000_005;
    const END: i64 = START + 300;

    fn active_track(ids: &[&str]) -> Track {
        let mut t = Track::new(dec!(1000), ids.len(), 300, TrackKind::User, None, 0);
        for (i, id) in ids.iter().enumerate() {
            t.seat(player(id, i as u8, mix(50, 50))).unwrap();
        }
        t.activate(START).unwrap();
        t
    }

    async fn board(track: &Track, mixes: &[(u32, u32)]) -> (Scoreboard, Arc<MemoryRateCache>) {
        let store = Arc::new(MemoryStore::new());
        for (user, (btc, eth)) in track.users.iter().zip(mixes) {
            let p = Portfolio::new(track.id.clone(), user.clone(), mix(*btc, *eth));
            PortfolioStore::insert(store.as_ref(), &p).await.unwrap();
        }
        let rates = Arc::new(MemoryRateCache::default());
        (
            Scoreboard::new(store, Arc::clone(&rates) as Arc<dyn RateCache>),
            rates,
        )
    }

    fn prices(btc: f64, eth: f64) -> RateSnapshot {
        RateSnapshot::new().with(Ticker::Btc, btc).with(Ticker::Eth, eth)
    }

    #[tokio::test]
    async fn four_player_scenario() {
        let track = active_track(&["a", "b", "c", "d"]);
        let (board, rates) = board(&track, &[(10, 90), (20, 80), (30, 70), (40, 60)]).await;
        rates.insert(START, prices(100.0, 100.0));
        rates.insert(END, prices(105.0, 98.0));

        let scored = board.standings(&track, END).await.unwrap();
        assert_eq!(scored.standings.len(), 4);
        assert_eq!(scored.standings[0].user_id, UserId::new("d"));
        assert!((scored.standings[0].score - 100.8).abs() < 1e-9);
        assert!(scored
            .standings
            .windows(2)
            .all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn missing_end_bucket_is_rate_unavailable() {
        let track = active_track(&["a"]);
        let (board, rates) = board(&track, &[(50, 50)]).await;
        rates.insert(START, prices(1.0, 1.0));

        let err = board.standings(&track, END).await.unwrap_err();
        assert_eq!(err.as_race(), Some(&RaceError::rate_unavailable(END)));
    }

    #[test]
    fn final_standings_share_prize_between_tied_winners() {
        let track = active_track(&["a", "b", "c"]);
        let ranked = vec![
            Standing { user_id: UserId::new("a"), score: 101.0 },
            Standing { user_id: UserId::new("b"), score: 101.0 },
            Standing { user_id: UserId::new("c"), score: 99.5 },
        ];
        let finals = final_standings(&track, &ranked, &RewardPolicy::new(dec!(0.1)));

        assert_eq!(finals[0].prize, dec!(0.1));
        assert_eq!(finals[1].prize, dec!(0.1));
        assert_eq!(finals[2].prize, Decimal::ZERO);
        assert!((finals[2].result + 0.5).abs() < 1e-9);
        assert_eq!(finals[1].lane, 1);
        assert_eq!(finals[2].name, "c");
    }
}
