//! Race scoring.
//!
//! A portfolio's score is the sum of each asset's percentage weighted by
//! the price ratio of that asset between the start and end buckets. An
//! unchanged market therefore scores exactly 100.
//!
//! # Examples
//!
//! ```
//! use racetrack::domain::asset::{Asset, AssetMix, RateSnapshot, Ticker};
//! use racetrack::domain::score::Ratios;
//!
//! let start = RateSnapshot::new().with(Ticker::Btc, 100.0).with(Ticker::Eth, 100.0);
//! let end = RateSnapshot::new().with(Ticker::Btc, 105.0).with(Ticker::Eth, 98.0);
//! let ratios = Ratios::between(&start, &end);
//!
//! let mix = AssetMix::new(vec![Asset::new(Ticker::Btc, 40), Asset::new(Ticker::Eth, 60)]).unwrap();
//! let score = ratios.score(&mix, 0).unwrap();
//! assert!((score - 100.8).abs() < 1e-9);
//! ```

use std::cmp::Ordering;
use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::asset::{AssetMix, RateSnapshot, Ticker};
use super::id::UserId;
use crate::error::RaceError;

/// Per-ticker price ratio `end / start`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ratios(BTreeMap<Ticker, f64>);

impl Ratios {
    /// Compute ratios for every ticker priced in both snapshots.
    ///
    /// Tickers missing from either side, or with a non-positive start
    /// price, are left out; scoring a portfolio that holds one of them
    /// fails with [`RaceError::RateUnavailable`].
    #[must_use]
    pub fn between(start: &RateSnapshot, end: &RateSnapshot) -> Self {
        let ratios = Ticker::ALL
            .into_iter()
            .filter_map(|t| match (start.get(t), end.get(t)) {
                (Some(s), Some(e)) if s > 0.0 => Some((t, e / s)),
                _ => None,
            })
            .collect();
        Self(ratios)
    }

    #[must_use]
    pub fn get(&self, ticker: Ticker) -> Option<f64> {
        self.0.get(&ticker).copied()
    }

    /// Score one portfolio. `bucket` is the end bucket, used for error context.
    ///
    /// # Errors
    ///
    /// [`RaceError::RateUnavailable`] naming the first held ticker without a ratio.
    pub fn score(&self, mix: &AssetMix, bucket: i64) -> Result<f64, RaceError> {
        mix.assets().iter().try_fold(0.0, |acc, asset| {
            let ratio = self.get(asset.name).ok_or_else(|| RaceError::RateUnavailable {
                bucket,
                ticker: Some(asset.name.symbol().to_string()),
            })?;
            Ok(acc + ratio * f64::from(asset.value))
        })
    }
}

/// One player's score at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    pub user_id: UserId,
    pub score: f64,
}

/// Sort standings best first. Equal scores are ordered by user id so the
/// result does not depend on input order.
pub fn rank(standings: &mut [Standing]) {
    standings.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
}

/// Number of leading entries of a ranked list that share the top score.
#[must_use]
pub fn winner_count(ranked: &[Standing]) -> usize {
    match ranked.first() {
        Some(top) => ranked.iter().take_while(|s| s.score == top.score).count(),
        None => 0,
    }
}

/// Prize handed to each winner of a race.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardPolicy {
    pub prize: Decimal,
}

impl RewardPolicy {
    #[must_use]
    pub const fn new(prize: Decimal) -> Self {
        Self { prize }
    }

    #[must_use]
    pub fn prize_for(&self, is_winner: bool) -> Decimal {
        if is_winner {
            self.prize
        } else {
            Decimal::ZERO
        }
    }
}

/// Final ranked entry attached to a finished track and sent with `gameover`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalStanding {
    pub id: UserId,
    /// Zero-based rank.
    pub position: usize,
    pub name: String,
    pub score: f64,
    /// Gain or loss relative to an unchanged market (`score - 100`).
    pub result: f64,
    pub prize: Decimal,
    #[serde(rename = "ship")]
    pub lane: u8,
}
