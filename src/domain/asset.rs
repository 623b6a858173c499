//! Assets, asset mixes and rate snapshots.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::error::AssetMixError;

/// A full tank: every mix sums to exactly this.
pub const FULL_MIX: u32 = 100;

/// Add percentages, rejecting any single value above [`FULL_MIX`] and any
/// sum that would overflow.
fn checked_total(values: impl IntoIterator<Item = u32>) -> Result<u32, AssetMixError> {
    values.into_iter().try_fold(0u32, |acc, value| {
        if value > FULL_MIX {
            return Err(AssetMixError::BadTotal { sum: value });
        }
        acc.checked_add(value)
            .ok_or(AssetMixError::BadTotal { sum: u32::MAX })
    })
}

/// The fixed set of tradable tickers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Ticker {
    Btc,
    Eth,
    Xrp,
    Bch,
    Ltc,
}

impl Ticker {
    /// All tickers, in fuel-slot order.
    pub const ALL: [Ticker; 5] = [Self::Btc, Self::Eth, Self::Xrp, Self::Bch, Self::Ltc];

    /// Upper-case symbol used as the rate snapshot key.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Btc => "BTC",
            Self::Eth => "ETH",
            Self::Xrp => "XRP",
            Self::Bch => "BCH",
            Self::Ltc => "LTC",
        }
    }

    /// Lower-case name used in portfolios.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Btc => "btc",
            Self::Eth => "eth",
            Self::Xrp => "xrp",
            Self::Bch => "bch",
            Self::Ltc => "ltc",
        }
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Ticker {
    type Err = AssetMixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AssetMixError::UnknownAsset(s.to_string()))
    }
}

impl TryFrom<String> for Ticker {
    type Error = AssetMixError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Ticker> for String {
    fn from(t: Ticker) -> Self {
        t.name().to_string()
    }
}

/// One weighted entry of a portfolio. `value` is a percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub name: Ticker,
    pub value: u32,
}

impl Asset {
    #[must_use]
    pub const fn new(name: Ticker, value: u32) -> Self {
        Self { name, value }
    }
}

/// A validated list of assets whose percentages sum to 100.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Asset>", into = "Vec<Asset>")]
pub struct AssetMix(Vec<Asset>);

impl AssetMix {
    /// Validate and wrap a list of assets.
    ///
    /// # Errors
    ///
    /// Returns an [`AssetMixError`] when the list is empty, repeats a
    /// ticker, holds a value above 100 or does not sum to 100.
    pub fn new(assets: Vec<Asset>) -> Result<Self, AssetMixError> {
        if assets.is_empty() {
            return Err(AssetMixError::Empty);
        }
        let mut seen = HashSet::new();
        for asset in &assets {
            if !seen.insert(asset.name) {
                return Err(AssetMixError::DuplicateAsset(asset.name.to_string()));
            }
        }
        let sum = checked_total(assets.iter().map(|a| a.value))?;
        if sum != FULL_MIX {
            return Err(AssetMixError::BadTotal { sum });
        }
        Ok(Self(assets))
    }

    /// Build a mix from a fuel vector as sent by race clients.
    ///
    /// Slots 0..5 map to `btc, eth, xrp, bch, ltc`. A sixth slot, if present,
    /// is a wildcard added to one of the first four tickers chosen at random.
    ///
    /// # Errors
    ///
    /// Same as [`AssetMix::new`].
    pub fn from_fuel<R: Rng + ?Sized>(fuel: &[u32], rng: &mut R) -> Result<Self, AssetMixError> {
        let mut assets: Vec<Asset> = Vec::with_capacity(fuel.len());
        for (slot, &value) in fuel.iter().enumerate() {
            let ticker = match Ticker::ALL.get(slot) {
                Some(&t) => t,
                None if slot == Ticker::ALL.len() => Ticker::ALL[rng.gen_range(0..4)],
                None => return Err(AssetMixError::UnknownAsset(format!("fuel slot {slot}"))),
            };
            if value > FULL_MIX {
                return Err(AssetMixError::BadTotal { sum: value });
            }
            match assets.iter_mut().find(|a| a.name == ticker) {
                Some(existing) => {
                    existing.value = existing
                        .value
                        .checked_add(value)
                        .ok_or(AssetMixError::BadTotal { sum: u32::MAX })?;
                }
                None => assets.push(Asset::new(ticker, value)),
            }
        }
        Self::new(assets)
    }

    #[must_use]
    pub fn assets(&self) -> &[Asset] {
        &self.0
    }
}

impl TryFrom<Vec<Asset>> for AssetMix {
    type Error = AssetMixError;

    fn try_from(value: Vec<Asset>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AssetMix> for Vec<Asset> {
    fn from(mix: AssetMix) -> Self {
        mix.0
    }
}

/// USD prices for one time bucket, keyed by upper-case ticker symbol.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RateSnapshot(BTreeMap<String, f64>);

impl RateSnapshot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, ticker: Ticker, usd: f64) -> Self {
        self.insert(ticker, usd);
        self
    }

    pub fn insert(&mut self, ticker: Ticker, usd: f64) {
        self.0.insert(ticker.symbol().to_string(), usd);
    }

    #[must_use]
    pub fn get(&self, ticker: Ticker) -> Option<f64> {
        self.0.get(ticker.symbol()).copied()
    }

    /// Iterate over `(symbol, price)` pairs in symbol order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    #[test]
    fn ticker_parses_case_insensitively() {
        assert_eq!("BTC".parse::<Ticker>().unwrap(), Ticker::Btc);
        assert_eq!("eth".parse::<Ticker>().unwrap(), Ticker::Eth);
        assert!(matches!(
            "doge".parse::<Ticker>(),
            Err(AssetMixError::UnknownAsset(_))
        ));
    }

    #[test]
    fn mix_must_sum_to_100() {
        let err = AssetMix::new(vec![Asset::new(Ticker::Btc, 10), Asset::new(Ticker::Eth, 80)])
            .unwrap_err();
        assert_eq!(err, AssetMixError::BadTotal { sum: 90 });
    }

    #[test]
    fn oversized_values_are_rejected_not_wrapped() {
        // u32::MAX + 101 wraps to exactly 100 without checked addition.
        let err = AssetMix::new(vec![Asset::new(Ticker::Btc, u32::MAX), Asset::new(Ticker::Eth, 101)])
            .unwrap_err();
        assert!(matches!(err, AssetMixError::BadTotal { .. }));

        let err = AssetMix::new(vec![Asset::new(Ticker::Btc, 150), Asset::new(Ticker::Eth, 0)])
            .unwrap_err();
        assert_eq!(err, AssetMixError::BadTotal { sum: 150 });
    }

    #[test]
    fn oversized_fuel_is_rejected_before_wildcard_merge() {
        let mut rng = StepRng::new(0, 0);
        let err = AssetMix::from_fuel(&[u32::MAX, 0, 0, 0, 0, 101], &mut rng).unwrap_err();
        assert!(matches!(err, AssetMixError::BadTotal { .. }));

        let err = AssetMix::from_fuel(&[0, 0, 0, 0, 0, u32::MAX], &mut rng).unwrap_err();
        assert_eq!(err, AssetMixError::BadTotal { sum: u32::MAX });
    }

    #[test]
    fn mix_rejects_duplicates_and_empty() {
        assert_eq!(AssetMix::new(vec![]).unwrap_err(), AssetMixError::Empty);
        let dup = AssetMix::new(vec![Asset::new(Ticker::Btc, 50), Asset::new(Ticker::Btc, 50)]);
        assert!(matches!(dup, Err(AssetMixError::DuplicateAsset(_))));
    }

    #[test]
    fn fuel_maps_slots_to_tickers() {
        let mut rng = StepRng::new(0, 0);
        let mix = AssetMix::from_fuel(&[10, 20, 30, 40, 0], &mut rng).unwrap();
        let names: Vec<_> = mix.assets().iter().map(|a| a.name).collect();
        assert_eq!(names, Ticker::ALL.to_vec());
    }

    #[test]
    fn fuel_wildcard_slot_merges_into_existing_ticker() {
        let mut rng = StepRng::new(0, 0);
        let mix = AssetMix::from_fuel(&[10, 20, 30, 20, 0, 20], &mut rng).unwrap();
        assert_eq!(mix.assets().len(), 5);
        let total: u32 = mix.assets().iter().map(|a| a.value).sum();
        assert_eq!(total, 100);
    }

    #[test]
    fn mix_deserializes_from_plain_json() {
        let mix: AssetMix =
            serde_json::from_str(r#"[{"name":"BTC","value":40},{"name":"eth","value":60}]"#)
                .unwrap();
        assert_eq!(mix.assets()[0], Asset::new(Ticker::Btc, 40));

        let bad = serde_json::from_str::<AssetMix>(r#"[{"name":"btc","value":40}]"#);
        assert!(bad.is_err());
    }
}
