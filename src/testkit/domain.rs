//! Builders for domain primitives used across tests.
//!
//! Provides concise factory functions so tests focus on assertions rather
//! than construction boilerplate.

use crate::domain::{
    Asset, AssetMix, ChainAccount, KeyRef, PlayerSnapshot, RateSnapshot, Ticker, User, UserId,
};

/// A user whose id and name are both `id`, with an address derived from it.
pub fn user(id: &str) -> User {
    User::new(
        id,
        id,
        ChainAccount::new(format!("0x{id}"), KeyRef::new(format!("key-{id}"))),
    )
}

/// A bot built the same way as [`user`].
pub fn bot(id: &str) -> User {
    user(id).into_bot()
}

/// A BTC/ETH mix. Zero weights are left out.
///
/// # Panics
///
/// If the weights do not sum to 100.
pub fn mix(btc: u32, eth: u32) -> AssetMix {
    let assets = [Asset::new(Ticker::Btc, btc), Asset::new(Ticker::Eth, eth)]
        .into_iter()
        .filter(|a| a.value > 0)
        .collect();
    AssetMix::new(assets).expect("test mix must sum to 100")
}

/// A seated player named after its id.
pub fn player(id: &str, lane: u8, fuel: AssetMix) -> PlayerSnapshot {
    PlayerSnapshot {
        id: UserId::new(id),
        name: id.to_string(),
        lane,
        fuel,
    }
}

/// A snapshot with BTC and ETH prices.
pub fn prices(btc: f64, eth: f64) -> RateSnapshot {
    RateSnapshot::new().with(Ticker::Btc, btc).with(Ticker::Eth, eth)
}
