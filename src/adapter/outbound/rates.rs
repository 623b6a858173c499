//! Rate feed: an in-memory bucket cache and the HTTP poller that fills it.
//!
//! The poller fetches USD prices for every ticker on a fixed cadence and
//! files each snapshot under `align_to_bucket(now)`. Entries older than the
//! TTL (counted in seconds behind the newest bucket) are evicted on insert.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::Client as HttpClient;
use serde_json::Value;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::domain::{align_to_bucket, RateSnapshot, Ticker};
use crate::error::{Error, Result};
use crate::port::{Clock, RateCache};

/// Default snapshot lifetime: 15 minutes.
pub const DEFAULT_TTL_SECS: i64 = 15 * 60;

/// Bucket-keyed snapshot cache.
pub struct MemoryRateCache {
    ttl_secs: i64,
    buckets: RwLock<BTreeMap<i64, RateSnapshot>>,
}

impl Default for MemoryRateCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL_SECS)
    }
}

impl MemoryRateCache {
    #[must_use]
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            ttl_secs,
            buckets: RwLock::new(BTreeMap::new()),
        }
    }

    /// Store `rates` under `bucket`, replacing any previous snapshot.
    pub fn insert(&self, bucket: i64, rates: RateSnapshot) {
        let mut buckets = self.buckets.write();
        buckets.insert(bucket, rates);
        if let Some(&newest) = buckets.keys().next_back() {
            let horizon = newest - self.ttl_secs;
            buckets.retain(|&b, _| b >= horizon);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.read().is_empty()
    }
}

#[async_trait]
impl RateCache for MemoryRateCache {
    async fn get(&self, bucket: i64) -> Result<Option<RateSnapshot>> {
        Ok(self.buckets.read().get(&bucket).cloned())
    }
}

/// Pull a snapshot out of a `pricemulti` response body.
///
/// Tickers absent from the body are left out of the snapshot; scoring then
/// reports them as unavailable for anyone who holds them.
pub fn parse_prices(body: &Value) -> RateSnapshot {
    let mut snapshot = RateSnapshot::new();
    for ticker in Ticker::ALL {
        match body
            .get(ticker.symbol())
            .and_then(|quote| quote.get("USD"))
            .and_then(Value::as_f64)
        {
            Some(usd) => snapshot.insert(ticker, usd),
            None => debug!(ticker = ticker.symbol(), "Price missing from feed"),
        }
    }
    snapshot
}

/// Periodically fetches prices into a [`MemoryRateCache`].
pub struct RatePoller {
    http: HttpClient,
    url: String,
    every: Duration,
    cache: Arc<MemoryRateCache>,
    clock: Arc<dyn Clock>,
}

impl RatePoller {
    #[must_use]
    pub fn new(
        source_url: &str,
        every: Duration,
        cache: Arc<MemoryRateCache>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let symbols: Vec<&str> = Ticker::ALL.iter().map(|t| t.symbol()).collect();
        let url = format!(
            "{}/data/pricemulti?fsyms={}&tsyms=USD",
            source_url.trim_end_matches('/'),
            symbols.join(",")
        );
        let http = HttpClient::builder()
            .timeout(every.max(Duration::from_secs(1)))
            .build()
            .unwrap_or_else(|err| {
                warn!(error = %err, "Failed to build HTTP client, using defaults");
                HttpClient::new()
            });
        Self {
            http,
            url,
            every,
            cache,
            clock,
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch once and store the snapshot. Returns the bucket written.
    ///
    /// # Errors
    ///
    /// HTTP failures, non-2xx statuses and an empty price set.
    pub async fn poll_once(&self) -> Result<i64> {
        let body: Value = self
            .http
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let snapshot = parse_prices(&body);
        if snapshot.is_empty() {
            return Err(Error::Parse("rate feed returned no known tickers".into()));
        }
        let bucket = align_to_bucket(self.clock.now());
        self.cache.insert(bucket, snapshot);
        debug!(bucket, "Rates stored");
        Ok(bucket)
    }

    /// Poll until `shutdown` flips to true. Failed polls are logged and skipped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(url = %self.url, every_secs = self.every.as_secs(), "Rate poller started");
        let mut ticker = tokio::time::interval(self.every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.poll_once().await {
                        warn!(error = %e, "Rate poll failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("Rate poller stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snap(btc: f64) -> RateSnapshot {
        RateSnapshot::new().with(Ticker::Btc, btc)
    }

    #[tokio::test]
    async fn get_returns_exact_bucket_only() {
        let cache = MemoryRateCache::default();
        cache.insert(100, snap(1.0));
        assert_eq!(cache.get(100).await.unwrap(), Some(snap(1.0)));
        assert_eq!(cache.get(105).await.unwrap(), None);
    }

    #[test]
    fn old_buckets_are_evicted() {
        let cache = MemoryRateCache::new(10);
        cache.insert(100, snap(1.0));
        cache.insert(105, snap(2.0));
        cache.insert(115, snap(3.0));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn parses_pricemulti_body() {
        let body = json!({
            "BTC": { "USD": 65000.5 },
            "ETH": { "USD": 3000 },
            "LTC": { "EUR": 70.0 },
        });
        let snapshot = parse_prices(&body);
        assert_eq!(snapshot.get(Ticker::Btc), Some(65000.5));
        assert_eq!(snapshot.get(Ticker::Eth), Some(3000.0));
        assert_eq!(snapshot.get(Ticker::Ltc), None);
    }

    #[test]
    fn poller_url_lists_every_ticker() {
        let poller = RatePoller::new(
            "https://min-api.cryptocompare.com/",
            Duration::from_secs(5),
            Arc::new(MemoryRateCache::default()),
            Arc::new(crate::adapter::outbound::clock::SystemClock),
        );
        assert_eq!(
            poller.url(),
            "https://min-api.cryptocompare.com/data/pricemulti?fsyms=BTC,ETH,XRP,BCH,LTC&tsyms=USD"
        );
    }
}
