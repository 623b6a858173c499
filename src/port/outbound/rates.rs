//! Rate cache port.

use async_trait::async_trait;

use crate::domain::RateSnapshot;
use crate::error::Result;

/// Read access to USD price snapshots keyed by 5-second bucket.
///
/// Keys must already be aligned with
/// [`align_to_bucket`](crate::domain::time::align_to_bucket); the cache does
/// no rounding or interpolation.
#[async_trait]
pub trait RateCache: Send + Sync {
    async fn get(&self, bucket: i64) -> Result<Option<RateSnapshot>>;
}
