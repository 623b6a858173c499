//! A player's committed asset mix for one track.

use serde::{Deserialize, Serialize};

use super::asset::AssetMix;
use super::id::{TrackId, UserId};

/// One per (track, user). Never modified after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub track_id: TrackId,
    pub user_id: UserId,
    pub assets: AssetMix,
}

impl Portfolio {
    #[must_use]
    pub const fn new(track_id: TrackId, user_id: UserId, assets: AssetMix) -> Self {
        Self {
            track_id,
            user_id,
            assets,
        }
    }
}
