//! Real-time delivery port.
//!
//! Events are addressed to rooms. Race events go to `track_<id>`; lobby
//! refreshes go to [`LOBBY_ROOM`]; per-user errors go to `user_<id>`.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::domain::{Asset, FinalStanding, PlayerSnapshot, RateSnapshot, Track, UserId};

/// Room every connected client listens on.
pub const LOBBY_ROOM: &str = "lobby";

/// Room that receives events addressed to one user.
#[must_use]
pub fn user_room(user: &UserId) -> String {
    format!("user_{user}")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinedTrack {
    pub track_id: String,
    pub user_id: UserId,
    pub fuel: Vec<Asset>,
    pub ship: u8,
}

/// Payload of `start`, also returned by `load_track`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceInit {
    pub id: String,
    pub race_name: String,
    /// Milliseconds since the epoch.
    pub start: i64,
    /// Milliseconds since the epoch.
    pub end: i64,
    pub players: Vec<PlayerSnapshot>,
}

impl RaceInit {
    #[must_use]
    pub fn from_track(track: &Track) -> Self {
        Self {
            id: track.id.to_string(),
            race_name: track.id.to_string(),
            start: track.start * 1000,
            end: track.end * 1000,
            players: track.players.clone(),
        }
    }
}

/// One entry of a `positionUpdate` broadcast.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerPosition {
    pub id: UserId,
    pub position: usize,
    pub score: f64,
    pub currencies: RateSnapshot,
    pub currencies_start: RateSnapshot,
}

/// Events pushed to race clients.
#[derive(Debug, Clone, PartialEq)]
pub enum RaceEvent {
    JoinedTrack(JoinedTrack),
    Start(RaceInit),
    PositionUpdate(Vec<PlayerPosition>),
    GameOver(Vec<FinalStanding>),
    InitTracks(Vec<Track>),
    Error { message: String },
}

impl RaceEvent {
    /// Wire name of the event.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::JoinedTrack(_) => "joinedTrack",
            Self::Start(_) => "start",
            Self::PositionUpdate(_) => "positionUpdate",
            Self::GameOver(_) => "gameover",
            Self::InitTracks(_) => "initTracks",
            Self::Error { .. } => "error",
        }
    }

    /// JSON payload as sent over the socket.
    ///
    /// # Errors
    ///
    /// Fails only if a payload contains a non-finite float.
    pub fn payload(&self) -> serde_json::Result<Value> {
        match self {
            Self::JoinedTrack(j) => serde_json::to_value(j),
            Self::Start(init) => serde_json::to_value(init),
            Self::PositionUpdate(p) => serde_json::to_value(p),
            Self::GameOver(s) => serde_json::to_value(s),
            Self::InitTracks(tracks) => Ok(serde_json::json!({ "tracks": tracks })),
            Self::Error { message } => Ok(serde_json::json!({ "message": message })),
        }
    }
}

/// Best-effort delivery to connected clients.
///
/// Delivery failures are the sink's problem; the engine never waits on or
/// retries an emit.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, room: &str, event: RaceEvent);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TrackId;

    #[test]
    fn event_names_match_wire_protocol() {
        assert_eq!(RaceEvent::GameOver(vec![]).name(), "gameover");
        assert_eq!(RaceEvent::PositionUpdate(vec![]).name(), "positionUpdate");
        assert_eq!(RaceEvent::InitTracks(vec![]).name(), "initTracks");
    }

    #[test]
    fn init_tracks_payload_wraps_tracks() {
        let json = RaceEvent::InitTracks(vec![]).payload().unwrap();
        assert!(json["tracks"].as_array().unwrap().is_empty());
    }

    #[test]
    fn joined_track_payload_is_camel_case() {
        let event = RaceEvent::JoinedTrack(JoinedTrack {
            track_id: TrackId::from("t1").to_string(),
            user_id: UserId::new("u1"),
            fuel: vec![],
            ship: 2,
        });
        let json = event.payload().unwrap();
        assert_eq!(json["trackId"], "t1");
        assert_eq!(json["ship"], 2);
    }

    #[test]
    fn user_room_is_prefixed() {
        assert_eq!(user_room(&UserId::new("42")), "user_42");
    }
}
