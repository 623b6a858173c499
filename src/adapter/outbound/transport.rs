//! Broadcast-channel event sink.
//!
//! Serializes each event once and fans it out to every subscriber. The
//! socket layer subscribes and forwards messages to the sockets in the
//! addressed room.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::port::{EventSink, RaceEvent};

/// Default channel capacity. Slow subscribers lag past this and lose messages.
pub const DEFAULT_CAPACITY: usize = 1024;

/// One serialized event addressed to a room.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundMessage {
    pub room: String,
    pub event: &'static str,
    pub payload: Value,
}

#[derive(Debug, Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<OutboundMessage>,
}

impl Default for BroadcastSink {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl BroadcastSink {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<OutboundMessage> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl EventSink for BroadcastSink {
    async fn emit(&self, room: &str, event: RaceEvent) {
        let payload = match event.payload() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(room, event = event.name(), error = %e, "Dropping unserializable event");
                return;
            }
        };
        let message = OutboundMessage {
            room: room.to_string(),
            event: event.name(),
            payload,
        };
        match self.tx.send(message) {
            Ok(receivers) => debug!(room, event = event.name(), receivers, "Event emitted"),
            Err(_) => debug!(room, event = event.name(), "Event emitted with no subscribers"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_serialized_events() {
        let sink = BroadcastSink::default();
        let mut rx = sink.subscribe();

        sink.emit(
            "track_1",
            RaceEvent::Error {
                message: "nope".into(),
            },
        )
        .await;

        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.room, "track_1");
        assert_eq!(msg.event, "error");
        assert_eq!(msg.payload["message"], "nope");
    }

    #[tokio::test]
    async fn emit_without_subscribers_is_silent() {
        let sink = BroadcastSink::new(1);
        sink.emit("lobby", RaceEvent::InitTracks(vec![])).await;
    }
}
