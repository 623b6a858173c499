//! Event sink that records every emitted event.

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::port::{EventSink, RaceEvent};

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<(String, RaceEvent)>>,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `(room, event)` pair so far.
    #[must_use]
    pub fn events(&self) -> Vec<(String, RaceEvent)> {
        self.events.lock().clone()
    }

    /// Events with wire name `name`, with their rooms.
    #[must_use]
    pub fn named(&self, name: &str) -> Vec<(String, RaceEvent)> {
        self.events
            .lock()
            .iter()
            .filter(|(_, e)| e.name() == name)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn count(&self, name: &str) -> usize {
        self.events.lock().iter().filter(|(_, e)| e.name() == name).count()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn emit(&self, room: &str, event: RaceEvent) {
        self.events.lock().push((room.to_string(), event));
    }
}
