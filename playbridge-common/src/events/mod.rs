//! Event types for the playbridge event system
//!
//! Provides the player event definitions and the shared EventBus.
//!
//! # Architecture
//!
//! Every event the player emits goes through one publish step:
//! - the player's own broadcast channel (`Player::subscribe`)
//! - the optional **EventBus** (tokio::broadcast), wrapped in a `BusEvent`
//!   whose topic is `"{prefix}:{name}"`
//! - the currently loaded playable, with the same topic

mod player_types;

pub use player_types::{PlayableId, PlayerState};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Player event types
///
/// Serialized with a `type` tag carrying the event name (`"loading"`,
/// `"bytesLoaded"`, ...), the same name used in bus topics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlayerEvent {
    /// Playable adopted, audio URL requested
    Loading { playable_id: PlayableId },

    /// Sound handle constructed for the playable
    Loaded {
        playable_id: PlayableId,
        /// Engine-side identifier of the new sound handle
        sound_id: String,
    },

    /// Release started (emitted even when nothing is loaded)
    Releasing { playable_id: Option<PlayableId> },

    /// Release finished, player holds no playable
    Released { playable_id: Option<PlayableId> },

    /// Recoverable failure; never fatal
    Error {
        message: String,
        /// Offending playable, when the failure concerns one
        playable_id: Option<PlayableId>,
    },

    /// Sound reached its end
    Finished { playable_id: PlayableId },

    /// Playback started
    Played { playable_id: PlayableId },

    Paused { playable_id: PlayableId },

    Resumed { playable_id: PlayableId },

    Stopped { playable_id: PlayableId },

    /// Position tick, repeated while playing
    Playing {
        playable_id: PlayableId,
        position_ms: u64,
        duration_ms: u64,
    },

    /// Buffering progress, repeated while loading
    BytesLoaded {
        playable_id: PlayableId,
        bytes_loaded: u64,
        bytes_total: u64,
    },
}

impl PlayerEvent {
    /// Event name as published (matches the serde `type` tag)
    pub fn name(&self) -> &'static str {
        match self {
            PlayerEvent::Loading { .. } => "loading",
            PlayerEvent::Loaded { .. } => "loaded",
            PlayerEvent::Releasing { .. } => "releasing",
            PlayerEvent::Released { .. } => "released",
            PlayerEvent::Error { .. } => "error",
            PlayerEvent::Finished { .. } => "finished",
            PlayerEvent::Played { .. } => "played",
            PlayerEvent::Paused { .. } => "paused",
            PlayerEvent::Resumed { .. } => "resumed",
            PlayerEvent::Stopped { .. } => "stopped",
            PlayerEvent::Playing { .. } => "playing",
            PlayerEvent::BytesLoaded { .. } => "bytesLoaded",
        }
    }

    /// Namespaced topic, e.g. `"player:loaded"`
    pub fn topic(&self, prefix: &str) -> String {
        format!("{}:{}", prefix, self.name())
    }

    /// Playable this event concerns, if any
    pub fn playable_id(&self) -> Option<&PlayableId> {
        match self {
            PlayerEvent::Releasing { playable_id }
            | PlayerEvent::Released { playable_id }
            | PlayerEvent::Error { playable_id, .. } => playable_id.as_ref(),
            PlayerEvent::Loading { playable_id }
            | PlayerEvent::Loaded { playable_id, .. }
            | PlayerEvent::Finished { playable_id }
            | PlayerEvent::Played { playable_id }
            | PlayerEvent::Paused { playable_id }
            | PlayerEvent::Resumed { playable_id }
            | PlayerEvent::Stopped { playable_id }
            | PlayerEvent::Playing { playable_id, .. }
            | PlayerEvent::BytesLoaded { playable_id, .. } => Some(playable_id),
        }
    }

    /// Repeated progress events (`playing`, `bytesLoaded`)
    ///
    /// These fire many times per second and are logged at trace level only.
    pub fn is_progress(&self) -> bool {
        matches!(
            self,
            PlayerEvent::Playing { .. } | PlayerEvent::BytesLoaded { .. }
        )
    }
}

/// Event as carried on the EventBus: topic + payload + emission time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusEvent {
    /// Namespaced topic (`"{prefix}:{name}"`)
    pub topic: String,
    pub event: PlayerEvent,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl BusEvent {
    pub fn new(prefix: &str, event: PlayerEvent) -> Self {
        Self {
            topic: event.topic(prefix),
            event,
            timestamp: chrono::Utc::now(),
        }
    }
}

/// Shared publish/subscribe sink for cross-component notification
///
/// Thin wrapper over `tokio::sync::broadcast`. Slow subscribers lag and
/// lose the oldest events instead of blocking emitters.
pub struct EventBus {
    tx: broadcast::Sender<BusEvent>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before dropping old events
    ///
    /// # Examples
    ///
    /// ```
    /// use playbridge_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<BusEvent> {
        self.tx.subscribe()
    }

    /// Wrap `event` under `prefix` and emit it
    ///
    /// Having no subscribers is not an error; the event is dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use playbridge_common::events::{EventBus, PlayerEvent};
    ///
    /// let event_bus = EventBus::new(16);
    /// let mut rx = event_bus.subscribe();
    /// event_bus.publish("player", PlayerEvent::Released { playable_id: None });
    /// assert_eq!(rx.try_recv().unwrap().topic, "player:released");
    /// ```
    pub fn publish(&self, prefix: &str, event: PlayerEvent) {
        let _ = self.tx.send(BusEvent::new(prefix, event));
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loading(id: &str) -> PlayerEvent {
        PlayerEvent::Loading {
            playable_id: PlayableId::from(id),
        }
    }

    #[test]
    fn test_eventbus_publish_without_subscribers() {
        let bus = EventBus::new(10);
        bus.publish("player", loading("a"));

        // Events published before subscribing are not replayed
        let mut rx = bus.subscribe();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_eventbus_publish_with_subscriber() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();

        bus.publish("audio", loading("a"));

        let received = rx.recv().await.unwrap();
        assert_eq!(received.topic, "audio:loading");
        assert_eq!(received.event, loading("a"));
    }

    #[test]
    fn test_event_names_match_serde_tag() {
        let id = PlayableId::from("x");
        let events = vec![
            loading("x"),
            PlayerEvent::Loaded {
                playable_id: id.clone(),
                sound_id: "s".into(),
            },
            PlayerEvent::Releasing { playable_id: None },
            PlayerEvent::Released { playable_id: None },
            PlayerEvent::Error {
                message: "m".into(),
                playable_id: None,
            },
            PlayerEvent::Finished { playable_id: id.clone() },
            PlayerEvent::Played { playable_id: id.clone() },
            PlayerEvent::Paused { playable_id: id.clone() },
            PlayerEvent::Resumed { playable_id: id.clone() },
            PlayerEvent::Stopped { playable_id: id.clone() },
            PlayerEvent::Playing {
                playable_id: id.clone(),
                position_ms: 1,
                duration_ms: 2,
            },
            PlayerEvent::BytesLoaded {
                playable_id: id,
                bytes_loaded: 1,
                bytes_total: 2,
            },
        ];

        for event in events {
            let value = serde_json::to_value(&event).unwrap();
            assert_eq!(value["type"], event.name(), "tag mismatch for {:?}", event);
        }
    }

    #[test]
    fn test_playable_id_accessor() {
        assert_eq!(
            loading("a").playable_id(),
            Some(&PlayableId::from("a"))
        );
        assert_eq!(
            PlayerEvent::Released { playable_id: None }.playable_id(),
            None
        );
    }

    #[test]
    fn test_bus_event_round_trip() {
        let event = BusEvent::new(
            "player",
            PlayerEvent::BytesLoaded {
                playable_id: PlayableId::from("a"),
                bytes_loaded: 512,
                bytes_total: 1024,
            },
        );
        let json = serde_json::to_string(&event).unwrap();
        let parsed: BusEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.topic, "player:bytesLoaded");
        assert_eq!(parsed.event, event.event);
        assert!(parsed.event.is_progress());
    }
}
