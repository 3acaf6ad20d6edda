//! # Playbridge Player Library (playbridge-player)
//!
//! Adapter that lets application models ("playables") drive playback
//! through an external playback engine.
//!
//! **Purpose:** Load/play/pause/stop/seek/volume on a single player, with
//! engine callbacks republished as `PlayerEvent`s on the player itself, on
//! an optional shared `EventBus`, and on the loaded playable.
//!
//! **Architecture:** `Player` holds at most one playable and one sound
//! handle. The engine (`PlaybackEngine` + `Sound`) and the playables are
//! traits; `SimulatedEngine` is an in-process stand-in.

pub mod engine;
pub mod error;
pub mod playable;
pub mod player;
pub mod volume;

pub use engine::{PlayState, PlaybackEngine, Sound, SoundEvent, SoundEventSender, SoundOptions};
pub use error::{Error, Result};
pub use playable::{EventTarget, Playable, PlayableLifecycle};
pub use player::{Player, PlayerOptions};
pub use volume::Volume;

pub use playbridge_common::{BusEvent, EventBus, PlayableId, PlayerEvent, PlayerState};
