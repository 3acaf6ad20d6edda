//! Playable capability traits
//!
//! A playable is any application model that can produce an audio URL.
//! Lifecycle hooks and event delivery are optional extensions, exposed as
//! accessor methods returning `Option<&dyn _>` so a model opts in by
//! implementing the extra trait and overriding the accessor.

use async_trait::async_trait;
use playbridge_common::{PlayableId, PlayerEvent};

use crate::Result;

/// Application model that can be loaded into the player
#[async_trait]
pub trait Playable: Send + Sync {
    /// Stable identifier; `None` for models that do not have one yet
    /// (e.g. unsaved), which makes them unplayable.
    fn id(&self) -> Option<PlayableId>;

    /// Whether `audio_url` can be called at all
    fn supports_audio(&self) -> bool {
        true
    }

    /// Resolve the URL the engine should play
    ///
    /// Called once per load. The player discards the result if another
    /// load or a release happened in the meantime.
    async fn audio_url(&self) -> Result<String>;

    /// Retain/release hooks, if the model has any
    fn lifecycle(&self) -> Option<&dyn PlayableLifecycle> {
        None
    }

    /// Receiver for namespaced player events, if the model accepts them
    fn event_target(&self) -> Option<&dyn EventTarget> {
        None
    }
}

/// Hooks called when a playable is adopted and dropped by the player
pub trait PlayableLifecycle: Send + Sync {
    fn retain(&self);
    fn release(&self);
}

/// Anything that accepts namespaced player events
pub trait EventTarget: Send + Sync {
    /// `topic` is `"{prefix}:{event name}"`
    fn trigger(&self, topic: &str, event: &PlayerEvent);
}

/// `true` iff the candidate exposes a non-null id and an audio URL
pub fn is_playable(playable: &dyn Playable) -> bool {
    playable.id().is_some() && playable.supports_audio()
}
