//! Playback engine abstraction
//!
//! The engine is external: it turns a URL into a controllable sound handle
//! and reports lifecycle callbacks. The player only sees these traits.
//!
//! # Callbacks
//!
//! Instead of per-callback closures, the engine receives a
//! `SoundEventSender` when a sound is created and reports `SoundEvent`s on
//! it. The player runs one forwarding task per sound that turns them into
//! `PlayerEvent`s.

pub mod simulated;

use std::sync::Arc;
use tokio::sync::mpsc;

use crate::Result;

pub use simulated::{SimulatedEngine, SimulatedSound, SimulationParams};

/// Engine-level playback state of a sound handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    /// Not started, explicitly stopped, or finished
    Stopped,
    /// Started; may still be paused (see `Sound::is_paused`)
    Playing,
}

/// Options for `PlaybackEngine::create_sound`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoundOptions {
    /// Engine-side handle identifier
    pub id: String,
    pub url: String,
    /// Initial volume, 0..=100
    pub volume: u8,
    /// Whether the engine itself should start playback. The player always
    /// passes `false` and calls `play()` after publishing `loaded`.
    pub auto_play: bool,
}

/// Callbacks a sound handle reports back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundEvent {
    /// Playback started
    Play,
    Pause,
    Resume,
    Stop,
    /// Reached the end
    Finish,
    /// Position tick while playing
    WhilePlaying,
    /// Byte progress while loading
    WhileLoading,
}

/// Channel end the engine reports `SoundEvent`s on
///
/// Sending never blocks and never fails loudly: once the player has dropped
/// the sound, events go nowhere.
#[derive(Debug, Clone)]
pub struct SoundEventSender {
    tx: mpsc::UnboundedSender<SoundEvent>,
}

impl SoundEventSender {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SoundEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn send(&self, event: SoundEvent) {
        let _ = self.tx.send(event);
    }

    /// True once the receiving side is gone
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Per-playback control object created by the engine
pub trait Sound: Send + Sync {
    fn id(&self) -> &str;

    fn play_state(&self) -> PlayState;
    fn is_paused(&self) -> bool;

    /// Current position in milliseconds
    fn position_ms(&self) -> u64;
    /// Estimated total duration in milliseconds (grows while buffering)
    fn duration_estimate_ms(&self) -> u64;
    fn bytes_loaded(&self) -> u64;
    /// Zero until the engine knows the size
    fn bytes_total(&self) -> u64;

    /// Current volume, 0..=100
    fn volume(&self) -> u8;

    fn play(&self);
    /// Pause if playing, resume if paused
    fn toggle_pause(&self);
    fn stop(&self);
    /// 0..=100
    fn set_volume(&self, volume: u8);
    /// Absolute position in milliseconds
    fn set_position(&self, position_ms: u64);
    /// Release engine resources; the handle is unusable afterwards
    fn destroy(&self);
}

/// Third-party playback engine
pub trait PlaybackEngine: Send + Sync {
    fn is_ready(&self) -> bool;

    fn create_sound(
        &self,
        options: SoundOptions,
        events: SoundEventSender,
    ) -> Result<Arc<dyn Sound>>;
}

/// Fraction of the sound buffered so far, 0.0 when the size is unknown
pub fn buffered_fraction(sound: &dyn Sound) -> f64 {
    let total = sound.bytes_total();
    if total == 0 {
        return 0.0;
    }
    sound.bytes_loaded() as f64 / total as f64
}
