//! Player: single point of control for what is currently playing
//!
//! Mediates between application playables and the playback engine, and
//! republishes engine callbacks as `PlayerEvent`s.
//!
//! # State
//!
//! At most one playable and one sound handle are held at a time, behind a
//! single mutex. The lock is never held across an `.await` or while
//! calling into a playable (hooks, event target).
//!
//! # Generations
//!
//! - **load generation**: bumped on every load and release. A URL fetch
//!   that completes under a different generation is discarded.
//! - **sound generation**: identifies one sound handle. Fades are bound to
//!   it, so a sound is never faded twice.
//!
//! # Detaching
//!
//! Callbacks a sound reported while it was attached are published before
//! the sound is detached, so a `stop()` right before a release still
//! yields `stopped`. Anything the engine reports afterwards goes nowhere.

mod dispatch;
pub mod fade;

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use playbridge_common::config::{FadeConfig, PlayerConfig};
use playbridge_common::{EventBus, PlayableId, PlayerEvent, PlayerState};

use crate::engine::{
    buffered_fraction, PlayState, PlaybackEngine, Sound, SoundEvent, SoundEventSender, SoundOptions,
};
use crate::playable::{self, Playable};
use crate::volume::Volume;
use crate::{Error, Result};

/// Construction options
#[derive(Clone)]
pub struct PlayerOptions {
    /// Shared bus every event is also published on
    pub bus: Option<Arc<EventBus>>,
    /// Start playback once the sound handle is constructed
    pub auto_play: bool,
    /// Namespace for bus and playable topics
    pub event_prefix: String,
    pub initial_volume: Volume,
    pub fade: FadeConfig,
    /// Capacity of the player's own event channel
    pub channel_capacity: usize,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self::from_config(&PlayerConfig::default(), None)
    }
}

impl PlayerOptions {
    /// Build options from the `[player]` config section
    ///
    /// The config is validated on load, so an out-of-range initial volume
    /// only reaches here through a hand-built `PlayerConfig`; it falls back
    /// to full volume.
    pub fn from_config(config: &PlayerConfig, bus: Option<Arc<EventBus>>) -> Self {
        Self {
            bus,
            auto_play: config.auto_play,
            event_prefix: config.event_prefix.clone(),
            initial_volume: Volume::new(config.initial_volume).unwrap_or_default(),
            fade: config.fade,
            channel_capacity: config.bus_capacity,
        }
    }

    pub fn with_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn with_auto_play(mut self, auto_play: bool) -> Self {
        self.auto_play = auto_play;
        self
    }
}

/// Sound handle currently associated with the player
#[derive(Clone)]
pub(crate) struct ActiveSound {
    handle: Arc<dyn Sound>,
    generation: u64,
    playable_id: PlayableId,
    /// Callback queue; taken (and closed) when the sound is detached
    events: Arc<Mutex<Option<UnboundedReceiver<SoundEvent>>>>,
    detached: CancellationToken,
}

struct Slot {
    playable: Option<Arc<dyn Playable>>,
    sound: Option<ActiveSound>,
    volume: Volume,
    load_generation: u64,
    sound_generation: u64,
}

pub(crate) struct Inner {
    engine: Arc<dyn PlaybackEngine>,
    options: PlayerOptions,
    runtime: Handle,
    slot: Mutex<Slot>,
    /// Cancellation token per fading sound generation
    fades: Mutex<HashMap<u64, CancellationToken>>,
    events_tx: broadcast::Sender<PlayerEvent>,
}

/// Playback adapter between playables and a playback engine
///
/// Cheap to clone; clones share state. One instance per process is the
/// expected usage, but nothing enforces it: construct it once at startup
/// and pass it to whatever needs it.
#[derive(Clone)]
pub struct Player {
    inner: Arc<Inner>,
}

impl Player {
    /// Create a player bound to the current tokio runtime
    pub fn new(engine: Arc<dyn PlaybackEngine>, options: PlayerOptions) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| Error::Runtime(e.to_string()))?;
        let (events_tx, _) = broadcast::channel(options.channel_capacity.max(1));

        Ok(Self {
            inner: Arc::new(Inner {
                engine,
                slot: Mutex::new(Slot {
                    playable: None,
                    sound: None,
                    volume: options.initial_volume,
                    load_generation: 0,
                    sound_generation: 0,
                }),
                options,
                runtime,
                fades: Mutex::new(HashMap::new()),
                events_tx,
            }),
        })
    }

    /// Subscribe to events emitted on the player itself (unprefixed)
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.inner.events_tx.subscribe()
    }

    pub fn options(&self) -> &PlayerOptions {
        &self.inner.options
    }

    /// Currently loaded playable
    pub fn playable(&self) -> Option<Arc<dyn Playable>> {
        self.inner.slot.lock().playable.clone()
    }

    /// Current sound handle
    pub fn sound(&self) -> Option<Arc<dyn Sound>> {
        self.inner.active_sound().map(|s| s.handle)
    }

    /// Stored volume in [0, 1]
    pub fn volume(&self) -> f64 {
        self.inner.slot.lock().volume.get()
    }

    /// Load `playable`, releasing whatever was loaded before
    ///
    /// No-op when `playable` is already loaded. Fails (and publishes an
    /// `error` event) when the engine is not ready or the candidate is not
    /// playable; the current state is left untouched in both cases.
    ///
    /// The audio URL is fetched on a spawned task; `loaded` follows once the
    /// sound handle exists.
    pub fn load(&self, playable: Arc<dyn Playable>) -> Result<()> {
        if self.is_already_playing(playable.as_ref()) {
            debug!("Load ignored: {:?} already loaded", playable.id());
            return Ok(());
        }

        if !self.inner.engine.is_ready() {
            warn!("Load rejected: playback engine not ready");
            self.inner.publish(PlayerEvent::Error {
                message: Error::EngineNotReady.to_string(),
                playable_id: None,
            });
            return Err(Error::EngineNotReady);
        }

        let id = match playable.id() {
            Some(id) if playable.supports_audio() => id,
            id => {
                let error = Error::NotPlayable(id.clone());
                warn!("Load rejected: {}", error);
                self.inner.publish(PlayerEvent::Error {
                    message: error.to_string(),
                    playable_id: id,
                });
                return Err(error);
            }
        };

        if self.inner.slot.lock().playable.is_some() {
            self.release();
        }

        let generation = {
            let mut slot = self.inner.slot.lock();
            slot.load_generation += 1;
            slot.playable = Some(Arc::clone(&playable));
            slot.load_generation
        };

        if let Some(lifecycle) = playable.lifecycle() {
            lifecycle.retain();
        }

        info!("Loading {}", id);
        self.inner.publish(PlayerEvent::Loading {
            playable_id: id.clone(),
        });

        let inner = Arc::clone(&self.inner);
        self.inner.runtime.spawn(async move {
            let url = playable.audio_url().await;
            inner.on_audio_url(generation, id, url);
        });

        Ok(())
    }

    /// Fade out and drop the sound, then drop the playable
    ///
    /// Publishes `releasing` and `released` even when nothing is loaded.
    pub fn release(&self) {
        self.fadeout();
        self.inner.detach_sound();

        let (playable, playable_id) = {
            let slot = self.inner.slot.lock();
            let id = slot.playable.as_ref().and_then(|p| p.id());
            (slot.playable.clone(), id)
        };

        self.inner.publish(PlayerEvent::Releasing {
            playable_id: playable_id.clone(),
        });

        if let Some(lifecycle) = playable.as_ref().and_then(|p| p.lifecycle()) {
            lifecycle.release();
        }

        {
            let mut slot = self.inner.slot.lock();
            slot.load_generation += 1;
            slot.playable = None;
        }

        if let Some(id) = &playable_id {
            info!("Released {}", id);
        }
        self.inner.publish(PlayerEvent::Released { playable_id });
    }

    /// Ramp the current sound to silence and destroy it (fire-and-forget)
    ///
    /// The sound stays associated with the player until `release`. A sound
    /// that is already fading is left to its running fade.
    pub fn fadeout(&self) {
        if let Some(active) = self.inner.active_sound() {
            self.inner.start_fade(active);
        }
    }

    /// `None` when nothing is loaded
    pub fn state(&self) -> Option<PlayerState> {
        let (has_playable, sound) = {
            let slot = self.inner.slot.lock();
            (slot.playable.is_some(), slot.sound.clone())
        };
        if !has_playable {
            return None;
        }

        let state = match sound {
            None => PlayerState::Loading,
            Some(active) if active.handle.play_state() == PlayState::Stopped => PlayerState::Stopped,
            Some(active) if active.handle.is_paused() => PlayerState::Paused,
            Some(_) => PlayerState::Playing,
        };
        Some(state)
    }

    /// True iff a playable is loaded and its id equals `playable`'s id
    pub fn is_already_playing(&self, playable: &dyn Playable) -> bool {
        let Some(candidate) = playable.id() else {
            return false;
        };
        self.current_id().as_ref() == Some(&candidate)
    }

    /// True iff the candidate has an id and can provide an audio URL
    pub fn is_playable(&self, candidate: &dyn Playable) -> bool {
        playable::is_playable(candidate)
    }

    /// Toggle pause on the loaded playable, or switch to another one
    ///
    /// With `None` the current playable is targeted. When it is the loaded
    /// one and a sound exists, pause/resume is toggled on the engine;
    /// otherwise current playback is stopped and the target loaded.
    pub fn toggle(&self, playable: Option<Arc<dyn Playable>>) -> Result<()> {
        let target = playable.or_else(|| self.playable());

        if let (Some(active), Some(target)) = (self.inner.active_sound(), &target) {
            if self.is_already_playing(target.as_ref()) {
                active.handle.toggle_pause();
                return Ok(());
            }
        }

        self.stop();
        match target {
            Some(target) => self.load(target),
            None => Ok(()),
        }
    }

    pub fn stop(&self) {
        if let Some(active) = self.inner.active_sound() {
            active.handle.stop();
        }
    }

    /// Set volume in [0, 1] on the current sound
    ///
    /// No-op (returns `None`) without a sound or for out-of-range values.
    pub fn set_volume(&self, volume: f64) -> Option<Arc<dyn Sound>> {
        let active = self.inner.active_sound()?;
        let volume = Volume::new(volume)?;

        self.inner.slot.lock().volume = volume;
        active.handle.set_volume(volume.to_engine());
        debug!("Volume set to {}", volume.to_engine());
        Some(active.handle)
    }

    /// Seek to a fraction of the estimated duration
    ///
    /// Rejected when the fraction lies outside [0, 1] or beyond what has
    /// been buffered so far.
    pub fn set_position(&self, position: f64) {
        let Some(active) = self.inner.active_sound() else {
            return;
        };
        if !(0.0..=1.0).contains(&position) {
            return;
        }

        let buffered = buffered_fraction(active.handle.as_ref());
        if buffered < position {
            debug!("Seek to {:.3} rejected, only {:.3} buffered", position, buffered);
            return;
        }

        let target_ms = (position * active.handle.duration_estimate_ms() as f64).round() as u64;
        active.handle.set_position(target_ms);
    }

    /// Seek relative to the current position (negative rewinds, floored at 0)
    pub fn set_relative_position(&self, delta_ms: i64) {
        let Some(active) = self.inner.active_sound() else {
            return;
        };
        let current = i64::try_from(active.handle.position_ms()).unwrap_or(i64::MAX);
        let target = current.saturating_add(delta_ms).max(0) as u64;
        active.handle.set_position(target);
    }

    /// Number of fades still running
    pub fn active_fades(&self) -> usize {
        self.inner.fades.lock().len()
    }

    /// Release, then cut every running fade short
    ///
    /// Cancelled fades destroy their sound immediately.
    pub fn shutdown(&self) {
        self.release();
        let fades = self.inner.fades.lock();
        for token in fades.values() {
            token.cancel();
        }
        info!("Player shut down, {} fade(s) cancelled", fades.len());
    }

    fn current_id(&self) -> Option<PlayableId> {
        let playable = self.inner.slot.lock().playable.clone();
        playable.and_then(|p| p.id())
    }
}

impl Inner {
    fn active_sound(&self) -> Option<ActiveSound> {
        self.slot.lock().sound.clone()
    }

    /// Take the current sound off the player, flushing its queued callbacks
    fn detach_sound(&self) -> Option<ActiveSound> {
        let active = self.slot.lock().sound.take()?;
        self.flush_sound_events(&active);
        Some(active)
    }

    fn is_current_load(&self, generation: u64) -> bool {
        self.slot.lock().load_generation == generation
    }

    /// Audio URL arrived (or failed) for the load tagged `generation`
    fn on_audio_url(self: &Arc<Self>, generation: u64, playable_id: PlayableId, url: Result<String>) {
        let url = match url {
            Ok(url) => url,
            Err(e) => {
                if self.is_current_load(generation) {
                    warn!("No audio URL for {}: {}", playable_id, e);
                    self.publish(PlayerEvent::Error {
                        message: e.to_string(),
                        playable_id: Some(playable_id),
                    });
                }
                return;
            }
        };

        let volume = {
            let slot = self.slot.lock();
            if slot.load_generation != generation {
                debug!("Discarding stale audio URL for {}", playable_id);
                return;
            }
            slot.volume
        };
        if let Some(prior) = self.detach_sound() {
            self.start_fade(prior);
        }

        let (events, rx) = SoundEventSender::channel();
        let options = SoundOptions {
            id: Uuid::new_v4().to_string(),
            url,
            volume: volume.to_engine(),
            auto_play: false,
        };
        debug!("Creating sound {} for {} ({})", options.id, playable_id, options.url);

        let handle = match self.engine.create_sound(options, events) {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Engine failed to create sound for {}: {}", playable_id, e);
                self.publish(PlayerEvent::Error {
                    message: e.to_string(),
                    playable_id: Some(playable_id),
                });
                return;
            }
        };

        let active = {
            let mut slot = self.slot.lock();
            if slot.load_generation != generation {
                None
            } else {
                slot.sound_generation += 1;
                let active = ActiveSound {
                    handle: Arc::clone(&handle),
                    generation: slot.sound_generation,
                    playable_id: playable_id.clone(),
                    events: Arc::new(Mutex::new(Some(rx))),
                    detached: CancellationToken::new(),
                };
                slot.sound = Some(active.clone());
                Some(active)
            }
        };
        let Some(active) = active else {
            debug!("Load of {} superseded during sound creation", playable_id);
            handle.destroy();
            return;
        };

        info!("Loaded {} as sound {}", playable_id, handle.id());
        self.publish(PlayerEvent::Loaded {
            playable_id,
            sound_id: handle.id().to_string(),
        });

        self.runtime
            .spawn(dispatch::forward_sound_events(Arc::downgrade(self), active));

        if self.options.auto_play {
            handle.play();
        }
    }

    /// Start a fade bound to `sound`, unless one is already running for it
    fn start_fade(self: &Arc<Self>, sound: ActiveSound) {
        let token = {
            let mut fades = self.fades.lock();
            if fades.contains_key(&sound.generation) {
                debug!("Sound {} already fading", sound.handle.id());
                return;
            }
            let token = CancellationToken::new();
            fades.insert(sound.generation, token.clone());
            token
        };

        debug!("Fading out sound {}", sound.handle.id());
        let inner = Arc::downgrade(self);
        let settings = self.options.fade;
        self.runtime.spawn(async move {
            fade::fade_out(sound.handle, settings, token).await;
            if let Some(inner) = inner.upgrade() {
                inner.fades.lock().remove(&sound.generation);
            }
        });
    }
}
