//! In-process simulated playback engine
//!
//! Produces no audio. Each sound is driven by a tokio task that advances
//! buffering and position on a fixed tick and reports the same callbacks a
//! real engine would. Used by the demo binary and by tests.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

use super::{PlayState, PlaybackEngine, Sound, SoundEvent, SoundEventSender, SoundOptions};
use crate::{Error, Result};

/// Shape of every simulated sound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationParams {
    /// Length of the simulated track
    pub duration_ms: u64,
    pub bytes_total: u64,
    /// Bytes buffered per tick
    pub bytes_per_tick: u64,
    /// Driver tick; position advances by this much per tick while playing
    pub tick: Duration,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            duration_ms: 5_000,
            bytes_total: 80_000,
            bytes_per_tick: 8_000,
            tick: Duration::from_millis(100),
        }
    }
}

/// Engine whose sounds play silently on tokio timers
pub struct SimulatedEngine {
    params: SimulationParams,
    ready: AtomicBool,
}

impl SimulatedEngine {
    pub fn new(params: SimulationParams) -> Self {
        Self {
            params,
            ready: AtomicBool::new(true),
        }
    }

    /// Toggle readiness (a real engine is not ready until initialised)
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }
}

impl Default for SimulatedEngine {
    fn default() -> Self {
        Self::new(SimulationParams::default())
    }
}

impl PlaybackEngine for SimulatedEngine {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn create_sound(
        &self,
        options: SoundOptions,
        events: SoundEventSender,
    ) -> Result<Arc<dyn Sound>> {
        let sound: Arc<dyn Sound> = self.create_simulated_sound(options, events)?;
        Ok(sound)
    }
}

impl SimulatedEngine {
    /// Same as `create_sound`, keeping the concrete handle type
    pub fn create_simulated_sound(
        &self,
        options: SoundOptions,
        events: SoundEventSender,
    ) -> Result<Arc<SimulatedSound>> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::Engine(format!("no async runtime for simulated sound: {}", e)))?;

        debug!("Simulated sound {} created for {}", options.id, options.url);
        let sound = Arc::new(SimulatedSound::new(options.id, options.volume, self.params, events));
        if options.auto_play {
            sound.play();
        }

        runtime.spawn(drive(Arc::clone(&sound)));
        Ok(sound)
    }
}

#[derive(Debug)]
struct SimState {
    play_state: PlayState,
    paused: bool,
    position_ms: u64,
    bytes_loaded: u64,
    volume: u8,
    destroyed: bool,
}

/// Sound handle created by `SimulatedEngine`
pub struct SimulatedSound {
    id: String,
    params: SimulationParams,
    state: Mutex<SimState>,
    events: SoundEventSender,
}

impl SimulatedSound {
    fn new(id: String, volume: u8, params: SimulationParams, events: SoundEventSender) -> Self {
        Self {
            id,
            params,
            state: Mutex::new(SimState {
                play_state: PlayState::Stopped,
                paused: false,
                position_ms: 0,
                bytes_loaded: 0,
                volume,
                destroyed: false,
            }),
            events,
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.state.lock().destroyed
    }

    /// Advance one tick; returns `false` once the driver should exit
    fn tick(&self) -> bool {
        let tick_ms = self.params.tick.as_millis() as u64;
        let mut pending = Vec::with_capacity(2);
        {
            let mut state = self.state.lock();
            if state.destroyed {
                return false;
            }

            if state.bytes_loaded < self.params.bytes_total {
                state.bytes_loaded =
                    (state.bytes_loaded + self.params.bytes_per_tick).min(self.params.bytes_total);
                pending.push(SoundEvent::WhileLoading);
            }

            if state.play_state == PlayState::Playing && !state.paused {
                state.position_ms = (state.position_ms + tick_ms).min(self.params.duration_ms);
                if state.position_ms >= self.params.duration_ms {
                    state.play_state = PlayState::Stopped;
                    pending.push(SoundEvent::Finish);
                } else {
                    pending.push(SoundEvent::WhilePlaying);
                }
            }
        }

        for event in pending {
            trace!("Simulated sound {}: {:?}", self.id, event);
            self.events.send(event);
        }
        !self.events.is_closed()
    }
}

async fn drive(sound: Arc<SimulatedSound>) {
    let mut interval = tokio::time::interval(sound.params.tick);
    // First tick completes immediately
    interval.tick().await;
    loop {
        interval.tick().await;
        if !sound.tick() {
            break;
        }
    }
    trace!("Simulated sound {} driver exited", sound.id);
}

impl Sound for SimulatedSound {
    fn id(&self) -> &str {
        &self.id
    }

    fn play_state(&self) -> PlayState {
        self.state.lock().play_state
    }

    fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    fn position_ms(&self) -> u64 {
        self.state.lock().position_ms
    }

    fn duration_estimate_ms(&self) -> u64 {
        self.params.duration_ms
    }

    fn bytes_loaded(&self) -> u64 {
        self.state.lock().bytes_loaded
    }

    fn bytes_total(&self) -> u64 {
        self.params.bytes_total
    }

    fn volume(&self) -> u8 {
        self.state.lock().volume
    }

    fn play(&self) {
        {
            let mut state = self.state.lock();
            if state.destroyed || state.play_state == PlayState::Playing {
                return;
            }
            if state.position_ms >= self.params.duration_ms {
                state.position_ms = 0;
            }
            state.play_state = PlayState::Playing;
            state.paused = false;
        }
        self.events.send(SoundEvent::Play);
    }

    fn toggle_pause(&self) {
        let event = {
            let mut state = self.state.lock();
            if state.destroyed {
                return;
            }
            match (state.play_state, state.paused) {
                (PlayState::Stopped, _) => None,
                (PlayState::Playing, true) => {
                    state.paused = false;
                    Some(SoundEvent::Resume)
                }
                (PlayState::Playing, false) => {
                    state.paused = true;
                    Some(SoundEvent::Pause)
                }
            }
        };

        match event {
            Some(event) => self.events.send(event),
            // Toggling a stopped sound starts it
            None => self.play(),
        }
    }

    fn stop(&self) {
        {
            let mut state = self.state.lock();
            if state.destroyed || state.play_state == PlayState::Stopped {
                return;
            }
            state.play_state = PlayState::Stopped;
            state.paused = false;
            state.position_ms = 0;
        }
        self.events.send(SoundEvent::Stop);
    }

    fn set_volume(&self, volume: u8) {
        self.state.lock().volume = volume.min(crate::volume::ENGINE_VOLUME_MAX);
    }

    fn set_position(&self, position_ms: u64) {
        let mut state = self.state.lock();
        if !state.destroyed {
            state.position_ms = position_ms.min(self.params.duration_ms);
        }
    }

    fn destroy(&self) {
        let mut state = self.state.lock();
        state.destroyed = true;
        state.play_state = PlayState::Stopped;
        debug!("Simulated sound {} destroyed", self.id);
    }
}
