//! Shared test infrastructure: recording engine and configurable playable

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Notify};

use playbridge_player::{
    Error, EventTarget, PlayState, PlayableId, PlayableLifecycle, PlaybackEngine, Playable,
    PlayerEvent, Result, Sound, SoundEvent, SoundEventSender, SoundOptions,
};

// ================================================================================================
// MockEngine
// ================================================================================================

/// Control call recorded on a mock sound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundCall {
    Play,
    TogglePause,
    Stop,
    SetVolume(u8),
    SetPosition(u64),
    Destroy,
}

#[derive(Debug)]
struct MockState {
    play_state: PlayState,
    paused: bool,
    position_ms: u64,
    duration_ms: u64,
    bytes_loaded: u64,
    bytes_total: u64,
    volume: u8,
    destroyed: bool,
    calls: Vec<SoundCall>,
}

/// Sound handle that records every control call
pub struct MockSound {
    pub options: SoundOptions,
    events: SoundEventSender,
    state: Mutex<MockState>,
}

impl MockSound {
    pub fn calls(&self) -> Vec<SoundCall> {
        self.state.lock().calls.clone()
    }

    pub fn is_destroyed(&self) -> bool {
        self.state.lock().destroyed
    }

    /// Report a callback as the engine would
    pub fn emit(&self, event: SoundEvent) {
        self.events.send(event);
    }

    pub fn set_progress(&self, position_ms: u64, duration_ms: u64, bytes_loaded: u64, bytes_total: u64) {
        let mut state = self.state.lock();
        state.position_ms = position_ms;
        state.duration_ms = duration_ms;
        state.bytes_loaded = bytes_loaded;
        state.bytes_total = bytes_total;
    }

    fn record(&self, call: SoundCall) {
        self.state.lock().calls.push(call);
    }
}

impl Sound for MockSound {
    fn id(&self) -> &str {
        &self.options.id
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
        self.state.lock().duration_ms
    }

    fn bytes_loaded(&self) -> u64 {
        self.state.lock().bytes_loaded
    }

    fn bytes_total(&self) -> u64 {
        self.state.lock().bytes_total
    }

    fn volume(&self) -> u8 {
        self.state.lock().volume
    }

    fn play(&self) {
        self.record(SoundCall::Play);
        {
            let mut state = self.state.lock();
            state.play_state = PlayState::Playing;
            state.paused = false;
        }
        self.events.send(SoundEvent::Play);
    }

    fn toggle_pause(&self) {
        self.record(SoundCall::TogglePause);
        let event = {
            let mut state = self.state.lock();
            if state.play_state == PlayState::Stopped {
                state.play_state = PlayState::Playing;
                SoundEvent::Play
            } else if state.paused {
                state.paused = false;
                SoundEvent::Resume
            } else {
                state.paused = true;
                SoundEvent::Pause
            }
        };
        self.events.send(event);
    }

    fn stop(&self) {
        self.record(SoundCall::Stop);
        {
            let mut state = self.state.lock();
            state.play_state = PlayState::Stopped;
            state.paused = false;
        }
        self.events.send(SoundEvent::Stop);
    }

    fn set_volume(&self, volume: u8) {
        let mut state = self.state.lock();
        state.calls.push(SoundCall::SetVolume(volume));
        state.volume = volume;
    }

    fn set_position(&self, position_ms: u64) {
        let mut state = self.state.lock();
        state.calls.push(SoundCall::SetPosition(position_ms));
        state.position_ms = position_ms;
    }

    fn destroy(&self) {
        let mut state = self.state.lock();
        state.calls.push(SoundCall::Destroy);
        state.destroyed = true;
    }
}

/// Engine that hands out `MockSound`s and keeps them for inspection
pub struct MockEngine {
    ready: AtomicBool,
    fail_create: AtomicBool,
    sounds: Mutex<Vec<Arc<MockSound>>>,
}

impl MockEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            ready: AtomicBool::new(true),
            fail_create: AtomicBool::new(false),
            sounds: Mutex::new(Vec::new()),
        })
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn sounds(&self) -> Vec<Arc<MockSound>> {
        self.sounds.lock().clone()
    }

    pub fn last_sound(&self) -> Arc<MockSound> {
        self.sounds
            .lock()
            .last()
            .cloned()
            .expect("engine created no sound")
    }
}

impl PlaybackEngine for MockEngine {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn create_sound(&self, options: SoundOptions, events: SoundEventSender) -> Result<Arc<dyn Sound>> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(Error::Engine("mock refused".to_string()));
        }

        let sound = Arc::new(MockSound {
            state: Mutex::new(MockState {
                play_state: PlayState::Stopped,
                paused: false,
                position_ms: 0,
                duration_ms: 0,
                bytes_loaded: 0,
                bytes_total: 0,
                volume: options.volume,
                destroyed: false,
                calls: Vec::new(),
            }),
            options,
            events,
        });
        self.sounds.lock().push(Arc::clone(&sound));
        Ok(sound)
    }
}

// ================================================================================================
// TestPlayable
// ================================================================================================

/// Playable with counters for hooks and a log of received topics
pub struct TestPlayable {
    id: Option<PlayableId>,
    url: String,
    supports_audio: bool,
    url_error: Option<String>,
    /// When set, `audio_url` waits for a notification
    gate: Option<Arc<Notify>>,
    pub retains: AtomicUsize,
    pub releases: AtomicUsize,
    topics: Mutex<Vec<String>>,
}

impl TestPlayable {
    pub fn new(id: &str) -> Self {
        Self {
            id: Some(PlayableId::from(id)),
            url: format!("{}.mp3", id),
            supports_audio: true,
            url_error: None,
            gate: None,
            retains: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
            topics: Mutex::new(Vec::new()),
        }
    }

    pub fn without_id() -> Self {
        Self {
            id: None,
            ..Self::new("anonymous")
        }
    }

    pub fn without_audio(mut self) -> Self {
        self.supports_audio = false;
        self
    }

    pub fn failing_url(mut self, message: &str) -> Self {
        self.url_error = Some(message.to_string());
        self
    }

    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn retain_count(&self) -> usize {
        self.retains.load(Ordering::SeqCst)
    }

    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn topics(&self) -> Vec<String> {
        self.topics.lock().clone()
    }
}

#[async_trait]
impl Playable for TestPlayable {
    fn id(&self) -> Option<PlayableId> {
        self.id.clone()
    }

    fn supports_audio(&self) -> bool {
        self.supports_audio
    }

    async fn audio_url(&self) -> Result<String> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        match &self.url_error {
            Some(message) => Err(Error::AudioUrl(message.clone())),
            None => Ok(self.url.clone()),
        }
    }

    fn lifecycle(&self) -> Option<&dyn PlayableLifecycle> {
        Some(self)
    }

    fn event_target(&self) -> Option<&dyn EventTarget> {
        Some(self)
    }
}

impl PlayableLifecycle for TestPlayable {
    fn retain(&self) {
        self.retains.fetch_add(1, Ordering::SeqCst);
    }

    fn release(&self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

impl EventTarget for TestPlayable {
    fn trigger(&self, topic: &str, _event: &PlayerEvent) {
        self.topics.lock().push(topic.to_string());
    }
}

// ================================================================================================
// Event helpers
// ================================================================================================

const EVENT_TIMEOUT: Duration = Duration::from_secs(1);

/// Receive events until one named `name` arrives; returns all names seen
pub async fn wait_for(rx: &mut broadcast::Receiver<PlayerEvent>, name: &str) -> Vec<String> {
    let mut seen = Vec::new();
    loop {
        let event = tokio::time::timeout(EVENT_TIMEOUT, rx.recv())
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {}, saw {:?}", name, seen))
            .expect("player event channel closed");
        seen.push(event.name().to_string());
        if event.name() == name {
            return seen;
        }
    }
}

/// Next event, or panic after the timeout
pub async fn next_event(rx: &mut broadcast::Receiver<PlayerEvent>) -> PlayerEvent {
    tokio::time::timeout(EVENT_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("player event channel closed")
}

/// Let spawned tasks run, then collect whatever was emitted
pub async fn drain(rx: &mut broadcast::Receiver<PlayerEvent>) -> Vec<String> {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    let mut names = Vec::new();
    while let Ok(event) = rx.try_recv() {
        names.push(event.name().to_string());
    }
    names
}
