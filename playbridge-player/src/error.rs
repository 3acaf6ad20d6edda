//! Error types for playbridge-player
//!
//! Load failures are also published as `error` events; returning them here
//! lets callers that hold the `Player` directly react without subscribing.

use playbridge_common::PlayableId;
use thiserror::Error;

/// Main error type for playbridge-player
#[derive(Error, Debug)]
pub enum Error {
    /// Playback engine reported not-ready when a load was requested
    #[error("Playback engine is not ready")]
    EngineNotReady,

    /// Candidate lacks an id or cannot provide an audio URL
    #[error("Not playable: {}", .0.as_ref().map(|id| id.as_str()).unwrap_or("<no id>"))]
    NotPlayable(Option<PlayableId>),

    /// Playable failed to provide its audio URL
    #[error("Audio URL unavailable: {0}")]
    AudioUrl(String),

    /// Playback engine failed to construct or drive a sound
    #[error("Engine error: {0}")]
    Engine(String),

    /// Player constructed outside a tokio runtime
    #[error("Runtime error: {0}")]
    Runtime(String),
}

/// Convenience Result type using playbridge-player Error
pub type Result<T> = std::result::Result<T, Error>;
