//! Player-related type definitions
//!
//! Supporting types for player state and playable identity.

use serde::{Deserialize, Serialize};

/// Stable identifier of a playable model
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayableId(String);

impl PlayableId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PlayableId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PlayableId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for PlayableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Player state as reported by `Player::state()`
///
/// A player with no playable has no state at all (`None`), so there is no
/// "idle" variant here.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlayerState {
    /// Playable adopted, audio URL requested, no sound handle yet
    Loading,
    /// Sound handle exists and the engine reports it stopped
    Stopped,
    Paused,
    Playing,
}

impl std::fmt::Display for PlayerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayerState::Loading => write!(f, "loading"),
            PlayerState::Stopped => write!(f, "stopped"),
            PlayerState::Paused => write!(f, "paused"),
            PlayerState::Playing => write!(f, "playing"),
        }
    }
}
