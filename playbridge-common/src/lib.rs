//! # Playbridge Common Library
//!
//! Shared code for the playbridge workspace:
//! - Player event types (`PlayerEvent`, `BusEvent`) and the `EventBus`
//! - Player state and playable identifiers
//! - Configuration loading (TOML)
//! - Common error types

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
pub use events::{BusEvent, EventBus, PlayableId, PlayerEvent, PlayerState};
