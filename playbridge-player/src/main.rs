//! playbridge - demo driver
//!
//! Loads one playable through the simulated engine, logs every bus event
//! and exits once playback finishes (or on Ctrl-C).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use clap::Parser;
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use playbridge_common::config::load_config;
use playbridge_player::engine::{SimulatedEngine, SimulationParams};
use playbridge_player::{
    EventBus, EventTarget, PlayableId, Player, PlayerEvent, PlayerOptions, Playable, Volume,
};

/// Command-line arguments for playbridge
#[derive(Parser, Debug)]
#[command(name = "playbridge")]
#[command(about = "Drive a simulated playback engine through the playbridge player")]
#[command(version)]
struct Args {
    /// Config file (overrides PLAYBRIDGE_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Audio URL handed to the engine
    #[arg(short, long, default_value = "demo.mp3")]
    url: String,

    /// Playable id
    #[arg(long, default_value = "demo")]
    id: String,

    /// Start playback as soon as the sound is loaded
    #[arg(long)]
    auto_play: bool,

    /// Initial volume in [0, 1]
    #[arg(short, long)]
    volume: Option<f64>,

    /// Length of the simulated track
    #[arg(long, default_value = "3000")]
    duration_ms: u64,
}

/// Playable backed by a fixed URL
struct UrlPlayable {
    id: PlayableId,
    url: String,
}

#[async_trait]
impl Playable for UrlPlayable {
    fn id(&self) -> Option<PlayableId> {
        Some(self.id.clone())
    }

    async fn audio_url(&self) -> playbridge_player::Result<String> {
        Ok(self.url.clone())
    }

    fn event_target(&self) -> Option<&dyn EventTarget> {
        Some(self)
    }
}

impl EventTarget for UrlPlayable {
    fn trigger(&self, topic: &str, event: &PlayerEvent) {
        if !event.is_progress() {
            debug!("{} received {}", self.id, topic);
        }
    }
}

fn init_tracing(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "playbridge={level},playbridge_player={level},playbridge_common={level}"
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config picks the log level, so it is reported once tracing is up
    let (config, source) = load_config(args.config.as_deref());
    init_tracing(&config.logging.level);
    source.log();

    let bus = Arc::new(EventBus::new(config.player.bus_capacity));
    let mut bus_rx = bus.subscribe();

    let mut options = PlayerOptions::from_config(&config.player, Some(Arc::clone(&bus)));
    if args.auto_play {
        options.auto_play = true;
    }
    if let Some(volume) = args.volume {
        options.initial_volume =
            Volume::new(volume).ok_or_else(|| anyhow!("volume must be within [0, 1], got {}", volume))?;
    }
    let auto_play = options.auto_play;

    let engine = Arc::new(SimulatedEngine::new(SimulationParams {
        duration_ms: args.duration_ms,
        ..SimulationParams::default()
    }));
    let player = Player::new(engine, options).context("Failed to create player")?;

    info!("Starting playbridge: {} ({})", args.id, args.url);
    player
        .load(Arc::new(UrlPlayable {
            id: PlayableId::new(args.id),
            url: args.url,
        }))
        .context("Failed to load playable")?;

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            received = bus_rx.recv() => {
                let bus_event = match received {
                    Ok(bus_event) => bus_event,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Event log lagged, {} events skipped", skipped);
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };

                match &bus_event.event {
                    PlayerEvent::Playing { position_ms, duration_ms, .. } => {
                        info!("{} {}/{} ms", bus_event.topic, position_ms, duration_ms);
                    }
                    event if event.is_progress() => debug!("{}", bus_event.topic),
                    event => info!("{} {:?}", bus_event.topic, event),
                }

                match bus_event.event {
                    PlayerEvent::Loaded { .. } if !auto_play => {
                        player.toggle(None).context("Failed to start playback")?;
                    }
                    PlayerEvent::Finished { .. } => break,
                    PlayerEvent::Error { message, .. } => {
                        warn!("Playback error: {}", message);
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    player.release();
    let fade_deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while player.active_fades() > 0 && tokio::time::Instant::now() < fade_deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    player.shutdown();

    info!("playbridge stopped");
    Ok(())
}
