//! Linear volume fadeout preceding sound disposal
//!
//! Each fade is a tokio task that owns the sound handle it targets. The
//! player keeps one cancellation token per fading sound (keyed by sound
//! generation), so a sound is never faded twice and shutdown can cut all
//! fades short.

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use playbridge_common::config::FadeConfig;

use crate::engine::Sound;

/// Ramp `sound` to silence, then destroy it
///
/// Every `settings.interval` the volume drops by `settings.step` (engine
/// scale) until it reaches zero. Cancelling `cancel` skips the rest of the
/// ramp; the sound is destroyed either way. A zero step or interval is
/// treated as 1 so the ramp always terminates.
pub async fn fade_out(sound: Arc<dyn Sound>, settings: FadeConfig, cancel: CancellationToken) {
    let step = settings.step.max(1);
    let mut volume = sound.volume();
    let mut ticker = tokio::time::interval(settings.interval().max(Duration::from_millis(1)));
    // First tick completes immediately
    ticker.tick().await;

    while volume > 0 {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Fadeout of sound {} cancelled at volume {}", sound.id(), volume);
                break;
            }
            _ = ticker.tick() => {
                volume = volume.saturating_sub(step);
                sound.set_volume(volume);
                trace!("Fadeout of sound {}: volume {}", sound.id(), volume);
            }
        }
    }

    sound.destroy();
    debug!("Sound {} destroyed after fadeout", sound.id());
}
