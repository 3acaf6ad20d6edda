//! Event fan-out and engine callback translation

use std::future::poll_fn;
use std::sync::Weak;
use std::task::Poll;
use tracing::{debug, trace};

use playbridge_common::{PlayableId, PlayerEvent};

use super::{ActiveSound, Inner};
use crate::engine::{Sound, SoundEvent};

impl Inner {
    /// Publish step run after every emission
    ///
    /// 1. the player's own subscribers (unprefixed)
    /// 2. the bus, as `"{prefix}:{name}"`
    /// 3. the current playable's event target, same topic
    pub(super) fn publish(&self, event: PlayerEvent) {
        if event.is_progress() {
            trace!(event = event.name(), "Player event");
        } else {
            debug!(event = event.name(), playable = ?event.playable_id(), "Player event");
        }

        // No receivers is fine
        let _ = self.events_tx.send(event.clone());

        let prefix = &self.options.event_prefix;
        if let Some(bus) = &self.options.bus {
            bus.publish(prefix, event.clone());
        }

        let playable = self.slot.lock().playable.clone();
        if let Some(target) = playable.as_ref().and_then(|p| p.event_target()) {
            target.trigger(&event.topic(prefix), &event);
        }
    }

    /// Publish callbacks `sound` queued while attached, then close its queue
    ///
    /// Runs synchronously on detach so these events precede whatever the
    /// detaching operation publishes next.
    pub(super) fn flush_sound_events(&self, sound: &ActiveSound) {
        let pending = sound.events.lock().take();
        if let Some(mut rx) = pending {
            rx.close();
            while let Ok(sound_event) = rx.try_recv() {
                let event = translate(sound_event, sound.handle.as_ref(), sound.playable_id.clone());
                self.publish(event);
            }
        }
        sound.detached.cancel();
        debug!("Sound {} detached", sound.handle.id());
    }
}

/// Translate one engine callback, reading progress fields from the sound
pub(super) fn translate(event: SoundEvent, sound: &dyn Sound, playable_id: PlayableId) -> PlayerEvent {
    match event {
        SoundEvent::Play => PlayerEvent::Played { playable_id },
        SoundEvent::Pause => PlayerEvent::Paused { playable_id },
        SoundEvent::Resume => PlayerEvent::Resumed { playable_id },
        SoundEvent::Stop => PlayerEvent::Stopped { playable_id },
        SoundEvent::Finish => PlayerEvent::Finished { playable_id },
        SoundEvent::WhilePlaying => PlayerEvent::Playing {
            playable_id,
            position_ms: sound.position_ms(),
            duration_ms: sound.duration_estimate_ms(),
        },
        SoundEvent::WhileLoading => PlayerEvent::BytesLoaded {
            playable_id,
            bytes_loaded: sound.bytes_loaded(),
            bytes_total: sound.bytes_total(),
        },
    }
}

/// Forward callbacks of `sound` until it is detached or the player is gone
pub(super) async fn forward_sound_events(inner: Weak<Inner>, sound: ActiveSound) {
    loop {
        let next = tokio::select! {
            biased;
            _ = sound.detached.cancelled() => None,
            next = poll_fn(|cx| match sound.events.lock().as_mut() {
                Some(rx) => rx.poll_recv(cx),
                None => Poll::Ready(None),
            }) => next,
        };
        let Some(sound_event) = next else {
            break;
        };
        let Some(inner) = inner.upgrade() else {
            break;
        };

        let event = translate(sound_event, sound.handle.as_ref(), sound.playable_id.clone());
        inner.publish(event);
    }
    trace!("Event forwarding for sound generation {} ended", sound.generation);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{SimulatedEngine, SoundEventSender, SoundOptions};

    #[tokio::test]
    async fn test_translate_reads_progress_from_sound() {
        let engine = SimulatedEngine::default();
        let (tx, _rx) = SoundEventSender::channel();
        let sound = engine
            .create_simulated_sound(
                SoundOptions {
                    id: "s".to_string(),
                    url: "a.mp3".to_string(),
                    volume: 100,
                    auto_play: false,
                },
                tx,
            )
            .unwrap();
        sound.set_position(1_200);

        let id = PlayableId::from("a");
        assert_eq!(
            translate(SoundEvent::WhilePlaying, sound.as_ref(), id.clone()),
            PlayerEvent::Playing {
                playable_id: id.clone(),
                position_ms: 1_200,
                duration_ms: 5_000,
            }
        );
        assert_eq!(
            translate(SoundEvent::WhileLoading, sound.as_ref(), id.clone()),
            PlayerEvent::BytesLoaded {
                playable_id: id.clone(),
                bytes_loaded: 0,
                bytes_total: 80_000,
            }
        );
        assert_eq!(
            translate(SoundEvent::Finish, sound.as_ref(), id.clone()),
            PlayerEvent::Finished { playable_id: id }
        );
    }
}
