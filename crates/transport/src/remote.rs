//! Play/pause events observed from other participants in the room.
//!
//! Each event is one controller transition under the room lock. The room
//! already saw the change, so nothing is sent back out.

use jukebox_core::{PlaybackState, TrackRecord};
use jukebox_engine::{Controller, Rejected};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub enum RemoteAction {
    /// Someone started `track`, or searched it to `offset`.
    Play { track: TrackRecord, offset: Duration },
    /// Someone paused, or searched while paused, at `offset`.
    Pause { offset: Duration },
}

#[derive(Debug, Clone)]
pub struct RemoteEvent {
    /// Nick of the participant that caused the event.
    pub origin: String,
    pub action: RemoteAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOutcome {
    /// Our own command echoed back, or nothing to apply it to.
    Ignored,
    Applied(PlaybackState),
}

pub fn apply_remote(
    controller: &Controller,
    bot_name: &str,
    event: RemoteEvent,
) -> Result<RemoteOutcome, Rejected> {
    if event.origin == bot_name {
        debug!("ignoring echo of our own playback event");
        return Ok(RemoteOutcome::Ignored);
    }

    match event.action {
        RemoteAction::Pause { offset } => match controller.observe_remote_pause(offset) {
            Ok(at) => {
                info!(origin = %event.origin, offset_secs = at.as_secs_f64(), "remote pause");
                Ok(RemoteOutcome::Applied(PlaybackState::Paused))
            }
            Err(Rejected::NotActive) => Ok(RemoteOutcome::Ignored),
            Err(err) => Err(err),
        },
        RemoteAction::Play { track, offset } => {
            let track_id = track.id.clone();
            let index = controller.observe_remote_play(track, offset)?;
            info!(
                origin = %event.origin,
                index,
                track_id = %track_id,
                offset_secs = offset.as_secs_f64(),
                "remote play"
            );
            Ok(RemoteOutcome::Applied(PlaybackState::Playing))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{apply_remote, RemoteAction, RemoteEvent, RemoteOutcome};
    use crate::{ChannelNotifier, Outbound};
    use jukebox_core::{PlaybackState, SourceKind, TrackRecord};
    use jukebox_engine::{Controller, NullNotifier, Rejected};
    use std::time::{Duration, SystemTime};
    use tokio::runtime::Handle;

    fn track(id: &str) -> TrackRecord {
        TrackRecord {
            id: id.to_string(),
            duration_secs: 100,
            title: format!("Title {id}"),
            thumbnail_url: String::new(),
            requester: "bob".to_string(),
            source: SourceKind::YouTube,
            requested_at: SystemTime::now(),
        }
    }

    fn play(id: &str, offset: u64) -> RemoteEvent {
        RemoteEvent {
            origin: "bob".to_string(),
            action: RemoteAction::Play {
                track: track(id),
                offset: Duration::from_secs(offset),
            },
        }
    }

    fn pause(offset: u64) -> RemoteEvent {
        RemoteEvent {
            origin: "bob".to_string(),
            action: RemoteAction::Pause {
                offset: Duration::from_secs(offset),
            },
        }
    }

    fn controller() -> Controller {
        Controller::new(Handle::current(), Box::new(NullNotifier))
    }

    #[tokio::test(start_paused = true)]
    async fn own_echo_is_ignored() {
        let c = controller();
        let mut event = play("a", 0);
        event.origin = "jukebox".to_string();

        assert_eq!(apply_remote(&c, "jukebox", event), Ok(RemoteOutcome::Ignored));
        assert!(c.current_track().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn remote_start_replaces_active_track() {
        let c = controller();
        c.start(track("a"));

        let outcome = apply_remote(&c, "jukebox", play("b", 0));

        assert_eq!(outcome, Ok(RemoteOutcome::Applied(PlaybackState::Playing)));
        assert_eq!(c.current_track().map(|(_, t)| t.id.clone()), Some("b".to_string()));
        assert_eq!(c.pending_timer().map(|t| t.track_id), Some("b".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn remote_search_on_same_track_seeks() {
        let c = controller();
        c.start(track("a"));

        apply_remote(&c, "jukebox", play("a", 40)).unwrap();

        assert_eq!(c.elapsed(), Duration::from_secs(40));
        assert_eq!(c.remaining(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn remote_pause_then_search_then_play() {
        let c = controller();
        c.start(track("a"));
        tokio::time::advance(Duration::from_secs(10)).await;

        apply_remote(&c, "jukebox", pause(10)).unwrap();
        assert_eq!(c.state(), PlaybackState::Paused);
        assert!(c.pending_timer().is_none());

        apply_remote(&c, "jukebox", pause(50)).unwrap();
        assert_eq!(c.elapsed(), Duration::from_secs(50));

        apply_remote(&c, "jukebox", play("a", 50)).unwrap();
        assert_eq!(c.state(), PlaybackState::Playing);
        assert_eq!(c.remaining(), Duration::from_secs(50));
    }

    #[tokio::test(start_paused = true)]
    async fn remote_pause_with_nothing_active_is_ignored() {
        let c = controller();
        assert_eq!(apply_remote(&c, "jukebox", pause(5)), Ok(RemoteOutcome::Ignored));
    }

    #[tokio::test(start_paused = true)]
    async fn remote_changes_are_not_sent_back_to_the_room() {
        let (channel, mut rx) = ChannelNotifier::new();
        let c = Controller::new(Handle::current(), Box::new(channel));
        c.start(track("a"));
        assert!(matches!(rx.try_recv(), Ok(Outbound::Event(_))));

        apply_remote(&c, "jukebox", play("b", 40)).unwrap();
        apply_remote(&c, "jukebox", pause(45)).unwrap();
        apply_remote(&c, "jukebox", pause(60)).unwrap();
        apply_remote(&c, "jukebox", play("b", 60)).unwrap();

        assert!(rx.try_recv().is_err());
        assert_eq!(c.elapsed(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn remote_play_of_other_track_at_offset_lands_on_that_track() {
        let c = controller();
        c.start(track("a"));
        tokio::time::advance(Duration::from_secs(5)).await;

        let outcome = apply_remote(&c, "jukebox", play("b", 40));

        assert_eq!(outcome, Ok(RemoteOutcome::Applied(PlaybackState::Playing)));
        assert_eq!(c.current_track().map(|(i, t)| (i, t.id.clone())), Some((1, "b".to_string())));
        assert_eq!(c.elapsed(), Duration::from_secs(40));
        assert_eq!(c.remaining(), Duration::from_secs(60));
        assert_eq!(c.pending_timer().map(|t| t.track_id), Some("b".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn remote_play_revives_a_stopped_track() {
        let c = controller();
        c.start(track("a"));
        c.stop().unwrap();

        apply_remote(&c, "jukebox", play("a", 30)).unwrap();

        assert_eq!(c.state(), PlaybackState::Playing);
        assert_eq!(c.elapsed(), Duration::from_secs(30));
        assert_eq!(c.snapshot().queue_len, 1);
        assert!(c.pending_timer().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn remote_play_past_the_end_is_rejected_untouched() {
        let c = controller();
        c.start(track("a"));

        let outcome = apply_remote(&c, "jukebox", play("b", 150));

        assert_eq!(
            outcome,
            Err(Rejected::OutOfRange {
                offset: Duration::from_secs(150),
                duration: Duration::from_secs(100)
            })
        );
        assert_eq!(c.current_track().map(|(i, _)| i), Some(0));
        assert_eq!(c.snapshot().queue_len, 1);
        assert_eq!(c.pending_timer().map(|t| t.track_id), Some("a".to_string()));
    }
}
