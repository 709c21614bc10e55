use jukebox_engine::{MediaCue, PlaybackEvent, PlaybackNotifier};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{info, warn};

mod remote;

pub use remote::{apply_remote, RemoteAction, RemoteEvent, RemoteOutcome};

fn command_name(event: &PlaybackEvent) -> &'static str {
    match event {
        PlaybackEvent::Play(_) => "yut_play",
        PlaybackEvent::Pause(_) => "yut_pause",
        PlaybackEvent::Stop(_) => "yut_stop",
    }
}

/// Frame sent to the room for an outbound event. Only play frames carry the
/// title.
pub fn event_payload(event: &PlaybackEvent) -> Value {
    let cue = event.cue();
    let mut item = json!({
        "type": cue.source,
        "id": cue.track_id,
        "duration": cue.duration_secs,
        "offset": cue.offset.as_secs_f64(),
    });
    if let (PlaybackEvent::Play(_), Some(obj)) = (event, item.as_object_mut()) {
        obj.insert("title".to_string(), json!(cue.title));
    }

    json!({
        "tc": command_name(event),
        "item": item,
    })
}

pub const PLAYLIST_RESET_NOTICE: &str = "Resetting playlist.";

/// What the room connection has to send: a media frame or a chat line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Event(PlaybackEvent),
    Notice(String),
}

/// Hands events to an async consumer, typically the task that owns the room
/// connection.
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl PlaybackNotifier for ChannelNotifier {
    fn notify(&self, event: &PlaybackEvent) {
        if self.tx.send(Outbound::Event(event.clone())).is_err() {
            warn!(tc = command_name(event), "event consumer is gone; dropping playback event");
        }
    }

    fn playlist_finished(&self, _last: &MediaCue) {
        if self
            .tx
            .send(Outbound::Notice(PLAYLIST_RESET_NOTICE.to_string()))
            .is_err()
        {
            warn!("event consumer is gone; dropping playlist notice");
        }
    }
}

pub struct TracingNotifier;

impl PlaybackNotifier for TracingNotifier {
    fn notify(&self, event: &PlaybackEvent) {
        let cue = event.cue();
        info!(
            tc = command_name(event),
            track_id = %cue.track_id,
            title = %cue.title,
            offset_secs = cue.offset.as_secs_f64(),
            "playback event"
        );
    }

    fn playlist_finished(&self, last: &MediaCue) {
        info!(track_id = %last.track_id, "last track ended; playlist reset");
    }
}

/// Delivers every event to each notifier in order.
pub struct NotifierChain {
    notifiers: Vec<Box<dyn PlaybackNotifier>>,
}

impl NotifierChain {
    pub fn new(notifiers: Vec<Box<dyn PlaybackNotifier>>) -> Self {
        Self { notifiers }
    }
}

impl PlaybackNotifier for NotifierChain {
    fn notify(&self, event: &PlaybackEvent) {
        for notifier in &self.notifiers {
            notifier.notify(event);
        }
    }

    fn playlist_finished(&self, last: &MediaCue) {
        for notifier in &self.notifiers {
            notifier.playlist_finished(last);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{event_payload, ChannelNotifier, NotifierChain, Outbound, PLAYLIST_RESET_NOTICE};
    use jukebox_core::SourceKind;
    use jukebox_engine::{MediaCue, PlaybackEvent, PlaybackNotifier};
    use std::time::Duration;

    fn cue() -> MediaCue {
        MediaCue {
            track_id: "dQw4w9WgXcQ".to_string(),
            duration_secs: 212,
            title: "Never Gonna Give You Up".to_string(),
            offset: Duration::from_millis(1_500),
            source: SourceKind::YouTube,
        }
    }

    #[test]
    fn play_frame_carries_title_and_offset() {
        let payload = event_payload(&PlaybackEvent::Play(cue()));

        assert_eq!(payload["tc"], "yut_play");
        assert_eq!(payload["item"]["type"], "youTube");
        assert_eq!(payload["item"]["id"], "dQw4w9WgXcQ");
        assert_eq!(payload["item"]["duration"], 212);
        assert_eq!(payload["item"]["offset"], 1.5);
        assert_eq!(payload["item"]["title"], "Never Gonna Give You Up");
    }

    #[test]
    fn pause_and_stop_frames_omit_title() {
        let pause = event_payload(&PlaybackEvent::Pause(cue()));
        let stop = event_payload(&PlaybackEvent::Stop(cue()));

        assert_eq!(pause["tc"], "yut_pause");
        assert_eq!(stop["tc"], "yut_stop");
        assert!(pause["item"].get("title").is_none());
        assert!(stop["item"].get("title").is_none());
    }

    #[test]
    fn chain_forwards_to_every_channel() {
        let (first, mut first_rx) = ChannelNotifier::new();
        let (second, mut second_rx) = ChannelNotifier::new();
        let chain = NotifierChain::new(vec![Box::new(first), Box::new(second)]);

        chain.notify(&PlaybackEvent::Stop(cue()));

        assert_eq!(first_rx.try_recv().ok(), Some(Outbound::Event(PlaybackEvent::Stop(cue()))));
        assert_eq!(second_rx.try_recv().ok(), Some(Outbound::Event(PlaybackEvent::Stop(cue()))));
    }

    #[test]
    fn playlist_reset_reaches_the_channel_as_a_notice() {
        let (channel, mut rx) = ChannelNotifier::new();
        let chain = NotifierChain::new(vec![Box::new(channel)]);

        chain.playlist_finished(&cue());

        assert_eq!(
            rx.try_recv().ok(),
            Some(Outbound::Notice(PLAYLIST_RESET_NOTICE.to_string()))
        );
    }

    #[test]
    fn closed_channel_does_not_panic() {
        let (notifier, rx) = ChannelNotifier::new();
        drop(rx);
        notifier.notify(&PlaybackEvent::Play(cue()));
    }
}
