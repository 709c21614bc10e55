use jukebox_core::{SourceKind, TrackRecord};
use serde::Serialize;
use std::time::Duration;

/// What the room's players need to line up with us.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaCue {
    pub track_id: String,
    pub duration_secs: u64,
    pub title: String,
    pub offset: Duration,
    pub source: SourceKind,
}

impl MediaCue {
    pub fn new(track: &TrackRecord, offset: Duration) -> Self {
        Self {
            track_id: track.id.clone(),
            duration_secs: track.duration_secs,
            title: track.title.clone(),
            offset,
            source: track.source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PlaybackEvent {
    Play(MediaCue),
    Pause(MediaCue),
    Stop(MediaCue),
}

impl PlaybackEvent {
    pub fn cue(&self) -> &MediaCue {
        match self {
            PlaybackEvent::Play(cue) | PlaybackEvent::Pause(cue) | PlaybackEvent::Stop(cue) => cue,
        }
    }
}

/// Outbound side of the controller. Invoked after the room lock is released,
/// so implementations may block or call back into the controller.
pub trait PlaybackNotifier: Send + Sync {
    fn notify(&self, event: &PlaybackEvent);

    /// The last track ran out and the playlist was reset. `last` is the track
    /// that ended.
    fn playlist_finished(&self, _last: &MediaCue) {}
}

pub struct NullNotifier;

impl PlaybackNotifier for NullNotifier {
    fn notify(&self, _event: &PlaybackEvent) {}
}
