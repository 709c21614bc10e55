use std::time::Duration;
use thiserror::Error;

/// A command whose precondition did not hold. The message is meant for the
/// person who issued it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejected {
    #[error("The playlist is empty.")]
    EmptyQueue,
    #[error("This is the last track in the playlist.")]
    LastTrack,
    #[error("No track is loaded.")]
    NoCurrentTrack,
    #[error("No track is playing.")]
    NotPlaying,
    #[error("The track is not paused.")]
    NotPaused,
    #[error("Nothing is playing or paused.")]
    NotActive,
    #[error("Invalid seek time {}s, the track is {}s long.", .offset.as_secs(), .duration.as_secs())]
    OutOfRange { offset: Duration, duration: Duration },
    #[error("There are no tracks to add.")]
    NothingToQueue,
    #[error("Nothing was deleted.")]
    NothingDeleted,
    #[error("Track {index} is active, stop it before deleting it.")]
    ActiveTrack { index: usize },
}
