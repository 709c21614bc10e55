pub mod clock;
pub mod controller;
pub mod error;
pub mod events;
pub mod queue;
pub mod scheduler;

pub use clock::PlaybackClock;
pub use controller::{AdvanceOutcome, Controller, RoomSnapshot, StartOutcome};
pub use error::Rejected;
pub use events::{MediaCue, NullNotifier, PlaybackEvent, PlaybackNotifier};
pub use queue::{DeletionResult, LastTrack, Queue};
pub use scheduler::{Scheduler, TimerInfo};
