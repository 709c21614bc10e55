pub mod config;
pub mod model;
pub mod timefmt;
pub mod urls;

pub use config::{AppConfig, RoomConfig};
pub use model::{PlaybackState, SourceKind, TrackCandidate, TrackError, TrackRecord};
pub use timefmt::{format_duration, parse_time_point};
