use crate::TrackCandidate;
use serde::{Deserialize, Serialize};

fn default_schema_version() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Name the room uses for us; remote events carrying it are our own echoes.
    pub bot_name: String,
    /// Log every outbound play/pause/stop at info level.
    pub announce_events: bool,
    /// Requester recorded for tracks queued from the console.
    pub console_requester: String,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            bot_name: "jukebox".to_string(),
            announce_events: true,
            console_requester: "console".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub log_level: String,
    pub room: RoomConfig,
    #[serde(default)]
    pub catalog: Vec<TrackCandidate>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            log_level: "info".to_string(),
            room: RoomConfig::default(),
            catalog: vec![TrackCandidate {
                id: "dQw4w9WgXcQ".to_string(),
                duration_secs: 212,
                title: "Rick Astley - Never Gonna Give You Up".to_string(),
                thumbnail_url: "https://i.ytimg.com/vi/dQw4w9WgXcQ/default.jpg".to_string(),
                source: crate::SourceKind::YouTube,
            }],
        }
    }
}
