use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};
use thiserror::Error;

/// Catalog a track was resolved from. Only used for display and on the wire.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SourceKind {
    #[serde(rename = "youTube")]
    YouTube,
    #[serde(rename = "soundCloud")]
    SoundCloud,
}

impl SourceKind {
    pub fn label(self) -> &'static str {
        match self {
            SourceKind::YouTube => "YouTube",
            SourceKind::SoundCloud => "SoundCloud",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum PlaybackState {
    Playing,
    Paused,
    #[default]
    Stopped,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrackError {
    #[error("resolved track has an empty id")]
    EmptyId,
}

/// A catalog item as handed over by the metadata resolver, before it is
/// attributed to a requester.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrackCandidate {
    pub id: String,
    pub duration_secs: u64,
    pub title: String,
    #[serde(default)]
    pub thumbnail_url: String,
    pub source: SourceKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrackRecord {
    pub id: String,
    pub duration_secs: u64,
    pub title: String,
    pub thumbnail_url: String,
    pub requester: String,
    pub source: SourceKind,
    pub requested_at: SystemTime,
}

impl TrackRecord {
    pub fn resolve(
        candidate: TrackCandidate,
        requester: impl Into<String>,
        now: SystemTime,
    ) -> Result<Self, TrackError> {
        if candidate.id.trim().is_empty() {
            return Err(TrackError::EmptyId);
        }
        Ok(Self {
            id: candidate.id,
            duration_secs: candidate.duration_secs,
            title: candidate.title,
            thumbnail_url: candidate.thumbnail_url,
            requester: requester.into(),
            source: candidate.source,
            requested_at: now,
        })
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }

    /// Time since the track was requested, zero if the wall clock went backwards.
    pub fn requested_ago(&self, now: SystemTime) -> Duration {
        now.duration_since(self.requested_at).unwrap_or_default()
    }
}
