use jukebox_core::{AppConfig, TrackCandidate};

/// Tracks the console can request, taken from the config file.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<TrackCandidate>,
}

impl Catalog {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            entries: cfg.catalog.clone(),
        }
    }

    pub fn entries(&self) -> &[TrackCandidate] {
        &self.entries
    }

    /// Exact id first, then the first title containing `query` (case-insensitive).
    pub fn resolve(&self, query: &str) -> Option<&TrackCandidate> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }
        if let Some(hit) = self.entries.iter().find(|c| c.id == query) {
            return Some(hit);
        }
        let needle = query.to_lowercase();
        self.entries
            .iter()
            .find(|c| c.title.to_lowercase().contains(&needle))
    }
}
