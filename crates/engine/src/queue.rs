use jukebox_core::TrackRecord;
use std::collections::BTreeSet;
use std::ops::Range;
use std::sync::Arc;

/// Answer to "is the current track the last one?". An empty queue is its own
/// case since callers word the two situations differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LastTrack {
    Empty,
    Yes,
    No,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionResult {
    /// Indices removed, ascending, as they were before deletion.
    pub deleted: Vec<usize>,
    /// Title of the removed track when exactly one was removed.
    pub track_title: Option<String>,
    /// Lowest and highest removed index for range deletions.
    pub range: Option<(usize, usize)>,
}

impl DeletionResult {
    pub fn count(&self) -> usize {
        self.deleted.len()
    }
}

#[derive(Debug, Default, Clone)]
pub struct Queue {
    tracks: Vec<Arc<TrackRecord>>,
    current: Option<usize>,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current(&self) -> Option<&Arc<TrackRecord>> {
        self.current.and_then(|i| self.tracks.get(i))
    }

    pub fn get(&self, index: usize) -> Option<&Arc<TrackRecord>> {
        self.tracks.get(index)
    }

    pub fn add(&mut self, track: Arc<TrackRecord>) -> usize {
        debug_assert!(!track.id.is_empty(), "queued track without id");
        self.tracks.push(track);
        self.tracks.len() - 1
    }

    /// Appends every track in order. Returns the positions they landed at.
    pub fn add_list(&mut self, tracks: impl IntoIterator<Item = Arc<TrackRecord>>) -> Range<usize> {
        let first = self.tracks.len();
        for track in tracks {
            self.add(track);
        }
        first..self.tracks.len()
    }

    /// Points the queue at `index`. Out-of-range indices leave it untouched.
    pub fn set_current(&mut self, index: usize) -> Option<&Arc<TrackRecord>> {
        if index >= self.tracks.len() {
            return None;
        }
        self.current = Some(index);
        self.tracks.get(index)
    }

    pub fn next_track(&self) -> Option<(usize, &Arc<TrackRecord>)> {
        let next = self.current.map_or(0, |i| i + 1);
        self.tracks.get(next).map(|t| (next, t))
    }

    /// Moves the current pointer one step forward.
    pub fn advance(&mut self) -> Option<(usize, Arc<TrackRecord>)> {
        let (next, track) = self.next_track().map(|(i, t)| (i, Arc::clone(t)))?;
        self.current = Some(next);
        Some((next, track))
    }

    pub fn is_last_track(&self) -> LastTrack {
        if self.tracks.is_empty() {
            LastTrack::Empty
        } else if self.next_track().is_none() {
            LastTrack::Yes
        } else {
            LastTrack::No
        }
    }

    /// Number of tracks queued after the current one.
    pub fn upcoming(&self) -> usize {
        let from = self.current.map_or(0, |i| i + 1);
        self.tracks.len().saturating_sub(from)
    }

    pub fn tracks_from_current(&self) -> Vec<(usize, Arc<TrackRecord>)> {
        let from = self.current.unwrap_or(0);
        self.tracks
            .iter()
            .enumerate()
            .skip(from)
            .map(|(i, t)| (i, Arc::clone(t)))
            .collect()
    }

    /// Resolves a deletion request to the positions it would remove. With
    /// `by_range`, the first and last entry of `indices` are the inclusive
    /// bounds of the range; positions past the end are dropped.
    pub fn select(&self, indices: &[usize], by_range: bool) -> BTreeSet<usize> {
        let len = self.tracks.len();
        if by_range {
            match (indices.first(), indices.last()) {
                (Some(&lo), Some(&hi)) => (lo..=hi).take_while(|&i| i < len).collect(),
                _ => BTreeSet::new(),
            }
        } else {
            indices.iter().copied().filter(|&i| i < len).collect()
        }
    }

    /// Removes the positions chosen by [`Queue::select`]. Returns `None`, and
    /// leaves the queue alone, if that selection is empty.
    pub fn delete(&mut self, indices: &[usize], by_range: bool) -> Option<DeletionResult> {
        let selected = self.select(indices, by_range);
        if selected.is_empty() {
            return None;
        }

        let track_title = if selected.len() == 1 {
            selected
                .iter()
                .next()
                .and_then(|&i| self.tracks.get(i))
                .map(|t| t.title.clone())
        } else {
            None
        };

        let mut index = 0;
        self.tracks.retain(|_| {
            let keep = !selected.contains(&index);
            index += 1;
            keep
        });

        self.current = match self.current {
            Some(cur) if selected.contains(&cur) => None,
            Some(cur) => Some(cur - selected.range(..cur).count()),
            None => None,
        };

        let deleted: Vec<usize> = selected.into_iter().collect();
        let range = if by_range {
            deleted.first().copied().zip(deleted.last().copied())
        } else {
            None
        };

        Some(DeletionResult {
            deleted,
            track_title,
            range,
        })
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::{LastTrack, Queue};
    use jukebox_core::{SourceKind, TrackRecord};
    use std::sync::Arc;
    use std::time::SystemTime;

    fn track(id: &str) -> Arc<TrackRecord> {
        Arc::new(TrackRecord {
            id: id.to_string(),
            duration_secs: 100,
            title: format!("Title {id}"),
            thumbnail_url: String::new(),
            requester: "tester".to_string(),
            source: SourceKind::YouTube,
            requested_at: SystemTime::now(),
        })
    }

    fn queue_of(ids: &[&str]) -> Queue {
        let mut q = Queue::new();
        for id in ids {
            q.add(track(id));
        }
        q
    }

    fn ids(q: &Queue) -> Vec<String> {
        q.tracks.iter().map(|t| t.id.clone()).collect()
    }

    impl Queue {
        fn assert_invariant(&self) {
            if let Some(i) = self.current {
                assert!(i < self.tracks.len());
            }
            if self.tracks.is_empty() {
                assert_eq!(self.current, None);
            }
        }
    }

    #[test]
    fn add_returns_new_last_index() {
        let mut q = Queue::new();
        assert_eq!(q.add(track("a")), 0);
        q.assert_invariant();
        assert_eq!(q.add(track("b")), 1);
        q.assert_invariant();
        assert_eq!(q.current_index(), None);
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn add_list_appends_in_order() {
        let mut q = queue_of(&["a"]);
        q.set_current(0);

        assert_eq!(q.add_list(vec![track("b"), track("c")]), 1..3);
        assert_eq!(q.add_list(Vec::new()), 3..3);

        assert_eq!(ids(&q), vec!["a", "b", "c"]);
        assert_eq!(q.current_index(), Some(0));
        q.assert_invariant();
    }

    #[test]
    fn last_track_distinguishes_empty() {
        let mut q = Queue::new();
        assert_eq!(q.is_last_track(), LastTrack::Empty);

        q.add(track("a"));
        assert_eq!(q.is_last_track(), LastTrack::No);
        q.set_current(0);
        assert_eq!(q.is_last_track(), LastTrack::Yes);

        q.add(track("b"));
        assert_eq!(q.is_last_track(), LastTrack::No);
        assert_eq!(q.upcoming(), 1);
    }

    #[test]
    fn advance_moves_current_forward_until_the_end() {
        let mut q = queue_of(&["a", "b"]);
        assert_eq!(q.advance().map(|(i, t)| (i, t.id.clone())), Some((0, "a".into())));
        assert_eq!(q.advance().map(|(i, _)| i), Some(1));
        assert!(q.advance().is_none());
        assert_eq!(q.current_index(), Some(1));
        q.assert_invariant();
    }

    #[test]
    fn delete_shifts_current_down() {
        let mut q = queue_of(&["a", "b", "c"]);
        q.set_current(1);

        let result = q.delete(&[0, 2], false).unwrap();

        assert_eq!(result.count(), 2);
        assert_eq!(result.deleted, vec![0, 2]);
        assert_eq!(result.track_title, None);
        assert_eq!(result.range, None);
        assert_eq!(q.current_index(), Some(0));
        assert_eq!(q.current().map(|t| t.id.as_str()), Some("b"));
        q.assert_invariant();
    }

    #[test]
    fn delete_ignores_invalid_indices_and_keeps_order() {
        let mut q = queue_of(&["a", "b", "c", "d"]);

        let result = q.delete(&[1, 9, 1, 42], false).unwrap();

        assert_eq!(result.deleted, vec![1]);
        assert_eq!(result.track_title.as_deref(), Some("Title b"));
        assert_eq!(ids(&q), vec!["a", "c", "d"]);
    }

    #[test]
    fn delete_of_nothing_is_not_performed() {
        let mut q = queue_of(&["a", "b"]);
        q.set_current(1);

        assert!(q.delete(&[5, 7], false).is_none());
        assert!(q.delete(&[], false).is_none());
        assert!(q.delete(&[3, 1], true).is_none());

        assert_eq!(ids(&q), vec!["a", "b"]);
        assert_eq!(q.current_index(), Some(1));
    }

    #[test]
    fn delete_by_range_expands_and_clamps() {
        let mut q = queue_of(&["a", "b", "c", "d", "e"]);
        q.set_current(4);

        let result = q.delete(&[1, 10], true).unwrap();

        assert_eq!(result.deleted, vec![1, 2, 3, 4]);
        assert_eq!(result.range, Some((1, 4)));
        assert_eq!(ids(&q), vec!["a"]);
        assert_eq!(q.current_index(), None);
        q.assert_invariant();
    }

    #[test]
    fn deleting_everything_clears_current() {
        let mut q = queue_of(&["a", "b"]);
        q.set_current(0);

        q.delete(&[0, 1], true).unwrap();

        assert!(q.is_empty());
        q.assert_invariant();
        assert_eq!(q.is_last_track(), LastTrack::Empty);
    }

    #[test]
    fn tracks_from_current_is_absolute() {
        let mut q = queue_of(&["a", "b", "c"]);
        assert_eq!(q.tracks_from_current().len(), 3);

        q.set_current(1);
        let tail: Vec<(usize, String)> = q
            .tracks_from_current()
            .into_iter()
            .map(|(i, t)| (i, t.id.clone()))
            .collect();
        assert_eq!(tail, vec![(1, "b".to_string()), (2, "c".to_string())]);
    }

    #[test]
    fn clear_resets_current() {
        let mut q = queue_of(&["a", "b"]);
        q.set_current(1);
        q.clear();
        assert!(q.is_empty());
        assert_eq!(q.current_index(), None);
        assert!(q.set_current(0).is_none());
    }
}
