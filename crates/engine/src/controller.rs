//! The room's playback state machine.
//!
//! Queue, clock and advance timer live behind one mutex and every command
//! holds it from its first read to its last reschedule. Outbound events are
//! collected under the lock and handed to the notifier once it is released.

use crate::clock::PlaybackClock;
use crate::error::Rejected;
use crate::events::{MediaCue, PlaybackEvent, PlaybackNotifier};
use crate::queue::{DeletionResult, LastTrack, Queue};
use crate::scheduler::{Scheduler, TimerInfo};
use jukebox_core::{PlaybackState, TrackRecord};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// Nothing was active; the track is now playing.
    Started { index: usize },
    /// Something is playing or paused; the track was queued behind it.
    Enqueued { index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// The timer was superseded by a later transition.
    Stale,
    Advanced {
        index: usize,
        track: Arc<TrackRecord>,
    },
    /// The last track ended and the queue was reset.
    Finished,
}

#[derive(Debug, Clone)]
pub struct RoomSnapshot {
    pub state: PlaybackState,
    pub current: Option<(usize, Arc<TrackRecord>)>,
    pub elapsed: Duration,
    pub remaining: Duration,
    pub queue_len: usize,
    pub upcoming: usize,
}

struct Room {
    queue: Queue,
    clock: PlaybackClock,
    scheduler: Scheduler,
}

struct Shared {
    room: Mutex<Room>,
    notifier: Box<dyn PlaybackNotifier>,
}

/// Cheap to clone; clones drive the same room.
#[derive(Clone)]
pub struct Controller {
    shared: Arc<Shared>,
}

impl Controller {
    /// Advance timers are spawned on `runtime`; commands themselves may be
    /// issued from any thread.
    pub fn new(runtime: Handle, notifier: Box<dyn PlaybackNotifier>) -> Self {
        Self {
            shared: Arc::new(Shared {
                room: Mutex::new(Room {
                    queue: Queue::new(),
                    clock: PlaybackClock::new(),
                    scheduler: Scheduler::new(runtime),
                }),
                notifier,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Room> {
        self.shared
            .room
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: PlaybackEvent) {
        self.shared.notifier.notify(&event);
    }

    /// Schedules the advance for the current track from the clock's position.
    /// The slot must already be empty.
    fn arm(&self, room: &mut Room, now: Instant) {
        let Some(track) = room.queue.current() else {
            return;
        };
        let remaining = room.clock.remaining(now, track.duration());
        if remaining.is_zero() {
            debug!(track_id = %track.id, "no time remaining; advance timer not armed");
            return;
        }
        let track_id = track.id.clone();
        let shared = Arc::downgrade(&self.shared);
        room.scheduler
            .schedule(remaining, &track_id, move |generation, track_id| {
                if let Some(shared) = shared.upgrade() {
                    Controller { shared }.advance(generation, &track_id);
                }
            });
    }

    fn play_next(&self, room: &mut Room, now: Instant) -> Option<(usize, Arc<TrackRecord>)> {
        let (index, track) = room.queue.advance()?;
        room.scheduler.cancel();
        room.clock.start(now);
        self.arm(room, now);
        Some((index, track))
    }

    /// Plays `track` if nothing is active, otherwise queues it.
    pub fn start(&self, track: TrackRecord) -> StartOutcome {
        let track = Arc::new(track);
        let now = Instant::now();
        let mut room = self.lock();
        let index = room.queue.add(Arc::clone(&track));

        if room.clock.state() != PlaybackState::Stopped {
            drop(room);
            info!(index, track_id = %track.id, requester = %track.requester, "track queued");
            return StartOutcome::Enqueued { index };
        }

        room.scheduler.cancel();
        room.queue.set_current(index);
        room.clock.start(now);
        self.arm(&mut room, now);
        drop(room);

        info!(index, track_id = %track.id, requester = %track.requester, "track started");
        self.emit(PlaybackEvent::Play(MediaCue::new(&track, Duration::ZERO)));
        StartOutcome::Started { index }
    }

    /// Queues `tracks` in order. If nothing is active the first of them
    /// starts playing. The returned index is that of the first added track.
    pub fn enqueue_all(&self, tracks: Vec<TrackRecord>) -> Result<StartOutcome, Rejected> {
        if tracks.is_empty() {
            return Err(Rejected::NothingToQueue);
        }
        let count = tracks.len();
        let now = Instant::now();
        let mut room = self.lock();
        let added = room.queue.add_list(tracks.into_iter().map(Arc::new));
        let first = added.start;

        if room.clock.state() != PlaybackState::Stopped {
            drop(room);
            info!(first, count, "tracks queued");
            return Ok(StartOutcome::Enqueued { index: first });
        }

        room.scheduler.cancel();
        let track = room.queue.set_current(first).cloned().ok_or(Rejected::NothingToQueue)?;
        room.clock.start(now);
        self.arm(&mut room, now);
        drop(room);

        info!(first, count, track_id = %track.id, "tracks queued; first one started");
        self.emit(PlaybackEvent::Play(MediaCue::new(&track, Duration::ZERO)));
        Ok(StartOutcome::Started { index: first })
    }

    pub fn skip(&self) -> Result<Arc<TrackRecord>, Rejected> {
        let now = Instant::now();
        let mut room = self.lock();
        match room.queue.is_last_track() {
            LastTrack::Empty => return Err(Rejected::EmptyQueue),
            LastTrack::Yes => return Err(Rejected::LastTrack),
            LastTrack::No => {}
        }
        let (index, track) = self.play_next(&mut room, now).ok_or(Rejected::LastTrack)?;
        drop(room);

        info!(index, track_id = %track.id, "skipped to next track");
        self.emit(PlaybackEvent::Play(MediaCue::new(&track, Duration::ZERO)));
        Ok(track)
    }

    pub fn replay(&self) -> Result<Arc<TrackRecord>, Rejected> {
        let now = Instant::now();
        let mut room = self.lock();
        let track = room.queue.current().cloned().ok_or(Rejected::NoCurrentTrack)?;
        room.scheduler.cancel();
        room.clock.start(now);
        self.arm(&mut room, now);
        drop(room);

        info!(track_id = %track.id, "replaying track");
        self.emit(PlaybackEvent::Play(MediaCue::new(&track, Duration::ZERO)));
        Ok(track)
    }

    /// Returns the position playback was frozen at.
    pub fn pause(&self) -> Result<Duration, Rejected> {
        let now = Instant::now();
        let mut room = self.lock();
        if room.clock.state() != PlaybackState::Playing {
            return Err(Rejected::NotPlaying);
        }
        let track = room.queue.current().cloned().ok_or(Rejected::NoCurrentTrack)?;
        room.scheduler.cancel();
        room.clock.pause(now, None);
        let offset = room.clock.elapsed(now);
        drop(room);

        info!(track_id = %track.id, offset_secs = offset.as_secs_f64(), "paused");
        self.emit(PlaybackEvent::Pause(MediaCue::new(&track, offset)));
        Ok(offset)
    }

    /// Resumes a paused track from `offset`, or from where it was paused.
    pub fn resume(&self, offset: Option<Duration>) -> Result<Duration, Rejected> {
        let now = Instant::now();
        let mut room = self.lock();
        if room.clock.state() != PlaybackState::Paused {
            return Err(Rejected::NotPaused);
        }
        let track = room.queue.current().cloned().ok_or(Rejected::NoCurrentTrack)?;
        let duration = track.duration();
        let offset = match offset {
            Some(o) if !o.is_zero() && o >= duration => {
                return Err(Rejected::OutOfRange {
                    offset: o,
                    duration,
                })
            }
            Some(o) => o,
            None => room.clock.elapsed(now),
        };

        room.scheduler.cancel();
        room.clock.resume(now, offset);
        self.arm(&mut room, now);
        drop(room);

        info!(track_id = %track.id, offset_secs = offset.as_secs_f64(), "resumed");
        self.emit(PlaybackEvent::Play(MediaCue::new(&track, offset)));
        Ok(offset)
    }

    /// Moves the position to `offset`, which must lie strictly inside the
    /// track. Returns the state playback is left in.
    pub fn seek(&self, offset: Duration) -> Result<PlaybackState, Rejected> {
        let now = Instant::now();
        let mut room = self.lock();
        let state = room.clock.state();
        if state == PlaybackState::Stopped {
            return Err(Rejected::NotActive);
        }
        let track = room.queue.current().cloned().ok_or(Rejected::NoCurrentTrack)?;
        let duration = track.duration();
        if offset.is_zero() || offset >= duration {
            return Err(Rejected::OutOfRange { offset, duration });
        }

        let event = if state == PlaybackState::Playing {
            room.scheduler.cancel();
            room.clock.resume(now, offset);
            self.arm(&mut room, now);
            PlaybackEvent::Play(MediaCue::new(&track, offset))
        } else {
            // paused: the next resume arms the timer from the new offset
            debug_assert!(room.scheduler.pending().is_none());
            room.clock.pause(now, Some(offset));
            PlaybackEvent::Pause(MediaCue::new(&track, offset))
        };
        drop(room);

        info!(track_id = %track.id, offset_secs = offset.as_secs_f64(), ?state, "seeked");
        self.emit(event);
        Ok(state)
    }

    /// Stops playback. The track stays current so it can be replayed.
    pub fn stop(&self) -> Result<Arc<TrackRecord>, Rejected> {
        let now = Instant::now();
        let mut room = self.lock();
        if room.clock.state() == PlaybackState::Stopped {
            return Err(Rejected::NotActive);
        }
        let track = room.queue.current().cloned().ok_or(Rejected::NoCurrentTrack)?;
        room.scheduler.cancel();
        let offset = room.clock.elapsed(now);
        room.clock.stop();
        drop(room);

        info!(track_id = %track.id, "stopped");
        self.emit(PlaybackEvent::Stop(MediaCue::new(&track, offset)));
        Ok(track)
    }

    /// Mirrors a play or time search another participant made in the room.
    /// A different track becomes current (appended to the playlist first);
    /// the current track continues from `offset`. Nothing is emitted: the
    /// room already saw the change.
    pub fn observe_remote_play(
        &self,
        track: TrackRecord,
        offset: Duration,
    ) -> Result<usize, Rejected> {
        let duration = track.duration();
        if !offset.is_zero() && offset >= duration {
            return Err(Rejected::OutOfRange { offset, duration });
        }
        let now = Instant::now();
        let mut room = self.lock();
        room.scheduler.cancel();

        let index = match room.queue.current_index() {
            Some(i) if room.queue.current().is_some_and(|t| t.id == track.id) => i,
            _ => {
                let index = room.queue.add(Arc::new(track));
                room.queue.set_current(index);
                index
            }
        };
        room.clock.resume(now, offset);
        self.arm(&mut room, now);
        drop(room);

        info!(index, offset_secs = offset.as_secs_f64(), "following remote play");
        Ok(index)
    }

    /// Mirrors a pause, or a time search while paused, made by another
    /// participant. A zero `offset` keeps our own position. Nothing is emitted.
    pub fn observe_remote_pause(&self, offset: Duration) -> Result<Duration, Rejected> {
        let now = Instant::now();
        let mut room = self.lock();
        if room.clock.state() == PlaybackState::Stopped {
            return Err(Rejected::NotActive);
        }
        let duration = room
            .queue
            .current()
            .map(|t| t.duration())
            .ok_or(Rejected::NoCurrentTrack)?;
        if offset >= duration && !offset.is_zero() {
            return Err(Rejected::OutOfRange { offset, duration });
        }

        room.scheduler.cancel();
        let explicit = (!offset.is_zero()).then_some(offset);
        room.clock.pause(now, explicit);
        let at = room.clock.elapsed(now);
        drop(room);

        info!(offset_secs = at.as_secs_f64(), "following remote pause");
        Ok(at)
    }

    /// Entry point for fired advance timers. Anything but the pending
    /// generation for the current track is discarded.
    pub fn advance(&self, generation: u64, track_id: &str) -> AdvanceOutcome {
        let now = Instant::now();
        let mut room = self.lock();
        let is_pending = room
            .scheduler
            .pending()
            .is_some_and(|t| t.generation == generation && t.track_id == track_id);
        let is_current = room.queue.current().is_some_and(|t| t.id == track_id);
        if !(is_pending && is_current) {
            debug!(generation, track_id, "discarding superseded advance");
            return AdvanceOutcome::Stale;
        }
        room.scheduler.complete(generation);

        if room.queue.is_last_track() != LastTrack::No {
            let elapsed = room.clock.elapsed(now);
            let last = room.queue.current().map(|t| MediaCue::new(t, elapsed));
            room.queue.clear();
            room.clock.stop();
            drop(room);
            info!(track_id, "last track finished; playlist reset");
            if let Some(last) = last {
                self.shared.notifier.playlist_finished(&last);
            }
            return AdvanceOutcome::Finished;
        }

        let Some((index, track)) = self.play_next(&mut room, now) else {
            return AdvanceOutcome::Stale;
        };
        drop(room);

        info!(index, track_id = %track.id, "advanced to next track");
        self.emit(PlaybackEvent::Play(MediaCue::new(&track, Duration::ZERO)));
        AdvanceOutcome::Advanced { index, track }
    }

    /// Deletes queue positions. The current position may only be deleted
    /// while playback is stopped.
    pub fn delete_items(
        &self,
        indices: &[usize],
        by_range: bool,
    ) -> Result<DeletionResult, Rejected> {
        let mut room = self.lock();
        if room.queue.is_empty() {
            return Err(Rejected::EmptyQueue);
        }
        if room.clock.state() != PlaybackState::Stopped {
            if let Some(current) = room.queue.current_index() {
                if room.queue.select(indices, by_range).contains(&current) {
                    return Err(Rejected::ActiveTrack { index: current });
                }
            }
        }
        let result = room
            .queue
            .delete(indices, by_range)
            .ok_or(Rejected::NothingDeleted)?;
        drop(room);

        info!(count = result.count(), deleted = ?result.deleted, "deleted queue items");
        Ok(result)
    }

    /// Stops anything active and empties the queue. Returns how many tracks
    /// were removed.
    pub fn clear(&self) -> Result<usize, Rejected> {
        let now = Instant::now();
        let mut room = self.lock();
        if room.queue.is_empty() {
            return Err(Rejected::EmptyQueue);
        }

        let mut stopped = None;
        if room.clock.state() != PlaybackState::Stopped {
            room.scheduler.cancel();
            let offset = room.clock.elapsed(now);
            stopped = room
                .queue
                .current()
                .map(|t| PlaybackEvent::Stop(MediaCue::new(t, offset)));
            room.clock.stop();
        }
        let count = room.queue.len();
        room.queue.clear();
        drop(room);

        info!(count, "playlist cleared");
        if let Some(event) = stopped {
            self.emit(event);
        }
        Ok(count)
    }

    pub fn state(&self) -> PlaybackState {
        self.lock().clock.state()
    }

    pub fn current_track(&self) -> Option<(usize, Arc<TrackRecord>)> {
        let room = self.lock();
        room.queue
            .current_index()
            .zip(room.queue.current().cloned())
    }

    pub fn elapsed(&self) -> Duration {
        self.lock().clock.elapsed(Instant::now())
    }

    pub fn remaining(&self) -> Duration {
        let room = self.lock();
        room.queue
            .current()
            .map(|t| room.clock.remaining(Instant::now(), t.duration()))
            .unwrap_or_default()
    }

    /// Tracks from the current one onwards, with their queue positions.
    pub fn queue_snapshot(&self) -> Vec<(usize, Arc<TrackRecord>)> {
        self.lock().queue.tracks_from_current()
    }

    pub fn is_last_track(&self) -> LastTrack {
        self.lock().queue.is_last_track()
    }

    pub fn next_track(&self) -> Result<(usize, Arc<TrackRecord>), Rejected> {
        let room = self.lock();
        match room.queue.is_last_track() {
            LastTrack::Empty => Err(Rejected::EmptyQueue),
            LastTrack::Yes => Err(Rejected::LastTrack),
            LastTrack::No => room
                .queue
                .next_track()
                .map(|(i, t)| (i, Arc::clone(t)))
                .ok_or(Rejected::LastTrack),
        }
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        let now = Instant::now();
        let room = self.lock();
        let current = room
            .queue
            .current_index()
            .zip(room.queue.current().cloned());
        let remaining = current
            .as_ref()
            .map(|(_, t)| room.clock.remaining(now, t.duration()))
            .unwrap_or_default();
        RoomSnapshot {
            state: room.clock.state(),
            elapsed: room.clock.elapsed(now),
            remaining,
            current,
            queue_len: room.queue.len(),
            upcoming: room.queue.upcoming(),
        }
    }

    pub fn pending_timer(&self) -> Option<TimerInfo> {
        self.lock().scheduler.pending().cloned()
    }
}
