//! Playback position bookkeeping for the active track.
//!
//! The clock never ticks on its own. It stores where playback last (re)started
//! and how far into the track that was; every read derives the position from
//! the `now` the caller passes in.

use jukebox_core::PlaybackState;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Default)]
pub struct PlaybackClock {
    state: PlaybackState,
    /// Set only while playing.
    anchor: Option<Instant>,
    /// Position already played before `anchor`.
    base_offset: Duration,
}

impl PlaybackClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// A new track became current.
    pub fn start(&mut self, now: Instant) {
        self.state = PlaybackState::Playing;
        self.anchor = Some(now);
        self.base_offset = Duration::ZERO;
    }

    /// Freezes the position. Outside of `Playing` this only records
    /// `offset_override`, which is how a seek lands while paused.
    pub fn pause(&mut self, now: Instant, offset_override: Option<Duration>) {
        match self.state {
            PlaybackState::Playing => {
                self.base_offset = offset_override.unwrap_or_else(|| self.elapsed(now));
                self.anchor = None;
                self.state = PlaybackState::Paused;
            }
            PlaybackState::Paused | PlaybackState::Stopped => {
                if let Some(offset) = offset_override {
                    self.base_offset = offset;
                }
            }
        }
    }

    /// Plays from `offset`; used for plain resume and for seeking while playing.
    pub fn resume(&mut self, now: Instant, offset: Duration) {
        self.base_offset = offset;
        self.anchor = Some(now);
        self.state = PlaybackState::Playing;
    }

    pub fn stop(&mut self) {
        self.state = PlaybackState::Stopped;
        self.anchor = None;
        self.base_offset = Duration::ZERO;
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        match (self.state, self.anchor) {
            (PlaybackState::Playing, Some(anchor)) => {
                self.base_offset + now.saturating_duration_since(anchor)
            }
            _ => self.base_offset,
        }
    }

    /// Time left in a track of length `duration`; overshoot reads as zero.
    pub fn remaining(&self, now: Instant, duration: Duration) -> Duration {
        duration.saturating_sub(self.elapsed(now))
    }
}

#[cfg(test)]
mod tests {
    use super::PlaybackClock;
    use jukebox_core::PlaybackState;
    use std::time::Duration;
    use tokio::time::Instant;

    const TRACK: Duration = Duration::from_secs(100);

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn starts_stopped_at_zero() {
        let clock = PlaybackClock::new();
        let now = Instant::now();
        assert_eq!(clock.state(), PlaybackState::Stopped);
        assert_eq!(clock.elapsed(now), Duration::ZERO);
        assert_eq!(clock.remaining(now, TRACK), TRACK);
    }

    #[test]
    fn elapsed_and_remaining_add_up_while_playing() {
        let mut clock = PlaybackClock::new();
        let t0 = Instant::now();
        clock.start(t0);

        for s in [0, 1, 30, 99, 100] {
            let now = t0 + secs(s);
            assert_eq!(clock.elapsed(now) + clock.remaining(now, TRACK), TRACK);
        }
    }

    #[test]
    fn overshoot_is_clamped_by_remaining_only() {
        let mut clock = PlaybackClock::new();
        let t0 = Instant::now();
        clock.start(t0);

        let late = t0 + secs(103);
        assert_eq!(clock.elapsed(late), secs(103));
        assert_eq!(clock.remaining(late, TRACK), Duration::ZERO);
    }

    #[test]
    fn pause_then_resume_preserves_elapsed() {
        let mut clock = PlaybackClock::new();
        let t0 = Instant::now();
        clock.start(t0);

        clock.pause(t0 + secs(30), None);
        assert_eq!(clock.state(), PlaybackState::Paused);
        let frozen = clock.elapsed(t0 + secs(500));
        assert_eq!(frozen, secs(30));

        let resumed_at = t0 + secs(900);
        clock.resume(resumed_at, frozen);
        assert_eq!(clock.elapsed(resumed_at), secs(30));
        assert_eq!(clock.elapsed(resumed_at + secs(5)), secs(35));
    }

    #[test]
    fn seeking_to_current_elapsed_is_idempotent() {
        let mut clock = PlaybackClock::new();
        let t0 = Instant::now();
        clock.start(t0);

        let now = t0 + secs(42);
        let before = (clock.elapsed(now), clock.remaining(now, TRACK));
        clock.resume(now, clock.elapsed(now));
        let after = (clock.elapsed(now), clock.remaining(now, TRACK));

        assert_eq!(before, after);
        assert_eq!(clock.state(), PlaybackState::Playing);
    }

    #[test]
    fn pause_override_while_paused_moves_offset() {
        let mut clock = PlaybackClock::new();
        let t0 = Instant::now();
        clock.start(t0);
        clock.pause(t0 + secs(10), None);

        clock.pause(t0 + secs(20), Some(secs(60)));

        assert_eq!(clock.state(), PlaybackState::Paused);
        assert_eq!(clock.elapsed(t0 + secs(99)), secs(60));
        assert_eq!(clock.remaining(t0, TRACK), secs(40));
    }

    #[test]
    fn pause_override_while_playing_wins_over_elapsed() {
        let mut clock = PlaybackClock::new();
        let t0 = Instant::now();
        clock.start(t0);
        clock.pause(t0 + secs(10), Some(secs(70)));
        assert_eq!(clock.elapsed(t0 + secs(11)), secs(70));
    }

    #[test]
    fn stop_resets_offset() {
        let mut clock = PlaybackClock::new();
        let t0 = Instant::now();
        clock.resume(t0, secs(50));
        clock.stop();
        assert_eq!(clock.state(), PlaybackState::Stopped);
        assert_eq!(clock.elapsed(t0 + secs(10)), Duration::ZERO);
    }
}
