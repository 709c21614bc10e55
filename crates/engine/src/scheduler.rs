//! One-shot advance timer with a single slot.
//!
//! Every scheduled timer gets a fresh generation. Cancellation is best effort:
//! a timer may already have fired and be waiting to deliver its notification
//! when it is cancelled, so receivers must check the generation they are
//! handed against [`Scheduler::pending`] before acting on it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerInfo {
    pub generation: u64,
    pub track_id: String,
    pub deadline: Instant,
}

struct PendingTimer {
    info: TimerInfo,
    fired: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

pub struct Scheduler {
    runtime: Handle,
    generation: u64,
    pending: Option<PendingTimer>,
}

impl Scheduler {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            generation: 0,
            pending: None,
        }
    }

    pub fn pending(&self) -> Option<&TimerInfo> {
        self.pending.as_ref().map(|p| &p.info)
    }

    /// Arms the slot. `on_fire` runs on the runtime once `after` has elapsed,
    /// with the generation returned here and the track id.
    ///
    /// # Panics
    ///
    /// If a timer is still pending. Callers cancel explicitly before
    /// rescheduling.
    pub fn schedule<F>(&mut self, after: Duration, track_id: &str, on_fire: F) -> u64
    where
        F: FnOnce(u64, String) + Send + 'static,
    {
        if let Some(existing) = &self.pending {
            panic!(
                "advance timer {} for track {} is still pending; cancel it before scheduling another",
                existing.info.generation, existing.info.track_id
            );
        }

        self.generation += 1;
        let generation = self.generation;
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        let id = track_id.to_string();
        let deadline = Instant::now() + after;
        let task = self.runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            flag.store(true, Ordering::SeqCst);
            trace!(generation, track_id = %id, "advance timer fired");
            on_fire(generation, id);
        });

        debug!(generation, track_id, after_secs = after.as_secs_f64(), "advance timer scheduled");
        self.pending = Some(PendingTimer {
            info: TimerInfo {
                generation,
                track_id: track_id.to_string(),
                deadline,
            },
            fired,
            task,
        });
        generation
    }

    /// Empties the slot. Returns `true` only if the timer was stopped before it
    /// fired.
    pub fn cancel(&mut self) -> bool {
        let Some(pending) = self.pending.take() else {
            return false;
        };
        if pending.fired.load(Ordering::SeqCst) {
            debug!(
                generation = pending.info.generation,
                "advance timer already fired; its notification will be discarded"
            );
            return false;
        }
        pending.task.abort();
        debug!(generation = pending.info.generation, "advance timer cancelled");
        true
    }

    /// Called by a fired timer to release its own slot. Fails for any
    /// generation other than the pending one.
    pub fn complete(&mut self, generation: u64) -> bool {
        match &self.pending {
            Some(p) if p.info.generation == generation => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
