// Handoff - Double buffer between the mix pass and the hardware callback
//
// Two fixed slots of interleaved stereo and an index telling which one is
// the front buffer. One mutex guards the slots, the front index and the
// "needs processing" flag, which together behave as a single-slot queue:
//
//   mix pass                         hardware callback
//   --------                         -----------------
//   wait until needs_processing      lock (try_lock, never blocks)
//   mix into private scratch         if a fresh buffer was published:
//   lock                                 swap front/back (index only)
//   copy scratch -> back slot        copy front slot -> device
//   needs_processing = false         needs_processing = true
//   unlock                           unlock, wake the mixer
//
// The hardware side only reads a slot after the mix side finished copying
// into it and cleared the flag under the same lock. When the mixer falls
// behind, the hardware replays the current front buffer (stale replay).
// When the lock is busy, the hardware leaves its own copy of the last
// delivered buffer untouched and plays it again.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError, TryLockError};
use std::time::Duration;

/// What the hardware side got from one service call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceOutcome {
    /// A freshly published buffer was swapped in and written
    Fresh,
    /// Nothing new was published, the previous front buffer was written again
    Replayed,
    /// The lock was busy, `out` was left untouched
    Contended,
}

struct HandoffState {
    slots: [Vec<f32>; 2],
    front: usize,
    needs_processing: bool,
}

impl HandoffState {
    fn back(&self) -> usize {
        1 - self.front
    }
}

/// Counters readable from any thread
#[derive(Debug, Default)]
pub struct HandoffStats {
    fresh: AtomicU64,
    replayed: AtomicU64,
    contended: AtomicU64,
    published: AtomicU64,
}

impl HandoffStats {
    pub fn fresh(&self) -> u64 {
        self.fresh.load(Ordering::Relaxed)
    }

    pub fn replayed(&self) -> u64 {
        self.replayed.load(Ordering::Relaxed)
    }

    pub fn contended(&self) -> u64 {
        self.contended.load(Ordering::Relaxed)
    }

    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Total hardware cycles serviced
    pub fn serviced(&self) -> u64 {
        self.fresh() + self.replayed() + self.contended()
    }

    pub fn reset(&self) {
        self.fresh.store(0, Ordering::Relaxed);
        self.replayed.store(0, Ordering::Relaxed);
        self.contended.store(0, Ordering::Relaxed);
        self.published.store(0, Ordering::Relaxed);
    }
}

pub struct Handoff {
    state: Mutex<HandoffState>,
    request: Condvar,
    buffer_len: usize,
    stats: HandoffStats,
}

impl Handoff {
    /// `buffer_len` is the interleaved length of one slot (`2 * window_length`)
    pub fn new(buffer_len: usize) -> Self {
        Self {
            state: Mutex::new(HandoffState {
                slots: [vec![0.0; buffer_len], vec![0.0; buffer_len]],
                front: 0,
                needs_processing: true,
            }),
            request: Condvar::new(),
            buffer_len,
            stats: HandoffStats::default(),
        }
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer_len
    }

    pub fn stats(&self) -> &HandoffStats {
        &self.stats
    }

    // A panic while holding the lock leaves the slots in a consistent state
    // (plain copies), so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, HandoffState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// True when the hardware side consumed the last published buffer
    pub fn needs_processing(&self) -> bool {
        self.lock().needs_processing
    }

    /// Copy a finished mix into the back slot and mark it ready
    pub fn publish(&self, mixed: &[f32]) {
        debug_assert_eq!(mixed.len(), self.buffer_len, "Mismatching buffer sizes");

        let mut state = self.lock();
        let back = state.back();
        state.slots[back].copy_from_slice(mixed);
        state.needs_processing = false;
        drop(state);

        self.stats.published.fetch_add(1, Ordering::Relaxed);
    }

    /// Hardware side of the handoff. Never blocks.
    ///
    /// Writes one full buffer into `out`, which must be `buffer_len` long.
    /// On `Contended` nothing is written, so a caller that keeps the buffer
    /// it was last given replays that window.
    pub fn service(&self, out: &mut [f32]) -> ServiceOutcome {
        debug_assert_eq!(out.len(), self.buffer_len, "Mismatching buffer sizes");

        let mut state = match self.state.try_lock() {
            Ok(state) => state,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                self.stats.contended.fetch_add(1, Ordering::Relaxed);
                return ServiceOutcome::Contended;
            }
        };

        let outcome = if state.needs_processing {
            ServiceOutcome::Replayed
        } else {
            state.front = state.back();
            ServiceOutcome::Fresh
        };

        out.copy_from_slice(&state.slots[state.front]);
        state.needs_processing = true;
        drop(state);

        self.request.notify_one();

        match outcome {
            ServiceOutcome::Fresh => self.stats.fresh.fetch_add(1, Ordering::Relaxed),
            _ => self.stats.replayed.fetch_add(1, Ordering::Relaxed),
        };
        outcome
    }

    /// Block the mix side until a buffer is requested or `timeout` elapses
    ///
    /// Returns whether a buffer is needed.
    pub fn wait_for_request(&self, timeout: Duration) -> bool {
        let state = self.lock();
        let (state, _) = self
            .request
            .wait_timeout_while(state, timeout, |s| !s.needs_processing)
            .unwrap_or_else(PoisonError::into_inner);
        state.needs_processing
    }

    /// Wake a mix worker waiting in `wait_for_request`
    pub fn wake(&self) {
        self.request.notify_all();
    }
}

impl std::fmt::Debug for Handoff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handoff")
            .field("buffer_len", &self.buffer_len)
            .field("stats", &self.stats)
            .finish()
    }
}
