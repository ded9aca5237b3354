//! Single-Slot Overwrite Cell
//!
//! Connects a producer that must never block (the detector callback, or the
//! frame loop handing targets to the interpolator) to a consumer that only
//! cares about the newest value:
//! - A write replaces whatever is stored, read or not; there is no queue
//! - Readers get a whole `Arc<T>`, never a partially-written value
//! - Sequenced writes older than the stored one are rejected
//!
//! The critical sections are a pointer swap, so the `parking_lot` mutex is
//! uncontended in practice.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct SlotState<T> {
    /// Newest value; `None` once taken or before the first write
    value: Option<Arc<T>>,
    /// Sequence of the newest sequenced write
    sequence: Option<u64>,
}

/// Slot statistics for monitoring
#[derive(Debug, Default)]
pub struct SlotStats {
    /// Total accepted writes
    pub published: AtomicU64,
    /// Writes that replaced a value nobody had taken
    pub overwritten: AtomicU64,
    /// Sequenced writes dropped for arriving out of order
    pub stale_rejected: AtomicU64,
    /// Values handed out by `take`
    pub taken: AtomicU64,
}

/// Capacity-1 cell where a new write replaces any unread value.
pub struct LatestSlot<T> {
    state: Mutex<SlotState<T>>,
    ready: Condvar,
    stats: SlotStats,
}

impl<T> LatestSlot<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SlotState {
                value: None,
                sequence: None,
            }),
            ready: Condvar::new(),
            stats: SlotStats::default(),
        }
    }

    /// Store `value`, replacing anything pending.
    pub fn publish(&self, value: T) {
        let mut state = self.state.lock();
        if state.value.replace(Arc::new(value)).is_some() {
            self.stats.overwritten.fetch_add(1, Ordering::Relaxed);
        }
        self.stats.published.fetch_add(1, Ordering::Relaxed);
        drop(state);
        self.ready.notify_one();
    }

    /// Store `value` unless a write with an equal or newer sequence is already held.
    ///
    /// Returns true if the value was stored.
    pub fn publish_sequenced(&self, sequence: u64, value: T) -> bool {
        let mut state = self.state.lock();
        if state.sequence.is_some_and(|held| sequence <= held) {
            self.stats.stale_rejected.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        state.sequence = Some(sequence);
        if state.value.replace(Arc::new(value)).is_some() {
            self.stats.overwritten.fetch_add(1, Ordering::Relaxed);
        }
        self.stats.published.fetch_add(1, Ordering::Relaxed);
        drop(state);
        self.ready.notify_one();
        true
    }

    /// Read the newest value without consuming it. Stale reads are expected.
    pub fn latest(&self) -> Option<Arc<T>> {
        self.state.lock().value.clone()
    }

    /// Consume the pending value, if any.
    pub fn take(&self) -> Option<Arc<T>> {
        let taken = self.state.lock().value.take();
        if taken.is_some() {
            self.stats.taken.fetch_add(1, Ordering::Relaxed);
        }
        taken
    }

    /// Consume the pending value, waiting at most `timeout` for one to arrive.
    ///
    /// May return early and empty on a spurious or [`wake_all`](Self::wake_all)
    /// wakeup; callers poll in a loop.
    pub fn wait_take(&self, timeout: Duration) -> Option<Arc<T>> {
        let mut state = self.state.lock();
        if state.value.is_none() {
            let _ = self.ready.wait_for(&mut state, timeout);
        }
        let taken = state.value.take();
        if taken.is_some() {
            self.stats.taken.fetch_add(1, Ordering::Relaxed);
        }
        taken
    }

    /// Whether a value is stored.
    pub fn is_pending(&self) -> bool {
        self.state.lock().value.is_some()
    }

    /// Drop the stored value and forget the sequence high-water mark.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.value = None;
        state.sequence = None;
    }

    /// Wake every waiter, e.g. so a stopping worker observes its run flag.
    pub fn wake_all(&self) {
        self.ready.notify_all();
    }

    pub fn stats(&self) -> &SlotStats {
        &self.stats
    }
}

impl<T> Default for LatestSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}
