//! Controller events and statistics

use super::mode::Mode;
use crate::gesture::{Action, CalibrationOutcome};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Notifications for the display collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    ModeChanged(Mode),
    /// Human-readable status line; only sent when the text changes
    Status(String),
    /// Sent exactly once per calibration
    CalibrationCompleted(CalibrationOutcome),
    /// The action or the contact indicator changed
    Gesture { action: Action, contact: bool },
    /// No valid hand for longer than the no-hand timeout
    HandLost,
    /// A pointer command was rejected; the loop keeps running
    InjectionWarning(String),
    /// The frame loop ended on an unrecoverable error
    Fatal(String),
}

/// Frame loop counters.
#[derive(Debug, Default)]
pub struct ControllerStats {
    /// Frames handed to the detector
    pub frames_processed: AtomicU64,
    /// Iterations where the source had no frame
    pub frames_skipped: AtomicU64,
    pub frames_without_hand: AtomicU64,
    pub clicks: AtomicU64,
    pub presses: AtomicU64,
    pub releases: AtomicU64,
    pub injection_failures: AtomicU64,
}

/// Plain copy of [`ControllerStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StatsSnapshot {
    pub frames_processed: u64,
    pub frames_skipped: u64,
    pub frames_without_hand: u64,
    pub clicks: u64,
    pub presses: u64,
    pub releases: u64,
    pub injection_failures: u64,
}

impl ControllerStats {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_processed: self.frames_processed.load(Ordering::Relaxed),
            frames_skipped: self.frames_skipped.load(Ordering::Relaxed),
            frames_without_hand: self.frames_without_hand.load(Ordering::Relaxed),
            clicks: self.clicks.load(Ordering::Relaxed),
            presses: self.presses.load(Ordering::Relaxed),
            releases: self.releases.load(Ordering::Relaxed),
            injection_failures: self.injection_failures.load(Ordering::Relaxed),
        }
    }
}
