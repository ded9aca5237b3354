//! Controller mode and run-time toggles

use crate::gesture::{ClickDistance, EmissionPolicy};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Which consumer currently owns the frame source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Mode {
    Calibrating = 0,
    Running = 1,
}

impl Mode {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Calibrating,
            _ => Self::Running,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Calibrating => "calibrating",
            Self::Running => "running",
        }
    }
}

/// Atomic wrapper for [`Mode`]
#[derive(Debug)]
pub struct AtomicMode(AtomicU8);

impl AtomicMode {
    pub const fn new(mode: Mode) -> Self {
        Self(AtomicU8::new(mode as u8))
    }

    pub fn load(&self) -> Mode {
        Mode::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Store `mode`, returning the previous one.
    pub fn swap(&self, mode: Mode) -> Mode {
        Mode::from_u8(self.0.swap(mode as u8, Ordering::AcqRel))
    }
}

/// What a controller session does from start to finish.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionPlan {
    /// Calibrate, report the outcome, then end
    CalibrateOnly,
    /// Calibrate, then control the pointer with the new click distance
    CalibrateThenRun,
    /// Control the pointer with an existing click distance
    Run(ClickDistance),
}

impl SessionPlan {
    pub fn initial_mode(&self) -> Mode {
        match self {
            Self::CalibrateOnly | Self::CalibrateThenRun => Mode::Calibrating,
            Self::Run(_) => Mode::Running,
        }
    }
}

/// Flags the display collaborator may flip while the controller runs.
///
/// Read once per frame by the frame loop.
#[derive(Debug)]
pub struct ControlToggles {
    dragging_enabled: AtomicBool,
    processing_enabled: AtomicBool,
}

impl ControlToggles {
    pub fn new(dragging_enabled: bool, processing_enabled: bool) -> Self {
        Self {
            dragging_enabled: AtomicBool::new(dragging_enabled),
            processing_enabled: AtomicBool::new(processing_enabled),
        }
    }

    pub fn dragging_enabled(&self) -> bool {
        self.dragging_enabled.load(Ordering::Relaxed)
    }

    pub fn set_dragging_enabled(&self, enabled: bool) {
        self.dragging_enabled.store(enabled, Ordering::Relaxed);
    }

    /// Whether pointer moves and button events are injected at all.
    pub fn processing_enabled(&self) -> bool {
        self.processing_enabled.load(Ordering::Relaxed)
    }

    pub fn set_processing_enabled(&self, enabled: bool) {
        self.processing_enabled.store(enabled, Ordering::Relaxed);
    }

    /// Emission policy for the current frame.
    pub fn policy(&self) -> EmissionPolicy {
        EmissionPolicy::from_toggles(self.dragging_enabled(), self.processing_enabled())
    }
}

impl Default for ControlToggles {
    fn default() -> Self {
        Self::new(false, true)
    }
}
