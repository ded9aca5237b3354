//! # Hand Pointer
//!
//! Turns a continuous stream of hand-landmark detections into pointer-control
//! events (move, click, drag) on the host display.
//!
//! ## Overview
//!
//! A camera frame source and an asynchronous landmark detector are external
//! collaborators. This library consumes the detector's latest result, measures
//! the thumb/index pinch distance, and drives the OS pointer through a
//! [`pointer::PointerSink`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use hand_pointer::gesture::{ClickDistance, EmissionPolicy, GestureClassifier, GestureTiming};
//! use hand_pointer::time::Timestamp;
//!
//! let mut classifier = GestureClassifier::new(
//!     ClickDistance::new(0.08),
//!     GestureTiming::default(),
//!     Timestamp::from_millis(0),
//! );
//! let decision = classifier.process(0.05, Timestamp::from_millis(600), EmissionPolicy::ClickAndDrag);
//! println!("{:?}", decision.action);
//! ```
//!
//! ## Architecture
//!
//! - [`time`]: Monotonic timestamps shared by every stage
//! - [`tracking`]: Landmark types, the single-slot result cell, collaborator traits and replay
//! - [`gesture`]: Calibration session and the click/hold/drag state machine
//! - [`motion`]: Active-zone mapping, window smoothing and the interpolation worker
//! - [`pointer`]: Pointer injection backends
//! - [`controller`]: Lifecycle, mode switching and the per-frame pipeline
//! - [`app`]: CLI and configuration management
//!
//! ## Frame Pipeline
//!
//! ```text
//! ┌─────────────┐    ┌─────────────┐    ┌─────────────┐    ┌─────────────┐
//! │ FrameSource │───▶│  Detector   │───▶│ LatestSlot  │───▶│ Calibration │
//! │             │    │   (async)   │    │ (overwrite) │    │  or Gesture │
//! └─────────────┘    └─────────────┘    └─────────────┘    └─────────────┘
//!                                                                 │
//!                                                                 ▼
//! ┌─────────────┐    ┌─────────────┐    ┌─────────────┐    ┌─────────────┐
//! │ PointerSink │◀───│ Interpolator│◀───│  Smoothing  │◀───│   Mapper    │
//! │             │    │   (worker)  │    │   Buffer    │    │             │
//! └─────────────┘    └─────────────┘    └─────────────┘    └─────────────┘
//! ```

pub mod time;
pub mod tracking;
pub mod gesture;
pub mod motion;
pub mod pointer;
pub mod controller;
pub mod app;

// Re-export commonly used types
pub use controller::{Controller, ControllerEvent, Mode, SessionPlan};
pub use gesture::{Action, CalibrationSession, ClickDistance, GestureClassifier};
pub use motion::{MonitorTarget, PointerInterpolator, SmoothingBuffer};
pub use pointer::{LoggingPointer, MouseButton, PointerSink};
pub use time::Timestamp;
pub use tracking::{DetectionResult, HandSnapshot, LandmarkPoint, LatestSlot};

/// Result type alias for the hand pointer library
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the hand pointer library
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Frame source error: {0}")]
    FrameSource(String),

    #[error("No capture device reachable: {0}")]
    DeviceUnavailable(String),

    #[error("Frame source closed")]
    SourceClosed,

    #[error("Next frame not due yet")]
    FrameNotReady,

    #[error("Landmark detector error: {0}")]
    Detector(String),

    #[error("Calibration error: {0}")]
    Calibration(String),

    #[error("Interpolator error: {0}")]
    Interpolator(String),

    #[error("Controller error: {0}")]
    Controller(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Replay error: {0}")]
    Replay(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error ends the session gracefully rather than fatally.
    pub fn is_graceful_end(&self) -> bool {
        matches!(self, Error::SourceClosed)
    }
}
