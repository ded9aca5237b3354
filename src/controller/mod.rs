//! Controller
//!
//! Wires the gesture and motion components around the external frame source,
//! landmark detector and pointer collaborators, and switches between
//! calibration and run mode.

pub mod events;
pub mod mode;
pub mod pipeline;
pub mod profile;
pub mod runner;

pub use events::{ControllerEvent, ControllerStats, StatsSnapshot};
pub use mode::{AtomicMode, ControlToggles, Mode, SessionPlan};
pub use pipeline::{FrameOutcome, FramePipeline, PipelineSettings};
pub use profile::CalibrationProfile;
pub use runner::{Collaborators, Controller, ControllerSettings, StopHandle};
