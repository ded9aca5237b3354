//! Hand tracking input
//!
//! This module defines what the core consumes from its external collaborators:
//! camera frames, asynchronously published landmark detections, and the
//! single-slot cell that always holds only the newest detection.

pub mod types;
pub mod latest;
pub mod source;
pub mod replay;

pub use types::*;
pub use latest::{LatestSlot, SlotStats};
pub use source::{DetectionCell, Frame, FrameSource, LandmarkDetector};
pub use replay::{synthetic_hand, ReplayDetector, ReplaySource, ReplayTrack};
