//! Collaborator interfaces
//!
//! The camera and the landmark model live outside this crate. The core talks to
//! them only through these traits and never inspects frame pixels itself.

use super::latest::LatestSlot;
use super::types::DetectionResult;
use crate::time::Timestamp;
use std::sync::Arc;

/// Shared cell the detector publishes into and the frame loop reads from.
pub type DetectionCell = Arc<LatestSlot<DetectionResult>>;

/// One captured camera frame, already mirrored horizontally.
///
/// Pixel layout is whatever the detector expects; the core passes it through.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Capture sequence number
    pub sequence: u64,
    pub width: u32,
    pub height: u32,
    pub pixels: Arc<[u8]>,
    pub captured_at: Timestamp,
}

impl Frame {
    /// A frame that carries no pixel data, for sources that drive a detector by sequence.
    pub fn placeholder(sequence: u64, width: u32, height: u32) -> Self {
        Self {
            sequence,
            width,
            height,
            pixels: Arc::from(Vec::new()),
            captured_at: Timestamp::now(),
        }
    }
}

/// Delivers successive camera frames.
pub trait FrameSource: Send {
    /// Read the next frame.
    ///
    /// - `Ok(Some(frame))`: a frame is available
    /// - `Ok(None)`: nothing this time; the caller skips the iteration and retries
    /// - `Err(Error::FrameNotReady)`: the next frame is not due; sources wait at
    ///   most a short slice before returning this, so callers can re-check their
    ///   stop flag and poll again
    /// - `Err(Error::SourceClosed)`: the stream ended normally
    /// - `Err(Error::DeviceUnavailable(_))`: no device at all; fatal, never retried
    fn next_frame(&mut self) -> crate::Result<Option<Frame>>;

    /// Release the underlying device. Called once, after every consumer has stopped.
    fn release(&mut self) {}
}

/// Asynchronous hand-landmark detector.
///
/// `submit` hands over a frame and returns immediately; results appear later in
/// the detector's [`DetectionCell`], keyed by a monotonically increasing sequence.
pub trait LandmarkDetector: Send {
    fn submit(&mut self, frame: &Frame) -> crate::Result<()>;

    /// Shut the detector down. Called once during controller shutdown.
    fn close(&mut self) {}
}
