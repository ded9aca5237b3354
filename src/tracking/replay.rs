//! Recorded landmark tracks
//!
//! A replay track stands in for the camera and the landmark model: the source
//! paces frames at the recorded rate and the detector publishes the recorded
//! hands for each submitted frame.

use super::latest::LatestSlot;
use super::source::{DetectionCell, Frame, FrameSource, LandmarkDetector};
use super::types::{DetectionResult, HandLandmark, LandmarkPoint, LANDMARK_COUNT};
use crate::time::Timestamp;
use crate::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Current track format version
pub const CURRENT_FORMAT_VERSION: &str = "1.0";

/// Track metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackMetadata {
    pub name: String,
    /// Capture rate the frames are replayed at
    pub fps: f64,
    pub recorded_at: DateTime<Utc>,
    pub format_version: String,
}

impl Default for TrackMetadata {
    fn default() -> Self {
        Self {
            name: String::new(),
            fps: 30.0,
            recorded_at: Utc::now(),
            format_version: CURRENT_FORMAT_VERSION.to_string(),
        }
    }
}

/// What the detector saw in one frame.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackFrame {
    #[serde(default)]
    pub hands: Vec<Vec<LandmarkPoint>>,
    /// The camera produced nothing for this slot
    #[serde(default)]
    pub dropped: bool,
}

/// A recorded sequence of landmark detections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplayTrack {
    pub metadata: TrackMetadata,
    pub frames: Vec<TrackFrame>,
}

impl ReplayTrack {
    pub fn new(name: impl Into<String>, fps: f64) -> Self {
        Self {
            metadata: TrackMetadata {
                name: name.into(),
                fps,
                ..Default::default()
            },
            frames: Vec::new(),
        }
    }

    /// Append a frame with one hand.
    pub fn push_hand(&mut self, points: Vec<LandmarkPoint>) {
        self.frames.push(TrackFrame {
            hands: vec![points],
            dropped: false,
        });
    }

    /// Append `count` frames with the same hand.
    pub fn repeat_hand(&mut self, points: &[LandmarkPoint], count: usize) {
        for _ in 0..count {
            self.push_hand(points.to_vec());
        }
    }

    /// Append `count` frames in which no hand was detected.
    pub fn push_empty(&mut self, count: usize) {
        for _ in 0..count {
            self.frames.push(TrackFrame::default());
        }
    }

    /// Append `count` slots where the camera yielded no frame.
    pub fn push_dropped(&mut self, count: usize) {
        for _ in 0..count {
            self.frames.push(TrackFrame {
                hands: Vec::new(),
                dropped: true,
            });
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Time between frames at the recorded rate.
    pub fn frame_interval(&self) -> Duration {
        if self.metadata.fps > 0.0 {
            Duration::from_secs_f64(1.0 / self.metadata.fps)
        } else {
            Duration::ZERO
        }
    }

    /// Save to a JSON file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load from a JSON file
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let track: ReplayTrack = serde_json::from_str(&content)?;
        if track.metadata.format_version != CURRENT_FORMAT_VERSION {
            warn!(
                name = %track.metadata.name,
                found = %track.metadata.format_version,
                expected = CURRENT_FORMAT_VERSION,
                "Track has different format version; some fields may use default values"
            );
        }
        if track.metadata.fps.is_nan() || track.metadata.fps < 0.0 {
            return Err(Error::Replay(format!(
                "fps must be non-negative, got {}",
                track.metadata.fps
            )));
        }
        debug!(name = %track.metadata.name, frames = track.len(), "Loaded replay track");
        Ok(track)
    }
}

/// Build a plausible open hand whose index fingertip sits at `(index_x, index_y)`
/// and whose thumb tip is `pinch` to its left.
pub fn synthetic_hand(index_x: f64, index_y: f64, pinch: f64) -> Vec<LandmarkPoint> {
    let mut points: Vec<LandmarkPoint> = (0..LANDMARK_COUNT)
        .map(|i| {
            // Fan the remaining joints out below the fingertip
            let finger = (i.saturating_sub(1) / 4) as f64;
            let joint = (i.saturating_sub(1) % 4) as f64;
            LandmarkPoint::new(
                index_x - 0.06 + finger * 0.03,
                index_y + 0.25 - joint * 0.05,
                0.0,
            )
        })
        .collect();
    points[HandLandmark::IndexTip.index()] = LandmarkPoint::new(index_x, index_y, 0.0);
    points[HandLandmark::ThumbTip.index()] = LandmarkPoint::new(index_x - pinch, index_y, 0.0);
    points
}

/// Longest single wait inside [`ReplaySource::next_frame`].
pub const PACE_SLICE: Duration = Duration::from_millis(10);

/// Frame source that replays a track's timing.
pub struct ReplaySource {
    track: Arc<ReplayTrack>,
    cursor: usize,
    interval: Duration,
    next_due: Option<Instant>,
    /// When set, frames are stamped from track time instead of the wall clock
    track_clock: Option<Timestamp>,
}

impl ReplaySource {
    pub fn new(track: Arc<ReplayTrack>) -> Self {
        let interval = track.frame_interval();
        Self {
            track,
            cursor: 0,
            interval,
            next_due: None,
            track_clock: None,
        }
    }

    /// Override the pacing, e.g. `Duration::ZERO` to replay as fast as possible.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Replay without sleeping, stamping frame `n` at `start + n / fps`.
    ///
    /// Timing-dependent behavior then plays out exactly as recorded, however
    /// fast the consumer runs.
    pub fn with_track_clock(mut self, start: Timestamp) -> Self {
        self.interval = Duration::ZERO;
        self.track_clock = Some(start);
        self
    }

    /// Whether the next frame is due, sleeping at most [`PACE_SLICE`] for it.
    fn frame_due(&mut self) -> bool {
        if self.interval.is_zero() {
            return true;
        }
        let now = Instant::now();
        let Some(due) = self.next_due else {
            self.next_due = Some(now + self.interval);
            return true;
        };
        if due > now {
            let wait = due - now;
            if wait > PACE_SLICE {
                std::thread::sleep(PACE_SLICE);
                return false;
            }
            std::thread::sleep(wait);
        }
        self.next_due = Some(due.max(now) + self.interval);
        true
    }
}

impl FrameSource for ReplaySource {
    fn next_frame(&mut self) -> crate::Result<Option<Frame>> {
        if self.track.is_empty() {
            return Err(Error::DeviceUnavailable(format!(
                "replay track '{}' has no frames",
                self.track.metadata.name
            )));
        }
        let Some(dropped) = self.track.frames.get(self.cursor).map(|f| f.dropped) else {
            return Err(Error::SourceClosed);
        };
        if !self.frame_due() {
            return Err(Error::FrameNotReady);
        }

        let sequence = self.cursor as u64;
        self.cursor += 1;

        if dropped {
            return Ok(None);
        }
        let mut frame = Frame::placeholder(sequence, 640, 480);
        if let Some(start) = self.track_clock {
            let offset = (self.track.frame_interval().as_nanos() as u64).saturating_mul(sequence);
            frame.captured_at = start + Duration::from_nanos(offset);
        }
        Ok(Some(frame))
    }

    fn release(&mut self) {
        debug!(replayed = self.cursor, "Replay source released");
    }
}

/// Detector that looks up the recorded hands for each submitted frame.
pub struct ReplayDetector {
    track: Arc<ReplayTrack>,
    results: DetectionCell,
    submitted: u64,
}

impl ReplayDetector {
    pub fn new(track: Arc<ReplayTrack>, results: DetectionCell) -> Self {
        Self {
            track,
            results,
            submitted: 0,
        }
    }

    /// Convenience: a detector plus a fresh result cell.
    pub fn with_cell(track: Arc<ReplayTrack>) -> (Self, DetectionCell) {
        let cell = Arc::new(LatestSlot::new());
        (Self::new(track, Arc::clone(&cell)), cell)
    }
}

impl LandmarkDetector for ReplayDetector {
    fn submit(&mut self, frame: &Frame) -> crate::Result<()> {
        let recorded = self
            .track
            .frames
            .get(frame.sequence as usize)
            .ok_or_else(|| Error::Detector(format!("no recorded frame {}", frame.sequence)))?;
        self.submitted += 1;
        self.results
            .publish_sequenced(frame.sequence, DetectionResult::new(frame.sequence, recorded.hands.clone()));
        Ok(())
    }

    fn close(&mut self) {
        debug!(submitted = self.submitted, "Replay detector closed");
    }
}
