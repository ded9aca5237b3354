//! Core types for hand landmarks
//!
//! Landmarks follow the 21-point hand topology: wrist, then four joints per
//! finger from thumb to pinky. Coordinates are normalized to [0, 1] with the
//! frame already mirrored horizontally.

use serde::{Deserialize, Serialize};

/// Number of landmarks in a complete hand.
pub const LANDMARK_COUNT: usize = 21;

/// A single normalized landmark position.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LandmarkPoint {
    pub x: f64,
    pub y: f64,
    /// Relative depth. Carried through but unused by the pipeline.
    #[serde(default)]
    pub z: f64,
}

impl LandmarkPoint {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance in the image plane, ignoring depth.
    #[inline]
    pub fn planar_distance(&self, other: &LandmarkPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// The 21 hand landmarks, in detector output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum HandLandmark {
    Wrist = 0,
    ThumbCmc = 1,
    ThumbMcp = 2,
    ThumbIp = 3,
    ThumbTip = 4,
    IndexMcp = 5,
    IndexPip = 6,
    IndexDip = 7,
    IndexTip = 8,
    MiddleMcp = 9,
    MiddlePip = 10,
    MiddleDip = 11,
    MiddleTip = 12,
    RingMcp = 13,
    RingPip = 14,
    RingDip = 15,
    RingTip = 16,
    PinkyMcp = 17,
    PinkyPip = 18,
    PinkyDip = 19,
    PinkyTip = 20,
}

impl HandLandmark {
    /// Position of this landmark in a snapshot.
    #[inline]
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wrist => "wrist",
            Self::ThumbCmc => "thumb-cmc",
            Self::ThumbMcp => "thumb-mcp",
            Self::ThumbIp => "thumb-ip",
            Self::ThumbTip => "thumb-tip",
            Self::IndexMcp => "index-mcp",
            Self::IndexPip => "index-pip",
            Self::IndexDip => "index-dip",
            Self::IndexTip => "index-tip",
            Self::MiddleMcp => "middle-mcp",
            Self::MiddlePip => "middle-pip",
            Self::MiddleDip => "middle-dip",
            Self::MiddleTip => "middle-tip",
            Self::RingMcp => "ring-mcp",
            Self::RingPip => "ring-pip",
            Self::RingDip => "ring-dip",
            Self::RingTip => "ring-tip",
            Self::PinkyMcp => "pinky-mcp",
            Self::PinkyPip => "pinky-pip",
            Self::PinkyDip => "pinky-dip",
            Self::PinkyTip => "pinky-tip",
        }
    }
}

/// A hand whose landmark list did not have the expected shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("expected {LANDMARK_COUNT} landmarks, got {count}")]
pub struct MalformedHand {
    pub count: usize,
}

/// One complete hand: exactly 21 landmarks.
#[derive(Debug, Clone, PartialEq)]
pub struct HandSnapshot {
    points: [LandmarkPoint; LANDMARK_COUNT],
}

impl HandSnapshot {
    /// Landmark accessor.
    #[inline]
    pub fn point(&self, landmark: HandLandmark) -> LandmarkPoint {
        self.points[landmark.index()]
    }

    #[inline]
    pub fn thumb_tip(&self) -> LandmarkPoint {
        self.point(HandLandmark::ThumbTip)
    }

    #[inline]
    pub fn index_tip(&self) -> LandmarkPoint {
        self.point(HandLandmark::IndexTip)
    }

    /// Planar distance between thumb tip and index fingertip.
    #[inline]
    pub fn pinch_distance(&self) -> f64 {
        self.thumb_tip().planar_distance(&self.index_tip())
    }

    pub fn points(&self) -> &[LandmarkPoint] {
        &self.points
    }
}

impl TryFrom<&[LandmarkPoint]> for HandSnapshot {
    type Error = MalformedHand;

    fn try_from(points: &[LandmarkPoint]) -> Result<Self, Self::Error> {
        let points = <[LandmarkPoint; LANDMARK_COUNT]>::try_from(points)
            .map_err(|_| MalformedHand { count: points.len() })?;
        Ok(Self { points })
    }
}

impl TryFrom<Vec<LandmarkPoint>> for HandSnapshot {
    type Error = MalformedHand;

    fn try_from(points: Vec<LandmarkPoint>) -> Result<Self, Self::Error> {
        Self::try_from(points.as_slice())
    }
}

/// Everything the detector reported for one submitted frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Detection sequence number, monotonically increasing per submission
    pub sequence: u64,
    /// Zero or more hands, each an ordered landmark list
    pub hands: Vec<Vec<LandmarkPoint>>,
}

impl DetectionResult {
    pub fn new(sequence: u64, hands: Vec<Vec<LandmarkPoint>>) -> Self {
        Self { sequence, hands }
    }

    /// A result with no hands.
    pub fn empty(sequence: u64) -> Self {
        Self { sequence, hands: Vec::new() }
    }

    /// The first reported hand, if it is complete.
    ///
    /// A malformed first hand counts as no hand; later hands are never used.
    pub fn primary_hand(&self) -> Option<HandSnapshot> {
        let first = self.hands.first()?;
        match HandSnapshot::try_from(first.as_slice()) {
            Ok(hand) => Some(hand),
            Err(e) => {
                tracing::trace!(sequence = self.sequence, "ignoring hand: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hand_with(thumb: (f64, f64), index: (f64, f64)) -> Vec<LandmarkPoint> {
        let mut points = vec![LandmarkPoint::new(0.5, 0.9, 0.0); LANDMARK_COUNT];
        points[HandLandmark::ThumbTip.index()] = LandmarkPoint::new(thumb.0, thumb.1, 0.0);
        points[HandLandmark::IndexTip.index()] = LandmarkPoint::new(index.0, index.1, -0.02);
        points
    }

    #[test]
    fn test_landmark_indices() {
        assert_eq!(HandLandmark::Wrist.index(), 0);
        assert_eq!(HandLandmark::ThumbTip.index(), 4);
        assert_eq!(HandLandmark::IndexTip.index(), 8);
        assert_eq!(HandLandmark::PinkyTip.index(), LANDMARK_COUNT - 1);
        assert_eq!(HandLandmark::IndexTip.as_str(), "index-tip");
    }

    #[test]
    fn test_pinch_distance_ignores_depth() {
        let hand = HandSnapshot::try_from(hand_with((0.40, 0.50), (0.43, 0.54))).unwrap();
        assert!((hand.pinch_distance() - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_malformed_hand_rejected() {
        let err = HandSnapshot::try_from(vec![LandmarkPoint::default(); 20]).unwrap_err();
        assert_eq!(err.count, 20);
        assert!(HandSnapshot::try_from(vec![LandmarkPoint::default(); 22]).is_err());
    }

    #[test]
    fn test_primary_hand_selection() {
        let result = DetectionResult::new(
            7,
            vec![hand_with((0.1, 0.1), (0.2, 0.1)), hand_with((0.8, 0.8), (0.9, 0.8))],
        );
        let hand = result.primary_hand().unwrap();
        assert_eq!(hand.thumb_tip().x, 0.1);
    }

    #[test]
    fn test_primary_hand_absent_or_malformed() {
        assert!(DetectionResult::empty(1).primary_hand().is_none());

        // A bad first hand is not replaced by a good second one
        let result = DetectionResult::new(
            2,
            vec![vec![LandmarkPoint::default(); 5], hand_with((0.1, 0.1), (0.2, 0.1))],
        );
        assert!(result.primary_hand().is_none());
    }

    #[test]
    fn test_landmark_point_deserializes_without_depth() {
        let point: LandmarkPoint = serde_json::from_str(r#"{"x":0.25,"y":0.75}"#).unwrap();
        assert_eq!(point, LandmarkPoint::new(0.25, 0.75, 0.0));
    }
}
