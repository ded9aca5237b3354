//! Run-mode frame pipeline
//!
//! One detection in, one decision out: the pinch distance drives the gesture
//! classifier and the index fingertip, mapped and smoothed, becomes the next
//! pointer target. Nothing here touches the pointer; the frame loop applies the
//! outcome.

use crate::gesture::{
    ButtonCommand, ClickDistance, EmissionPolicy, FrameDecision, GestureClassifier, GestureTiming,
};
use crate::motion::{map_to_monitor, ActiveZone, MonitorGeometry, MonitorTarget, SmoothingBuffer, SmoothingSettings};
use crate::time::Timestamp;
use crate::tracking::DetectionResult;

/// Static parameters of the run-mode pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub timing: GestureTiming,
    pub zone: ActiveZone,
    pub geometry: MonitorGeometry,
    pub smoothing: SmoothingSettings,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            timing: GestureTiming::default(),
            zone: ActiveZone::default(),
            geometry: MonitorGeometry::new(1920, 1080),
            smoothing: SmoothingSettings::default(),
        }
    }
}

/// Everything decided for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameOutcome {
    /// Pinch distance, if a valid hand was present
    pub distance: Option<f64>,
    pub decision: FrameDecision,
    /// Where the pointer should go; `None` without a hand or while output is suppressed
    pub target: Option<MonitorTarget>,
}

/// Classifier plus coordinate mapping for run mode.
pub struct FramePipeline {
    classifier: GestureClassifier,
    smoothing: SmoothingBuffer,
    zone: ActiveZone,
    geometry: MonitorGeometry,
}

impl FramePipeline {
    pub fn new(click_distance: ClickDistance, settings: &PipelineSettings, now: Timestamp) -> Self {
        Self {
            classifier: GestureClassifier::new(click_distance, settings.timing, now),
            smoothing: SmoothingBuffer::new(settings.smoothing),
            zone: settings.zone,
            geometry: settings.geometry,
        }
    }

    /// Process the latest detection (possibly stale, possibly absent).
    pub fn process(
        &mut self,
        detection: Option<&DetectionResult>,
        now: Timestamp,
        policy: EmissionPolicy,
    ) -> FrameOutcome {
        let Some(hand) = detection.and_then(DetectionResult::primary_hand) else {
            return FrameOutcome {
                distance: None,
                decision: self.classifier.hand_missing(now),
                target: None,
            };
        };

        let distance = hand.pinch_distance();
        let decision = self.classifier.process(distance, now, policy);

        let tip = hand.index_tip();
        let smoothed = self
            .smoothing
            .push(map_to_monitor(tip.x, tip.y, &self.zone, self.geometry));
        let target = (policy != EmissionPolicy::Suppressed).then_some(smoothed);

        FrameOutcome {
            distance: Some(distance),
            decision,
            target,
        }
    }

    /// Let go of a held button, e.g. on shutdown.
    pub fn release_held(&mut self) -> ButtonCommand {
        self.classifier.release_held()
    }

    pub fn classifier(&self) -> &GestureClassifier {
        &self.classifier
    }
}
