//! Gesture recognition
//!
//! Calibration of the per-user click distance and the click/hold/drag state
//! machine that runs once calibration is done.

pub mod calibration;
pub mod classifier;

pub use calibration::{
    estimate_click_distance, CalibrationOutcome, CalibrationPhase, CalibrationSession,
    CalibrationSettings, CalibrationStatus, ClickDistance, ThresholdEstimator, NO_HAND_PROMPT,
};
pub use classifier::{
    Action, ButtonCommand, EmissionPolicy, FrameDecision, GestureClassifier, GestureState,
    GestureTiming,
};
