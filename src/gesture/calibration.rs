//! Contact Calibration
//!
//! A timed, multi-phase sampler that derives a person-specific click distance:
//! the user is prompted to hold thumb and index fingertip apart, then together,
//! while pinch distances are recorded. The phase clock only runs while a hand is
//! visible, so looking away cannot skip a phase.

use crate::time::Timestamp;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Status text shown while no valid hand is in view.
pub const NO_HAND_PROMPT: &str = "Couldn't detect hand.";

/// Threshold distance at or below which the fingertips count as touching.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClickDistance(f64);

impl ClickDistance {
    pub const fn new(value: f64) -> Self {
        Self(value)
    }

    /// Clamp `value` into `[min, max]`.
    pub fn clamped(value: f64, min: f64, max: f64) -> Self {
        Self(value.clamp(min, max))
    }

    #[inline]
    pub const fn value(&self) -> f64 {
        self.0
    }

    /// Whether `distance` is a contact.
    #[inline]
    pub fn is_contact(&self, distance: f64) -> bool {
        distance <= self.0
    }
}

impl std::fmt::Display for ClickDistance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}", self.0)
    }
}

/// How the two sample sets are reduced to a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdEstimator {
    /// Midpoint of the widest touching sample and the closest apart sample.
    #[default]
    Extremes,
    /// Midpoint of the 75th touching percentile and the 25th apart percentile.
    Percentile,
}

impl ThresholdEstimator {
    /// Edge used when the touching phase recorded nothing.
    pub fn touching_fallback(&self) -> f64 {
        match self {
            Self::Extremes => 0.04,
            Self::Percentile => 0.05,
        }
    }

    /// Lower clamp bound used when none is configured.
    pub fn default_min_click_distance(&self) -> f64 {
        match self {
            Self::Extremes => 0.04,
            Self::Percentile => 0.05,
        }
    }

    /// Edge used when the apart phase recorded nothing.
    pub fn not_touching_fallback(&self) -> f64 {
        match self {
            Self::Extremes => 0.10,
            Self::Percentile => 0.15,
        }
    }

    fn touching_edge(&self, samples: &[f64]) -> Option<f64> {
        match self {
            Self::Extremes => samples.iter().copied().reduce(f64::max),
            Self::Percentile => percentile(samples, 75.0),
        }
    }

    fn not_touching_edge(&self, samples: &[f64]) -> Option<f64> {
        match self {
            Self::Extremes => samples.iter().copied().reduce(f64::min),
            Self::Percentile => percentile(samples, 25.0),
        }
    }
}

/// Linear-interpolated percentile of `samples`; `None` when empty.
fn percentile(samples: &[f64], pct: f64) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    let rank = (pct / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64))
}

/// Phase durations and threshold bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationSettings {
    pub prompt_apart: Duration,
    pub measure_apart: Duration,
    pub prompt_together: Duration,
    pub measure_together: Duration,
    pub min_click_distance: f64,
    pub max_click_distance: f64,
    pub estimator: ThresholdEstimator,
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            prompt_apart: Duration::from_secs(5),
            measure_apart: Duration::from_secs(3),
            prompt_together: Duration::from_secs(3),
            measure_together: Duration::from_secs(3),
            min_click_distance: 0.04,
            max_click_distance: 0.15,
            estimator: ThresholdEstimator::Extremes,
        }
    }
}

impl CalibrationSettings {
    /// Default phases and bounds for `estimator`.
    pub fn with_estimator(estimator: ThresholdEstimator) -> Self {
        Self {
            min_click_distance: estimator.default_min_click_distance(),
            estimator,
            ..Self::default()
        }
    }

    /// Active time after which calibration completes.
    pub fn total(&self) -> Duration {
        self.prompt_apart + self.measure_apart + self.prompt_together + self.measure_together
    }

    /// Phase for an accumulated active time. Each phase includes its end bound.
    pub fn phase_at(&self, elapsed: Duration) -> CalibrationPhase {
        let mut end = Duration::ZERO;
        for (phase, length) in [
            (CalibrationPhase::PromptApart, self.prompt_apart),
            (CalibrationPhase::MeasureApart, self.measure_apart),
            (CalibrationPhase::PromptTogether, self.prompt_together),
            (CalibrationPhase::MeasureTogether, self.measure_together),
        ] {
            end += length;
            if elapsed <= end {
                return phase;
            }
        }
        CalibrationPhase::Complete
    }

    /// Active time at which `phase` ends.
    fn phase_end(&self, phase: CalibrationPhase) -> Duration {
        match phase {
            CalibrationPhase::PromptApart => self.prompt_apart,
            CalibrationPhase::MeasureApart => self.prompt_apart + self.measure_apart,
            CalibrationPhase::PromptTogether => {
                self.prompt_apart + self.measure_apart + self.prompt_together
            }
            CalibrationPhase::MeasureTogether | CalibrationPhase::Complete => self.total(),
        }
    }
}

/// Calibration phases, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalibrationPhase {
    /// Ask for fingertips close but apart; nothing sampled
    PromptApart,
    /// Sample the apart distance
    MeasureApart,
    /// Ask for fingertips together; nothing sampled
    PromptTogether,
    /// Sample the touching distance
    MeasureTogether,
    Complete,
}

impl CalibrationPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PromptApart => "prompt-apart",
            Self::MeasureApart => "measure-apart",
            Self::PromptTogether => "prompt-together",
            Self::MeasureTogether => "measure-together",
            Self::Complete => "complete",
        }
    }

    /// User-facing instruction with whole seconds left in the phase.
    pub fn prompt(&self, seconds_left: u64) -> String {
        match self {
            Self::PromptApart => format!(
                "Bring your thumb tip and pointer tip close (but not touching) in {} seconds",
                seconds_left
            ),
            Self::MeasureApart => format!(
                "Measuring not touching position... {} seconds remaining",
                seconds_left
            ),
            Self::PromptTogether => format!(
                "Touch your thumb tip and pointer tip together in {} seconds",
                seconds_left
            ),
            Self::MeasureTogether => format!(
                "Measuring touching position... {} seconds remaining",
                seconds_left
            ),
            Self::Complete => "Calibration complete.".to_string(),
        }
    }
}

/// Result of a finished calibration.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationOutcome {
    pub click_distance: ClickDistance,
    pub touching_edge: f64,
    pub not_touching_edge: f64,
    pub touching_samples: usize,
    pub not_touching_samples: usize,
    pub estimator: ThresholdEstimator,
}

/// Reduce sample sets to a click distance, falling back to defaults for empty sets.
pub fn estimate_click_distance(
    touching: &[f64],
    not_touching: &[f64],
    settings: &CalibrationSettings,
) -> CalibrationOutcome {
    let estimator = settings.estimator;
    let touching_edge = estimator
        .touching_edge(touching)
        .unwrap_or_else(|| estimator.touching_fallback());
    let not_touching_edge = estimator
        .not_touching_edge(not_touching)
        .unwrap_or_else(|| estimator.not_touching_fallback());

    CalibrationOutcome {
        click_distance: ClickDistance::clamped(
            (touching_edge + not_touching_edge) / 2.0,
            settings.min_click_distance,
            settings.max_click_distance,
        ),
        touching_edge,
        not_touching_edge,
        touching_samples: touching.len(),
        not_touching_samples: not_touching.len(),
        estimator,
    }
}

/// Progress report from [`CalibrationSession::advance`].
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationStatus {
    InProgress {
        phase: CalibrationPhase,
        prompt: String,
    },
    Done(CalibrationOutcome),
}

/// One calibration run. Completion is terminal; build a new session to recalibrate.
pub struct CalibrationSession {
    settings: CalibrationSettings,
    /// Accumulated time with a hand in view
    active: Duration,
    phase: CalibrationPhase,
    touching: Vec<f64>,
    not_touching: Vec<f64>,
    /// Previous frame with a hand, for [`observe`](Self::observe)
    last_seen: Option<Timestamp>,
    completed: bool,
}

impl CalibrationSession {
    pub fn new(settings: CalibrationSettings) -> Self {
        Self {
            settings,
            active: Duration::ZERO,
            phase: CalibrationPhase::PromptApart,
            touching: Vec::new(),
            not_touching: Vec::new(),
            last_seen: None,
            completed: false,
        }
    }

    /// Feed one frame.
    ///
    /// `distance` is the pinch distance, or `None` when no valid hand was seen.
    /// `delta` is added to the phase clock only when a hand was seen.
    pub fn advance(
        &mut self,
        distance: Option<f64>,
        delta: Duration,
    ) -> crate::Result<CalibrationStatus> {
        if self.completed {
            return Err(crate::Error::Calibration(
                "session already completed".to_string(),
            ));
        }

        let Some(distance) = distance else {
            return Ok(CalibrationStatus::InProgress {
                phase: self.phase,
                prompt: NO_HAND_PROMPT.to_string(),
            });
        };

        self.active += delta;
        let phase = self.settings.phase_at(self.active);
        if phase != self.phase {
            debug!(
                from = self.phase.as_str(),
                to = phase.as_str(),
                active_secs = self.active.as_secs_f64(),
                "Calibration phase changed"
            );
            self.phase = phase;
        }

        match phase {
            CalibrationPhase::MeasureApart if distance.is_finite() => self.not_touching.push(distance),
            CalibrationPhase::MeasureTogether if distance.is_finite() => self.touching.push(distance),
            CalibrationPhase::Complete => return Ok(CalibrationStatus::Done(self.finish())),
            _ => {}
        }

        Ok(CalibrationStatus::InProgress {
            phase,
            prompt: phase.prompt(self.seconds_left()),
        })
    }

    /// Feed one frame stamped with wall time; the delta is measured between
    /// consecutive frames that both had a hand, so gaps add nothing.
    pub fn observe(
        &mut self,
        distance: Option<f64>,
        now: Timestamp,
    ) -> crate::Result<CalibrationStatus> {
        let delta = match distance {
            Some(_) => {
                let delta = self
                    .last_seen
                    .map(|seen| now.duration_since(seen))
                    .unwrap_or(Duration::ZERO);
                self.last_seen = Some(now);
                delta
            }
            None => {
                self.last_seen = None;
                Duration::ZERO
            }
        };
        self.advance(distance, delta)
    }

    fn seconds_left(&self) -> u64 {
        let end = self.settings.phase_end(self.phase);
        end.saturating_sub(self.active).as_secs() + 1
    }

    fn finish(&mut self) -> CalibrationOutcome {
        self.completed = true;
        let outcome = estimate_click_distance(&self.touching, &self.not_touching, &self.settings);
        info!(
            click_distance = outcome.click_distance.value(),
            touching_edge = outcome.touching_edge,
            not_touching_edge = outcome.not_touching_edge,
            touching_samples = outcome.touching_samples,
            not_touching_samples = outcome.not_touching_samples,
            "Calibration complete"
        );
        // Samples are not needed past this point
        self.touching = Vec::new();
        self.not_touching = Vec::new();
        outcome
    }

    pub fn phase(&self) -> CalibrationPhase {
        self.phase
    }

    /// Accumulated time with a hand in view.
    pub fn active_time(&self) -> Duration {
        self.active
    }

    pub fn is_complete(&self) -> bool {
        self.completed
    }

    pub fn touching_samples(&self) -> &[f64] {
        &self.touching
    }

    pub fn not_touching_samples(&self) -> &[f64] {
        &self.not_touching
    }
}
