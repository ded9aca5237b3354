//! Saved calibration results

use crate::gesture::{CalibrationOutcome, ClickDistance, ThresholdEstimator};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A calibration outcome stored on disk, so later runs can skip calibrating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationProfile {
    pub click_distance: ClickDistance,
    pub touching_edge: f64,
    pub not_touching_edge: f64,
    pub touching_samples: usize,
    pub not_touching_samples: usize,
    #[serde(default)]
    pub estimator: ThresholdEstimator,
    pub calibrated_at: DateTime<Utc>,
}

impl CalibrationProfile {
    pub fn from_outcome(outcome: &CalibrationOutcome) -> Self {
        Self {
            click_distance: outcome.click_distance,
            touching_edge: outcome.touching_edge,
            not_touching_edge: outcome.not_touching_edge,
            touching_samples: outcome.touching_samples,
            not_touching_samples: outcome.not_touching_samples,
            estimator: outcome.estimator,
            calibrated_at: Utc::now(),
        }
    }

    /// Default location: `~/.hand_pointer/profile.json`
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".hand_pointer")
            .join("profile.json")
    }

    /// The stored click distance, clamped to the current bounds.
    pub fn click_distance_within(&self, min: f64, max: f64) -> ClickDistance {
        let clamped = ClickDistance::clamped(self.click_distance.value(), min, max);
        if clamped != self.click_distance {
            warn!(
                stored = self.click_distance.value(),
                used = clamped.value(),
                "Stored click distance outside configured bounds; clamped"
            );
        }
        clamped
    }

    /// Save as pretty JSON
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        debug!(path = %path.display(), "Saved calibration profile");
        Ok(())
    }

    /// Load from a JSON file
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let profile: Self = serde_json::from_str(&content)?;
        if !profile.click_distance.value().is_finite() || profile.click_distance.value() <= 0.0 {
            return Err(crate::Error::Calibration(format!(
                "profile click distance must be positive, got {}",
                profile.click_distance.value()
            )));
        }
        Ok(profile)
    }
}
