//! Configuration Management

use crate::controller::{ControllerSettings, PipelineSettings};
use crate::gesture::{CalibrationSettings, GestureTiming, ThresholdEstimator};
use crate::motion::{ActiveZone, InterpolatorSettings, MonitorGeometry, SmoothingSettings};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Hand tracking settings
    #[serde(default)]
    pub tracking: TrackingConfig,
    /// Gesture timing
    #[serde(default)]
    pub gesture: GestureConfig,
    /// Calibration phases and bounds
    #[serde(default)]
    pub calibration: CalibrationConfig,
    /// Smoothing and interpolation
    #[serde(default)]
    pub motion: MotionConfig,
    /// Fallback display size
    #[serde(default)]
    pub display: DisplayConfig,
}

/// Tracking configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Lower bound of the active zone (normalized)
    pub active_zone_low: f64,
    /// Upper bound of the active zone (normalized)
    pub active_zone_high: f64,
    /// Hand absence before a gesture is dropped (ms)
    pub no_hand_timeout_ms: u64,
}

/// Gesture configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Contact time before a hold becomes a drag (ms)
    pub drag_hold_ms: u64,
    /// Contact debounce window (ms)
    pub debounce_ms: u64,
    /// Minimum spacing between clicks (ms)
    pub click_cooldown_ms: u64,
    /// Start with dragging enabled
    pub dragging_enabled: bool,
}

/// Calibration configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub prompt_apart_ms: u64,
    pub measure_apart_ms: u64,
    pub prompt_together_ms: u64,
    pub measure_together_ms: u64,
    /// Lower clamp bound of the click distance; unset means the estimator's own
    /// default (0.04 for extremes, 0.05 for percentile)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_click_distance: Option<f64>,
    /// Upper clamp bound of the click distance
    pub max_click_distance: f64,
    /// "extremes" or "percentile"
    pub estimator: ThresholdEstimator,
}

/// Motion configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Raw targets kept for smoothing
    pub smoothing_window: usize,
    /// Targets needed before smoothing starts
    pub smoothing_activation: usize,
    /// Weight of each newer target (lower is smoother)
    pub smoothing_alpha: f64,
    /// Moves per interpolated animation
    pub interpolation_steps: u32,
    /// Delay after each interpolation move (ms)
    pub step_delay_ms: u64,
    /// Idle wait for a new target (ms)
    pub poll_interval_ms: u64,
    /// Longest wait for the interpolator to exit (ms)
    pub stop_timeout_ms: u64,
}

/// Display configuration, used when the pointer backend cannot report a size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            active_zone_low: 0.2,
            active_zone_high: 0.8,
            no_hand_timeout_ms: 300,
        }
    }
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            drag_hold_ms: 200,
            debounce_ms: 100,
            click_cooldown_ms: 500,
            dragging_enabled: false,
        }
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            prompt_apart_ms: 5000,
            measure_apart_ms: 3000,
            prompt_together_ms: 3000,
            measure_together_ms: 3000,
            min_click_distance: None,
            max_click_distance: 0.15,
            estimator: ThresholdEstimator::Extremes,
        }
    }
}

impl CalibrationConfig {
    /// `(min, max)` clamp bounds for the click distance.
    pub fn click_distance_bounds(&self) -> (f64, f64) {
        let min = self
            .min_click_distance
            .unwrap_or_else(|| self.estimator.default_min_click_distance());
        (min, self.max_click_distance)
    }
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            smoothing_window: 10,
            smoothing_activation: 5,
            smoothing_alpha: 0.3,
            interpolation_steps: 10,
            step_delay_ms: 5,
            poll_interval_ms: 10,
            stop_timeout_ms: 1000,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

impl Config {
    /// Validate config values are within acceptable ranges.
    /// Returns Ok(()) if valid, or Err with a description of the first invalid field.
    pub fn validate(&self) -> Result<(), crate::Error> {
        let t = &self.tracking;
        if !(0.0..1.0).contains(&t.active_zone_low) || !(t.active_zone_low < t.active_zone_high && t.active_zone_high <= 1.0) {
            return Err(crate::Error::Config(format!(
                "active zone must satisfy 0 <= low < high <= 1, got [{}, {}]",
                t.active_zone_low, t.active_zone_high
            )));
        }

        let durations = [
            ("tracking.no_hand_timeout_ms", t.no_hand_timeout_ms),
            ("gesture.drag_hold_ms", self.gesture.drag_hold_ms),
            ("gesture.debounce_ms", self.gesture.debounce_ms),
            ("gesture.click_cooldown_ms", self.gesture.click_cooldown_ms),
            ("calibration.prompt_apart_ms", self.calibration.prompt_apart_ms),
            ("calibration.measure_apart_ms", self.calibration.measure_apart_ms),
            ("calibration.prompt_together_ms", self.calibration.prompt_together_ms),
            ("calibration.measure_together_ms", self.calibration.measure_together_ms),
            ("motion.step_delay_ms", self.motion.step_delay_ms),
            ("motion.poll_interval_ms", self.motion.poll_interval_ms),
            ("motion.stop_timeout_ms", self.motion.stop_timeout_ms),
        ];
        if let Some((key, _)) = durations.iter().find(|(_, ms)| *ms == 0) {
            return Err(crate::Error::Config(format!("{} must be > 0", key)));
        }

        let (min, max) = self.calibration.click_distance_bounds();
        if !(min > 0.0 && min <= max) {
            return Err(crate::Error::Config(format!(
                "click distance bounds must satisfy 0 < min <= max, got [{}, {}]",
                min, max
            )));
        }

        let m = &self.motion;
        if m.smoothing_window == 0 {
            return Err(crate::Error::Config("smoothing_window must be >= 1".to_string()));
        }
        if m.smoothing_activation == 0 || m.smoothing_activation > m.smoothing_window {
            return Err(crate::Error::Config(format!(
                "smoothing_activation must be in [1, {}], got {}",
                m.smoothing_window, m.smoothing_activation
            )));
        }
        if !(m.smoothing_alpha > 0.0 && m.smoothing_alpha <= 1.0) {
            return Err(crate::Error::Config(format!(
                "smoothing_alpha must be in (0, 1], got {}",
                m.smoothing_alpha
            )));
        }
        if m.interpolation_steps == 0 {
            return Err(crate::Error::Config("interpolation_steps must be >= 1".to_string()));
        }

        if self.display.width == 0 || self.display.height == 0 {
            return Err(crate::Error::Config(format!(
                "display size must be non-zero, got {}x{}",
                self.display.width, self.display.height
            )));
        }
        Ok(())
    }

    /// Load config from file
    pub fn load(path: &Path) -> Result<Self, crate::Error> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from default location
    pub fn load_default() -> Result<Self, crate::Error> {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<(), crate::Error> {
        let content = self.to_toml()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".hand_pointer").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Generate TOML representation
    pub fn to_toml(&self) -> Result<String, crate::Error> {
        toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Look up a value by dotted key, e.g. `gesture.drag_hold_ms`.
    pub fn get(&self, key: &str) -> Result<toml::Value, crate::Error> {
        let root = toml::Value::try_from(self).map_err(|e| crate::Error::Config(e.to_string()))?;
        key.split('.')
            .try_fold(&root, |value, part| value.get(part))
            .cloned()
            .ok_or_else(|| crate::Error::Config(format!("unknown config key: {}", key)))
    }

    pub fn gesture_timing(&self) -> GestureTiming {
        GestureTiming {
            drag_hold: Duration::from_millis(self.gesture.drag_hold_ms),
            debounce: Duration::from_millis(self.gesture.debounce_ms),
            click_cooldown: Duration::from_millis(self.gesture.click_cooldown_ms),
            no_hand_timeout: Duration::from_millis(self.tracking.no_hand_timeout_ms),
        }
    }

    pub fn calibration_settings(&self) -> CalibrationSettings {
        let c = &self.calibration;
        let (min_click_distance, max_click_distance) = c.click_distance_bounds();
        CalibrationSettings {
            prompt_apart: Duration::from_millis(c.prompt_apart_ms),
            measure_apart: Duration::from_millis(c.measure_apart_ms),
            prompt_together: Duration::from_millis(c.prompt_together_ms),
            measure_together: Duration::from_millis(c.measure_together_ms),
            min_click_distance,
            max_click_distance,
            estimator: c.estimator,
        }
    }

    pub fn interpolator_settings(&self) -> InterpolatorSettings {
        InterpolatorSettings {
            steps: self.motion.interpolation_steps,
            step_delay: Duration::from_millis(self.motion.step_delay_ms),
            poll_interval: Duration::from_millis(self.motion.poll_interval_ms),
            stop_timeout: Duration::from_millis(self.motion.stop_timeout_ms),
        }
    }

    /// Settings for a controller session.
    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            calibration: self.calibration_settings(),
            pipeline: PipelineSettings {
                timing: self.gesture_timing(),
                zone: ActiveZone::new(self.tracking.active_zone_low, self.tracking.active_zone_high),
                geometry: MonitorGeometry::new(self.display.width, self.display.height),
                smoothing: SmoothingSettings {
                    window: self.motion.smoothing_window,
                    activation: self.motion.smoothing_activation,
                    alpha: self.motion.smoothing_alpha,
                },
            },
            interpolator: self.interpolator_settings(),
            ..ControllerSettings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.tracking.active_zone_low, 0.2);
        assert_eq!(config.gesture.drag_hold_ms, 200);
        assert_eq!(config.calibration.estimator, ThresholdEstimator::Extremes);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let toml = Config::default().to_toml().unwrap();
        for section in ["[tracking]", "[gesture]", "[calibration]", "[motion]", "[display]"] {
            assert!(toml.contains(section), "missing {}", section);
        }
        assert!(toml.contains("estimator = \"extremes\""));
    }

    #[test]
    fn test_default_path() {
        let path = Config::default_path();
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_config_save_and_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let mut original = Config::default();
        original.gesture.dragging_enabled = true;
        original.calibration.estimator = ThresholdEstimator::Percentile;
        original.motion.interpolation_steps = 20;

        original.save(&config_path).expect("Failed to save config");
        let loaded = Config::load(&config_path).expect("Failed to load config");
        assert_eq!(loaded, original);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("partial.toml");
        std::fs::write(&config_path, "[gesture]\ndrag_hold_ms = 350\n").unwrap();

        let loaded = Config::load(&config_path).unwrap();
        assert_eq!(loaded.gesture.drag_hold_ms, 350);
        assert_eq!(loaded.gesture.debounce_ms, 100);
        assert_eq!(loaded.motion, MotionConfig::default());
    }

    #[test]
    fn test_load_nonexistent_file() {
        let temp_dir = TempDir::new().unwrap();
        assert!(Config::load(&temp_dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_load_invalid_values() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("bad.toml");
        std::fs::write(&config_path, "[tracking]\nactive_zone_low = 0.9\nactive_zone_high = 0.1\n").unwrap();
        assert!(matches!(Config::load(&config_path), Err(crate::Error::Config(_))));
    }

    #[test]
    fn test_invalid_toml_parsing() {
        let result: Result<Config, _> = toml::from_str("this is not valid toml {{{}}}");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_zero_duration() {
        let mut config = Config::default();
        config.gesture.click_cooldown_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("gesture.click_cooldown_ms"));
    }

    #[test]
    fn test_validate_click_distance_bounds() {
        let mut config = Config::default();
        config.calibration.min_click_distance = Some(0.2);
        assert!(config.validate().is_err());
        config.calibration.min_click_distance = Some(0.15);
        assert!(config.validate().is_ok());
        config.calibration.min_click_distance = Some(0.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_click_distance_floor_follows_estimator() {
        let mut config = Config::default();
        assert_eq!(config.calibration_settings().min_click_distance, 0.04);

        config.calibration.estimator = ThresholdEstimator::Percentile;
        assert_eq!(config.calibration_settings().min_click_distance, 0.05);
        assert_eq!(config.calibration_settings().max_click_distance, 0.15);

        config.calibration.min_click_distance = Some(0.03);
        assert_eq!(config.calibration_settings().min_click_distance, 0.03);
    }

    #[test]
    fn test_percentile_from_toml_uses_own_floor() {
        let config: Config = toml::from_str("[calibration]\nestimator = \"percentile\"\n").unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.calibration.click_distance_bounds(), (0.05, 0.15));
    }

    #[test]
    fn test_validate_smoothing() {
        let mut config = Config::default();
        config.motion.smoothing_activation = 11;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.motion.smoothing_alpha = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.motion.smoothing_alpha = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zone_boundaries() {
        let mut config = Config::default();
        config.tracking.active_zone_low = 0.0;
        config.tracking.active_zone_high = 1.0;
        assert!(config.validate().is_ok());
        config.tracking.active_zone_high = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_display() {
        let mut config = Config::default();
        config.display.width = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_get_dotted_key() {
        let config = Config::default();
        assert_eq!(config.get("gesture.drag_hold_ms").unwrap(), toml::Value::Integer(200));
        assert_eq!(config.get("calibration.estimator").unwrap().as_str(), Some("extremes"));
        assert!(config.get("motion").unwrap().is_table());
        assert!(config.get("gesture.nope").is_err());
    }

    #[test]
    fn test_controller_settings_conversion() {
        let settings = Config::default().controller_settings();
        assert_eq!(settings.calibration, CalibrationSettings::default());
        assert_eq!(settings.pipeline.timing, GestureTiming::default());
        assert_eq!(settings.pipeline.smoothing, SmoothingSettings::default());
        assert_eq!(settings.interpolator, InterpolatorSettings::default());
        assert_eq!(settings.pipeline.geometry, MonitorGeometry::new(1920, 1080));
    }
}
