//! Active-zone coordinate mapping
//!
//! Only the central part of the camera's field of view is used for pointing,
//! so the user never has to reach the frame edges to reach the screen edges.

use serde::{Deserialize, Serialize};

/// Pixel position on the active monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MonitorTarget {
    pub x: i32,
    pub y: i32,
}

impl MonitorTarget {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Size of the active monitor in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MonitorGeometry {
    pub width: u32,
    pub height: u32,
}

impl MonitorGeometry {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> MonitorTarget {
        MonitorTarget::new((self.width / 2) as i32, (self.height / 2) as i32)
    }
}

/// Normalized sub-range mapped onto the full display, applied per axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActiveZone {
    pub low: f64,
    pub high: f64,
}

impl Default for ActiveZone {
    fn default() -> Self {
        Self { low: 0.2, high: 0.8 }
    }
}

impl ActiveZone {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// Map one normalized coordinate to a fraction of the display.
    pub fn map(&self, v: f64) -> f64 {
        map_axis(v, self.low, self.high)
    }
}

/// Clamp `v` to `[low, high]` and rescale linearly to `[0, 1]`.
pub fn map_axis(v: f64, low: f64, high: f64) -> f64 {
    if high <= low {
        return 0.0;
    }
    (v.clamp(low, high) - low) / (high - low)
}

/// Map a normalized landmark position to a monitor pixel.
///
/// Pixels are rounded, not truncated, so `0.5` lands on the exact center
/// despite the rounding error of the rescale.
pub fn map_to_monitor(x: f64, y: f64, zone: &ActiveZone, geometry: MonitorGeometry) -> MonitorTarget {
    MonitorTarget::new(
        (zone.map(x) * geometry.width as f64).round() as i32,
        (zone.map(y) * geometry.height as f64).round() as i32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_axis_bounds() {
        assert_eq!(map_axis(0.1, 0.2, 0.8), 0.0);
        assert_eq!(map_axis(0.8, 0.2, 0.8), 1.0);
        assert!((map_axis(0.5, 0.2, 0.8) - 0.5).abs() < 1e-12);
        assert_eq!(map_axis(0.95, 0.2, 0.8), 1.0);
        assert_eq!(map_axis(-1.0, 0.2, 0.8), 0.0);
    }

    #[test]
    fn test_map_axis_degenerate_zone() {
        assert_eq!(map_axis(0.5, 0.5, 0.5), 0.0);
    }

    #[test]
    fn test_map_to_monitor() {
        let zone = ActiveZone::default();
        let geometry = MonitorGeometry::new(1920, 1080);
        assert_eq!(map_to_monitor(0.5, 0.5, &zone, geometry), MonitorTarget::new(960, 540));
        assert_eq!(map_to_monitor(0.0, 1.0, &zone, geometry), MonitorTarget::new(0, 1080));
        assert_eq!(map_to_monitor(0.35, 0.2, &zone, geometry), MonitorTarget::new(480, 0));
    }

    #[test]
    fn test_geometry_center() {
        assert_eq!(MonitorGeometry::new(1920, 1080).center(), MonitorTarget::new(960, 540));
    }
}
