//! Motion control
//!
//! Normalized fingertip position to on-screen cursor motion: active-zone
//! mapping, trailing-window smoothing and the background interpolation worker.

pub mod interpolator;
pub mod mapper;
pub mod smoothing;

pub use interpolator::{
    ease_out, InterpolatorSettings, InterpolatorStats, PointerInterpolator, TargetHandle,
};
pub use mapper::{map_axis, map_to_monitor, ActiveZone, MonitorGeometry, MonitorTarget};
pub use smoothing::{SmoothingBuffer, SmoothingSettings};
