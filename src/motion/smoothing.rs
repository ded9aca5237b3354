//! Trailing-window smoothing
//!
//! Keeps the last few raw mapped targets and blends them with an exponential
//! fold that is recomputed from the window on every call. History older than
//! the window has no influence at all.

use super::mapper::MonitorTarget;
use std::collections::VecDeque;

/// Window parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothingSettings {
    /// Maximum number of raw samples kept
    pub window: usize,
    /// Samples needed before blending starts
    pub activation: usize,
    /// Weight of each newer sample in the fold (lower is smoother)
    pub alpha: f64,
}

impl Default for SmoothingSettings {
    fn default() -> Self {
        Self {
            window: 10,
            activation: 5,
            alpha: 0.3,
        }
    }
}

/// Bounded FIFO of raw targets with a window-local exponential blend.
#[derive(Debug, Clone)]
pub struct SmoothingBuffer {
    settings: SmoothingSettings,
    samples: VecDeque<MonitorTarget>,
}

impl SmoothingBuffer {
    pub fn new(settings: SmoothingSettings) -> Self {
        let window = settings.window.max(1);
        Self {
            settings: SmoothingSettings { window, ..settings },
            samples: VecDeque::with_capacity(window),
        }
    }

    pub fn settings(&self) -> &SmoothingSettings {
        &self.settings
    }

    /// Add a raw target and return the point to send downstream.
    ///
    /// Below the activation count the raw point passes through unchanged.
    pub fn push(&mut self, raw: MonitorTarget) -> MonitorTarget {
        if self.samples.len() == self.settings.window {
            self.samples.pop_front();
        }
        self.samples.push_back(raw);
        self.smoothed().unwrap_or(raw)
    }

    /// Blend of the current window, or `None` below the activation count.
    pub fn smoothed(&self) -> Option<MonitorTarget> {
        if self.samples.len() < self.settings.activation {
            return None;
        }
        let mut iter = self.samples.iter();
        let first = iter.next()?;
        let alpha = self.settings.alpha;
        let (x, y) = iter.fold((first.x as f64, first.y as f64), |(sx, sy), s| {
            (
                alpha * s.x as f64 + (1.0 - alpha) * sx,
                alpha * s.y as f64 + (1.0 - alpha) * sy,
            )
        });
        Some(MonitorTarget::new(x.round() as i32, y.round() as i32))
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

impl Default for SmoothingBuffer {
    fn default() -> Self {
        Self::new(SmoothingSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(x: i32) -> MonitorTarget {
        MonitorTarget::new(x, x)
    }

    #[test]
    fn test_passthrough_below_activation() {
        let mut buffer = SmoothingBuffer::default();
        for x in [0, 100, 200, 300] {
            assert_eq!(buffer.push(t(x)), t(x));
        }
        assert!(buffer.smoothed().is_none());
    }

    #[test]
    fn test_blend_at_activation() {
        let mut buffer = SmoothingBuffer::default();
        for x in [0, 0, 0, 0] {
            buffer.push(t(x));
        }
        // Seeded with 0, one step of 0.3 * 100
        assert_eq!(buffer.push(t(100)), t(30));
    }

    #[test]
    fn test_window_is_bounded() {
        let mut buffer = SmoothingBuffer::default();
        for _ in 0..50 {
            buffer.push(t(1000));
        }
        assert_eq!(buffer.len(), 10);
        // Ten samples of the new value push the old history out entirely
        for _ in 0..10 {
            buffer.push(t(0));
        }
        assert_eq!(buffer.smoothed(), Some(t(0)));
    }

    #[test]
    fn test_fold_is_recomputed_from_window() {
        let mut buffer = SmoothingBuffer::new(SmoothingSettings {
            window: 3,
            activation: 1,
            alpha: 0.5,
        });
        buffer.push(t(1000));
        buffer.push(t(0));
        buffer.push(t(0));
        buffer.push(t(0));
        // The 1000 sample fell out of the window
        assert_eq!(buffer.smoothed(), Some(t(0)));
    }

    #[test]
    fn test_steady_input_is_unchanged() {
        let mut buffer = SmoothingBuffer::default();
        for _ in 0..12 {
            assert_eq!(buffer.push(MonitorTarget::new(640, 360)), MonitorTarget::new(640, 360));
        }
    }

    #[test]
    fn test_clear() {
        let mut buffer = SmoothingBuffer::default();
        buffer.push(t(5));
        buffer.clear();
        assert!(buffer.is_empty());
    }
}
