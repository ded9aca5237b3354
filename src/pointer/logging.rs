//! Dry-run pointer backend
//!
//! Records commands instead of touching the OS cursor and keeps a virtual
//! cursor position so the interpolator can resynchronize against it. The log
//! keeps only the newest commands; totals are counted separately.

use super::{InjectionError, InjectionResult, MouseButton, PointerSink};
use crate::motion::{MonitorGeometry, MonitorTarget};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, trace};

/// A command received by [`LoggingPointer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerCommand {
    MoveTo { x: i32, y: i32 },
    Click { button: MouseButton, count: u32 },
    Press(MouseButton),
    Release(MouseButton),
}

/// Commands kept by default before the oldest are evicted.
pub const DEFAULT_LOG_LIMIT: usize = 4096;

#[derive(Debug)]
struct Inner {
    position: MonitorTarget,
    commands: VecDeque<PointerCommand>,
    limit: usize,
    /// Accepted moves, including evicted ones
    moves: usize,
    evicted: usize,
}

/// Pointer sink that logs instead of injecting.
#[derive(Debug)]
pub struct LoggingPointer {
    geometry: MonitorGeometry,
    inner: Mutex<Inner>,
    rejecting: AtomicBool,
}

impl LoggingPointer {
    /// Create a sink for a display of the given size, cursor at the origin.
    pub fn new(geometry: MonitorGeometry) -> Self {
        Self {
            geometry,
            inner: Mutex::new(Inner {
                position: MonitorTarget::default(),
                commands: VecDeque::new(),
                limit: DEFAULT_LOG_LIMIT,
                moves: 0,
                evicted: 0,
            }),
            rejecting: AtomicBool::new(false),
        }
    }

    /// Start the virtual cursor somewhere else.
    pub fn with_position(self, position: MonitorTarget) -> Self {
        self.inner.lock().position = position;
        self
    }

    /// Keep at most `limit` commands in the log (at least one).
    pub fn with_log_limit(self, limit: usize) -> Self {
        self.inner.lock().limit = limit.max(1);
        self
    }

    /// Make every following command fail with [`InjectionError::Rejected`].
    pub fn set_rejecting(&self, rejecting: bool) {
        self.rejecting.store(rejecting, Ordering::SeqCst);
    }

    /// Move the virtual cursor without recording a command, as if the user
    /// had grabbed the physical mouse.
    pub fn warp_to(&self, position: MonitorTarget) {
        self.inner.lock().position = position;
    }

    /// Snapshot of the logged commands, oldest first.
    pub fn commands(&self) -> Vec<PointerCommand> {
        self.inner.lock().commands.iter().copied().collect()
    }

    /// Commands dropped from the front of the log.
    pub fn evicted(&self) -> usize {
        self.inner.lock().evicted
    }

    /// Accepted button commands only (moves filtered out).
    pub fn button_commands(&self) -> Vec<PointerCommand> {
        self.inner
            .lock()
            .commands
            .iter()
            .filter(|c| !matches!(c, PointerCommand::MoveTo { .. }))
            .copied()
            .collect()
    }

    /// Accepted moves since creation or the last [`clear`](Self::clear).
    pub fn move_count(&self) -> usize {
        self.inner.lock().moves
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.commands.clear();
        inner.moves = 0;
        inner.evicted = 0;
    }

    fn record(&self, command: PointerCommand) -> InjectionResult<()> {
        if self.rejecting.load(Ordering::SeqCst) {
            return Err(InjectionError::Rejected(format!("{:?}", command)));
        }
        let mut inner = self.inner.lock();
        if let PointerCommand::MoveTo { x, y } = command {
            inner.position = MonitorTarget::new(x, y);
            inner.moves += 1;
            trace!(x, y, "Pointer move");
        } else {
            debug!(?command, "Pointer button");
        }
        if inner.commands.len() >= inner.limit {
            inner.commands.pop_front();
            inner.evicted += 1;
        }
        inner.commands.push_back(command);
        Ok(())
    }
}

impl PointerSink for LoggingPointer {
    fn move_to(&self, x: i32, y: i32) -> InjectionResult<()> {
        self.record(PointerCommand::MoveTo { x, y })
    }

    fn click(&self, button: MouseButton, count: u32) -> InjectionResult<()> {
        self.record(PointerCommand::Click { button, count })
    }

    fn press(&self, button: MouseButton) -> InjectionResult<()> {
        self.record(PointerCommand::Press(button))
    }

    fn release(&self, button: MouseButton) -> InjectionResult<()> {
        self.record(PointerCommand::Release(button))
    }

    fn position(&self) -> InjectionResult<MonitorTarget> {
        Ok(self.inner.lock().position)
    }

    fn display_geometry(&self) -> Option<MonitorGeometry> {
        Some(self.geometry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pointer() -> LoggingPointer {
        LoggingPointer::new(MonitorGeometry::new(1920, 1080))
    }

    #[test]
    fn test_records_commands_in_order() {
        let p = pointer();
        p.move_to(10, 20).unwrap();
        p.press(MouseButton::Left).unwrap();
        p.release(MouseButton::Left).unwrap();
        p.click(MouseButton::Left, 1).unwrap();

        assert_eq!(
            p.commands(),
            vec![
                PointerCommand::MoveTo { x: 10, y: 20 },
                PointerCommand::Press(MouseButton::Left),
                PointerCommand::Release(MouseButton::Left),
                PointerCommand::Click { button: MouseButton::Left, count: 1 },
            ]
        );
        assert_eq!(p.button_commands().len(), 3);
        assert_eq!(p.move_count(), 1);
    }

    #[test]
    fn test_moves_update_position() {
        let p = pointer().with_position(MonitorTarget::new(5, 5));
        assert_eq!(p.position().unwrap(), MonitorTarget::new(5, 5));
        p.move_to(300, 400).unwrap();
        assert_eq!(p.position().unwrap(), MonitorTarget::new(300, 400));
    }

    #[test]
    fn test_warp_is_not_recorded() {
        let p = pointer();
        p.warp_to(MonitorTarget::new(50, 60));
        assert_eq!(p.position().unwrap(), MonitorTarget::new(50, 60));
        assert!(p.commands().is_empty());
    }

    #[test]
    fn test_rejecting_fails_without_recording() {
        let p = pointer();
        p.set_rejecting(true);
        assert!(matches!(p.click(MouseButton::Left, 1), Err(InjectionError::Rejected(_))));
        assert!(p.move_to(1, 1).is_err());
        assert!(p.commands().is_empty());
        assert_eq!(p.position().unwrap(), MonitorTarget::default());

        p.set_rejecting(false);
        assert!(p.click(MouseButton::Left, 1).is_ok());
    }

    #[test]
    fn test_log_is_bounded() {
        let p = pointer().with_log_limit(3);
        for x in 0..5 {
            p.move_to(x, 0).unwrap();
        }
        p.click(MouseButton::Left, 1).unwrap();

        assert_eq!(
            p.commands(),
            vec![
                PointerCommand::MoveTo { x: 3, y: 0 },
                PointerCommand::MoveTo { x: 4, y: 0 },
                PointerCommand::Click { button: MouseButton::Left, count: 1 },
            ]
        );
        assert_eq!(p.evicted(), 3);
        assert_eq!(p.move_count(), 5);
        assert_eq!(p.position().unwrap(), MonitorTarget::new(4, 0));

        p.clear();
        assert_eq!(p.move_count(), 0);
        assert!(p.commands().is_empty());
    }

    #[test]
    fn test_reports_configured_geometry() {
        assert_eq!(pointer().display_geometry(), Some(MonitorGeometry::new(1920, 1080)));
    }
}
