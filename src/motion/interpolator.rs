//! Pointer Interpolator
//!
//! A background worker that owns the "last known real position" of the cursor
//! and animates it toward the newest requested target:
//!
//! - `set_target` overwrites any target the worker has not picked up yet
//! - Each animation runs a fixed number of ease-out steps with a fixed delay
//! - While idle, the position is resynchronized from the device so external
//!   cursor moves are tolerated
//! - `stop` is cooperative and waits a bounded time for the worker to exit

use super::mapper::MonitorTarget;
use crate::pointer::PointerSink;
use crate::tracking::LatestSlot;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Animation and lifecycle timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterpolatorSettings {
    /// Moves per animation
    pub steps: u32,
    /// Sleep after each move
    pub step_delay: Duration,
    /// Longest idle wait for a new target
    pub poll_interval: Duration,
    /// Longest wait for the worker to exit in `stop`
    pub stop_timeout: Duration,
}

impl Default for InterpolatorSettings {
    fn default() -> Self {
        Self {
            steps: 10,
            step_delay: Duration::from_millis(5),
            poll_interval: Duration::from_millis(10),
            stop_timeout: Duration::from_secs(1),
        }
    }
}

/// Worker counters.
#[derive(Debug, Default)]
pub struct InterpolatorStats {
    pub animations_completed: AtomicU64,
    /// Animations cut short by `stop`
    pub animations_aborted: AtomicU64,
    pub move_failures: AtomicU64,
    pub resyncs: AtomicU64,
}

/// Ease-out curve: fast start, decelerating into the target.
pub fn ease_out(t: f64) -> f64 {
    1.0 - (1.0 - t).powi(2)
}

fn lerp(from: MonitorTarget, to: MonitorTarget, t: f64) -> MonitorTarget {
    let x = from.x as f64 + (to.x - from.x) as f64 * t;
    let y = from.y as f64 + (to.y - from.y) as f64 * t;
    MonitorTarget::new(x.round() as i32, y.round() as i32)
}

/// Cloneable handle for feeding targets to a running interpolator.
#[derive(Clone)]
pub struct TargetHandle {
    pending: Arc<LatestSlot<MonitorTarget>>,
    running: Arc<AtomicBool>,
}

impl TargetHandle {
    /// Request a move to `target`, replacing any target not yet picked up.
    ///
    /// Ignored once the interpolator is stopping.
    pub fn set_target(&self, target: MonitorTarget) {
        if self.running.load(Ordering::SeqCst) {
            self.pending.publish(target);
        }
    }
}

/// Background cursor animation worker.
pub struct PointerInterpolator {
    pending: Arc<LatestSlot<MonitorTarget>>,
    running: Arc<AtomicBool>,
    stats: Arc<InterpolatorStats>,
    settings: InterpolatorSettings,
    thread_handle: Option<JoinHandle<()>>,
    done: Option<Receiver<()>>,
}

impl PointerInterpolator {
    /// Spawn the `pointer-interpolator` worker.
    pub fn start(pointer: Arc<dyn PointerSink>, settings: InterpolatorSettings) -> crate::Result<Self> {
        let pending = Arc::new(LatestSlot::new());
        let running = Arc::new(AtomicBool::new(true));
        let stats = Arc::new(InterpolatorStats::default());
        let (done_tx, done_rx) = mpsc::channel();

        let worker = Worker {
            pointer,
            pending: Arc::clone(&pending),
            running: Arc::clone(&running),
            stats: Arc::clone(&stats),
            settings,
        };

        let handle = thread::Builder::new()
            .name("pointer-interpolator".into())
            .spawn(move || {
                worker.run();
                let _ = done_tx.send(());
            })
            .map_err(|e| {
                crate::Error::Interpolator(format!("Failed to spawn interpolator thread: {}", e))
            })?;

        info!(steps = settings.steps, step_delay_ms = settings.step_delay.as_millis() as u64, "Pointer interpolator started");

        Ok(Self {
            pending,
            running,
            stats,
            settings,
            thread_handle: Some(handle),
            done: Some(done_rx),
        })
    }

    /// Request a move to `target`, replacing any target not yet picked up.
    pub fn set_target(&self, target: MonitorTarget) {
        self.target_handle().set_target(target);
    }

    pub fn target_handle(&self) -> TargetHandle {
        TargetHandle {
            pending: Arc::clone(&self.pending),
            running: Arc::clone(&self.running),
        }
    }

    /// Whether a target is waiting for the worker.
    pub fn has_pending(&self) -> bool {
        self.pending.is_pending()
    }

    /// Targets replaced before the worker picked them up.
    pub fn overwritten_targets(&self) -> u64 {
        self.pending.stats().overwritten.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> &InterpolatorStats {
        &self.stats
    }

    pub fn settings(&self) -> &InterpolatorSettings {
        &self.settings
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop the worker and wait up to `stop_timeout` for it to exit.
    ///
    /// An animation in progress is abandoned at the next step. If the worker
    /// does not exit in time it is detached and an error is returned.
    pub fn stop(&mut self) -> crate::Result<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        self.pending.clear();
        self.pending.wake_all();

        let exited = match self.done.take() {
            // A disconnected channel means the worker is gone as well
            Some(done) => !matches!(
                done.recv_timeout(self.settings.stop_timeout),
                Err(mpsc::RecvTimeoutError::Timeout)
            ),
            None => true,
        };

        let handle = self.thread_handle.take();
        if !exited {
            warn!(timeout_ms = self.settings.stop_timeout.as_millis() as u64, "Pointer interpolator did not stop in time; detaching");
            return Err(crate::Error::Interpolator(
                "worker did not exit before the stop timeout".into(),
            ));
        }
        if let Some(handle) = handle {
            let _ = handle.join();
        }

        info!(
            completed = self.stats.animations_completed.load(Ordering::Relaxed),
            aborted = self.stats.animations_aborted.load(Ordering::Relaxed),
            "Pointer interpolator stopped"
        );
        Ok(())
    }
}

impl Drop for PointerInterpolator {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

struct Worker {
    pointer: Arc<dyn PointerSink>,
    pending: Arc<LatestSlot<MonitorTarget>>,
    running: Arc<AtomicBool>,
    stats: Arc<InterpolatorStats>,
    settings: InterpolatorSettings,
}

impl Worker {
    fn run(&self) {
        let mut current = self.device_position().unwrap_or_default();
        let mut failing = false;

        while self.running.load(Ordering::SeqCst) {
            match self.pending.wait_take(self.settings.poll_interval) {
                Some(target) => {
                    if !self.running.load(Ordering::SeqCst) {
                        break;
                    }
                    current = self.animate(current, *target, &mut failing);
                }
                None => {
                    if let Some(position) = self.device_position() {
                        if position != current {
                            debug!(x = position.x, y = position.y, "Cursor moved externally; resynchronized");
                        }
                        current = position;
                        self.stats.resyncs.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
        }
    }

    /// Animate from `from` to `to`; returns where the cursor was left.
    fn animate(&self, from: MonitorTarget, to: MonitorTarget, failing: &mut bool) -> MonitorTarget {
        let steps = self.settings.steps.max(1);
        let mut reached = from;

        for step in 1..=steps {
            if !self.running.load(Ordering::SeqCst) {
                self.stats.animations_aborted.fetch_add(1, Ordering::Relaxed);
                return reached;
            }

            // The last step lands exactly on the target
            let point = if step == steps {
                to
            } else {
                lerp(from, to, ease_out(step as f64 / steps as f64))
            };

            match self.pointer.move_to(point.x, point.y) {
                Ok(()) => *failing = false,
                Err(e) => {
                    self.stats.move_failures.fetch_add(1, Ordering::Relaxed);
                    if !*failing {
                        warn!(error = %e, "Pointer move failed");
                    }
                    *failing = true;
                }
            }
            reached = point;
            if step == steps {
                self.stats.animations_completed.fetch_add(1, Ordering::Relaxed);
            }

            if !self.settings.step_delay.is_zero() {
                thread::sleep(self.settings.step_delay);
            }
        }

        to
    }

    fn device_position(&self) -> Option<MonitorTarget> {
        self.pointer.position().ok()
    }
}
