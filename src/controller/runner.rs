//! Controller
//!
//! Owns the session lifecycle: the `frame-loop` worker, which pulls frames,
//! feeds the detector and runs calibration and then run mode, and the
//! `pointer-interpolator` worker. Stopping is cooperative; the frame source
//! and detector are released only after both workers have exited.

use super::events::{ControllerEvent, ControllerStats, StatsSnapshot};
use super::mode::{AtomicMode, ControlToggles, Mode, SessionPlan};
use super::pipeline::{FramePipeline, PipelineSettings};
use crate::gesture::{
    ButtonCommand, CalibrationOutcome, CalibrationSession, CalibrationSettings, CalibrationStatus,
    ClickDistance,
};
use crate::motion::{InterpolatorSettings, PointerInterpolator, TargetHandle};
use crate::pointer::{MouseButton, PointerSink};
use crate::tracking::{DetectionCell, Frame, FrameSource, HandSnapshot, LandmarkDetector};
use crate::{Error, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Everything the controller needs to know up front.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerSettings {
    pub calibration: CalibrationSettings,
    /// Run-mode settings; the geometry is replaced by the pointer's own when it reports one
    pub pipeline: PipelineSettings,
    pub interpolator: InterpolatorSettings,
    /// Pause after an iteration where the source had no frame
    pub skip_backoff: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            calibration: CalibrationSettings::default(),
            pipeline: PipelineSettings::default(),
            interpolator: InterpolatorSettings::default(),
            skip_backoff: Duration::from_millis(1),
        }
    }
}

/// The external collaborators a controller drives.
pub struct Collaborators {
    pub source: Box<dyn FrameSource>,
    pub detector: Box<dyn LandmarkDetector>,
    /// Cell the detector publishes into
    pub results: DetectionCell,
    pub pointer: Arc<dyn PointerSink>,
}

/// Cloneable handle that asks a running controller to stop, e.g. from a signal handler.
#[derive(Clone)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn request_stop(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// What the frame loop hands back when it exits.
struct LoopExit {
    source: Box<dyn FrameSource>,
    detector: Box<dyn LandmarkDetector>,
    result: Result<()>,
}

/// Session lifecycle owner.
pub struct Controller {
    settings: ControllerSettings,
    plan: SessionPlan,
    pointer: Arc<dyn PointerSink>,
    results: DetectionCell,
    pending: Option<(Box<dyn FrameSource>, Box<dyn LandmarkDetector>)>,
    mode: Arc<AtomicMode>,
    toggles: Arc<ControlToggles>,
    running: Arc<AtomicBool>,
    loop_finished: Arc<AtomicBool>,
    stats: Arc<ControllerStats>,
    calibration: Arc<Mutex<Option<CalibrationOutcome>>>,
    events_tx: Sender<ControllerEvent>,
    events_rx: Option<Receiver<ControllerEvent>>,
    frame_loop: Option<JoinHandle<LoopExit>>,
    interpolator: Option<PointerInterpolator>,
}

impl Controller {
    pub fn new(
        settings: ControllerSettings,
        plan: SessionPlan,
        collaborators: Collaborators,
        toggles: ControlToggles,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        Self {
            settings,
            plan,
            pointer: collaborators.pointer,
            results: collaborators.results,
            pending: Some((collaborators.source, collaborators.detector)),
            mode: Arc::new(AtomicMode::new(plan.initial_mode())),
            toggles: Arc::new(toggles),
            running: Arc::new(AtomicBool::new(false)),
            loop_finished: Arc::new(AtomicBool::new(false)),
            stats: Arc::new(ControllerStats::default()),
            calibration: Arc::new(Mutex::new(None)),
            events_tx,
            events_rx: Some(events_rx),
            frame_loop: None,
            interpolator: None,
        }
    }

    /// Take the event receiver. Returns `None` after the first call.
    pub fn take_events(&mut self) -> Option<Receiver<ControllerEvent>> {
        self.events_rx.take()
    }

    pub fn mode(&self) -> Mode {
        self.mode.load()
    }

    pub fn toggles(&self) -> Arc<ControlToggles> {
        Arc::clone(&self.toggles)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(Arc::clone(&self.running))
    }

    /// Outcome of this session's calibration, once it has completed.
    pub fn calibration(&self) -> Option<CalibrationOutcome> {
        self.calibration.lock().clone()
    }

    /// Whether the frame loop is alive and has not been asked to stop.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst) && !self.loop_finished.load(Ordering::SeqCst)
    }

    /// Spawn the interpolator and the frame loop.
    ///
    /// A controller can only be started once.
    pub fn start(&mut self) -> Result<()> {
        let Some((source, detector)) = self.pending.take() else {
            return Err(Error::Controller("controller already started".into()));
        };

        let mut pipeline = self.settings.pipeline.clone();
        if let Some(geometry) = self.pointer.display_geometry() {
            pipeline.geometry = geometry;
        }

        let interpolator =
            PointerInterpolator::start(Arc::clone(&self.pointer), self.settings.interpolator)?;
        self.running.store(true, Ordering::SeqCst);

        let frame_loop = FrameLoop {
            source,
            detector,
            results: Arc::clone(&self.results),
            pointer: Arc::clone(&self.pointer),
            targets: interpolator.target_handle(),
            mode: Arc::clone(&self.mode),
            toggles: Arc::clone(&self.toggles),
            running: Arc::clone(&self.running),
            stats: Arc::clone(&self.stats),
            calibration: Arc::clone(&self.calibration),
            events: self.events_tx.clone(),
            plan: self.plan,
            calibration_settings: self.settings.calibration.clone(),
            pipeline,
            skip_backoff: self.settings.skip_backoff,
            last_status: None,
        };
        self.interpolator = Some(interpolator);

        let finished = Arc::clone(&self.loop_finished);
        let handle = thread::Builder::new()
            .name("frame-loop".into())
            .spawn(move || {
                let exit = frame_loop.run();
                finished.store(true, Ordering::SeqCst);
                exit
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                Error::Controller(format!("Failed to spawn frame loop: {}", e))
            })?;
        self.frame_loop = Some(handle);

        info!(mode = self.mode().as_str(), "Controller started");
        Ok(())
    }

    /// Ask the workers to stop and shut down.
    ///
    /// Returns the frame loop's fatal error, if it had one.
    pub fn stop(&mut self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);
        self.shutdown()
    }

    /// Block until the frame loop ends on its own, then shut down.
    pub fn wait(&mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        let Some(handle) = self.frame_loop.take() else {
            return Ok(());
        };

        let exit = handle.join();
        self.running.store(false, Ordering::SeqCst);

        if let Some(mut interpolator) = self.interpolator.take() {
            if let Err(e) = interpolator.stop() {
                warn!(error = %e, "Interpolator shutdown incomplete");
            }
        }

        let result = match exit {
            Ok(LoopExit {
                mut source,
                mut detector,
                result,
            }) => {
                source.release();
                detector.close();
                result
            }
            Err(_) => Err(Error::Controller("frame loop panicked".into())),
        };

        let stats = self.stats.snapshot();
        info!(
            frames = stats.frames_processed,
            skipped = stats.frames_skipped,
            without_hand = stats.frames_without_hand,
            clicks = stats.clicks,
            presses = stats.presses,
            releases = stats.releases,
            injection_failures = stats.injection_failures,
            "Controller stopped"
        );
        result
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// State owned by the `frame-loop` worker.
struct FrameLoop {
    source: Box<dyn FrameSource>,
    detector: Box<dyn LandmarkDetector>,
    results: DetectionCell,
    pointer: Arc<dyn PointerSink>,
    targets: TargetHandle,
    mode: Arc<AtomicMode>,
    toggles: Arc<ControlToggles>,
    running: Arc<AtomicBool>,
    stats: Arc<ControllerStats>,
    calibration: Arc<Mutex<Option<CalibrationOutcome>>>,
    events: Sender<ControllerEvent>,
    plan: SessionPlan,
    calibration_settings: CalibrationSettings,
    pipeline: PipelineSettings,
    skip_backoff: Duration,
    last_status: Option<String>,
}

impl FrameLoop {
    fn run(mut self) -> LoopExit {
        let result = match self.drive() {
            Err(e) if e.is_graceful_end() => {
                info!("Frame source closed");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Frame loop failed");
                self.emit(ControllerEvent::Fatal(e.to_string()));
                Err(e)
            }
            Ok(()) => Ok(()),
        };
        LoopExit {
            source: self.source,
            detector: self.detector,
            result,
        }
    }

    fn drive(&mut self) -> Result<()> {
        let click_distance = match self.plan {
            SessionPlan::Run(click_distance) => click_distance,
            SessionPlan::CalibrateOnly | SessionPlan::CalibrateThenRun => {
                self.enter(Mode::Calibrating);
                let Some(outcome) = self.calibrate()? else {
                    return Ok(());
                };
                if self.plan == SessionPlan::CalibrateOnly {
                    return Ok(());
                }
                outcome.click_distance
            }
        };

        self.enter(Mode::Running);
        info!(click_distance = click_distance.value(), "Run mode started");

        let mut pipeline = None;
        let result = self.run_mode(click_distance, &mut pipeline);
        if let Some(pipeline) = pipeline.as_mut() {
            self.apply_button(pipeline.release_held());
        }
        result
    }

    fn enter(&self, mode: Mode) {
        if self.mode.swap(mode) != mode {
            debug!(mode = mode.as_str(), "Mode changed");
        }
        self.emit(ControllerEvent::ModeChanged(mode));
    }

    /// Run a calibration session to completion; `None` if stopped first.
    fn calibrate(&mut self) -> Result<Option<CalibrationOutcome>> {
        let mut session = CalibrationSession::new(self.calibration_settings.clone());
        info!(total_secs = self.calibration_settings.total().as_secs_f64(), "Calibration started");

        while self.running.load(Ordering::SeqCst) {
            let Some(frame) = self.pull_frame()? else {
                continue;
            };
            let distance = self.current_hand().map(|hand| hand.pinch_distance());

            match session.observe(distance, frame.captured_at)? {
                CalibrationStatus::InProgress { prompt, .. } => self.status(prompt),
                CalibrationStatus::Done(outcome) => {
                    *self.calibration.lock() = Some(outcome.clone());
                    self.emit(ControllerEvent::CalibrationCompleted(outcome.clone()));
                    self.status(format!(
                        "Calibration complete. Click distance: {}",
                        outcome.click_distance
                    ));
                    return Ok(Some(outcome));
                }
            }
        }

        info!(phase = session.phase().as_str(), "Calibration aborted");
        Ok(None)
    }

    fn run_mode(
        &mut self,
        click_distance: ClickDistance,
        pipeline: &mut Option<FramePipeline>,
    ) -> Result<()> {
        let mut last_gesture = None;

        while self.running.load(Ordering::SeqCst) {
            let Some(frame) = self.pull_frame()? else {
                continue;
            };
            let now = frame.captured_at;
            let pipeline = pipeline
                .get_or_insert_with(|| FramePipeline::new(click_distance, &self.pipeline, now));

            let detection = self.results.latest();
            let outcome = pipeline.process(detection.as_deref(), now, self.toggles.policy());

            if outcome.distance.is_none() {
                ControllerStats::bump(&self.stats.frames_without_hand);
            }
            if outcome.decision.hand_lost {
                self.emit(ControllerEvent::HandLost);
            }
            if let Some(target) = outcome.target {
                self.targets.set_target(target);
            }
            self.apply_button(outcome.decision.button);

            let gesture = (outcome.decision.action, outcome.decision.contact);
            if last_gesture != Some(gesture) {
                last_gesture = Some(gesture);
                self.emit(ControllerEvent::Gesture {
                    action: gesture.0,
                    contact: gesture.1,
                });
            }
        }
        Ok(())
    }

    /// Pull one frame and hand it to the detector.
    ///
    /// `Ok(None)` means skip this iteration.
    fn pull_frame(&mut self) -> Result<Option<Frame>> {
        let frame = match self.source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                ControllerStats::bump(&self.stats.frames_skipped);
                thread::sleep(self.skip_backoff);
                return Ok(None);
            }
            // Not counted as skipped; the source already waited its slice
            Err(Error::FrameNotReady) => return Ok(None),
            Err(Error::FrameSource(message)) => {
                warn!(%message, "Frame read failed; retrying");
                ControllerStats::bump(&self.stats.frames_skipped);
                thread::sleep(self.skip_backoff);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        // A detector failure only means no fresh result for this frame
        if let Err(e) = self.detector.submit(&frame) {
            warn!(error = %e, sequence = frame.sequence, "Detector rejected frame");
        }
        ControllerStats::bump(&self.stats.frames_processed);
        Ok(Some(frame))
    }

    fn current_hand(&self) -> Option<HandSnapshot> {
        let hand = self.results.latest().and_then(|result| result.primary_hand());
        if hand.is_none() {
            ControllerStats::bump(&self.stats.frames_without_hand);
        }
        hand
    }

    fn apply_button(&self, command: ButtonCommand) {
        let result = match command {
            ButtonCommand::None => return,
            ButtonCommand::Click => {
                ControllerStats::bump(&self.stats.clicks);
                self.pointer.click(MouseButton::Left, 1)
            }
            ButtonCommand::Press => {
                ControllerStats::bump(&self.stats.presses);
                self.pointer.press(MouseButton::Left)
            }
            ButtonCommand::Release => {
                ControllerStats::bump(&self.stats.releases);
                self.pointer.release(MouseButton::Left)
            }
        };

        if let Err(e) = result {
            ControllerStats::bump(&self.stats.injection_failures);
            warn!(error = %e, ?command, "Pointer injection failed");
            self.emit(ControllerEvent::InjectionWarning(e.to_string()));
        }
    }

    fn status(&mut self, text: String) {
        if self.last_status.as_deref() == Some(text.as_str()) {
            return;
        }
        self.last_status = Some(text.clone());
        self.emit(ControllerEvent::Status(text));
    }

    fn emit(&self, event: ControllerEvent) {
        // Nobody listening is fine
        let _ = self.events.send(event);
    }
}
