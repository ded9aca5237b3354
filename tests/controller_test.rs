//! Integration tests for the controller lifecycle
//!
//! Tracks are replayed on their own clock (frame `n` at `n * 20ms`), so every
//! timing threshold plays out exactly as written however fast the test runs.

use hand_pointer::controller::{
    Collaborators, ControlToggles, Controller, ControllerEvent, ControllerSettings, Mode, SessionPlan,
};
use hand_pointer::gesture::{Action, ClickDistance};
use hand_pointer::motion::MonitorGeometry;
use hand_pointer::pointer::{LoggingPointer, MouseButton, PointerCommand};
use hand_pointer::time::Timestamp;
use hand_pointer::tracking::{synthetic_hand, ReplayDetector, ReplaySource, ReplayTrack};
use hand_pointer::Error;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const APART: f64 = 0.12;
const TOUCHING: f64 = 0.03;

/// 50 fps, so one frame is 20ms of track time
fn track() -> ReplayTrack {
    ReplayTrack::new("test", 50.0)
}

fn hold(track: &mut ReplayTrack, pinch: f64, frames: usize) {
    track.repeat_hand(&synthetic_hand(0.5, 0.5, pinch), frames);
}

/// Frames 0..=700 run a full calibration; frame 701 completes it.
fn calibration_frames(track: &mut ReplayTrack) {
    hold(track, APART, 401);
    hold(track, TOUCHING, 301);
}

fn controller(
    track: ReplayTrack,
    plan: SessionPlan,
    toggles: ControlToggles,
) -> (Controller, Arc<LoggingPointer>) {
    let track = Arc::new(track);
    let (detector, results) = ReplayDetector::with_cell(Arc::clone(&track));
    let source = ReplaySource::new(track).with_track_clock(Timestamp::from_millis(0));
    let pointer = Arc::new(LoggingPointer::new(MonitorGeometry::new(1920, 1080)));

    let collaborators = Collaborators {
        source: Box::new(source),
        detector: Box::new(detector),
        results,
        pointer: pointer.clone(),
    };
    let controller = Controller::new(ControllerSettings::default(), plan, collaborators, toggles);
    (controller, pointer)
}

/// Start, run to the end of the track and collect every event.
fn run_to_end(mut controller: Controller) -> (Controller, hand_pointer::Result<()>, Vec<ControllerEvent>) {
    let events = controller.take_events().unwrap();
    controller.start().unwrap();
    let result = controller.wait();
    let events = events.try_iter().collect();
    (controller, result, events)
}

fn left(command: fn(MouseButton) -> PointerCommand) -> PointerCommand {
    command(MouseButton::Left)
}

fn click() -> PointerCommand {
    PointerCommand::Click {
        button: MouseButton::Left,
        count: 1,
    }
}

#[test]
fn test_calibrate_only_reports_outcome_once() {
    let mut t = track();
    calibration_frames(&mut t);
    hold(&mut t, APART, 50);

    let (controller, pointer) = controller(t, SessionPlan::CalibrateOnly, ControlToggles::default());
    let (controller, result, events) = run_to_end(controller);
    assert!(result.is_ok());

    let outcome = controller.calibration().expect("calibration outcome");
    assert!((outcome.click_distance.value() - 0.075).abs() < 1e-9);
    assert_eq!(outcome.touching_samples, 150);
    assert_eq!(outcome.not_touching_samples, 150);

    let completed = events
        .iter()
        .filter(|e| matches!(e, ControllerEvent::CalibrationCompleted(_)))
        .count();
    assert_eq!(completed, 1);
    assert_eq!(events.first(), Some(&ControllerEvent::ModeChanged(Mode::Calibrating)));
    assert_eq!(
        events.last(),
        Some(&ControllerEvent::Status("Calibration complete. Click distance: 0.0750".into()))
    );

    let statuses: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            ControllerEvent::Status(text) => Some(text.as_str()),
            _ => None,
        })
        .collect();
    assert!(statuses[0].starts_with("Bring your thumb tip and pointer tip close"));
    assert!(statuses.windows(2).all(|w| w[0] != w[1]));
    assert!(statuses.iter().any(|s| s.starts_with("Measuring touching position")));

    // Calibration never injects anything
    assert!(pointer.commands().is_empty());
    assert_eq!(controller.mode(), Mode::Calibrating);
}

#[test]
fn test_calibrate_then_run_clicks_with_new_threshold() {
    let mut t = track();
    calibration_frames(&mut t);
    hold(&mut t, APART, 30);
    hold(&mut t, TOUCHING, 5);
    hold(&mut t, APART, 20);

    let (controller, pointer) = controller(t, SessionPlan::CalibrateThenRun, ControlToggles::default());
    let (controller, result, events) = run_to_end(controller);
    assert!(result.is_ok());

    assert_eq!(controller.mode(), Mode::Running);
    assert_eq!(pointer.button_commands(), vec![click()]);
    assert_eq!(controller.stats().clicks, 1);

    let modes: Vec<Mode> = events
        .iter()
        .filter_map(|e| match e {
            ControllerEvent::ModeChanged(mode) => Some(*mode),
            _ => None,
        })
        .collect();
    assert_eq!(modes, vec![Mode::Calibrating, Mode::Running]);
    assert!(events.contains(&ControllerEvent::Gesture {
        action: Action::Click,
        contact: true,
    }));
}

#[test]
fn test_run_with_dragging_presses_and_releases() {
    let mut t = track();
    hold(&mut t, 0.15, 30);
    hold(&mut t, TOUCHING, 5);
    hold(&mut t, 0.15, 30);
    hold(&mut t, TOUCHING, 20);
    hold(&mut t, 0.15, 30);

    let (controller, pointer) = controller(
        t,
        SessionPlan::Run(ClickDistance::new(0.08)),
        ControlToggles::new(true, true),
    );
    let (controller, result, _) = run_to_end(controller);
    assert!(result.is_ok());

    assert_eq!(
        pointer.button_commands(),
        vec![click(), left(PointerCommand::Press), left(PointerCommand::Release)]
    );
    let stats = controller.stats();
    assert_eq!((stats.clicks, stats.presses, stats.releases), (1, 1, 1));
    assert_eq!(stats.frames_processed, 115);
}

#[test]
fn test_click_only_mode_never_presses() {
    let mut t = track();
    hold(&mut t, 0.15, 30);
    hold(&mut t, TOUCHING, 20);
    hold(&mut t, 0.15, 10);

    let (controller, pointer) = controller(
        t,
        SessionPlan::Run(ClickDistance::new(0.08)),
        ControlToggles::new(false, true),
    );
    let (_controller, result, _) = run_to_end(controller);
    assert!(result.is_ok());

    // Fires on the first touching frame; holding on never turns into a press
    assert_eq!(pointer.button_commands(), vec![click()]);
}

#[test]
fn test_lost_hand_releases_drag() {
    let mut t = track();
    hold(&mut t, 0.15, 30);
    hold(&mut t, TOUCHING, 30);
    t.push_empty(30);

    let (controller, pointer) = controller(
        t,
        SessionPlan::Run(ClickDistance::new(0.08)),
        ControlToggles::new(true, true),
    );
    let (controller, result, events) = run_to_end(controller);
    assert!(result.is_ok());

    assert_eq!(
        pointer.button_commands(),
        vec![left(PointerCommand::Press), left(PointerCommand::Release)]
    );
    assert_eq!(events.iter().filter(|e| **e == ControllerEvent::HandLost).count(), 1);
    assert_eq!(controller.stats().frames_without_hand, 30);
}

#[test]
fn test_held_button_released_when_track_ends() {
    let mut t = track();
    hold(&mut t, 0.15, 30);
    hold(&mut t, TOUCHING, 30);

    let (controller, pointer) = controller(
        t,
        SessionPlan::Run(ClickDistance::new(0.08)),
        ControlToggles::new(true, true),
    );
    let (_controller, result, _) = run_to_end(controller);
    assert!(result.is_ok());

    assert_eq!(
        pointer.button_commands(),
        vec![left(PointerCommand::Press), left(PointerCommand::Release)]
    );
}

#[test]
fn test_processing_disabled_injects_nothing() {
    let mut t = track();
    hold(&mut t, 0.15, 30);
    hold(&mut t, TOUCHING, 5);
    hold(&mut t, 0.15, 30);

    let (controller, pointer) = controller(
        t,
        SessionPlan::Run(ClickDistance::new(0.08)),
        ControlToggles::new(true, false),
    );
    let (controller, result, _) = run_to_end(controller);
    assert!(result.is_ok());

    assert!(pointer.commands().is_empty());
    assert_eq!(controller.stats().frames_processed, 65);
}

#[test]
fn test_injection_failures_are_surfaced() {
    let mut t = track();
    hold(&mut t, 0.15, 30);
    hold(&mut t, TOUCHING, 5);
    hold(&mut t, 0.15, 10);

    let (controller, pointer) = controller(
        t,
        SessionPlan::Run(ClickDistance::new(0.08)),
        ControlToggles::default(),
    );
    pointer.set_rejecting(true);
    let (controller, result, events) = run_to_end(controller);

    // The loop keeps going after a rejected command
    assert!(result.is_ok());
    assert_eq!(controller.stats().injection_failures, 1);
    assert_eq!(controller.stats().frames_processed, 45);
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, ControllerEvent::InjectionWarning(_)))
            .count(),
        1
    );
}

#[test]
fn test_dropped_frames_are_skipped() {
    let mut t = track();
    hold(&mut t, 0.15, 10);
    t.push_dropped(5);
    hold(&mut t, 0.15, 10);

    let (controller, _pointer) = controller(
        t,
        SessionPlan::Run(ClickDistance::new(0.08)),
        ControlToggles::default(),
    );
    let (controller, result, _) = run_to_end(controller);
    assert!(result.is_ok());

    let stats = controller.stats();
    assert_eq!(stats.frames_processed, 20);
    assert_eq!(stats.frames_skipped, 5);
}

#[test]
fn test_empty_track_is_fatal() {
    let (controller, _pointer) = controller(track(), SessionPlan::CalibrateThenRun, ControlToggles::default());
    let (_controller, result, events) = run_to_end(controller);

    assert!(matches!(result, Err(Error::DeviceUnavailable(_))));
    assert!(matches!(events.last(), Some(ControllerEvent::Fatal(_))));
}

#[test]
fn test_start_twice_is_an_error() {
    let mut t = track();
    hold(&mut t, 0.15, 5);
    let (mut controller, _pointer) = controller(
        t,
        SessionPlan::Run(ClickDistance::new(0.08)),
        ControlToggles::default(),
    );

    controller.start().unwrap();
    assert!(matches!(controller.start(), Err(Error::Controller(_))));
    controller.wait().unwrap();
}

#[test]
fn test_stop_during_calibration_is_prompt() {
    let mut t = ReplayTrack::new("long", 30.0);
    hold(&mut t, APART, 3000);
    let track = Arc::new(t);
    let (detector, results) = ReplayDetector::with_cell(Arc::clone(&track));
    let pointer = Arc::new(LoggingPointer::new(MonitorGeometry::new(1920, 1080)));
    let mut controller = Controller::new(
        ControllerSettings::default(),
        SessionPlan::CalibrateThenRun,
        Collaborators {
            source: Box::new(ReplaySource::new(track)),
            detector: Box::new(detector),
            results,
            pointer,
        },
        ControlToggles::default(),
    );

    controller.start().unwrap();
    thread::sleep(Duration::from_millis(100));
    assert!(controller.is_running());

    let started = Instant::now();
    controller.stop().unwrap();
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(!controller.is_running());
    assert!(controller.calibration().is_none());
    assert_eq!(controller.mode(), Mode::Calibrating);
}

#[test]
fn test_stop_is_prompt_on_slow_track() {
    // One frame every four seconds
    let mut t = ReplayTrack::new("slow", 0.25);
    hold(&mut t, APART, 10);
    let track = Arc::new(t);
    let (detector, results) = ReplayDetector::with_cell(Arc::clone(&track));
    let pointer = Arc::new(LoggingPointer::new(MonitorGeometry::new(1920, 1080)));
    let mut controller = Controller::new(
        ControllerSettings::default(),
        SessionPlan::Run(ClickDistance::new(0.08)),
        Collaborators {
            source: Box::new(ReplaySource::new(track)),
            detector: Box::new(detector),
            results,
            pointer,
        },
        ControlToggles::default(),
    );

    controller.start().unwrap();
    thread::sleep(Duration::from_millis(300));

    let started = Instant::now();
    controller.stop().unwrap();
    assert!(started.elapsed() < Duration::from_secs(1));

    // Waiting for the second frame is not a skipped frame
    let stats = controller.stats();
    assert_eq!(stats.frames_processed, 1);
    assert_eq!(stats.frames_skipped, 0);
}

#[test]
fn test_short_dropout_keeps_contact_indicator() {
    let mut t = track();
    hold(&mut t, 0.15, 30);
    hold(&mut t, TOUCHING, 20);
    // 100ms without a hand, well inside the no-hand timeout
    t.push_empty(5);
    hold(&mut t, TOUCHING, 20);
    hold(&mut t, 0.15, 10);

    let (controller, pointer) = controller(
        t,
        SessionPlan::Run(ClickDistance::new(0.08)),
        ControlToggles::new(true, true),
    );
    let (_controller, result, events) = run_to_end(controller);
    assert!(result.is_ok());

    let contacts: Vec<bool> = events
        .iter()
        .filter_map(|e| match e {
            ControllerEvent::Gesture { contact, .. } => Some(*contact),
            _ => None,
        })
        .collect();
    let contact_ends = contacts.windows(2).filter(|w| w[0] && !w[1]).count();
    assert_eq!(contact_ends, 1, "contact indicator flickered: {:?}", contacts);
    assert!(!events.contains(&ControllerEvent::HandLost));
    assert_eq!(
        pointer.button_commands(),
        vec![left(PointerCommand::Press), left(PointerCommand::Release)]
    );
}
