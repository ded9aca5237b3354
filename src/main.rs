//! Hand Pointer - gesture-driven pointer control
//!
//! Drives the pointer pipeline from a recorded landmark track.

use hand_pointer::app::cli::{Cli, Commands, ConfigAction};
use hand_pointer::app::config::Config;
use hand_pointer::controller::{
    CalibrationProfile, Collaborators, ControlToggles, Controller, ControllerEvent, SessionPlan,
};
use hand_pointer::gesture::CalibrationOutcome;
use hand_pointer::motion::MonitorGeometry;
use hand_pointer::pointer::{LoggingPointer, PointerSink};
use hand_pointer::time::SessionClock;
use hand_pointer::tracking::{ReplayDetector, ReplaySource, ReplayTrack};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::thread;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Parse CLI arguments first so we can use --verbose to set log level
    let cli = Cli::parse_args();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    SessionClock::init();

    let config = if let Some(path) = &cli.config {
        Config::load(path)?
    } else {
        Config::load_default()?
    };

    match cli.command {
        Commands::Run {
            replay,
            profile,
            dragging,
            dry_run,
            paused,
        } => {
            let options = RunOptions {
                profile,
                dragging: dragging || config.gesture.dragging_enabled,
                dry_run,
                paused,
            };
            run_run(&replay, options, &config)?;
        }
        Commands::Calibrate { replay, output } => {
            run_calibrate(&replay, output, &config)?;
        }
        Commands::Init { force } => {
            let path = cli.config.clone().unwrap_or_else(Config::default_path);
            run_init(&path, force, &config)?;
        }
        Commands::Config { action } => {
            run_config(action, &config)?;
        }
    }

    Ok(())
}

struct RunOptions {
    profile: Option<PathBuf>,
    dragging: bool,
    dry_run: bool,
    paused: bool,
}

fn run_run(replay: &Path, options: RunOptions, config: &Config) -> anyhow::Result<()> {
    let plan = match &options.profile {
        Some(path) => {
            let profile = CalibrationProfile::load(path)?;
            let (min, max) = config.calibration.click_distance_bounds();
            let click_distance = profile.click_distance_within(min, max);
            info!(%click_distance, calibrated_at = %profile.calibrated_at, "Loaded calibration profile");
            SessionPlan::Run(click_distance)
        }
        None => SessionPlan::CalibrateThenRun,
    };

    let pointer = make_pointer(options.dry_run, config)?;
    let toggles = ControlToggles::new(options.dragging, !options.paused);
    let controller = build_controller(replay, plan, pointer, toggles, config)?;
    run_to_end(controller)?;
    Ok(())
}

fn run_calibrate(replay: &Path, output: Option<PathBuf>, config: &Config) -> anyhow::Result<()> {
    let geometry = MonitorGeometry::new(config.display.width, config.display.height);
    let pointer: Arc<dyn PointerSink> = Arc::new(LoggingPointer::new(geometry));
    let toggles = ControlToggles::new(false, false);
    let controller =
        build_controller(replay, SessionPlan::CalibrateOnly, pointer, toggles, config)?;

    let Some(outcome) = run_to_end(controller)? else {
        anyhow::bail!("Calibration did not complete; the track may be too short");
    };

    let path = output.unwrap_or_else(CalibrationProfile::default_path);
    CalibrationProfile::from_outcome(&outcome).save(&path)?;
    println!("Click distance: {}", outcome.click_distance);
    println!("Saved profile to {:?}", path);
    Ok(())
}

fn build_controller(
    replay: &Path,
    plan: SessionPlan,
    pointer: Arc<dyn PointerSink>,
    toggles: ControlToggles,
    config: &Config,
) -> anyhow::Result<Controller> {
    if !replay.exists() {
        anyhow::bail!("Replay track not found: {:?}", replay);
    }
    let track = Arc::new(ReplayTrack::load(replay)?);
    info!(
        name = %track.metadata.name,
        frames = track.len(),
        fps = track.metadata.fps,
        "Loaded replay track"
    );

    let (detector, results) = ReplayDetector::with_cell(Arc::clone(&track));
    let collaborators = Collaborators {
        source: Box::new(ReplaySource::new(track)),
        detector: Box::new(detector),
        results,
        pointer,
    };
    Ok(Controller::new(
        config.controller_settings(),
        plan,
        collaborators,
        toggles,
    ))
}

/// Start the controller, print its events until the session ends, then shut down.
///
/// Returns the calibration outcome, if the session calibrated.
fn run_to_end(mut controller: Controller) -> anyhow::Result<Option<CalibrationOutcome>> {
    let printer = controller.take_events().and_then(|events| {
        thread::Builder::new()
            .name("event-printer".into())
            .spawn(move || print_events(events))
            .map_err(|e| warn!(error = %e, "Failed to spawn event printer"))
            .ok()
    });

    let stop = controller.stop_handle();
    ctrlc::set_handler(move || stop.request_stop())?;

    controller.start()?;
    info!("Running... Press Ctrl+C to stop");
    let result = controller.wait();

    let stats = controller.stats();
    let calibration = controller.calibration();
    // Dropping the controller closes the event channel, which ends the printer
    drop(controller);
    if let Some(printer) = printer {
        let _ = printer.join();
    }

    println!(
        "Frames: {}  clicks: {}  presses: {}  releases: {}  injection failures: {}",
        stats.frames_processed, stats.clicks, stats.presses, stats.releases, stats.injection_failures
    );
    result?;
    Ok(calibration)
}

fn print_events(events: Receiver<ControllerEvent>) {
    for event in events {
        match event {
            ControllerEvent::Status(text) => println!("{}", text),
            ControllerEvent::ModeChanged(mode) => println!("Mode: {}", mode.as_str()),
            ControllerEvent::CalibrationCompleted(_) => {}
            ControllerEvent::Gesture { action, contact } => {
                info!(action = action.as_str(), contact, "Gesture");
            }
            ControllerEvent::HandLost => println!("Hand lost"),
            ControllerEvent::InjectionWarning(message) => {
                println!("Warning: pointer action failed: {}", message)
            }
            ControllerEvent::Fatal(message) => eprintln!("Fatal: {}", message),
        }
    }
}

#[cfg(feature = "enigo")]
fn make_pointer(dry_run: bool, config: &Config) -> anyhow::Result<Arc<dyn PointerSink>> {
    if dry_run {
        let geometry = MonitorGeometry::new(config.display.width, config.display.height);
        return Ok(Arc::new(LoggingPointer::new(geometry)));
    }
    Ok(Arc::new(hand_pointer::pointer::EnigoPointer::new()?))
}

#[cfg(not(feature = "enigo"))]
fn make_pointer(dry_run: bool, config: &Config) -> anyhow::Result<Arc<dyn PointerSink>> {
    if !dry_run {
        warn!("Built without the `enigo` feature; logging pointer commands instead of injecting them");
    }
    let geometry = MonitorGeometry::new(config.display.width, config.display.height);
    Ok(Arc::new(LoggingPointer::new(geometry)))
}

fn run_init(path: &Path, force: bool, config: &Config) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Config already exists at {:?}. Use --force to overwrite.",
            path
        );
    }

    config.save(path)?;
    println!("Created config at {:?}", path);
    println!("\nConfig content:\n{}", config.to_toml()?);
    Ok(())
}

fn run_config(action: ConfigAction, config: &Config) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            println!("Configuration ({:?}):\n", Config::default_path());
            println!("{}", config.to_toml()?);
        }
        ConfigAction::Get { key } => {
            let value = config.get(&key)?;
            println!("{} = {}", key, value);
        }
    }
    Ok(())
}
