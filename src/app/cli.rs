//! Command-Line Interface

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Hand Pointer - Control the mouse pointer with hand gestures
#[derive(Parser, Debug)]
#[command(name = "hand-pointer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Drive the pointer from a recorded landmark track
    Run {
        /// Landmark track (JSON)
        #[arg(short, long)]
        replay: PathBuf,

        /// Saved calibration profile; calibrates first when omitted
        #[arg(short, long)]
        profile: Option<PathBuf>,

        /// Enable press-and-hold dragging
        #[arg(long)]
        dragging: bool,

        /// Log pointer commands instead of injecting them
        #[arg(long)]
        dry_run: bool,

        /// Start with pointer output disabled
        #[arg(long)]
        paused: bool,
    },

    /// Calibrate the click distance and save a profile
    Calibrate {
        /// Landmark track (JSON)
        #[arg(short, long)]
        replay: PathBuf,

        /// Where to write the profile (default: ~/.hand_pointer/profile.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Initialize configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// View configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Get a specific configuration value
    Get {
        /// Configuration key (e.g., "gesture.drag_hold_ms")
        key: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
