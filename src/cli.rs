//! CLI interface module
//!
//! Provides command-line interface using clap derive macros.

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

use crate::constants::{GAIN_MAX, GAIN_MIN};
use crate::region::{RegionPreset, Selection};

/// Exit codes for the CLI
///
/// These codes follow standard Unix conventions and provide
/// specific error categories for scripting and automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Normal termination
    Success = 0,
    /// Anything not covered below
    GeneralError = 1,
    /// Bad arguments
    InvalidArgs = 2,
    /// Input image or file missing
    InputNotFound = 3,
    /// Could not write an output file
    OutputError = 4,
    /// Image could not be decoded or measured
    ProcessingError = 5,
    /// Config file or calibration store problem
    ConfigError = 6,
}

impl ExitCode {
    /// Convert to process exit code
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Get human-readable description
    pub fn description(self) -> &'static str {
        match self {
            ExitCode::Success => "Success",
            ExitCode::GeneralError => "General error",
            ExitCode::InvalidArgs => "Invalid arguments",
            ExitCode::InputNotFound => "Input file not found",
            ExitCode::OutputError => "Output error (permission denied, disk full, etc.)",
            ExitCode::ProcessingError => "Processing error",
            ExitCode::ConfigError => "Configuration or calibration store error",
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.code()
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code.code() as u8)
    }
}

/// Vision camera brightness measurement and LightStrengthGain calibration
#[derive(Parser, Debug)]
#[command(name = "vision-cal")]
#[command(version)]
#[command(about = "Measure image brightness and recommend a LightStrengthGain", long_about = None)]
pub struct Cli {
    /// Config file (default: ./vision-cal.toml, then the user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Calibration database directory (overrides the config file)
    #[arg(long, global = true)]
    pub base_path: Option<PathBuf>,

    /// Measurement history file (overrides the config file)
    #[arg(long = "history-file", global = true)]
    pub history_file: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Measure an image and recommend a gain
    Analyze(AnalyzeArgs),
    /// Recommend a gain for a known brightness
    Recommend(RecommendArgs),
    /// Read or write LightStrengthGain in the calibration store
    Gain {
        #[command(subcommand)]
        action: GainCommand,
    },
    /// Manage saved measurements
    History {
        #[command(subcommand)]
        action: HistoryCommand,
    },
    /// Walk through the pre-flight checklist
    Checklist(ChecklistArgs),
    /// Show configuration and calibration store locations
    Info,
}

/// Arguments for the analyze command
#[derive(clap::Args, Debug)]
pub struct AnalyzeArgs {
    /// Image file (PNG, JPEG, BMP, TIFF)
    pub image: PathBuf,

    /// Region corners `x0,y0,x1,y1`, any order; clamped to the image
    #[arg(long, allow_hyphen_values = true, conflicts_with = "preset")]
    pub region: Option<Selection>,

    /// Named region (`standard`)
    #[arg(long)]
    pub preset: Option<RegionPreset>,

    /// Current gain; read from the calibration store when omitted
    #[arg(long, value_parser = parse_gain)]
    pub gain: Option<f64>,

    /// Append the measurement to the history
    #[arg(long)]
    pub save: bool,

    /// Write a luminance histogram plot (PNG)
    #[arg(long, value_name = "PATH")]
    pub histogram: Option<PathBuf>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the recommend command
#[derive(clap::Args, Debug)]
pub struct RecommendArgs {
    /// Measured average brightness (0-255)
    #[arg(long, value_parser = parse_brightness)]
    pub brightness: f64,

    /// Current gain (0-1)
    #[arg(long, value_parser = parse_gain)]
    pub gain: f64,

    /// Treat the brightness as a whole-image measurement
    #[arg(long)]
    pub full: bool,
}

/// Calibration store actions
#[derive(Subcommand, Debug)]
pub enum GainCommand {
    /// Print the stored LightStrengthGain
    Show,
    /// Write a new LightStrengthGain (0-1)
    Set {
        #[arg(value_parser = parse_gain)]
        value: f64,
    },
}

/// History actions
#[derive(Subcommand, Debug)]
pub enum HistoryCommand {
    /// List saved measurements
    List,
    /// Show one measurement in full (1-based)
    Show { number: usize },
    /// Write the gain of a saved measurement to the camera document (1-based)
    Apply { number: usize },
    /// Delete all saved measurements
    Clear,
    /// Export to an Excel workbook
    Export { output: PathBuf },
    /// Write an HTML report
    Report {
        output: PathBuf,

        /// Template with {{total_measurements}}, {{report_time}}, {{table_header}}, {{table_rows}}
        #[arg(long)]
        template: Option<PathBuf>,
    },
}

/// Arguments for the checklist command
#[derive(clap::Args, Debug)]
pub struct ChecklistArgs {
    /// Mark every item as done without prompting
    #[arg(short, long)]
    pub yes: bool,
}

fn parse_gain(s: &str) -> Result<f64, String> {
    let value: f64 = s.trim().parse().map_err(|_| format!("'{s}' is not a number"))?;
    if (GAIN_MIN..=GAIN_MAX).contains(&value) {
        Ok(value)
    } else {
        Err(format!("gain must be between {GAIN_MIN} and {GAIN_MAX}"))
    }
}

fn parse_brightness(s: &str) -> Result<f64, String> {
    let value: f64 = s.trim().parse().map_err(|_| format!("'{s}' is not a number"))?;
    if (0.0..=255.0).contains(&value) {
        Ok(value)
    } else {
        Err("brightness must be between 0 and 255".to_string())
    }
}

/// Create a styled progress bar for checklist progress
pub fn create_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{bar:30.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
            .expect("Invalid progress bar template")
            .progress_chars("#>-"),
    );
    pb
}
