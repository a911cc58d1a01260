//! vision-cal - Brightness measurement and LightStrengthGain calibration
//!
//! Measures the BT.601 luminance of a camera frame (whole image or a
//! selected rectangle), compares it with the target brightness of 128 and
//! suggests a new `LightStrengthGain` for the camera's XML calibration
//! document.
//!
//! # Features
//!
//! - **Region selection** ([`region`]) - Normalize user rectangles against the image
//! - **Brightness statistics** ([`brightness`]) - Mean, spread and extrema of luminance
//! - **Histogram** ([`histogram`]) - 256-bin luminance histogram and PNG plot
//! - **Recommendation** ([`recommend`]) - One-step gain suggestion
//! - **Calibration store** ([`calibration`]) - Locate, read and rewrite the camera XML
//! - **History and export** ([`history`], [`export`]) - JSON history, xlsx and HTML
//! - **Checklist** ([`checklist`]) - Pre-flight setup confirmation
//! - **Session state** ([`session`]) - Immutable state for front ends
//!
//! # Quick Start
//!
//! ```rust
//! use image::{Rgb, RgbImage};
//! use vision_cal::{recommend, AnalysisScope, PixelRegion, RegionStats, TARGET_BRIGHTNESS};
//!
//! let image = RgbImage::from_pixel(64, 48, Rgb([90, 90, 90]));
//! let region = PixelRegion::whole(&image).unwrap();
//! let stats = RegionStats::compute(&region);
//!
//! let rec = recommend(stats.avg_brightness, TARGET_BRIGHTNESS, 0.5, AnalysisScope::WholeImage);
//! assert!(rec.suggested_gain > 0.5);
//! println!("{}", rec.text());
//! ```
//!
//! # Architecture
//!
//! ```text
//! Image -> Region -> RegionStats -> recommend -> GainRecommendation
//!                        |                              |
//!                    Histogram                 CalibrationStore (XML)
//!                                                       |
//!                                        History -> xlsx / HTML report
//! ```

pub mod brightness;
pub mod calibration;
pub mod checklist;
pub mod cli;
pub mod config;
pub mod constants;
pub mod export;
pub mod histogram;
pub mod history;
pub mod image_source;
pub mod logging;
pub mod recommend;
pub mod region;
pub mod session;
pub mod util;

// Re-exports for convenience
pub use brightness::{luminance, RegionStats};
pub use calibration::{
    load_gain_or_default, CalibrationError, CalibrationLocator, CalibrationStore, CameraDocument,
    XmlCalibrationStore,
};
pub use checklist::{Checklist, ChecklistCategory, ChecklistError};
pub use cli::{
    create_progress_bar, AnalyzeArgs, ChecklistArgs, Cli, Commands, ExitCode, GainCommand,
    HistoryCommand, RecommendArgs,
};
pub use config::{CliOverrides, Config, ConfigError, Settings};
pub use constants::{DEFAULT_GAIN, TARGET_BRIGHTNESS, TARGET_TOLERANCE};
pub use export::{export_xlsx, render_report, write_report, ExportError};
pub use histogram::{HistogramError, LuminanceHistogram};
pub use history::{HistoryError, MeasurementHistory, MeasurementRecord};
pub use image_source::{load_image, ImageSourceError, SourceImage};
pub use recommend::{recommend, Adjustment, AnalysisScope, GainRecommendation};
pub use region::{PixelRegion, RegionError, RegionPreset, RegionRect, Selection};
pub use session::{Analysis, AppState, SessionError};
pub use util::{escape_html, format_timestamp, now_timestamp, percentage, write_atomic};

/// Exit codes for CLI (prefer the `ExitCode` enum)
pub mod exit_codes {
    use super::ExitCode;

    pub const SUCCESS: i32 = ExitCode::Success as i32;
    pub const GENERAL_ERROR: i32 = ExitCode::GeneralError as i32;
    pub const INVALID_ARGS: i32 = ExitCode::InvalidArgs as i32;
    pub const INPUT_NOT_FOUND: i32 = ExitCode::InputNotFound as i32;
    pub const OUTPUT_ERROR: i32 = ExitCode::OutputError as i32;
    pub const PROCESSING_ERROR: i32 = ExitCode::ProcessingError as i32;
    pub const CONFIG_ERROR: i32 = ExitCode::ConfigError as i32;
}
