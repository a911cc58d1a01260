//! Application state
//!
//! [`AppState`] is a plain value: every transition builds a new state and
//! leaves the old one alone. Infallible transitions consume `self`; fallible
//! ones borrow it, so on error the caller still holds the prior state.
//!
//! ```rust
//! use image::{Rgb, RgbImage};
//! use vision_cal::image_source::SourceImage;
//! use vision_cal::session::AppState;
//!
//! let image = SourceImage::new("gray.png", RgbImage::from_pixel(64, 64, Rgb([200, 200, 200])));
//! let state = AppState::new(0.8).with_image(image);
//! let analyzed = state.analyze_full().unwrap();
//!
//! let rec = &analyzed.analysis().unwrap().recommendation;
//! assert!((rec.suggested_gain - 0.5741).abs() < 1e-4);
//! ```

use thiserror::Error;

use crate::brightness::RegionStats;
use crate::constants::{GAIN_MAX, GAIN_MIN, TARGET_BRIGHTNESS};
use crate::history::{HistoryError, MeasurementRecord};
use crate::image_source::SourceImage;
use crate::recommend::{recommend, AnalysisScope, GainRecommendation};
use crate::region::{PixelRegion, RegionError, RegionPreset, RegionRect, Selection};

/// Session error types
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No image loaded")]
    NoImage,

    #[error(transparent)]
    Region(#[from] RegionError),

    #[error(transparent)]
    History(#[from] HistoryError),
}

pub type Result<T> = std::result::Result<T, SessionError>;

/// Result of measuring one region
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub scope: AnalysisScope,
    pub rect: RegionRect,
    pub stats: RegionStats,
    pub recommendation: GainRecommendation,
}

impl Analysis {
    fn measure(image: &SourceImage, rect: RegionRect, scope: AnalysisScope, gain: f64) -> Result<Self> {
        let region = PixelRegion::from_image(image.pixels(), rect)?;
        let stats = RegionStats::compute(&region);
        let recommendation = recommend(stats.avg_brightness, TARGET_BRIGHTNESS, gain, scope);
        tracing::debug!(
            image = image.name(),
            region = %rect.descriptor(),
            avg = stats.avg_brightness,
            suggested = recommendation.suggested_gain,
            "region analyzed"
        );
        Ok(Self {
            scope,
            rect,
            stats,
            recommendation,
        })
    }

    /// Region text for records: `full` for whole-image analysis
    pub fn region_label(&self) -> String {
        match self.scope {
            AnalysisScope::WholeImage => "full".to_string(),
            AnalysisScope::SelectedRegion => self.rect.descriptor(),
        }
    }
}

/// Everything the front end displays
#[derive(Debug, Clone)]
pub struct AppState {
    image: Option<SourceImage>,
    selection: Option<RegionRect>,
    gain: f64,
    original_gain: f64,
    analysis: Option<Analysis>,
}

fn clamp_gain(gain: f64) -> f64 {
    if gain.is_nan() {
        GAIN_MIN
    } else {
        gain.clamp(GAIN_MIN, GAIN_MAX)
    }
}

impl AppState {
    /// Fresh state with the gain read from the calibration store
    pub fn new(gain: f64) -> Self {
        let gain = clamp_gain(gain);
        Self {
            image: None,
            selection: None,
            gain,
            original_gain: gain,
            analysis: None,
        }
    }

    pub fn image(&self) -> Option<&SourceImage> {
        self.image.as_ref()
    }

    pub fn selection(&self) -> Option<RegionRect> {
        self.selection
    }

    pub fn gain(&self) -> f64 {
        self.gain
    }

    pub fn original_gain(&self) -> f64 {
        self.original_gain
    }

    pub fn analysis(&self) -> Option<&Analysis> {
        self.analysis.as_ref()
    }

    /// Replace the image; selection and analysis are dropped
    pub fn with_image(self, image: SourceImage) -> Self {
        Self {
            image: Some(image),
            selection: None,
            analysis: None,
            ..self
        }
    }

    /// Set the working gain and recompute the current recommendation
    pub fn with_gain(self, gain: f64) -> Self {
        let gain = clamp_gain(gain);
        let analysis = self.analysis.map(|mut a| {
            a.recommendation = recommend(a.stats.avg_brightness, TARGET_BRIGHTNESS, gain, a.scope);
            a
        });
        Self {
            gain,
            analysis,
            ..self
        }
    }

    /// Back to the gain the session started with
    pub fn reset_gain(self) -> Self {
        let original = self.original_gain;
        self.with_gain(original)
    }

    /// Take the gain stored in a history record
    pub fn apply_record(&self, record: &MeasurementRecord) -> Result<Self> {
        let gain = record.gain_value()?;
        Ok(self.clone().with_gain(gain))
    }

    fn loaded_image(&self) -> Result<&SourceImage> {
        self.image.as_ref().ok_or(SessionError::NoImage)
    }

    /// Measure every pixel of the image
    pub fn analyze_full(&self) -> Result<Self> {
        let image = self.loaded_image()?;
        let (w, h) = image.dimensions();
        let rect = RegionRect::full(w, h)?;
        let analysis = Analysis::measure(image, rect, AnalysisScope::WholeImage, self.gain)?;
        Ok(Self {
            selection: None,
            analysis: Some(analysis),
            ..self.clone()
        })
    }

    /// Measure a user rectangle, normalized against the image bounds
    pub fn analyze_selection(&self, selection: Selection) -> Result<Self> {
        let image = self.loaded_image()?;
        let (w, h) = image.dimensions();
        let rect = selection.normalize(w, h)?;
        let analysis = Analysis::measure(image, rect, AnalysisScope::SelectedRegion, self.gain)?;
        Ok(Self {
            selection: Some(rect),
            analysis: Some(analysis),
            ..self.clone()
        })
    }

    pub fn analyze_preset(&self, preset: RegionPreset) -> Result<Self> {
        self.analyze_selection(preset.selection())
    }

    /// Drop the selection and the analysis, keep the image
    pub fn reset_selection(self) -> Self {
        Self {
            selection: None,
            analysis: None,
            ..self
        }
    }

    /// Snapshot of the current analysis as a history record
    ///
    /// `None` until something has been analyzed.
    pub fn record(&self, timestamp: &str) -> Option<MeasurementRecord> {
        let analysis = self.analysis.as_ref()?;
        Some(MeasurementRecord {
            timestamp: timestamp.to_string(),
            source: analysis.scope.label().to_string(),
            region: analysis.region_label(),
            avg_brightness: format!("{:.2}", analysis.stats.avg_brightness),
            rgb_average: analysis.stats.rgb_summary(),
            gain: format!("{:.2}", self.gain),
            recommendation: analysis.recommendation.text(),
        })
    }
}
