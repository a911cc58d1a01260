//! Measurement history
//!
//! Append-only list of past measurements, persisted as a JSON flat file
//! between runs.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::util::write_atomic;

/// Current history file version
pub const HISTORY_VERSION: u32 = 1;

/// Source label of entries written by [`MeasurementRecord::calibration_write`]
pub const CALIBRATION_WRITE: &str = "calibration write";

/// History error types
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported history version {found} in {path}")]
    Version { path: PathBuf, found: u32 },

    #[error("No measurement #{0}")]
    NoSuchRecord(usize),

    #[error("Recorded gain '{0}' is not a number")]
    InvalidGain(String),
}

pub type Result<T> = std::result::Result<T, HistoryError>;

/// One saved measurement, already formatted for display and export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    /// `%Y-%m-%d %H:%M:%S`
    pub timestamp: String,
    /// "whole image" or "selected region"
    pub source: String,
    /// Region descriptor, `full` for whole-image analysis
    pub region: String,
    /// Average brightness, 2 decimals
    pub avg_brightness: String,
    /// `R:{r}, G:{g}, B:{b}`
    pub rgb_average: String,
    /// LightStrengthGain at measurement time, 2 decimals
    pub gain: String,
    /// Recommendation text, one line per explanation line
    pub recommendation: String,
}

impl MeasurementRecord {
    /// Field values in export column order
    pub fn fields(&self) -> [&str; 7] {
        [
            self.timestamp.as_str(),
            self.source.as_str(),
            self.region.as_str(),
            self.avg_brightness.as_str(),
            self.rgb_average.as_str(),
            self.gain.as_str(),
            self.recommendation.as_str(),
        ]
    }

    /// Entry noting a gain written to a camera document
    ///
    /// No image is involved, so the measurement columns hold `-`.
    pub fn calibration_write(timestamp: &str, camera_name: &str, gain: f64) -> Self {
        let unmeasured = || "-".to_string();
        Self {
            timestamp: timestamp.to_string(),
            source: CALIBRATION_WRITE.to_string(),
            region: unmeasured(),
            avg_brightness: unmeasured(),
            rgb_average: unmeasured(),
            gain: format!("{gain:.2}"),
            recommendation: format!("Applied to {camera_name}.xml"),
        }
    }

    /// Parse the recorded gain back to a number
    pub fn gain_value(&self) -> Result<f64> {
        self.gain
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|gain| gain.is_finite())
            .ok_or_else(|| HistoryError::InvalidGain(self.gain.clone()))
    }

    /// One-line summary for listings
    pub fn summary(&self) -> String {
        format!(
            "{} - brightness: {}, LSG: {}",
            self.timestamp, self.avg_brightness, self.gain
        )
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct HistoryFile {
    version: u32,
    records: Vec<MeasurementRecord>,
}

/// Ordered measurement records
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeasurementHistory {
    records: Vec<MeasurementRecord>,
}

impl MeasurementHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a JSON file; a missing file is an empty history
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path)?;
        let file: HistoryFile = serde_json::from_str(&content)?;
        if file.version != HISTORY_VERSION {
            return Err(HistoryError::Version {
                path: path.to_path_buf(),
                found: file.version,
            });
        }
        Ok(Self {
            records: file.records,
        })
    }

    /// Save to a JSON file, replacing it atomically
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = HistoryFile {
            version: HISTORY_VERSION,
            records: self.records.clone(),
        };
        let content = serde_json::to_string_pretty(&file)?;
        write_atomic(path, content.as_bytes())?;
        tracing::info!(path = %path.display(), records = self.records.len(), "history saved");
        Ok(())
    }

    pub fn push(&mut self, record: MeasurementRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[MeasurementRecord] {
        &self.records
    }

    /// Record by 1-based position, as shown in listings
    pub fn get(&self, number: usize) -> Result<&MeasurementRecord> {
        number
            .checked_sub(1)
            .and_then(|idx| self.records.get(idx))
            .ok_or(HistoryError::NoSuchRecord(number))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
