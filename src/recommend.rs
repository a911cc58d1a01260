//! LightStrengthGain recommendation
//!
//! Maps a measured average brightness to a suggested gain. One suggestion
//! per call; nothing here iterates or reads back an applied value.
//!
//! The step size depends on the direction:
//!
//! ```text
//! too bright: factor = gain                  new = max(0, gain - diff/255 * factor)
//! too dim:    factor = max(0.1, 1 - gain)    new = min(1, gain + diff/255 * factor)
//! ```
//!
//! # Example
//!
//! ```rust
//! use vision_cal::recommend::{recommend, AnalysisScope};
//!
//! let rec = recommend(200.0, 128.0, 0.8, AnalysisScope::WholeImage);
//! assert!((rec.suggested_gain - 0.5741).abs() < 1e-4);
//! assert_eq!(rec.lines[0], "[Whole image analysis]");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{
    FULL_SCALE, GAIN_MAX, GAIN_MIN, KEY_LIGHT_STRENGTH_GAIN, MIN_INCREASE_FACTOR,
    TARGET_TOLERANCE,
};

/// What the measurement covered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisScope {
    WholeImage,
    SelectedRegion,
}

impl AnalysisScope {
    /// Source label used in measurement records
    pub fn label(self) -> &'static str {
        match self {
            AnalysisScope::WholeImage => "whole image",
            AnalysisScope::SelectedRegion => "selected region",
        }
    }

    fn header(self) -> &'static str {
        match self {
            AnalysisScope::WholeImage => "[Whole image analysis]",
            AnalysisScope::SelectedRegion => "[Selected region analysis]",
        }
    }
}

impl fmt::Display for AnalysisScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Direction of the suggested change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Adjustment {
    /// Within tolerance of the target
    Hold,
    /// Image too bright
    Decrease,
    /// Image too dim
    Increase,
}

/// Suggested gain plus the explanation shown to the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GainRecommendation {
    /// Explanation, header first
    pub lines: Vec<String>,
    pub adjustment: Adjustment,
    /// Signed step before clamping; zero when holding
    pub delta: f64,
    /// Gain the step was computed from
    pub current_gain: f64,
    /// Always within [0, 1]
    pub suggested_gain: f64,
}

impl GainRecommendation {
    /// Explanation joined with newlines
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn needs_adjustment(&self) -> bool {
        self.adjustment != Adjustment::Hold
    }
}

/// Compute the gain suggestion for a measured brightness
///
/// `current_gain` is expected in [0, 1]; callers clamp it beforehand.
pub fn recommend(
    avg_brightness: f64,
    target_brightness: f64,
    current_gain: f64,
    scope: AnalysisScope,
) -> GainRecommendation {
    let mut lines = vec![scope.header().to_string()];

    if (avg_brightness - target_brightness).abs() <= TARGET_TOLERANCE {
        lines.push(format!(
            "Current brightness ({:.2}) is near the target ({}±{}). No adjustment needed.",
            avg_brightness, target_brightness, TARGET_TOLERANCE
        ));
        return GainRecommendation {
            lines,
            adjustment: Adjustment::Hold,
            delta: 0.0,
            current_gain,
            suggested_gain: current_gain,
        };
    }

    let (adjustment, delta, suggested_gain) = if avg_brightness > target_brightness {
        let diff = avg_brightness - target_brightness;
        let factor = current_gain;
        let step = diff / FULL_SCALE * factor;
        let new_gain = (current_gain - step).max(GAIN_MIN);

        lines.push(format!(
            "Brightness ({:.2}) is {:.1} above the target ({}).",
            avg_brightness, diff, target_brightness
        ));
        lines.push(format!(
            "Decrease {} from {:.2} to {:.2}.",
            KEY_LIGHT_STRENGTH_GAIN, current_gain, new_gain
        ));
        lines.push(format!(
            "Adjustment: -{:.3} (= -{:.1}/255 * {:.2})",
            step, diff, factor
        ));
        (Adjustment::Decrease, -step, new_gain)
    } else {
        let diff = target_brightness - avg_brightness;
        let factor = (1.0 - current_gain).max(MIN_INCREASE_FACTOR);
        let step = diff / FULL_SCALE * factor;
        let new_gain = (current_gain + step).min(GAIN_MAX);

        lines.push(format!(
            "Brightness ({:.2}) is {:.1} below the target ({}).",
            avg_brightness, diff, target_brightness
        ));
        lines.push(format!(
            "Increase {} from {:.2} to {:.2}.",
            KEY_LIGHT_STRENGTH_GAIN, current_gain, new_gain
        ));
        lines.push(format!(
            "Adjustment: +{:.3} (= +{:.1}/255 * {:.2})",
            step, diff, factor
        ));
        (Adjustment::Increase, step, new_gain)
    };

    tracing::debug!(
        avg_brightness,
        current_gain,
        suggested_gain,
        ?adjustment,
        "gain recommendation computed"
    );

    GainRecommendation {
        lines,
        adjustment,
        delta,
        current_gain,
        suggested_gain,
    }
}
