//! Fixed values shared across the crate
//!
//! Target brightness, calibration key and the tag names of the camera
//! calibration documents. None of these are mutated at runtime.

/// Reference luminance the recommendation steers toward
pub const TARGET_BRIGHTNESS: f64 = 128.0;

/// Half-width of the "near target" band around [`TARGET_BRIGHTNESS`]
pub const TARGET_TOLERANCE: f64 = 10.0;

/// Upper bound of an 8-bit channel, used as the control-law denominator
pub const FULL_SCALE: f64 = 255.0;

/// Floor of the adjustment factor when increasing the gain
pub const MIN_INCREASE_FACTOR: f64 = 0.1;

/// Valid gain range
pub const GAIN_MIN: f64 = 0.0;
pub const GAIN_MAX: f64 = 1.0;

/// Gain used when the calibration document cannot be read
pub const DEFAULT_GAIN: f64 = 1.0;

/// Calibration key adjusted by this tool
pub const KEY_LIGHT_STRENGTH_GAIN: &str = "LightStrengthGain";

/// ITU-R BT.601 luma coefficients
pub mod bt601 {
    pub const R: f64 = 0.299;
    pub const G: f64 = 0.587;
    pub const B: f64 = 0.114;
}

/// Element names of the calibration documents
pub mod xml {
    pub const ITEM: &str = "Item";
    pub const NAME: &str = "Name";
    pub const VALUE: &str = "Value";
    pub const PART: &str = "Part";
    pub const TYPE: &str = "Type";
    pub const TYPE_CAMERA: &str = "Camera";

    /// Default installation directory of the vision module database
    pub const DEFAULT_BASE_PATH: &str = r"C:\Park Systems\XEService\DB\Module\Vision";
}

/// Timestamp format of measurement records and reports
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bt601_weights_sum_to_one() {
        assert!((bt601::R + bt601::G + bt601::B - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_target_band_inside_range() {
        assert!(TARGET_BRIGHTNESS - TARGET_TOLERANCE > 0.0);
        assert!(TARGET_BRIGHTNESS + TARGET_TOLERANCE < FULL_SCALE);
        assert!(GAIN_MIN < GAIN_MAX);
        assert!((GAIN_MIN..=GAIN_MAX).contains(&DEFAULT_GAIN));
    }
}
