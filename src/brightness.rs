//! Region brightness statistics
//!
//! Computes per-pixel luminance (ITU-R BT.601) over a [`PixelRegion`] and
//! summarizes it.
//!
//! # Example
//!
//! ```rust
//! use vision_cal::brightness::RegionStats;
//! use vision_cal::region::PixelRegion;
//!
//! let region = PixelRegion::new(2, 1, vec![[255, 255, 255], [0, 0, 0]]).unwrap();
//! let stats = RegionStats::compute(&region);
//! assert!((stats.avg_brightness - 127.5).abs() < 1e-9);
//! assert_eq!(stats.luminance_map(), &[255, 0]);
//! ```

use serde::{Deserialize, Serialize};

use crate::constants::bt601;
use crate::region::PixelRegion;

/// BT.601 luminance of one pixel
#[inline]
pub fn luminance(r: u8, g: u8, b: u8) -> f64 {
    bt601::R * f64::from(r) + bt601::G * f64::from(g) + bt601::B * f64::from(b)
}

/// Brightness and color statistics of a region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionStats {
    /// Mean luminance
    pub avg_brightness: f64,
    /// Population standard deviation of luminance
    pub std_brightness: f64,
    /// Minimum luminance
    pub min_brightness: f64,
    /// Maximum luminance
    pub max_brightness: f64,
    /// Mean of the raw red channel
    pub avg_r: f64,
    /// Mean of the raw green channel
    pub avg_g: f64,
    /// Mean of the raw blue channel
    pub avg_b: f64,
    /// Per-pixel luminance truncated to 8 bits, row-major
    #[serde(skip)]
    luminance: Vec<u8>,
}

impl RegionStats {
    /// Measure a region
    ///
    /// Regions are non-empty by construction, so this cannot fail.
    pub fn compute(region: &PixelRegion) -> Self {
        let pixels = region.pixels();
        let n = pixels.len() as f64;

        let mut luma_map = Vec::with_capacity(pixels.len());
        let mut values = Vec::with_capacity(pixels.len());
        let (mut sum_r, mut sum_g, mut sum_b) = (0u64, 0u64, 0u64);
        let mut sum_y = 0.0f64;
        let mut min_y = f64::INFINITY;
        let mut max_y = f64::NEG_INFINITY;

        for &[r, g, b] in pixels {
            let y = luminance(r, g, b);
            sum_r += u64::from(r);
            sum_g += u64::from(g);
            sum_b += u64::from(b);
            sum_y += y;
            min_y = min_y.min(y);
            max_y = max_y.max(y);
            values.push(y);
            // `as` saturates, and y never leaves [0, 255] for 8-bit input
            luma_map.push(y as u8);
        }

        let (avg, std) = if max_y == min_y {
            (min_y, 0.0)
        } else {
            let mean = (sum_y / n).clamp(min_y, max_y);
            let variance = values.iter().map(|y| (y - mean).powi(2)).sum::<f64>() / n;
            (mean, variance.sqrt())
        };

        tracing::debug!(
            pixels = pixels.len(),
            avg = avg,
            std = std,
            min = min_y,
            max = max_y,
            "region statistics computed"
        );

        Self {
            avg_brightness: avg,
            std_brightness: std,
            min_brightness: min_y,
            max_brightness: max_y,
            avg_r: sum_r as f64 / n,
            avg_g: sum_g as f64 / n,
            avg_b: sum_b as f64 / n,
            luminance: luma_map,
        }
    }

    /// 8-bit luminance map for histogram rendering
    pub fn luminance_map(&self) -> &[u8] {
        &self.luminance
    }

    /// `R:{r}, G:{g}, B:{b}` with channel means rounded to integers
    pub fn rgb_summary(&self) -> String {
        format!(
            "R:{:.0}, G:{:.0}, B:{:.0}",
            self.avg_r, self.avg_g, self.avg_b
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(pixels: Vec<[u8; 3]>) -> PixelRegion {
        let w = pixels.len() as u32;
        PixelRegion::new(w, 1, pixels).unwrap()
    }

    #[test]
    fn test_luminance_weights() {
        assert_eq!(luminance(0, 0, 0), 0.0);
        assert!((luminance(255, 255, 255) - 255.0).abs() < 1e-9);
        assert!((luminance(255, 0, 0) - 76.245).abs() < 1e-9);
        assert!((luminance(0, 255, 0) - 149.685).abs() < 1e-9);
        assert!((luminance(0, 0, 255) - 29.07).abs() < 1e-9);
    }

    #[test]
    fn test_uniform_region_has_zero_spread() {
        let stats = RegionStats::compute(&region(vec![[200, 10, 90]; 37]));
        let expected = luminance(200, 10, 90);

        assert_eq!(stats.std_brightness, 0.0);
        assert_eq!(stats.avg_brightness, expected);
        assert_eq!(stats.min_brightness, expected);
        assert_eq!(stats.max_brightness, expected);
        assert_eq!(stats.avg_r, 200.0);
        assert_eq!(stats.avg_g, 10.0);
        assert_eq!(stats.avg_b, 90.0);
    }

    #[test]
    fn test_population_std() {
        // Luminance 0 and 255: mean 127.5, population std 127.5
        let stats = RegionStats::compute(&region(vec![[0, 0, 0], [255, 255, 255]]));
        assert!((stats.avg_brightness - 127.5).abs() < 1e-9);
        assert!((stats.std_brightness - 127.5).abs() < 1e-9);
        assert_eq!(stats.min_brightness, 0.0);
        assert!((stats.max_brightness - 255.0).abs() < 1e-9);
    }

    #[test]
    fn test_channel_means_are_unweighted() {
        let stats = RegionStats::compute(&region(vec![[255, 0, 0], [0, 0, 255]]));
        assert_eq!(stats.avg_r, 127.5);
        assert_eq!(stats.avg_g, 0.0);
        assert_eq!(stats.avg_b, 127.5);
        assert_eq!(stats.rgb_summary(), "R:128, G:0, B:128");
    }

    #[test]
    fn test_mean_between_extrema() {
        let mut pixels = Vec::new();
        for i in 0..=255u8 {
            pixels.push([i, i.wrapping_mul(7), 255 - i]);
        }
        let stats = RegionStats::compute(&region(pixels));
        assert!(stats.min_brightness <= stats.avg_brightness);
        assert!(stats.avg_brightness <= stats.max_brightness);
        assert!(stats.max_brightness <= 255.0);
        assert!(stats.min_brightness >= 0.0);
    }

    #[test]
    fn test_mean_is_order_invariant() {
        let pixels: Vec<[u8; 3]> = (0..64u8).map(|i| [i * 3, 255 - i, i]).collect();
        let mut reversed = pixels.clone();
        reversed.reverse();

        let a = RegionStats::compute(&region(pixels));
        let b = RegionStats::compute(&region(reversed));
        assert!((a.avg_brightness - b.avg_brightness).abs() < 1e-9);
        assert!((a.std_brightness - b.std_brightness).abs() < 1e-9);
        assert_eq!(a.min_brightness, b.min_brightness);
        assert_eq!(a.max_brightness, b.max_brightness);
    }

    #[test]
    fn test_luminance_map_truncates() {
        // 76.245 -> 76
        let stats = RegionStats::compute(&region(vec![[255, 0, 0], [0, 255, 0]]));
        assert_eq!(stats.luminance_map(), &[76, 149]);
    }
}
