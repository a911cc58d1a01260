//! Luminance histogram
//!
//! 256 bins over the 8-bit luminance map, and a PNG plot of it with the
//! target and mean marked.
//!
//! The plot carries no text. Title and legend come from
//! [`LuminanceHistogram::title`] and [`LuminanceHistogram::legend`] and are
//! printed next to the saved file.

use image::{Rgb, RgbImage};
use std::path::Path;
use thiserror::Error;

use crate::recommend::AnalysisScope;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const BAR: Rgb<u8> = Rgb([128, 128, 128]);
const AXIS: Rgb<u8> = Rgb([0, 0, 0]);
const TARGET_LINE: Rgb<u8> = Rgb([220, 30, 30]);
const MEAN_LINE: Rgb<u8> = Rgb([30, 60, 220]);

/// Histogram error types
#[derive(Debug, Error)]
pub enum HistogramError {
    #[error("Plot size {0}x{1} is too small")]
    PlotTooSmall(u32, u32),

    #[error("Failed to save plot: {0}")]
    Save(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, HistogramError>;

/// Pixel counts per luminance value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LuminanceHistogram {
    bins: [u64; 256],
    total: u64,
    sum: u64,
}

impl LuminanceHistogram {
    pub fn from_luminance(map: &[u8]) -> Self {
        let mut bins = [0u64; 256];
        let mut sum = 0u64;
        for &v in map {
            bins[v as usize] += 1;
            sum += u64::from(v);
        }
        Self {
            bins,
            total: map.len() as u64,
            sum,
        }
    }

    pub fn bins(&self) -> &[u64; 256] {
        &self.bins
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Mean of the 8-bit map (not of the unrounded luminance)
    pub fn mean(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.sum as f64 / self.total as f64
        }
    }

    /// Tallest bin
    pub fn peak(&self) -> u64 {
        self.bins.iter().copied().max().unwrap_or(0)
    }

    pub fn title(scope: AnalysisScope) -> &'static str {
        match scope {
            AnalysisScope::WholeImage => "Whole image luminance distribution",
            AnalysisScope::SelectedRegion => "Selected region luminance distribution",
        }
    }

    /// Key for the plot's marker lines, x axis is luminance 0-255
    pub fn legend(&self, target: f64) -> String {
        format!(
            "x: luminance 0-255, y: pixel count; red dashed: target {:.0}, blue: mean {:.2}",
            target,
            self.mean()
        )
    }

    /// Draw the histogram into an image
    ///
    /// Each luminance value gets an equal-width column. The target is drawn
    /// as a dashed red line, the mean as a solid blue one.
    pub fn render(&self, width: u32, height: u32, target: f64) -> Result<RgbImage> {
        if width < 256 || height < 32 {
            return Err(HistogramError::PlotTooSmall(width, height));
        }

        let mut img = RgbImage::from_pixel(width, height, BACKGROUND);
        let plot_h = height - 1;
        let peak = self.peak().max(1) as f64;
        let column = |v: f64| ((v / 256.0) * width as f64).clamp(0.0, (width - 1) as f64) as u32;

        for (value, &count) in self.bins.iter().enumerate() {
            if count == 0 {
                continue;
            }
            let bar_h = ((count as f64 / peak) * plot_h as f64).round() as u32;
            let x0 = column(value as f64);
            let x1 = column(value as f64 + 1.0).max(x0 + 1).min(width);
            for x in x0..x1 {
                for y in (plot_h - bar_h)..plot_h {
                    img.put_pixel(x, y, BAR);
                }
            }
        }

        for x in 0..width {
            img.put_pixel(x, plot_h, AXIS);
        }

        let tx = column(target);
        for y in 0..plot_h {
            if (y / 6) % 2 == 0 {
                img.put_pixel(tx, y, TARGET_LINE);
            }
        }

        let mx = column(self.mean());
        for y in 0..plot_h {
            img.put_pixel(mx, y, MEAN_LINE);
        }

        Ok(img)
    }

    /// Render and save as an image file (format from extension)
    pub fn save_plot(&self, path: &Path, width: u32, height: u32, target: f64) -> Result<()> {
        let img = self.render(width, height, target)?;
        img.save(path)?;
        tracing::info!(path = %path.display(), "histogram plot saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_bins_and_mean() {
        let hist = LuminanceHistogram::from_luminance(&[0, 0, 10, 255]);
        assert_eq!(hist.total(), 4);
        assert_eq!(hist.bins()[0], 2);
        assert_eq!(hist.bins()[10], 1);
        assert_eq!(hist.bins()[255], 1);
        assert_eq!(hist.peak(), 2);
        assert!((hist.mean() - 66.25).abs() < 1e-12);
    }

    #[test]
    fn test_empty_histogram() {
        let hist = LuminanceHistogram::from_luminance(&[]);
        assert_eq!(hist.total(), 0);
        assert_eq!(hist.mean(), 0.0);
        assert_eq!(hist.peak(), 0);
    }

    #[test]
    fn test_render_marks_target_and_mean() {
        let hist = LuminanceHistogram::from_luminance(&[64; 100]);
        let img = hist.render(512, 200, 128.0).unwrap();

        assert_eq!(img.dimensions(), (512, 200));
        // Target at 128 -> column 256, first dash starts at the top
        assert_eq!(*img.get_pixel(256, 0), TARGET_LINE);
        // Mean 64 -> column 128, solid
        assert_eq!(*img.get_pixel(128, 0), MEAN_LINE);
        assert_eq!(*img.get_pixel(128, 150), MEAN_LINE);
        // Bar for bin 64 spans columns 128..130; the second one is pure bar
        assert_eq!(*img.get_pixel(129, 150), BAR);
        // Empty bins stay background
        assert_eq!(*img.get_pixel(400, 150), BACKGROUND);
    }

    #[test]
    fn test_render_rejects_tiny_plot() {
        let hist = LuminanceHistogram::from_luminance(&[1, 2, 3]);
        assert!(matches!(
            hist.render(100, 100, 128.0),
            Err(HistogramError::PlotTooSmall(100, 100))
        ));
    }

    #[test]
    fn test_save_plot_writes_png() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hist.png");
        let hist = LuminanceHistogram::from_luminance(&[10, 20, 30, 30]);
        hist.save_plot(&path, 256, 64, 128.0).unwrap();

        let loaded = image::open(&path).unwrap();
        assert_eq!(loaded.width(), 256);
        assert_eq!(loaded.height(), 64);
    }

    #[test]
    fn test_titles() {
        assert!(LuminanceHistogram::title(AnalysisScope::WholeImage).starts_with("Whole"));
        assert!(LuminanceHistogram::title(AnalysisScope::SelectedRegion).starts_with("Selected"));
    }

    #[test]
    fn test_legend() {
        let hist = LuminanceHistogram::from_luminance(&[90, 91]);
        let legend = hist.legend(128.0);
        assert!(legend.contains("target 128"));
        assert!(legend.contains("mean 90.50"));
    }
}
