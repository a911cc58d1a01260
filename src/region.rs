//! Region selection and pixel extraction
//!
//! A [`Selection`] is whatever the user dragged or typed: corners in any
//! order, possibly outside the image. [`Selection::normalize`] turns it into a
//! [`RegionRect`] that is guaranteed to be non-empty and inside the image,
//! and [`PixelRegion`] copies those pixels out for measurement.
//!
//! # Example
//!
//! ```rust
//! use vision_cal::region::{PixelRegion, Selection};
//! use image::RgbImage;
//!
//! let image = RgbImage::new(640, 480);
//! // Dragged from bottom-right to top-left, partly off-image
//! let rect = Selection::new(700, 300, 100, -20).normalize(640, 480).unwrap();
//! assert_eq!(rect.descriptor(), "(100, 0) - (640, 300)");
//!
//! let region = PixelRegion::from_image(&image, rect).unwrap();
//! assert_eq!(region.len(), 540 * 300);
//! ```

use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Region error types
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RegionError {
    #[error("Region is empty")]
    EmptyRegion,

    #[error("Invalid selection {0}: no pixels remain inside the {1}x{2} image")]
    InvalidSelection(Selection, u32, u32),

    #[error("Pixel buffer holds {actual} pixels, expected {expected}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("Cannot parse selection '{0}': expected x0,y0,x1,y1")]
    Parse(String),

    #[error("Unknown region preset '{0}'")]
    UnknownPreset(String),
}

pub type Result<T> = std::result::Result<T, RegionError>;

/// Raw user rectangle in image coordinates
///
/// Corners may come in any order and may lie outside the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub x0: i64,
    pub y0: i64,
    pub x1: i64,
    pub y1: i64,
}

impl Selection {
    pub fn new(x0: i64, y0: i64, x1: i64, y1: i64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Map a rectangle drawn on a scaled display back to image coordinates
    ///
    /// `scale` is the combined display factor (fit-to-window scale times
    /// zoom). Coordinates are truncated toward zero after division.
    pub fn from_display(start: (f64, f64), end: (f64, f64), scale: f64) -> Self {
        let scale = if scale > 0.0 { scale } else { 1.0 };
        let to_image = |v: f64| (v / scale).trunc() as i64;
        Self {
            x0: to_image(start.0.min(end.0)),
            y0: to_image(start.1.min(end.1)),
            x1: to_image(start.0.max(end.0)),
            y1: to_image(start.1.max(end.1)),
        }
    }

    /// Order the corners and clamp them to a `width` x `height` image
    ///
    /// Fails when nothing of the rectangle survives clamping.
    pub fn normalize(&self, width: u32, height: u32) -> Result<RegionRect> {
        let (w, h) = (i64::from(width), i64::from(height));
        let x1 = self.x0.min(self.x1).max(0);
        let y1 = self.y0.min(self.y1).max(0);
        let x2 = self.x0.max(self.x1).min(w);
        let y2 = self.y0.max(self.y1).min(h);

        if x2 <= x1 || y2 <= y1 {
            return Err(RegionError::InvalidSelection(*self, width, height));
        }

        // Bounded by width/height above, so the casts cannot truncate
        Ok(RegionRect {
            x: x1 as u32,
            y: y1 as u32,
            width: (x2 - x1) as u32,
            height: (y2 - y1) as u32,
        })
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}) - ({}, {})", self.x0, self.y0, self.x1, self.y1)
    }
}

impl FromStr for Selection {
    type Err = RegionError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<i64> = s
            .split(',')
            .map(|p| p.trim().parse::<i64>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|_| RegionError::Parse(s.to_string()))?;

        match parts.as_slice() {
            [x0, y0, x1, y1] => Ok(Self::new(*x0, *y0, *x1, *y1)),
            _ => Err(RegionError::Parse(s.to_string())),
        }
    }
}

/// Non-empty rectangle inside an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl RegionRect {
    /// Rectangle covering a whole `width` x `height` image
    pub fn full(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(RegionError::EmptyRegion);
        }
        Ok(Self {
            x: 0,
            y: 0,
            width,
            height,
        })
    }

    /// Exclusive right edge, saturating at `u32::MAX`
    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    /// Exclusive bottom edge, saturating at `u32::MAX`
    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Text form used in measurement records: `(x1, y1) - (x2, y2)`
    pub fn descriptor(&self) -> String {
        format!(
            "({}, {}) - ({}, {})",
            self.x,
            self.y,
            self.right(),
            self.bottom()
        )
    }
}

/// Predefined selection rectangles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RegionPreset {
    /// Reference area (70,100)-(400,300)
    #[default]
    Standard,
}

impl RegionPreset {
    pub fn selection(self) -> Selection {
        match self {
            RegionPreset::Standard => Selection::new(70, 100, 400, 300),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RegionPreset::Standard => "Reference area (70,100)-(400,300)",
        }
    }
}

impl FromStr for RegionPreset {
    type Err = RegionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "standard" | "reference" => Ok(RegionPreset::Standard),
            _ => Err(RegionError::UnknownPreset(s.to_string())),
        }
    }
}

/// Rectangular block of RGB pixels, row-major
#[derive(Debug, Clone, PartialEq)]
pub struct PixelRegion {
    width: u32,
    height: u32,
    pixels: Vec<[u8; 3]>,
}

impl PixelRegion {
    /// Build a region from raw RGB triples
    pub fn new(width: u32, height: u32, pixels: Vec<[u8; 3]>) -> Result<Self> {
        if width == 0 || height == 0 || pixels.is_empty() {
            return Err(RegionError::EmptyRegion);
        }
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(RegionError::SizeMismatch {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Copy the pixels of `rect` out of `image`
    pub fn from_image(image: &RgbImage, rect: RegionRect) -> Result<Self> {
        let fits = |start: u32, len: u32, limit: u32| {
            start.checked_add(len).is_some_and(|end| end <= limit)
        };
        if !fits(rect.x, rect.width, image.width()) || !fits(rect.y, rect.height, image.height()) {
            return Err(RegionError::InvalidSelection(
                Selection::new(
                    i64::from(rect.x),
                    i64::from(rect.y),
                    i64::from(rect.right()),
                    i64::from(rect.bottom()),
                ),
                image.width(),
                image.height(),
            ));
        }

        let mut pixels = Vec::with_capacity(rect.area());
        for y in rect.y..rect.bottom() {
            for x in rect.x..rect.right() {
                pixels.push(image.get_pixel(x, y).0);
            }
        }
        Self::new(rect.width, rect.height, pixels)
    }

    /// Every pixel of `image`
    pub fn whole(image: &RgbImage) -> Result<Self> {
        let rect = RegionRect::full(image.width(), image.height())?;
        Self::from_image(image, rect)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    /// Always false for a constructed region; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn pixels(&self) -> &[[u8; 3]] {
        &self.pixels
    }
}
