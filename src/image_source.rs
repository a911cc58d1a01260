//! Image loading
//!
//! Decodes a file into an 8-bit RGB bitmap. Anything the `image` crate can
//! open (PNG, JPEG, BMP, TIFF with the enabled features) is accepted.

use image::RgbImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Image loading error types
#[derive(Debug, Error)]
pub enum ImageSourceError {
    #[error("Image not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

pub type Result<T> = std::result::Result<T, ImageSourceError>;

/// Decoded image plus the name it was loaded under
#[derive(Debug, Clone)]
pub struct SourceImage {
    name: String,
    pixels: Arc<RgbImage>,
}

impl SourceImage {
    pub fn new(name: impl Into<String>, pixels: RgbImage) -> Self {
        Self {
            name: name.into(),
            pixels: Arc::new(pixels),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }
}

/// Load an image from disk as RGB8
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<SourceImage> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(ImageSourceError::NotFound(path.to_path_buf()));
    }

    let decoded = image::open(path).map_err(|source| ImageSourceError::Decode {
        path: path.to_path_buf(),
        source,
    })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let rgb = decoded.to_rgb8();
    tracing::info!(
        image = %name,
        width = rgb.width(),
        height = rgb.height(),
        "image loaded"
    );
    Ok(SourceImage::new(name, rgb))
}
