//! Raster backend trait and shared types.
//!
//! The [`RasterBackend`] trait defines the two operations every backend must
//! support: decode a PNG/JPEG payload into a [`SourceImage`], and render one
//! output (crop → resample → encode) from it.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. Tests use the recording `MockBackend` below.

use super::params::RenderParams;
use image::RgbaImage;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// A decoded source raster.
///
/// Pixels are shared behind an `Arc`: cloning is cheap and the buffer is
/// never mutated after decode.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pixels: Arc<RgbaImage>,
}

impl SourceImage {
    pub fn new(pixels: RgbaImage) -> Self {
        Self {
            pixels: Arc::new(pixels),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width(),
            height: self.height(),
        }
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }
}

/// Trait for raster backends.
///
/// `Sync` so one backend can serve every size of a batch on the rayon pool.
pub trait RasterBackend: Sync {
    /// Decode an encoded image payload.
    fn decode(&self, data: &[u8]) -> Result<SourceImage, BackendError>;

    /// Render one output and return its encoded bytes.
    fn render(&self, source: &SourceImage, params: &RenderParams) -> Result<Vec<u8>, BackendError>;
}
