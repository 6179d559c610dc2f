//! Pure Rust raster backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Sniff format | `image::guess_format` (PNG and JPEG only) |
//! | Decode | `image::load_from_memory_with_format` → RGBA8 |
//! | Crop | `image::imageops::crop_imm` into a scratch surface |
//! | Resample | `image::imageops::resize` (Nearest / Triangle / Lanczos3) |
//! | Encode → PNG | `image::codecs::png::PngEncoder` (RGBA8, lossless) |
//!
//! Every render allocates its own scratch surface and drops it before
//! returning, so concurrent renders never share pixel buffers.

use super::backend::{BackendError, RasterBackend, SourceImage};
use super::params::RenderParams;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageFormat, RgbaImage, imageops};

/// Formats with decoders compiled in.
const INPUT_FORMATS: &[ImageFormat] = &[ImageFormat::Png, ImageFormat::Jpeg];

/// Backend built on the `image` crate.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode an RGBA buffer as PNG. Fully transparent pixels stay transparent.
pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>, BackendError> {
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf)
        .write_image(
            img.as_raw(),
            img.width(),
            img.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|e| BackendError::ProcessingFailed(format!("PNG encode failed: {e}")))?;
    Ok(buf)
}

impl RasterBackend for RustBackend {
    fn decode(&self, data: &[u8]) -> Result<SourceImage, BackendError> {
        let format = image::guess_format(data)
            .map_err(|e| BackendError::UnsupportedFormat(e.to_string()))?;
        if !INPUT_FORMATS.contains(&format) {
            return Err(BackendError::UnsupportedFormat(format!("{format:?}")));
        }
        let decoded = image::load_from_memory_with_format(data, format)
            .map_err(|e| BackendError::ProcessingFailed(format!("Failed to decode: {e}")))?;
        if decoded.width() == 0 || decoded.height() == 0 {
            return Err(BackendError::ProcessingFailed(
                "image has no pixels".to_string(),
            ));
        }
        Ok(SourceImage::new(decoded.to_rgba8()))
    }

    fn render(&self, source: &SourceImage, params: &RenderParams) -> Result<Vec<u8>, BackendError> {
        if params.width == 0 || params.height == 0 {
            return Err(BackendError::ProcessingFailed(format!(
                "target {}x{} has no pixels",
                params.width, params.height
            )));
        }
        let region = params.region;
        if region.width == 0
            || region.height == 0
            || region.x + region.width > source.width()
            || region.y + region.height > source.height()
        {
            return Err(BackendError::ProcessingFailed(format!(
                "region {}x{}+{}+{} outside {}x{} source",
                region.width,
                region.height,
                region.x,
                region.y,
                source.width(),
                source.height()
            )));
        }

        let surface: RgbaImage = imageops::crop_imm(
            source.pixels(),
            region.x,
            region.y,
            region.width,
            region.height,
        )
        .to_image();
        let resized = imageops::resize(
            &surface,
            params.width,
            params.height,
            params.filter.filter_type(),
        );
        drop(surface);
        encode_png(&resized)
    }
}
