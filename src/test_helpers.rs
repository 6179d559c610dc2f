//! Shared test utilities for the iconcut test suite.
//!
//! Builds synthetic images in memory so no test depends on fixture files.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let img = bordered_image(1000, 250, RED, GREEN);
//! let bytes = png_bytes(&img);
//! let upload = png_upload("photo.png", &img);
//! ```

use crate::upload::Upload;
use image::codecs::jpeg::JpegEncoder;
use image::{ImageEncoder, Rgba, RgbaImage};

pub const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
pub const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

// =========================================================================
// Synthetic rasters
// =========================================================================

/// `size × size` square: a `border`-wide frame in `outer`, the rest in `inner`.
pub fn bordered_image(size: u32, border: u32, outer: Rgba<u8>, inner: Rgba<u8>) -> RgbaImage {
    RgbaImage::from_fn(size, size, |x, y| {
        let inside = (border..size - border).contains(&x) && (border..size - border).contains(&y);
        if inside { inner } else { outer }
    })
}

/// Top-left quadrant red, the rest blue.
pub fn quadrant_image(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        if x < width / 2 && y < height / 2 {
            RED
        } else {
            BLUE
        }
    })
}

// =========================================================================
// Encoded payloads
// =========================================================================

/// Encode `img` as PNG.
pub fn png_bytes(img: &RgbaImage) -> Vec<u8> {
    crate::imaging::encode_png(img).unwrap()
}

/// A grey JPEG of the given size.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let rgb = image::RgbImage::from_pixel(width, height, image::Rgb([128, 128, 128]));
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, 90)
        .write_image(rgb.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    buf
}

/// A PNG upload with a declared media type.
pub fn png_upload(name: &str, img: &RgbaImage) -> Upload {
    Upload::new(name, Some("image/png".to_string()), png_bytes(img))
}
