//! Raster work: decode, crop, resample, encode.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::load_from_memory_with_format` (PNG, JPEG) |
//! | **Snap crop** | [`pixel_rect`] (pure math) |
//! | **Resample** | `imageops::resize` with the configured [`Resampling`] |
//! | **Encode** | `PngEncoder`, RGBA8 |
//!
//! The module is split into:
//! - **Calculations**: Pure functions mapping crops onto pixels (unit testable)
//! - **Parameters**: Data structures describing one render
//! - **Backend**: [`RasterBackend`] trait + [`RustBackend`]

pub mod backend;
mod calculations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, RasterBackend, SourceImage};
pub use calculations::pixel_rect;
pub use params::{PixelRect, RenderParams, Resampling};
pub use rust_backend::{RustBackend, encode_png};
