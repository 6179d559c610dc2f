//! Parameter types for image operations.
//!
//! These structs describe *what* to render, not *how*. They are the interface
//! between the [`pipeline`](crate::pipeline) (which decides what outputs to
//! create) and the [`backend`](super::backend) (which does the pixel work), so
//! a mock backend can stand in during tests.
//!
//! ## Types
//!
//! - [`Resampling`]: Filter used to map the crop region onto the target grid.
//! - [`PixelRect`]: Crop region snapped to whole source pixels.
//! - [`RenderParams`]: Full specification of one output: region, target size, filter.

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

/// Resampling filter for the crop-to-target mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resampling {
    Nearest,
    #[default]
    Bilinear,
    Lanczos3,
}

impl Resampling {
    pub fn filter_type(self) -> FilterType {
        match self {
            Resampling::Nearest => FilterType::Nearest,
            Resampling::Bilinear => FilterType::Triangle,
            Resampling::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// A region of the source in whole pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Everything needed to render one output from a decoded source.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderParams {
    pub region: PixelRect,
    pub width: u32,
    pub height: u32,
    pub filter: Resampling,
}
