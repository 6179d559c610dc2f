//! # iconcut
//!
//! Crop one source image and render it as a full set of platform icons.
//!
//! # Architecture: Three Cooperating Parts
//!
//! ```text
//! 1. Edit      pointer events  →  CropRect        (editor + geometry)
//! 2. Render    source + crop   →  EncodedRaster[] (pipeline + imaging)
//! 3. Publish   rasters         →  OutputSet       (resources + export)
//! ```
//!
//! A [`session::Session`] owns one of each and decides when outputs stay
//! valid: any crop change or new image discards them, and a render that
//! finishes after such a change is dropped unseen.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`geometry`] | Crop rectangles, resize handles, clamping and constraint math |
//! | [`editor`] | Pointer-driven move/resize state machine over a scaled view |
//! | [`pipeline`] | Batch rendering of target sizes, in order, all or nothing |
//! | [`imaging`] | Raster backend: decode, crop, resample, PNG encode |
//! | [`resources`] | Handles for published outputs and their release |
//! | [`export`] | Single-file and zip bundle export through a [`export::Sink`] |
//! | [`upload`] | Source file type and size checks |
//! | [`presets`] | Built-in platform catalog |
//! | [`session`] | Orchestration, generations, stale-result handling |
//! | [`config`] | `iconcut.toml` loading, merging and validation |
//! | [`types`] | Target sizes and platform presets |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Stretch, Never Letterbox
//!
//! Each output is the crop region resampled to exactly the target size. A
//! non-square crop on a square target is stretched.
//!
//! ## PNG With Alpha Only
//!
//! Every output is RGBA PNG, whatever the source format. Transparent source
//! pixels stay transparent.
//!
//! ## Scoped Handles
//!
//! Published outputs are addressable through `blob:iconcut/<n>` handles that
//! live in the [`resources::OutputManager`]. The set the session holds
//! releases them exactly once, when it is replaced, cleared or dropped.

pub mod config;
pub mod editor;
pub mod export;
pub mod geometry;
pub mod imaging;
pub mod output;
pub mod pipeline;
pub mod presets;
pub mod resources;
pub mod session;
pub mod types;
pub mod upload;

#[cfg(test)]
pub(crate) mod test_helpers;
