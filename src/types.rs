//! Shared types passed between the catalog, the pipeline and the exporters.
//!
//! These are serialized both ways: presets come from `iconcut.toml` and the
//! `platforms --json` command writes them back out.

use serde::{Deserialize, Serialize};

/// One requested output: raster dimensions plus the file name it exports as.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetSize {
    pub width: u32,
    pub height: u32,
    /// Export file name, also the entry name inside a bundle.
    pub label: String,
}

impl TargetSize {
    pub fn new(width: u32, height: u32, label: impl Into<String>) -> Self {
        Self {
            width,
            height,
            label: label.into(),
        }
    }
}

/// A named, ordered list of target sizes for one platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlatformPreset {
    /// Stable identifier used on the command line (`--platform favicon`).
    pub id: String,
    /// Display name; also the stem of the bundle archive name.
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub sizes: Vec<TargetSize>,
}
