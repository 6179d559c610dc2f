//! Configuration module.
//!
//! Handles loading, validating, and merging `iconcut.toml`. Stock defaults
//! are serialized to a TOML table, the user's file is merged on top, and the
//! result is deserialized with unknown keys rejected.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [upload]
//! max_bytes = 10485760                          # 10 MiB
//! accepted_types = ["image/png", "image/jpeg", "image/jpg"]
//!
//! [editor]
//! min_dim = 50              # Smallest crop side, in source pixels
//! handle_hit_size = 28.0    # Resize grip hit box, in rendered pixels
//!
//! [raster]
//! filter = "bilinear"       # nearest | bilinear | lanczos3
//!
//! [export]
//! output_dir = "icons"
//!
//! [processing]
//! parallel = true           # Render sizes concurrently
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//!
//! [[platforms]]             # Extra presets, appended to the built-in catalog
//! id = "watch"
//! name = "Watch Face"
//! sizes = [{ width = 40, height = 40, label = "watch-40.png" }]
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse. Override just the values you want:
//!
//! ```toml
//! [editor]
//! min_dim = 32
//! ```

use crate::imaging::Resampling;
use crate::presets;
use crate::types::PlatformPreset;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File name looked up in the config directory.
pub const CONFIG_FILE: &str = "iconcut.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Application configuration loaded from `iconcut.toml`.
///
/// All fields have defaults; user files only name what they change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Limits on accepted input files.
    pub upload: UploadConfig,
    /// Crop editor constraints.
    pub editor: EditorConfig,
    /// Resampling settings.
    pub raster: RasterConfig,
    /// Export destination.
    pub export: ExportConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
    /// User presets appended to the built-in catalog.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub platforms: Vec<PlatformPreset>,
}

impl AppConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upload.max_bytes == 0 {
            return Err(ConfigError::Validation(
                "upload.max_bytes must be greater than 0".into(),
            ));
        }
        if self.upload.accepted_types.is_empty() {
            return Err(ConfigError::Validation(
                "upload.accepted_types must not be empty".into(),
            ));
        }
        if !(self.editor.min_dim >= 1.0 && self.editor.min_dim.is_finite()) {
            return Err(ConfigError::Validation(
                "editor.min_dim must be at least 1".into(),
            ));
        }
        if !(self.editor.handle_hit_size > 0.0 && self.editor.handle_hit_size.is_finite()) {
            return Err(ConfigError::Validation(
                "editor.handle_hit_size must be positive".into(),
            ));
        }

        let mut ids: HashSet<String> = presets::builtin_presets()
            .into_iter()
            .map(|p| p.id)
            .collect();
        for preset in &self.platforms {
            if !ids.insert(preset.id.clone()) {
                return Err(ConfigError::Validation(format!(
                    "platforms: duplicate id '{}'",
                    preset.id
                )));
            }
            if preset.sizes.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "platforms.{}: sizes must not be empty",
                    preset.id
                )));
            }
            for size in &preset.sizes {
                if size.width == 0 || size.height == 0 {
                    return Err(ConfigError::Validation(format!(
                        "platforms.{}: '{}' has a zero dimension",
                        preset.id, size.label
                    )));
                }
                if size.label.trim().is_empty() {
                    return Err(ConfigError::Validation(format!(
                        "platforms.{}: every size needs a label",
                        preset.id
                    )));
                }
            }
        }
        Ok(())
    }

    /// Built-in presets plus the ones declared in this config.
    pub fn catalog(&self) -> Vec<PlatformPreset> {
        presets::catalog(&self.platforms)
    }
}

/// Input file limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadConfig {
    /// Largest accepted payload in bytes.
    pub max_bytes: u64,
    /// Accepted media types, compared case-insensitively.
    pub accepted_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024,
            accepted_types: vec![
                "image/png".to_string(),
                "image/jpeg".to_string(),
                "image/jpg".to_string(),
            ],
        }
    }
}

/// Crop editor constraints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EditorConfig {
    /// Smallest allowed crop side, in source pixels.
    pub min_dim: f64,
    /// Side of the square hit box around each resize grip, in rendered pixels.
    pub handle_hit_size: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            min_dim: 50.0,
            handle_hit_size: 28.0,
        }
    }
}

/// Resampling settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RasterConfig {
    pub filter: Resampling,
}

/// Export destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    /// Directory single files and bundles are written to.
    pub output_dir: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: "icons".to_string(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Render the sizes of one batch concurrently.
    pub parallel: bool,
    /// Maximum number of parallel workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_processes: Option<usize>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            max_processes: None,
        }
    }
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(AppConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `iconcut.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the directory has no config file.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<AppConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: AppConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `iconcut.toml` in the given directory.
pub fn load_config(dir: &Path) -> Result<AppConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(dir)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `iconcut.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# iconcut configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.

# ---------------------------------------------------------------------------
# Accepted input
# ---------------------------------------------------------------------------
[upload]
# Largest accepted source file, in bytes (10 MiB).
max_bytes = 10485760

# Media types accepted as source images.
accepted_types = ["image/png", "image/jpeg", "image/jpg"]

# ---------------------------------------------------------------------------
# Crop editor
# ---------------------------------------------------------------------------
[editor]
# Smallest crop side in source pixels. Sources smaller than this are
# selected whole.
min_dim = 50

# Side of the square hit box around each resize grip, in rendered pixels.
handle_hit_size = 28.0

# ---------------------------------------------------------------------------
# Rasterization
# ---------------------------------------------------------------------------
[raster]
# Resampling filter: "nearest", "bilinear" or "lanczos3".
filter = "bilinear"

# ---------------------------------------------------------------------------
# Export
# ---------------------------------------------------------------------------
[export]
# Directory single files and bundles are written to.
output_dir = "icons"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Render the sizes of one batch concurrently.
parallel = true

# Maximum parallel workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4

# ---------------------------------------------------------------------------
# Custom platforms (appended to the built-in catalog)
# ---------------------------------------------------------------------------
# [[platforms]]
# id = "watch"
# name = "Watch Face"
# description = "Complication icons"
# sizes = [
#     { width = 40, height = 40, label = "watch-40.png" },
#     { width = 88, height = 88, label = "watch-88.png" },
# ]
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = AppConfig::default();
        assert_eq!(config.upload.max_bytes, 10 * 1024 * 1024);
        assert_eq!(config.editor.min_dim, 50.0);
        assert_eq!(config.raster.filter, Resampling::Bilinear);
        assert_eq!(config.export.output_dir, "icons");
        assert!(config.processing.parallel);
        assert!(config.platforms.is_empty());
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[editor]
min_dim = 32
"#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.editor.min_dim, 32.0);
        // Defaults preserved
        assert_eq!(config.editor.handle_hit_size, 28.0);
        assert_eq!(config.upload.accepted_types.len(), 3);
    }

    #[test]
    fn parse_filter_names() {
        let config: AppConfig = toml::from_str("[raster]\nfilter = \"lanczos3\"").unwrap();
        assert_eq!(config.raster.filter, Resampling::Lanczos3);
        let config: AppConfig = toml::from_str("[raster]\nfilter = \"nearest\"").unwrap();
        assert_eq!(config.raster.filter, Resampling::Nearest);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result: Result<AppConfig, _> = toml::from_str("[editor]\nmin_size = 10");
        assert!(result.is_err());
    }

    #[test]
    fn stock_config_parses_to_defaults() {
        let config: AppConfig = toml::from_str(stock_config_toml()).unwrap();
        let defaults = AppConfig::default();
        assert_eq!(config.upload.max_bytes, defaults.upload.max_bytes);
        assert_eq!(config.upload.accepted_types, defaults.upload.accepted_types);
        assert_eq!(config.editor.min_dim, defaults.editor.min_dim);
        assert_eq!(config.raster.filter, defaults.raster.filter);
        assert_eq!(config.export.output_dir, defaults.export.output_dir);
        config.validate().unwrap();
    }

    // =========================================================================
    // merge / load
    // =========================================================================

    #[test]
    fn merge_overrides_nested_keys_only() {
        let base = stock_defaults_value().unwrap();
        let overlay: toml::Value = toml::from_str("[upload]\nmax_bytes = 1024").unwrap();
        let config = resolve_config(base, Some(overlay)).unwrap();
        assert_eq!(config.upload.max_bytes, 1024);
        assert_eq!(config.upload.accepted_types.len(), 3);
    }

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.editor.min_dim, 50.0);
    }

    #[test]
    fn load_config_reads_file_with_custom_platform() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE),
            r#"
[export]
output_dir = "out"

[[platforms]]
id = "watch"
name = "Watch Face"
sizes = [{ width = 40, height = 40, label = "watch-40.png" }]
"#,
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.export.output_dir, "out");
        assert_eq!(config.platforms.len(), 1);
        assert_eq!(config.platforms[0].sizes[0].label, "watch-40.png");
        assert!(config.catalog().iter().any(|p| p.id == "watch"));
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "this is not valid toml [[[").unwrap();
        let result = load_config(tmp.path());
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    // =========================================================================
    // validation
    // =========================================================================

    #[test]
    fn validate_rejects_zero_max_bytes() {
        let mut config = AppConfig::default();
        config.upload.max_bytes = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_rejects_tiny_min_dim() {
        let mut config = AppConfig::default();
        config.editor.min_dim = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_preset_colliding_with_builtin() {
        let mut config = AppConfig::default();
        config.platforms.push(PlatformPreset {
            id: "favicon".into(),
            name: "Mine".into(),
            description: String::new(),
            sizes: vec![crate::types::TargetSize::new(16, 16, "a.png")],
        });
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("duplicate id 'favicon'"), "{err}");
    }

    #[test]
    fn validate_rejects_zero_sized_target() {
        let mut config = AppConfig::default();
        config.platforms.push(PlatformPreset {
            id: "broken".into(),
            name: "Broken".into(),
            description: String::new(),
            sizes: vec![crate::types::TargetSize::new(0, 16, "a.png")],
        });
        assert!(config.validate().is_err());
    }

    // =========================================================================
    // Processing config tests
    // =========================================================================

    #[test]
    fn effective_threads_auto() {
        let config = ProcessingConfig::default();
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&config), cores);
    }

    #[test]
    fn effective_threads_clamped_to_cores() {
        let config = ProcessingConfig {
            parallel: true,
            max_processes: Some(99999),
        };
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&config), cores);
    }

    #[test]
    fn effective_threads_zero_means_one() {
        let config = ProcessingConfig {
            parallel: true,
            max_processes: Some(0),
        };
        assert_eq!(effective_threads(&config), 1);
    }
}
