//! Built-in platform catalog.
//!
//! Each preset is an ordered list of [`TargetSize`]s; the order is the order
//! outputs are generated, previewed and bundled in. Users can append presets
//! of their own through `[[platforms]]` in `iconcut.toml`.

use crate::types::{PlatformPreset, TargetSize};

fn preset(id: &str, name: &str, description: &str, sizes: &[(u32, &str)]) -> PlatformPreset {
    PlatformPreset {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        sizes: sizes
            .iter()
            .map(|&(side, label)| TargetSize::new(side, side, label))
            .collect(),
    }
}

/// The stock catalog, in display order.
pub fn builtin_presets() -> Vec<PlatformPreset> {
    vec![
        preset(
            "favicon",
            "Website Favicon",
            "For website icons and browser tabs",
            &[
                (16, "favicon-16x16.png"),
                (32, "favicon-32x32.png"),
                (48, "favicon-48x48.png"),
                (96, "favicon-96x96.png"),
                (144, "favicon-144x144.png"),
                (180, "apple-touch-icon.png"),
                (192, "android-chrome-192x192.png"),
            ],
        ),
        preset(
            "browser-extension",
            "Browser Extension",
            "For Chrome/Firefox extensions",
            &[
                (16, "extension-16x16.png"),
                (32, "extension-32x32.png"),
                (48, "extension-48x48.png"),
                (128, "extension-128x128.png"),
                (256, "extension-256x256.png"),
                (512, "extension-512x512.png"),
            ],
        ),
        preset(
            "ios",
            "iOS App",
            "For Apple App Store",
            &[
                (60, "ios-60x60.png"),
                (120, "ios-120x120.png"),
                (180, "ios-180x180.png"),
            ],
        ),
        preset(
            "android",
            "Android App",
            "For Google Play Store",
            &[
                (48, "android-48x48.png"),
                (96, "android-96x96.png"),
                (192, "android-192x192.png"),
            ],
        ),
        preset(
            "complete-set",
            "Complete Icon Set",
            "All essential sizes for web and apps",
            &[
                (16, "icon-16x16.png"),
                (32, "icon-32x32.png"),
                (48, "icon-48x48.png"),
                (96, "icon-96x96.png"),
                (128, "icon-128x128.png"),
                (144, "icon-144x144.png"),
                (180, "icon-180x180.png"),
                (192, "icon-192x192.png"),
                (256, "icon-256x256.png"),
                (512, "icon-512x512.png"),
            ],
        ),
    ]
}

/// Built-in presets followed by `extra` (user presets from config).
pub fn catalog(extra: &[PlatformPreset]) -> Vec<PlatformPreset> {
    let mut all = builtin_presets();
    all.extend(extra.iter().cloned());
    all
}

/// Find a preset by id.
pub fn find<'a>(presets: &'a [PlatformPreset], id: &str) -> Option<&'a PlatformPreset> {
    presets.iter().find(|p| p.id == id)
}
