//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Platforms
//!
//! ```text
//! 001 favicon: Website Favicon (7 sizes)
//!     For website icons and browser tabs
//!     16x16 favicon-16x16.png
//!     32x32 favicon-32x32.png
//! ```
//!
//! ## Check
//!
//! ```text
//! logo.png: 1024x768 image/png (84.2 KB)
//!     Default crop: 768x768 at 128,0
//! ```
//!
//! ## Generate
//!
//! ```text
//! Rendering 3 sizes from 768x768 at 128,0 of 1024x768
//!     002 32x32 favicon-32x32.png (1.9 KB)
//!     001 16x16 favicon-16x16.png (712 B)
//!     003 48x48 favicon-48x48.png (3.1 KB)
//! Rendered 3 outputs
//! Wrote icons/favicon-icons-1718000000000.zip
//! ```
//!
//! Progress lines arrive in completion order; the index is the size's
//! position in the preset.
//!
//! # Architecture
//!
//! Each display has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::geometry::CropRect;
use crate::pipeline::ProcessEvent;
use crate::resources::GeneratedOutput;
use crate::types::{PlatformPreset, TargetSize};
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Human-readable byte count.
fn format_bytes(n: usize) -> String {
    const KB: f64 = 1024.0;
    let f = n as f64;
    if f < KB {
        format!("{n} B")
    } else if f < KB * KB {
        format!("{:.1} KB", f / KB)
    } else {
        format!("{:.1} MB", f / (KB * KB))
    }
}

/// `16x16 favicon-16x16.png`
fn size_line(size: &TargetSize) -> String {
    format!("{}x{} {}", size.width, size.height, size.label)
}

/// `768x768 at 128,0`, rounded to whole pixels.
fn crop_line(crop: &CropRect) -> String {
    let (x, y, w, h) = crop.rounded();
    format!("{w}x{h} at {x},{y}")
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate_desc(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

// ============================================================================
// Platforms
// ============================================================================

/// Format the preset catalog: one header per preset, its sizes indented.
pub fn format_platforms(presets: &[PlatformPreset]) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, preset) in presets.iter().enumerate() {
        lines.push(format!(
            "{} {}: {} ({} sizes)",
            format_index(i + 1),
            preset.id,
            preset.name,
            preset.sizes.len()
        ));
        if !preset.description.is_empty() {
            lines.push(format!(
                "{}{}",
                indent(1),
                truncate_desc(&preset.description, 60)
            ));
        }
        for size in &preset.sizes {
            lines.push(format!("{}{}", indent(1), size_line(size)));
        }
    }
    lines
}

pub fn print_platforms(presets: &[PlatformPreset]) {
    for line in format_platforms(presets) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

/// Format the result of validating and decoding a source image.
pub fn format_check(
    name: &str,
    media_type: &str,
    byte_len: usize,
    dimensions: (u32, u32),
    default_crop: &CropRect,
) -> Vec<String> {
    vec![
        format!(
            "{}: {}x{} {} ({})",
            name,
            dimensions.0,
            dimensions.1,
            media_type,
            format_bytes(byte_len)
        ),
        format!("{}Default crop: {}", indent(1), crop_line(default_crop)),
    ]
}

// ============================================================================
// Generate
// ============================================================================

/// Format a single progress event as display lines.
pub fn format_process_event(event: &ProcessEvent) -> Vec<String> {
    match event {
        ProcessEvent::Started {
            source_width,
            source_height,
            region,
            total,
        } => vec![format!(
            "Rendering {} sizes from {}x{} at {},{} of {}x{}",
            total, region.width, region.height, region.x, region.y, source_width, source_height
        )],
        ProcessEvent::SizeEncoded {
            index,
            label,
            width,
            height,
            bytes,
        } => vec![format!(
            "{}{} {}x{} {} ({})",
            indent(1),
            format_index(index + 1),
            width,
            height,
            label,
            format_bytes(*bytes)
        )],
        ProcessEvent::Finished { count } => vec![format!("Rendered {} outputs", count)],
    }
}

/// Format published outputs with their handles.
pub fn format_outputs(outputs: &[GeneratedOutput]) -> Vec<String> {
    outputs
        .iter()
        .enumerate()
        .map(|(i, out)| {
            format!(
                "{} {} \u{2192} {}",
                format_index(i + 1),
                size_line(&out.size),
                out.handle.uri()
            )
        })
        .collect()
}

pub fn print_outputs(outputs: &[GeneratedOutput]) {
    for line in format_outputs(outputs) {
        println!("{}", line);
    }
}

/// Format the files an export wrote.
pub fn format_export(names: &[String], dir: &Path) -> Vec<String> {
    names
        .iter()
        .map(|name| format!("Wrote {}", dir.join(name).display()))
        .collect()
}

pub fn print_export(names: &[String], dir: &Path) {
    for line in format_export(names, dir) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
