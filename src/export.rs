//! Persisting outputs: one file at a time, or all of them as a zip bundle.
//!
//! Where bytes end up is behind the [`Sink`] trait. [`DirectorySink`] writes
//! into a directory through a temporary file, so a failed write never leaves
//! a partial file behind; [`MemorySink`] keeps everything in memory.
//!
//! ## Bundles
//!
//! [`export_bundle`] builds the whole archive in memory before handing it to
//! the sink. Entries are deflate-compressed, named by their label and stored
//! flat, in the order given. The archive is named
//! `<slug>-icons-<unix-millis>.zip`; when that name is taken, `-1`, `-2`, ...
//! are appended to the stem.

use crate::resources::GeneratedOutput;
use std::collections::{BTreeMap, HashSet};
use std::fs::{self, OpenOptions};
use std::io::{self, Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Suffixes tried after the plain bundle name is taken.
const MAX_NAME_ATTEMPTS: u32 = 100;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("output has an empty label")]
    EmptyLabel,
    #[error("failed to write {name}: {source}")]
    Persist {
        name: String,
        #[source]
        source: io::Error,
    },
}

#[derive(Error, Debug)]
pub enum BundleError {
    #[error("nothing to bundle")]
    Empty,
    #[error("output #{index} has an empty label")]
    EmptyLabel { index: usize },
    #[error("duplicate entry name: {0}")]
    DuplicateLabel(String),
    #[error("archive write failed: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("archive write failed: {0}")]
    Io(#[from] io::Error),
    #[error("failed to persist {name}: {source}")]
    Persist {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("no free bundle name for {0}")]
    NameTaken(String),
}

/// Destination for exported files.
pub trait Sink {
    /// Write `bytes` under `name`, replacing any existing file.
    fn write(&self, name: &str, bytes: &[u8]) -> io::Result<()>;

    /// Write `bytes` under `name`. Fails with [`io::ErrorKind::AlreadyExists`]
    /// if `name` is taken.
    fn write_new(&self, name: &str, bytes: &[u8]) -> io::Result<()>;
}

/// Writes files into one directory, created on first write.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn target(&self, name: &str) -> io::Result<PathBuf> {
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a plain file name: {name:?}"),
            ));
        }
        Ok(self.dir.join(name))
    }

    /// Write to a hidden sibling first; the caller moves it into place.
    fn stage(&self, name: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let tmp = self.dir.join(format!(".{name}.{}.tmp", std::process::id()));
        if let Err(e) = fs::write(&tmp, bytes) {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        Ok(tmp)
    }
}

impl Sink for DirectorySink {
    fn write(&self, name: &str, bytes: &[u8]) -> io::Result<()> {
        let target = self.target(name)?;
        let tmp = self.stage(name, bytes)?;
        fs::rename(&tmp, &target).inspect_err(|_| {
            let _ = fs::remove_file(&tmp);
        })
    }

    fn write_new(&self, name: &str, bytes: &[u8]) -> io::Result<()> {
        let target = self.target(name)?;
        fs::create_dir_all(&self.dir)?;
        // create_new claims the name atomically, on any filesystem.
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)?;
        file.write_all(bytes).and_then(|()| file.sync_all()).inspect_err(|_| {
            let _ = fs::remove_file(&target);
        })
    }
}

/// Keeps written files in memory, keyed by name.
#[derive(Debug, Default)]
pub struct MemorySink {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}

impl Sink for MemorySink {
    fn write(&self, name: &str, bytes: &[u8]) -> io::Result<()> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    fn write_new(&self, name: &str, bytes: &[u8]) -> io::Result<()> {
        let mut files = self.files.lock().unwrap_or_else(PoisonError::into_inner);
        if files.contains_key(name) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{name} exists"),
            ));
        }
        files.insert(name.to_string(), bytes.to_vec());
        Ok(())
    }
}

// =============================================================================
// Single-file export
// =============================================================================

/// Persist one output under its label. Returns the name written.
pub fn export_single(output: &GeneratedOutput, sink: &impl Sink) -> Result<String, ExportError> {
    let name = output.label();
    if name.is_empty() {
        return Err(ExportError::EmptyLabel);
    }
    sink.write(name, &output.bytes)
        .map_err(|source| ExportError::Persist {
            name: name.to_string(),
            source,
        })?;
    log::info!("exported {name} ({} bytes)", output.bytes.len());
    Ok(name.to_string())
}

// =============================================================================
// Bundle export
// =============================================================================

/// Zip `outputs` and persist the archive. Returns the archive's name.
///
/// Nothing is persisted unless every entry was written.
pub fn export_bundle(
    outputs: &[GeneratedOutput],
    bundle_name: &str,
    sink: &impl Sink,
) -> Result<String, BundleError> {
    let archive = build_archive(outputs)?;
    let stem = format!("{}-icons-{}", slug(bundle_name), unix_millis());

    for attempt in 0..=MAX_NAME_ATTEMPTS {
        let name = if attempt == 0 {
            format!("{stem}.zip")
        } else {
            format!("{stem}-{attempt}.zip")
        };
        match sink.write_new(&name, &archive) {
            Ok(()) => {
                log::info!(
                    "bundled {} outputs into {name} ({} bytes)",
                    outputs.len(),
                    archive.len()
                );
                return Ok(name);
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                log::debug!("{name} exists, trying next suffix");
            }
            Err(source) => return Err(BundleError::Persist { name, source }),
        }
    }
    Err(BundleError::NameTaken(stem))
}

/// Build the zip archive in memory.
pub fn build_archive(outputs: &[GeneratedOutput]) -> Result<Vec<u8>, BundleError> {
    if outputs.is_empty() {
        return Err(BundleError::Empty);
    }
    let mut seen = HashSet::new();
    for (index, output) in outputs.iter().enumerate() {
        let label = output.label();
        if label.is_empty() {
            return Err(BundleError::EmptyLabel { index });
        }
        if !seen.insert(label) {
            return Err(BundleError::DuplicateLabel(label.to_string()));
        }
    }

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for output in outputs {
        zip.start_file(output.label(), options)?;
        zip.write_all(&output.bytes)?;
    }
    Ok(zip.finish()?.into_inner())
}

/// Lowercase ASCII alphanumerics joined by single dashes.
///
/// ```
/// assert_eq!(iconcut::export::slug("Browser Extension"), "browser-extension");
/// assert_eq!(iconcut::export::slug("iOS / iPadOS"), "ios-ipados");
/// assert_eq!(iconcut::export::slug("***"), "bundle");
/// ```
pub fn slug(name: &str) -> String {
    let words: Vec<String> = name
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_ascii_lowercase)
        .collect();
    if words.is_empty() {
        "bundle".to_string()
    } else {
        words.join("-")
    }
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::EncodedRaster;
    use crate::resources::OutputManager;
    use crate::types::TargetSize;
    use std::io::Read;
    use tempfile::TempDir;

    fn outputs(labels: &[&str]) -> Vec<GeneratedOutput> {
        let manager = OutputManager::new();
        let set = manager.publish(
            labels
                .iter()
                .map(|l| EncodedRaster {
                    size: TargetSize::new(8, 8, *l),
                    bytes: format!("bytes of {l}").into_bytes(),
                })
                .collect(),
        );
        set.outputs().to_vec()
    }

    fn entry_names(archive: &[u8]) -> Vec<String> {
        let mut zip = zip::ZipArchive::new(Cursor::new(archive)).unwrap();
        (0..zip.len())
            .map(|i| zip.by_index(i).unwrap().name().to_string())
            .collect()
    }

    // =========================================================================
    // Single export
    // =========================================================================

    #[test]
    fn single_export_writes_label() {
        let sink = MemorySink::new();
        let outs = outputs(&["favicon-32x32.png"]);
        let name = export_single(&outs[0], &sink).unwrap();
        assert_eq!(name, "favicon-32x32.png");
        assert_eq!(sink.get(&name).unwrap(), b"bytes of favicon-32x32.png");
    }

    #[test]
    fn single_export_overwrites() {
        let tmp = TempDir::new().unwrap();
        let sink = DirectorySink::new(tmp.path().join("icons"));
        let outs = outputs(&["icon.png"]);
        export_single(&outs[0], &sink).unwrap();
        export_single(&outs[0], &sink).unwrap();
        let written = fs::read(tmp.path().join("icons/icon.png")).unwrap();
        assert_eq!(written, b"bytes of icon.png");
    }

    #[test]
    fn directory_sink_leaves_no_temp_files() {
        let tmp = TempDir::new().unwrap();
        let sink = DirectorySink::new(tmp.path());
        sink.write("a.png", b"a").unwrap();
        sink.write_new("b.zip", b"b").unwrap();
        let mut names: Vec<String> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["a.png", "b.zip"]);
    }

    #[test]
    fn directory_sink_write_new_refuses_existing() {
        let tmp = TempDir::new().unwrap();
        let sink = DirectorySink::new(tmp.path());
        sink.write_new("x.zip", b"first").unwrap();
        let err = sink.write_new("x.zip", b"second").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read(tmp.path().join("x.zip")).unwrap(), b"first");
    }

    #[test]
    fn directory_sink_write_new_creates_missing_dir() {
        let tmp = TempDir::new().unwrap();
        let sink = DirectorySink::new(tmp.path().join("out/icons"));
        sink.write_new("x.zip", b"zip").unwrap();
        assert_eq!(fs::read(tmp.path().join("out/icons/x.zip")).unwrap(), b"zip");
    }

    #[test]
    fn directory_sink_write_new_rejects_paths_before_touching_disk() {
        let tmp = TempDir::new().unwrap();
        let sink = DirectorySink::new(tmp.path().join("out"));
        let err = sink.write_new("../x.zip", b"zip").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(!tmp.path().join("out").exists());
        assert!(!tmp.path().join("x.zip").exists());
    }

    #[test]
    fn directory_sink_rejects_paths() {
        let tmp = TempDir::new().unwrap();
        let sink = DirectorySink::new(tmp.path());
        let err = sink.write("../escape.png", b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    // =========================================================================
    // Bundles
    // =========================================================================

    #[test]
    fn bundle_entries_follow_output_order() {
        let sink = MemorySink::new();
        let outs = outputs(&["icon-128.png", "icon-16.png", "icon-48.png"]);

        let name = export_bundle(&outs, "Browser Extension", &sink).unwrap();

        assert!(name.starts_with("browser-extension-icons-"));
        assert!(name.ends_with(".zip"));
        let archive = sink.get(&name).unwrap();
        assert_eq!(
            entry_names(&archive),
            vec!["icon-128.png", "icon-16.png", "icon-48.png"]
        );

        let mut zip = zip::ZipArchive::new(Cursor::new(archive)).unwrap();
        let mut entry = zip.by_name("icon-16.png").unwrap();
        assert_eq!(entry.compression(), CompressionMethod::Deflated);
        let mut content = Vec::new();
        entry.read_to_end(&mut content).unwrap();
        assert_eq!(content, b"bytes of icon-16.png");
    }

    #[test]
    fn taken_bundle_name_gets_a_suffix() {
        let sink = MemorySink::new();
        let outs = outputs(&["a.png"]);
        // Occupy every name this millisecond could produce without a suffix.
        let now = unix_millis();
        for ms in now..now + 5_000 {
            sink.write(&format!("favicon-icons-{ms}.zip"), b"taken")
                .unwrap();
        }

        let name = export_bundle(&outs, "Favicon", &sink).unwrap();

        assert!(name.ends_with("-1.zip"), "got {name}");
    }

    #[test]
    fn duplicate_labels_abort_before_persisting() {
        let sink = MemorySink::new();
        let outs = outputs(&["a.png", "a.png"]);
        let err = export_bundle(&outs, "x", &sink).unwrap_err();
        assert!(matches!(err, BundleError::DuplicateLabel(ref l) if l == "a.png"));
        assert!(sink.names().is_empty());
    }

    #[test]
    fn empty_label_aborts() {
        let sink = MemorySink::new();
        let outs = outputs(&["a.png", ""]);
        let err = export_bundle(&outs, "x", &sink).unwrap_err();
        assert!(matches!(err, BundleError::EmptyLabel { index: 1 }));
        assert!(sink.names().is_empty());
    }

    #[test]
    fn empty_bundle_is_rejected() {
        assert!(matches!(build_archive(&[]), Err(BundleError::Empty)));
    }

    #[test]
    fn slug_examples() {
        assert_eq!(slug("Complete Set"), "complete-set");
        assert_eq!(slug("  Android--Icons  "), "android-icons");
        assert_eq!(slug(""), "bundle");
    }
}
