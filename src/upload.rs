//! Accepting a source file.
//!
//! An [`Upload`] is a name, an optional declared media type and the raw
//! bytes. [`Upload::validate`] checks it against the `[upload]` config before
//! anything tries to decode it. Undeclared media types are inferred from the
//! file extension.

use crate::config::UploadConfig;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please upload a PNG or JPEG image (got {0})")]
    UnsupportedMediaType(String),
    #[error("File is too large ({size} bytes). Maximum size is {max} bytes")]
    TooLarge { size: u64, max: u64 },
    #[error("File is empty")]
    Empty,
}

/// Reading an upload from disk.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Rejected(#[from] ValidationError),
}

/// A file picked by the user.
#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub media_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(name: impl Into<String>, media_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type,
            bytes,
        }
    }

    /// Read a file from disk; the media type is left to inference.
    ///
    /// Never reads more than `config.max_bytes + 1` bytes: a file over the
    /// limit is rejected from its metadata, or as soon as the read passes it.
    pub fn from_path(path: &Path, config: &UploadConfig) -> Result<Self, UploadError> {
        let max = config.max_bytes;
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        if len > max {
            return Err(ValidationError::TooLarge { size: len, max }.into());
        }
        let mut bytes = Vec::new();
        file.take(max.saturating_add(1)).read_to_end(&mut bytes)?;
        let read = bytes.len() as u64;
        if read > max {
            return Err(ValidationError::TooLarge { size: read, max }.into());
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, None, bytes))
    }

    /// Declared media type, or one inferred from the extension.
    pub fn effective_media_type(&self) -> Option<String> {
        self.media_type
            .as_deref()
            .map(|t| t.trim().to_ascii_lowercase())
            .or_else(|| media_type_for(&self.name).map(str::to_string))
    }

    /// Check type and size limits.
    pub fn validate(&self, config: &UploadConfig) -> Result<(), ValidationError> {
        let media_type = self.effective_media_type().unwrap_or_default();
        let accepted = config
            .accepted_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(&media_type));
        if !accepted {
            let shown = if media_type.is_empty() {
                format!("unknown type for {}", self.name)
            } else {
                media_type
            };
            return Err(ValidationError::UnsupportedMediaType(shown));
        }

        let size = self.bytes.len() as u64;
        if size > config.max_bytes {
            return Err(ValidationError::TooLarge {
                size,
                max: config.max_bytes,
            });
        }
        if size == 0 {
            return Err(ValidationError::Empty);
        }
        Ok(())
    }
}

/// Media type for a file name's extension, if it is an image type we know.
pub fn media_type_for(name: &str) -> Option<&'static str> {
    let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}
