//! Format detection and deserialization helpers shared by the config loader
//! and the demonstration-module loader.
//!
//! Files are RON, TOML, or JSON; the format is chosen by extension.

use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur while reading a data file.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Return the first of `candidates` (file names relative to `dir`) that
/// exists as a regular file.
pub fn find_first_existing(dir: &Path, candidates: &[&str]) -> Option<PathBuf> {
    candidates
        .iter()
        .map(|name| dir.join(name))
        .find(|candidate| candidate.is_file())
}

// ===========================================================================
// Deserialization
// ===========================================================================

/// RON options for authored files: optional fields may be written bare,
/// without `Some(..)`.
fn ron_options() -> ron::Options {
    ron::Options::default().with_default_extension(ron::extensions::Extensions::IMPLICIT_SOME)
}

/// Deserialize `content` as `format`, attributing errors to `path`.
pub fn deserialize_str<T: DeserializeOwned>(
    content: &str,
    format: Format,
    path: &Path,
) -> Result<T, DataLoadError> {
    let parse_err = |detail: String| DataLoadError::Parse {
        file: path.to_path_buf(),
        detail,
    };

    match format {
        Format::Ron => ron_options()
            .from_str(content)
            .map_err(|e| parse_err(e.to_string())),
        Format::Json => serde_json::from_str(content).map_err(|e| parse_err(e.to_string())),
        Format::Toml => toml::from_str(content).map_err(|e| parse_err(e.to_string())),
    }
}

/// Read a file and deserialize it according to its format (detected from extension).
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    deserialize_str(&content, format, path)
}

// ===========================================================================
// Tests
// ===========================================================================
