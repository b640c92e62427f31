use std::path::{Path, PathBuf};

use showcase_data::loader::deserialize_file;
use showcase_data::schema::{ExportData, MetaData, ModuleData};

/// A loaded demonstration module.
///
/// Immutable once loaded; a reload produces a new value rather than
/// mutating this one.
#[derive(Debug, Clone)]
pub struct DemonstrationModule {
    pub path: PathBuf,
    pub meta: MetaData,
    /// Exports in declaration order.
    pub exports: Vec<ExportData>,
}

/// A module file could not be read or deserialized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to load {path}: {detail}")]
pub struct ModuleLoadError {
    pub path: PathBuf,
    pub detail: String,
}

impl DemonstrationModule {
    /// Read and deserialize a module file.
    pub fn load(path: &Path) -> Result<Self, ModuleLoadError> {
        let data: ModuleData = deserialize_file(path).map_err(|e| ModuleLoadError {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        Ok(Self::from_data(path, data))
    }

    pub fn from_data(path: impl Into<PathBuf>, data: ModuleData) -> Self {
        Self {
            path: path.into(),
            meta: data.meta,
            exports: data.exports,
        }
    }
}
