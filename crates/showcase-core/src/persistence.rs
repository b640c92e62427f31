//! Durable selection and theme storage.
//!
//! Reads never fail: a missing, unreadable or corrupt store reads as "no
//! persisted selection". Writes go through immediately.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, warn};

use crate::theme::ThemePreference;

pub const SHOWCASE_ID_KEY: &str = "selection.showcaseId";
pub const THEME_KEY: &str = "selection.theme";

/// Store file name inside the per-user config directory.
pub const STORE_FILE: &str = "selection.toml";

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("corrupt store {path}: {detail}")]
    Corrupt { path: PathBuf, detail: String },

    #[error("failed to serialize store: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// A durable per-user string key-value store.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;

    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError>;
}

// ---------------------------------------------------------------------------
// Memory
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// File
// ---------------------------------------------------------------------------

/// A flat TOML table on disk, rewritten on every `set`.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The store in the platform's per-user config directory, falling back
    /// to the working directory when none can be determined.
    pub fn user_default() -> Self {
        let path = directories::ProjectDirs::from("dev", "showcase", "showcase")
            .map(|dirs| dirs.config_dir().join(STORE_FILE))
            .unwrap_or_else(|| PathBuf::from(STORE_FILE));
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_table(&self) -> Result<BTreeMap<String, String>, PersistenceError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(PersistenceError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        let content = String::from_utf8(bytes).map_err(|e| PersistenceError::Corrupt {
            path: self.path.clone(),
            detail: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| PersistenceError::Corrupt {
            path: self.path.clone(),
            detail: e.to_string(),
        })
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.read_table()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        let mut table = table_for_write(self.read_table())?;
        table.insert(key.to_string(), value.to_string());

        let io = |source| PersistenceError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io)?;
        }
        let content = toml::to_string(&table)?;
        std::fs::write(&self.path, content).map_err(io)?;
        debug!(key, path = %self.path.display(), "persisted");
        Ok(())
    }
}

/// The table a write starts from. Corrupt contents are dropped; any other
/// read failure aborts the write so the remaining keys survive.
fn table_for_write(
    read: Result<BTreeMap<String, String>, PersistenceError>,
) -> Result<BTreeMap<String, String>, PersistenceError> {
    match read {
        Ok(table) => Ok(table),
        Err(e @ PersistenceError::Corrupt { .. }) => {
            warn!(error = %e, "discarding corrupt selection store");
            Ok(BTreeMap::new())
        }
        Err(e) => Err(e),
    }
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// What was selected when the session last ended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedSelection {
    pub showcase_id: Option<String>,
    pub theme: ThemePreference,
}

/// Read the persisted selection; any problem yields the default.
pub fn read_selection(store: &dyn KeyValueStore) -> PersistedSelection {
    let showcase_id = store.get(SHOWCASE_ID_KEY).unwrap_or_else(|e| {
        warn!(error = %e, "ignoring persisted showcase id");
        None
    });
    let theme = match store.get(THEME_KEY) {
        Ok(Some(raw)) => raw.parse().unwrap_or_else(|e| {
            warn!(error = %e, "ignoring persisted theme");
            ThemePreference::default()
        }),
        Ok(None) => ThemePreference::default(),
        Err(e) => {
            warn!(error = %e, "ignoring persisted theme");
            ThemePreference::default()
        }
    };
    PersistedSelection {
        showcase_id: showcase_id.filter(|id| !id.is_empty()),
        theme,
    }
}

pub fn write_selection_id(store: &dyn KeyValueStore, id: &str) -> Result<(), PersistenceError> {
    store.set(SHOWCASE_ID_KEY, id)
}

pub fn write_theme(store: &dyn KeyValueStore, theme: ThemePreference) -> Result<(), PersistenceError> {
    store.set(THEME_KEY, theme.as_str())
}
