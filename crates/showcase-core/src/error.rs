use showcase_data::ConfigError;

use crate::controls::ControlError;
use crate::persistence::PersistenceError;

/// Errors surfaced by the showcase runtime.
#[derive(Debug, thiserror::Error)]
pub enum ShowcaseError {
    /// The configuration could not be loaded; fatal to startup.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The requested showcase is not in the current registry.
    #[error("showcase '{id}' not found")]
    ShowcaseNotFound { id: String },

    /// No showcase is currently selected.
    #[error("no showcase is currently selected")]
    NoSelection,

    /// A control update was rejected.
    #[error(transparent)]
    Control(#[from] ControlError),

    /// The durable store could not be written.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// The file watcher could not be started.
    #[error("file watcher error: {0}")]
    Watch(#[from] notify::Error),
}
