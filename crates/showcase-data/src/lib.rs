//! On-disk formats for the showcase runner.
//!
//! - [`config`] -- the runner configuration: schema, defaults, validation,
//!   generation, and loading with path resolution.
//! - [`schema`] -- serde structs for demonstration-module files.
//! - [`loader`] -- RON / TOML / JSON format detection and deserialization.

pub mod config;
pub mod loader;
pub mod schema;

pub use config::{Config, ConfigError, InitOutcome, LoadedConfig, RawConfig, load, validate};
pub use loader::{DataLoadError, Format, deserialize_file};
pub use schema::{ControlData, ExportData, ExportKindData, MetaData, ModuleData, RenderableData};
