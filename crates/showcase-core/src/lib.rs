//! Showcase discovery and interactive rendering runtime.
//!
//! Discovers demonstration-module files, parses their renderable exports
//! into showcases, groups them in a registry, and drives an interactive
//! session: selection, editable controls, theme, and a fault-isolated
//! preview with viewport simulation.
//!
//! # Usage
//!
//! ```rust,ignore
//! use showcase_core::{ComponentLibrary, FileStore, ManualThemeSignal, Runtime};
//!
//! let loaded = showcase_data::config::load(&std::env::current_dir()?)?;
//! let mut runtime = Runtime::from_config(
//!     &loaded,
//!     my_components(),
//!     Box::new(FileStore::user_default()),
//!     std::sync::Arc::new(ManualThemeSignal::default()),
//!     true,
//! )?;
//! runtime.select("Button-Primary")?;
//! loop {
//!     runtime.pump()?;
//!     // draw runtime.preview().status() and runtime.control_fields()
//! }
//! ```

pub mod control_view;
pub mod controls;
pub mod discovery;
pub mod error;
pub mod module;
pub mod parser;
pub mod persistence;
pub mod preview;
pub mod registry;
pub mod renderable;
pub mod runtime;
pub mod session;
pub mod showcase;
pub mod source;
pub mod subscription;
pub mod theme;
pub mod watcher;

pub use control_view::{ControlField, ControlWidget, describe_controls};
pub use controls::{
    ControlDecodeError, ControlError, ControlInput, ControlOutcome, ControlState, ControlValues,
    init_control_values, set_control_value,
};
pub use discovery::{Discovery, DiscoveryError, ModuleCollection};
pub use error::ShowcaseError;
pub use module::{DemonstrationModule, ModuleLoadError};
pub use parser::{ParseError, parse};
pub use persistence::{
    FileStore, KeyValueStore, MemoryStore, PersistedSelection, PersistenceError, read_selection,
};
pub use preview::{
    DeviceFrame, Preview, PreviewLayout, PreviewStatus, RenderFailure, ViewCommand, Viewport,
};
pub use registry::{Diagnostic, RegistryHandle, ShowcaseRegistry};
pub use renderable::{ComponentLibrary, Props, RenderError, Renderable, RenderedOutput};
pub use runtime::Runtime;
pub use session::{Effect, SessionEvent, SessionState, reconcile_selection};
pub use showcase::{ControlKind, PropControlConfig, RenderableRef, Showcase};
pub use source::{FsModuleSource, ModuleSource, StaticModuleSource};
pub use theme::{
    AmbientThemeSignal, ManualThemeSignal, ResolvedTheme, ThemeController, ThemePreference,
};
pub use watcher::ModuleWatcher;
