//! Filesystem watching for hot reload.
//!
//! Events under the project root are debounced; a burst that touches at
//! least one path able to change the discovered set triggers a single full
//! rescan of the [`FsModuleSource`]. Subscribers receive the new collection
//! on the watcher's thread.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{DebounceEventResult, Debouncer, new_debouncer};
use tracing::{debug, trace, warn};

use crate::discovery::Discovery;
use crate::source::FsModuleSource;

/// Quiet period that closes a burst of filesystem events.
pub const DEBOUNCE: Duration = Duration::from_millis(150);

/// Keeps the underlying watcher alive; dropping it stops watching.
pub struct ModuleWatcher {
    _debouncer: Debouncer<RecommendedWatcher>,
    root: PathBuf,
}

impl std::fmt::Debug for ModuleWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleWatcher")
            .field("root", &self.root)
            .finish()
    }
}

impl ModuleWatcher {
    /// Watch the source's root recursively and rescan on relevant changes.
    pub fn spawn(source: Arc<FsModuleSource>) -> Result<Self, notify::Error> {
        let root = source.discovery().root().to_path_buf();
        let target = Arc::clone(&source);
        let mut debouncer = new_debouncer(DEBOUNCE, move |res: DebounceEventResult| match res {
            Ok(events) => {
                let changed = relevant_changes(
                    target.discovery(),
                    events.iter().map(|event| event.path.as_path()),
                );
                if changed.is_empty() {
                    trace!(events = events.len(), "ignoring unrelated changes");
                } else {
                    debug!(paths = ?changed, "module files changed");
                    target.rescan();
                }
            }
            Err(e) => warn!(error = %e, "file watcher error"),
        })?;
        debouncer.watcher().watch(&root, RecursiveMode::Recursive)?;
        debug!(root = %root.display(), "watching for module changes");
        Ok(Self {
            _debouncer: debouncer,
            root,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// The changed paths that can alter what `discovery` finds.
pub fn relevant_changes<'a>(
    discovery: &Discovery,
    paths: impl IntoIterator<Item = &'a Path>,
) -> Vec<&'a Path> {
    paths
        .into_iter()
        .filter(|path| discovery.affects_scan(path))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bursts_outside_module_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join(".git")).unwrap();
        std::fs::create_dir_all(root.join("showcase-dist")).unwrap();
        std::fs::write(root.join(".git/index"), "").unwrap();
        std::fs::write(root.join("showcase-dist/app.js"), "").unwrap();

        let pattern = format!(
            "{}/**/*.showcase.*",
            glob::Pattern::escape(&root.to_string_lossy())
        );
        let excludes = showcase_data::config::default_exclude_patterns();
        let discovery = Discovery::new(root, vec![pattern], &excludes);

        let noise = [root.join(".git/index"), root.join("showcase-dist/app.js")];
        assert!(relevant_changes(&discovery, noise.iter().map(PathBuf::as_path)).is_empty());

        let module = root.join("button.showcase.ron");
        let burst = [root.join("showcase-dist/app.js"), module.clone()];
        assert_eq!(
            relevant_changes(&discovery, burst.iter().map(PathBuf::as_path)),
            vec![module.as_path()]
        );
    }
}
