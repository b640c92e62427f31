//! Module discovery: expands discovery patterns into a deduplicated,
//! order-stable list of module files, and materializes them lazily.
//!
//! Each scan recomputes the match set from scratch; there is no incremental
//! diffing of previous results.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use showcase_data::config::LoadedConfig;
use tracing::{debug, warn};

use crate::module::{DemonstrationModule, ModuleLoadError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A non-fatal discovery problem, surfaced as an empty-state message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiscoveryError {
    #[error("pattern `{pattern}` matched no files")]
    NoMatches { pattern: String },

    #[error("pattern `{pattern}` is invalid: {detail}")]
    InvalidPattern { pattern: String, detail: String },
}

// ---------------------------------------------------------------------------
// Scanning
// ---------------------------------------------------------------------------

const PATH_MATCH: glob::MatchOptions = glob::MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Compiled discovery settings.
#[derive(Debug, Clone)]
pub struct Discovery {
    root: PathBuf,
    patterns: Vec<String>,
    matchers: Vec<glob::Pattern>,
    excludes: Vec<glob::Pattern>,
}

/// Result of a single scan.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Matched files: deduplicated, pattern order then path order.
    pub files: Vec<PathBuf>,
    pub problems: Vec<DiscoveryError>,
}

impl Discovery {
    /// Build discovery settings. Invalid exclude patterns are dropped with
    /// a warning.
    pub fn new(root: impl Into<PathBuf>, patterns: Vec<String>, excludes: &[String]) -> Self {
        let excludes = excludes
            .iter()
            .filter_map(|p| match glob::Pattern::new(p) {
                Ok(compiled) => Some(compiled),
                Err(e) => {
                    warn!(pattern = %p, error = %e, "ignoring invalid exclude pattern");
                    None
                }
            })
            .collect();
        let matchers = patterns
            .iter()
            .filter_map(|p| glob::Pattern::new(p).ok())
            .collect();
        Self {
            root: root.into(),
            patterns,
            matchers,
            excludes,
        }
    }

    pub fn from_config(loaded: &LoadedConfig) -> Self {
        Self::new(
            loaded.root.clone(),
            loaded.config.discovery_patterns.clone(),
            &loaded.config.exclude_patterns,
        )
    }

    /// The directory relative exclusions are matched against.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Expand every pattern, drop excluded and non-file matches, and
    /// deduplicate while keeping first-seen order.
    pub fn scan(&self) -> ScanReport {
        let mut seen: HashSet<PathBuf> = HashSet::new();
        let mut report = ScanReport::default();

        for pattern in &self.patterns {
            let paths = match glob::glob(pattern) {
                Ok(paths) => paths,
                Err(e) => {
                    report.problems.push(DiscoveryError::InvalidPattern {
                        pattern: pattern.clone(),
                        detail: e.to_string(),
                    });
                    continue;
                }
            };

            let mut matched = 0usize;
            for entry in paths {
                let path = match entry {
                    Ok(path) => path,
                    Err(e) => {
                        warn!(error = %e, "unreadable path during discovery");
                        continue;
                    }
                };
                if !path.is_file() || self.is_excluded(&path) {
                    continue;
                }
                matched += 1;
                if seen.insert(path.clone()) {
                    report.files.push(path);
                }
            }

            if matched == 0 {
                report.problems.push(DiscoveryError::NoMatches {
                    pattern: pattern.clone(),
                });
            }
        }

        debug!(
            files = report.files.len(),
            problems = report.problems.len(),
            "discovery scan complete"
        );
        report
    }

    /// Whether `path` matches an exclude pattern. Absolute patterns are
    /// tested against the absolute path, all others against the path
    /// relative to the root. `*` never crosses a `/`.
    pub fn is_excluded(&self, path: &Path) -> bool {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        self.excludes.iter().any(|pattern| {
            let target = if Path::new(pattern.as_str()).is_absolute() {
                path
            } else {
                relative
            };
            pattern.matches_path_with(target, PATH_MATCH)
        })
    }

    /// Whether a change at `path` can alter the scan result: it is not
    /// excluded, and it either matches a discovery pattern or is no longer
    /// a regular file (a removed file or a directory).
    pub fn affects_scan(&self, path: &Path) -> bool {
        if self.is_excluded(path) {
            return false;
        }
        !path.is_file()
            || self
                .matchers
                .iter()
                .any(|pattern| pattern.matches_path_with(path, PATH_MATCH))
    }
}

// ---------------------------------------------------------------------------
// Lazy collection
// ---------------------------------------------------------------------------

/// One discovered file and its (lazily loaded) module.
#[derive(Debug)]
pub struct ModuleEntry {
    path: PathBuf,
    module: OnceLock<Result<Arc<DemonstrationModule>, ModuleLoadError>>,
}

impl ModuleEntry {
    fn lazy(path: PathBuf) -> Self {
        Self {
            path,
            module: OnceLock::new(),
        }
    }

    fn preloaded(module: DemonstrationModule) -> Self {
        let path = module.path.clone();
        let cell = OnceLock::new();
        let _ = cell.set(Ok(Arc::new(module)));
        Self { path, module: cell }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the module on first access; later calls return the cached result.
    pub fn module(&self) -> Result<Arc<DemonstrationModule>, ModuleLoadError> {
        self.module
            .get_or_init(|| DemonstrationModule::load(&self.path).map(Arc::new))
            .clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.module.get().is_some()
    }
}

/// The current set of discovered modules.
///
/// Published whole by a module source; never mutated after publication
/// beyond filling its lazy cells.
#[derive(Debug, Default)]
pub struct ModuleCollection {
    entries: Vec<ModuleEntry>,
    problems: Vec<DiscoveryError>,
}

impl ModuleCollection {
    pub fn empty() -> Self {
        Self::default()
    }

    /// A collection of not-yet-loaded files.
    pub fn from_scan(report: ScanReport) -> Self {
        Self {
            entries: report.files.into_iter().map(ModuleEntry::lazy).collect(),
            problems: report.problems,
        }
    }

    /// A collection of already materialized modules.
    pub fn from_modules(modules: impl IntoIterator<Item = DemonstrationModule>) -> Self {
        Self {
            entries: modules.into_iter().map(ModuleEntry::preloaded).collect(),
            problems: Vec::new(),
        }
    }

    pub fn entries(&self) -> &[ModuleEntry] {
        &self.entries
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().map(ModuleEntry::path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Materialize a single file, if it belongs to this collection.
    pub fn get(&self, path: &Path) -> Option<Result<Arc<DemonstrationModule>, ModuleLoadError>> {
        self.entries
            .iter()
            .find(|e| e.path == path)
            .map(ModuleEntry::module)
    }

    /// Materialize every module, in collection order.
    pub fn load_all(&self) -> Vec<Result<Arc<DemonstrationModule>, ModuleLoadError>> {
        self.entries.iter().map(ModuleEntry::module).collect()
    }

    /// Discovery problems recorded when this collection was produced.
    pub fn problems(&self) -> &[DiscoveryError] {
        &self.problems
    }
}
