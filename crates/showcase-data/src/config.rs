//! Runner configuration: schema, built-in defaults, validation, and loading.
//!
//! [`validate`] is pure (merge over defaults + checks). [`load`] searches the
//! working directory for a configuration file, generating one from the
//! project layout if none exists, then validates it and resolves every
//! relative path against the file's directory.

use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

use crate::loader::{DataLoadError, deserialize_file, find_first_existing};

/// Configuration file names, in search order. The first existing file wins.
pub const CONFIG_FILE_CANDIDATES: [&str; 3] = [
    "showcase.config.toml",
    "showcase.config.ron",
    "showcase.config.json",
];

/// File written when a configuration is generated.
pub const GENERATED_CONFIG_FILE: &str = "showcase.config.toml";

pub const DEFAULT_PORT: u16 = 6060;
pub const DEFAULT_OUTPUT_DIR: &str = "./showcase-dist";
pub const DEFAULT_EXCLUDE_PATTERNS: [&str; 3] = ["**/node_modules/**", "**/.git/**", "**/*.test.*"];

/// Directories inspected when generating a configuration, in preference order.
pub const CONVENTIONAL_SOURCE_DIRS: [&str; 5] = ["src/components", "components", "src", "lib", "app"];

/// Stylesheets inspected when generating a configuration, in preference order.
pub const CONVENTIONAL_STYLESHEETS: [&str; 5] = [
    "src/index.css",
    "src/styles/globals.css",
    "styles/globals.css",
    "app/globals.css",
    "src/app/globals.css",
];

/// File-name suffix glob used for generated discovery patterns.
const MODULE_GLOB: &str = "**/*.showcase.*";

// ===========================================================================
// Errors
// ===========================================================================

/// Errors raised while loading or validating the configuration.
///
/// Always fatal to startup; a configuration is never partially applied.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A field failed validation.
    #[error("invalid `{field}`: {constraint}")]
    Invalid {
        field: &'static str,
        constraint: String,
    },

    /// No configuration file exists, even after generating one.
    #[error("no configuration file found in {dir} (looked for {candidates})")]
    NotFound { dir: PathBuf, candidates: String },

    /// The generated configuration could not be serialized.
    #[error("failed to serialize generated configuration: {detail}")]
    Generate { detail: String },

    /// The generated configuration could not be written.
    #[error("failed to write configuration to {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The configuration file could not be read or parsed.
    #[error(transparent)]
    Load(#[from] DataLoadError),
}

fn invalid(field: &'static str, constraint: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        constraint: constraint.into(),
    }
}

// ===========================================================================
// Schema
// ===========================================================================

/// The configuration exactly as authored. Every field is optional here;
/// [`validate`] fills omitted fields from the built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discovery_patterns: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_patterns: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_styles_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_wrapper_path: Option<String>,
    /// Kept wide so out-of-range values reach validation instead of failing
    /// deserialization with a less specific message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
}

/// A validated configuration with every default applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Non-empty, in declaration order.
    pub discovery_patterns: Vec<String>,
    /// Deduplicated, first occurrence order.
    pub exclude_patterns: Vec<String>,
    pub global_styles_path: Option<PathBuf>,
    pub global_wrapper_path: Option<PathBuf>,
    pub port: u16,
    pub output_dir: PathBuf,
}

impl From<&Config> for RawConfig {
    fn from(config: &Config) -> Self {
        let path_string = |p: &PathBuf| p.to_string_lossy().into_owned();
        Self {
            discovery_patterns: Some(config.discovery_patterns.clone()),
            exclude_patterns: Some(config.exclude_patterns.clone()),
            global_styles_path: config.global_styles_path.as_ref().map(path_string),
            global_wrapper_path: config.global_wrapper_path.as_ref().map(path_string),
            port: Some(i64::from(config.port)),
            output_dir: Some(path_string(&config.output_dir)),
        }
    }
}

/// The built-in exclude patterns.
pub fn default_exclude_patterns() -> Vec<String> {
    DEFAULT_EXCLUDE_PATTERNS.iter().map(|p| p.to_string()).collect()
}

// ===========================================================================
// Validation
// ===========================================================================

/// Merge `candidate` over the built-in defaults and validate the result.
///
/// Performs no filesystem access.
pub fn validate(candidate: &RawConfig) -> Result<Config, ConfigError> {
    let discovery_patterns = match &candidate.discovery_patterns {
        Some(patterns) if !patterns.is_empty() => patterns.clone(),
        _ => {
            return Err(invalid(
                "discoveryPatterns",
                "at least one discovery pattern required",
            ));
        }
    };
    for pattern in &discovery_patterns {
        check_pattern("discoveryPatterns", pattern)?;
    }

    let mut exclude_patterns: Vec<String> = Vec::new();
    let excludes = candidate
        .exclude_patterns
        .clone()
        .unwrap_or_else(default_exclude_patterns);
    for pattern in excludes {
        check_pattern("excludePatterns", &pattern)?;
        if !exclude_patterns.contains(&pattern) {
            exclude_patterns.push(pattern);
        }
    }

    let port = candidate.port.unwrap_or(i64::from(DEFAULT_PORT));
    let port = u16::try_from(port)
        .ok()
        .filter(|p| *p >= 1)
        .ok_or_else(|| invalid("port", "port must be an integer in [1,65535]"))?;

    let output_dir = candidate
        .output_dir
        .clone()
        .unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string());
    if output_dir.trim().is_empty() {
        return Err(invalid("outputDir", "must not be empty"));
    }

    let global_styles_path = optional_path("globalStylesPath", &candidate.global_styles_path)?;
    let global_wrapper_path = optional_path("globalWrapperPath", &candidate.global_wrapper_path)?;

    Ok(Config {
        discovery_patterns,
        exclude_patterns,
        global_styles_path,
        global_wrapper_path,
        port,
        output_dir: PathBuf::from(output_dir),
    })
}

fn check_pattern(field: &'static str, pattern: &str) -> Result<(), ConfigError> {
    if pattern.trim().is_empty() {
        return Err(invalid(field, "patterns must not be empty"));
    }
    glob::Pattern::new(pattern)
        .map(|_| ())
        .map_err(|e| invalid(field, format!("`{pattern}` is not a valid glob: {e}")))
}

fn optional_path(
    field: &'static str,
    value: &Option<String>,
) -> Result<Option<PathBuf>, ConfigError> {
    match value {
        Some(v) if v.trim().is_empty() => Err(invalid(field, "must not be empty when set")),
        Some(v) => Ok(Some(PathBuf::from(v))),
        None => Ok(None),
    }
}

// ===========================================================================
// Path resolution
// ===========================================================================

impl Config {
    /// Resolve every relative path and pattern against `base`.
    ///
    /// Exclude patterns starting with `**` match anywhere and are left as-is.
    pub fn resolve_against(self, base: &Path) -> Config {
        let escaped_base = glob::Pattern::escape(&base.to_string_lossy());
        Config {
            discovery_patterns: self
                .discovery_patterns
                .iter()
                .map(|p| resolve_pattern(&escaped_base, p))
                .collect(),
            exclude_patterns: self
                .exclude_patterns
                .iter()
                .map(|p| {
                    if p.starts_with("**") {
                        p.clone()
                    } else {
                        resolve_pattern(&escaped_base, p)
                    }
                })
                .collect(),
            global_styles_path: self.global_styles_path.map(|p| resolve_path(base, &p)),
            global_wrapper_path: self.global_wrapper_path.map(|p| resolve_path(base, &p)),
            port: self.port,
            output_dir: resolve_path(base, &self.output_dir),
        }
    }
}

/// Join `path` onto `base` unless it is already absolute, dropping `.` segments.
pub fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };
    joined
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

fn resolve_pattern(escaped_base: &str, pattern: &str) -> String {
    if Path::new(pattern).is_absolute() {
        return pattern.to_string();
    }
    let mut rest = pattern;
    while let Some(stripped) = rest.strip_prefix("./") {
        rest = stripped;
    }
    format!("{}/{}", escaped_base.trim_end_matches('/'), rest)
}

// ===========================================================================
// Loading
// ===========================================================================

/// A validated configuration together with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedConfig {
    /// The configuration file that was read.
    pub source: PathBuf,
    /// The directory relative paths were resolved against.
    pub root: PathBuf,
    /// The validated, fully resolved configuration.
    pub config: Config,
    /// Whether the file was generated during this load.
    pub generated: bool,
}

/// Locate the configuration file in `dir`, honouring the candidate order.
pub fn find_config_file(dir: &Path) -> Option<PathBuf> {
    find_first_existing(dir, &CONFIG_FILE_CANDIDATES)
}

/// Load, validate, and resolve the configuration for `working_dir`.
///
/// If no configuration file exists, one is generated from the project
/// layout and the search is retried exactly once.
pub fn load(working_dir: &Path) -> Result<LoadedConfig, ConfigError> {
    if let Some(path) = find_config_file(working_dir) {
        return load_file(&path);
    }

    let written = write_generated_config(working_dir)?;
    info!(path = %written.display(), "no configuration found, generated a default one");

    let path = find_config_file(working_dir).ok_or_else(|| ConfigError::NotFound {
        dir: working_dir.to_path_buf(),
        candidates: CONFIG_FILE_CANDIDATES.join(", "),
    })?;
    let mut loaded = load_file(&path)?;
    loaded.generated = true;
    Ok(loaded)
}

/// Load, validate, and resolve a specific configuration file.
pub fn load_file(path: &Path) -> Result<LoadedConfig, ConfigError> {
    let raw: RawConfig = deserialize_file(path)?;
    let config = validate(&raw)?;

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let root = std::path::absolute(&parent).unwrap_or(parent);
    debug!(
        source = %path.display(),
        patterns = config.discovery_patterns.len(),
        "configuration loaded"
    );

    Ok(LoadedConfig {
        source: path.to_path_buf(),
        config: config.resolve_against(&root),
        root,
        generated: false,
    })
}

// ===========================================================================
// Generation
// ===========================================================================

/// What a project directory looks like, as far as config generation cares.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectLayout {
    /// Conventional source directories present, relative to the project.
    pub source_dirs: Vec<String>,
    /// The first conventional stylesheet present, relative to the project.
    pub stylesheet: Option<String>,
}

/// Inspect `dir` for conventional source directories and a stylesheet.
///
/// A directory nested inside (or containing) one already chosen is skipped.
pub fn detect_layout(dir: &Path) -> ProjectLayout {
    let mut source_dirs: Vec<String> = Vec::new();
    for candidate in CONVENTIONAL_SOURCE_DIRS {
        if !dir.join(candidate).is_dir() {
            continue;
        }
        let overlaps = source_dirs.iter().any(|chosen| {
            Path::new(candidate).starts_with(chosen) || Path::new(chosen).starts_with(candidate)
        });
        if !overlaps {
            source_dirs.push(candidate.to_string());
        }
    }

    let stylesheet = CONVENTIONAL_STYLESHEETS
        .iter()
        .find(|s| dir.join(s).is_file())
        .map(|s| s.to_string());

    ProjectLayout {
        source_dirs,
        stylesheet,
    }
}

/// Build a best-effort configuration for `layout`.
pub fn generate_config(layout: &ProjectLayout) -> RawConfig {
    let discovery_patterns = if layout.source_dirs.is_empty() {
        vec![MODULE_GLOB.to_string()]
    } else {
        layout
            .source_dirs
            .iter()
            .map(|d| format!("{d}/{MODULE_GLOB}"))
            .collect()
    };

    RawConfig {
        discovery_patterns: Some(discovery_patterns),
        exclude_patterns: Some(default_exclude_patterns()),
        global_styles_path: layout.stylesheet.clone(),
        global_wrapper_path: None,
        port: Some(i64::from(DEFAULT_PORT)),
        output_dir: Some(DEFAULT_OUTPUT_DIR.to_string()),
    }
}

/// Render `raw` as the TOML text of a configuration file.
pub fn render_config(raw: &RawConfig) -> Result<String, ConfigError> {
    let body = toml::to_string_pretty(raw).map_err(|e| ConfigError::Generate {
        detail: e.to_string(),
    })?;
    Ok(format!("# Showcase runner configuration.\n\n{body}"))
}

/// Generate a configuration from `dir`'s layout and write it to
/// [`GENERATED_CONFIG_FILE`], replacing any file of that name.
pub fn write_generated_config(dir: &Path) -> Result<PathBuf, ConfigError> {
    let layout = detect_layout(dir);
    let text = render_config(&generate_config(&layout))?;
    let path = dir.join(GENERATED_CONFIG_FILE);
    std::fs::write(&path, text).map_err(|source| ConfigError::Write {
        path: path.clone(),
        source,
    })?;
    debug!(path = %path.display(), dirs = ?layout.source_dirs, "wrote generated configuration");
    Ok(path)
}

/// Result of [`init_config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    /// A configuration file was written.
    Written(PathBuf),
    /// A configuration already existed and `force` was not set.
    AlreadyExists(PathBuf),
}

/// Write a generated configuration into `dir` unless one exists already.
pub fn init_config(dir: &Path, force: bool) -> Result<InitOutcome, ConfigError> {
    if let Some(existing) = find_config_file(dir) {
        if !force {
            return Ok(InitOutcome::AlreadyExists(existing));
        }
    }
    write_generated_config(dir).map(InitOutcome::Written)
}

// ===========================================================================
// Tests
// ===========================================================================
