//! Logging setup using `tracing` and `tracing-subscriber`.
//!
//! `RUST_LOG` wins when set. Otherwise the level comes from the command
//! line: `warn` by default, `-v` for `info`, `-vv` for `debug`, and
//! `--silent` for errors only.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Crates whose events follow the configured level.
const OWN_CRATES: [&str; 3] = ["showcase_cli", "showcase_core", "showcase_data"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogConfig {
    pub level: LevelFilter,
    pub with_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::WARN,
            with_target: false,
        }
    }
}

impl LogConfig {
    #[must_use]
    pub fn from_flags(verbosity: u8, silent: bool) -> Self {
        let level = if silent {
            LevelFilter::ERROR
        } else {
            match verbosity {
                0 => LevelFilter::WARN,
                1 => LevelFilter::INFO,
                _ => LevelFilter::DEBUG,
            }
        };
        Self {
            level,
            ..Self::default()
        }
    }
}

/// Filter directives for `level`: our crates at `level`, others at `warn`
/// unless `level` is quieter.
pub fn filter_directives(level: LevelFilter) -> String {
    let level = level.to_string().to_lowercase();
    let base = if level == "error" || level == "off" {
        level.as_str()
    } else {
        "warn"
    };
    let mut directives = vec![base.to_string()];
    directives.extend(OWN_CRATES.iter().map(|c| format!("{c}={level}")));
    directives.join(",")
}

/// Install the global subscriber, writing to stderr.
pub fn init_logging(config: &LogConfig) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(config.level)));
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(config.with_target)
        .without_time();
    tracing_subscriber::registry().with(filter).with(layer).try_init()
}
