//! Command implementations. Output goes to the given writer so commands can
//! be exercised in tests.

use std::io::{self, Write};
use std::path::Path;

use showcase_core::{Diagnostic, FsModuleSource, ModuleSource, ShowcaseRegistry};
use showcase_data::config::{self, InitOutcome};
use tracing::{info, warn};

use crate::cli::{CheckArgs, InitArgs, ListArgs};

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

/// Result of `check`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckSummary {
    pub showcases: usize,
    /// Modules that failed to load or parse.
    pub broken: usize,
}

impl CheckSummary {
    pub fn is_ok(&self) -> bool {
        self.broken == 0
    }
}

pub fn run_init(args: &InitArgs, out: &mut impl Write) -> Result<InitOutcome, CommandError> {
    let outcome = config::init_config(&args.dir.dir, args.force)?;
    match &outcome {
        InitOutcome::Written(path) => {
            info!(path = %path.display(), "configuration written");
            if !args.silent {
                writeln!(out, "Wrote {}", path.display())?;
            }
        }
        InitOutcome::AlreadyExists(path) => {
            warn!(
                path = %path.display(),
                "configuration already exists; pass --force to overwrite"
            );
        }
    }
    Ok(outcome)
}

pub fn run_list(args: &ListArgs, out: &mut impl Write) -> Result<(), CommandError> {
    let registry = build_registry(&args.dir.dir)?;

    match &args.filter {
        Some(query) => {
            let hits = registry.filter(query);
            if hits.is_empty() {
                writeln!(out, "No showcases match \"{query}\".")?;
            }
            for showcase in hits {
                writeln!(out, "{}  ({})", showcase.title, showcase.id)?;
            }
        }
        None => {
            if registry.is_empty() {
                writeln!(out, "No showcases found.")?;
            }
            for (group, showcases) in registry.groups() {
                writeln!(out, "{group}")?;
                for showcase in showcases {
                    writeln!(out, "  {}  ({})", showcase.name, showcase.id)?;
                }
            }
        }
    }

    write_diagnostics(&registry, out)?;
    Ok(())
}

pub fn run_check(args: &CheckArgs, out: &mut impl Write) -> Result<CheckSummary, CommandError> {
    let registry = build_registry(&args.dir.dir)?;
    write_diagnostics(&registry, out)?;

    let broken = registry
        .diagnostics()
        .iter()
        .filter(|d| matches!(d, Diagnostic::LoadFailed(_) | Diagnostic::ParseFailed(_)))
        .count();
    let summary = CheckSummary {
        showcases: registry.len(),
        broken,
    };
    writeln!(
        out,
        "{} showcases, {} broken modules",
        summary.showcases, summary.broken
    )?;
    Ok(summary)
}

fn build_registry(dir: &Path) -> Result<ShowcaseRegistry, CommandError> {
    let loaded = config::load(dir)?;
    if loaded.generated {
        info!(path = %loaded.source.display(), "generated configuration");
    }
    let source = FsModuleSource::from_config(&loaded);
    Ok(ShowcaseRegistry::build(&source.list()))
}

fn write_diagnostics(registry: &ShowcaseRegistry, out: &mut impl Write) -> io::Result<()> {
    for diagnostic in registry.diagnostics() {
        let label = match diagnostic {
            Diagnostic::NoMatches(_) => "note",
            Diagnostic::DuplicateId { .. } => "warning",
            Diagnostic::LoadFailed(_) | Diagnostic::ParseFailed(_) => "error",
        };
        writeln!(out, "{label}: {diagnostic}")?;
    }
    Ok(())
}
