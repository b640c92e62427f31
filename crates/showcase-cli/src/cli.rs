//! CLI argument definitions for the showcase runner.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "showcase",
    version,
    about = "Discover and inspect component showcases",
    long_about = "Discover demonstration modules, parse them into showcases, \
                  and manage the runner configuration."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase log verbosity (-v for info, -vv for debug).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Write a generated configuration file.
    Init(InitArgs),

    /// List discovered showcases by group.
    List(ListArgs),

    /// Load and parse every module; fail if any is broken.
    Check(CheckArgs),
}

#[derive(Debug, Args)]
pub struct DirArg {
    /// Project directory (default: current directory).
    #[arg(long = "dir", value_name = "PATH", default_value = ".")]
    pub dir: PathBuf,
}

#[derive(Debug, Args)]
pub struct InitArgs {
    #[command(flatten)]
    pub dir: DirArg,

    /// Overwrite an existing configuration file.
    #[arg(long)]
    pub force: bool,

    /// Only report errors.
    #[arg(long)]
    pub silent: bool,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    #[command(flatten)]
    pub dir: DirArg,

    /// Only show showcases whose title contains this text.
    #[arg(long, value_name = "QUERY")]
    pub filter: Option<String>,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    #[command(flatten)]
    pub dir: DirArg,
}
