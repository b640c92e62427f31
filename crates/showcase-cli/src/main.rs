//! Showcase runner CLI.

use std::io;

use clap::Parser;
use showcase_cli::cli::{Cli, Command};
use showcase_cli::commands::{run_check, run_init, run_list};
use showcase_cli::logging::{LogConfig, init_logging};

fn main() {
    let cli = Cli::parse();
    let silent = matches!(&cli.command, Command::Init(args) if args.silent);
    if let Err(error) = init_logging(&LogConfig::from_flags(cli.verbose, silent)) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }

    let mut out = io::stdout().lock();
    let exit_code = match &cli.command {
        Command::Init(args) => match run_init(args, &mut out) {
            Ok(_) => 0,
            Err(error) => {
                eprintln!("error: {error}");
                1
            }
        },
        Command::List(args) => match run_list(args, &mut out) {
            Ok(()) => 0,
            Err(error) => {
                eprintln!("error: {error}");
                1
            }
        },
        Command::Check(args) => match run_check(args, &mut out) {
            Ok(summary) => {
                if summary.is_ok() { 0 } else { 1 }
            }
            Err(error) => {
                eprintln!("error: {error}");
                1
            }
        },
    };
    std::process::exit(exit_code);
}
