//! Command-line front end for the showcase runner.

pub mod cli;
pub mod commands;
pub mod logging;
