//! CLI: argument parsing, config file, progress rendering, summary output
//!
//! This crate provides the `calferry` command-line interface.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod render;

pub use cli::Cli;
pub use error::{CliError, CliResult};
