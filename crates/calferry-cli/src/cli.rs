//! Command-line interface definition.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// calferry - carry your ICS calendar over to Google Calendar
#[derive(Debug, Parser)]
#[command(name = "calferry")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// ICS file, or directory of .ics files, to import
    #[arg(value_name = "ICS_PATH")]
    pub ics_path: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, env = "CALFERRY_CONFIG")]
    pub config: Option<PathBuf>,

    // --- Target selection ---
    /// Calendar to import into
    #[arg(long, short = 'c')]
    pub calendar: Option<String>,

    /// Path to the OAuth credentials JSON
    #[arg(long, env = "CALFERRY_CREDENTIALS")]
    pub credentials: Option<PathBuf>,

    /// Path to the token cache
    #[arg(long, env = "CALFERRY_TOKEN")]
    pub token: Option<PathBuf>,

    // --- Run behavior ---
    /// Simulate the run without committing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Import events even when the calendar already has them
    #[arg(long)]
    pub no_skip_duplicates: bool,

    /// Strip attendees from every event
    #[arg(long)]
    pub no_attendees: bool,

    /// Only import events starting on or after this date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub start_date: Option<NaiveDate>,

    /// Only import events starting before this date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub end_date: Option<NaiveDate>,

    /// Stop after this many events reach a terminal state
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,

    /// Add this address as an accepted attendee on every event
    #[arg(long, value_name = "EMAIL")]
    pub add_self: Option<String>,

    /// Commits per pacing batch
    #[arg(long, value_name = "N")]
    pub batch_size: Option<usize>,

    /// Skip events with more than this many attendees
    #[arg(long, value_name = "N")]
    pub max_attendees: Option<usize>,

    // --- Alternate modes ---
    /// List the calendars visible to the account and exit
    #[arg(long)]
    pub list_calendars: bool,

    // --- Verbosity ---
    /// Enable debug output
    #[arg(long, short = 'v', conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only print warnings and the final summary
    #[arg(long, short = 'q')]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the browser OAuth flow and cache tokens
    Auth {
        /// Discard cached tokens and re-authenticate
        #[arg(long)]
        force: bool,
    },
}
