//! CLI configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/calferry/config.toml` by default. Every field has a default;
//! CLI flags override file values. Unknown keys are rejected so a typo
//! never silently changes a run.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use calferry_core::{TracingConfig, TracingOutputFormat};
use calferry_engine::ImportOptions;

use crate::cli::Cli;
use crate::error::{CliError, CliResult};

/// Configuration file contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Import behavior defaults.
    pub import: ImportSettings,

    /// Google credential and token locations.
    pub google: GoogleSettings,

    /// Logging defaults.
    pub logging: LoggingSettings,
}

/// `[import]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImportSettings {
    /// Calendar to import into.
    pub calendar: Option<String>,

    /// Whether events already on the target are skipped.
    pub skip_duplicates: Option<bool>,

    /// Whether attendees are carried over.
    pub include_attendees: Option<bool>,

    /// First admitted start date (inclusive).
    pub start_date: Option<NaiveDate>,

    /// First rejected start date (exclusive).
    pub end_date: Option<NaiveDate>,

    /// Stop after this many terminal events.
    pub limit: Option<usize>,

    /// Address appended as an accepted attendee on every event.
    pub add_self: Option<String>,

    /// Commits per pacing batch.
    pub batch_size: Option<usize>,

    /// Skip events with more than this many attendees.
    pub max_attendees: Option<usize>,
}

/// `[google]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GoogleSettings {
    /// Path to the OAuth credentials JSON.
    pub credentials: Option<PathBuf>,

    /// Path to the token cache.
    pub token: Option<PathBuf>,
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSettings {
    /// Default filter level (`error`..`trace`).
    pub level: Option<String>,

    /// Output format: `compact` or `json`.
    pub format: Option<String>,
}

impl FileConfig {
    /// Loads configuration from the default path, or defaults when the
    /// file does not exist.
    pub fn load() -> CliResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CliError::Config(format!("failed to read {}: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| CliError::Config(format!("failed to parse {}: {}", path.display(), e)))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("calferry")
            .join("config.toml")
    }
}

/// Fully resolved settings for one invocation: file values with CLI flags
/// layered on top.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Engine options for the run.
    pub options: ImportOptions,

    /// Path to the OAuth credentials JSON.
    pub credentials_path: PathBuf,

    /// Token cache path override, when set.
    pub token_path: Option<PathBuf>,

    /// Tracing configuration.
    pub tracing: TracingConfig,
}

impl Settings {
    /// Default credentials file name, resolved against the working
    /// directory.
    pub const DEFAULT_CREDENTIALS: &'static str = "credentials.json";

    /// Layers CLI flags over file values.
    pub fn resolve(cli: &Cli, file: &FileConfig) -> CliResult<Self> {
        let defaults = ImportOptions::default();

        let batch_size = cli
            .batch_size
            .or(file.import.batch_size)
            .unwrap_or(defaults.batch_size);
        if batch_size == 0 {
            return Err(CliError::Usage("--batch-size must be at least 1".into()));
        }

        let options = ImportOptions {
            dry_run: cli.dry_run,
            target_calendar: cli
                .calendar
                .clone()
                .or_else(|| file.import.calendar.clone())
                .unwrap_or(defaults.target_calendar),
            include_attendees: if cli.no_attendees {
                false
            } else {
                file.import
                    .include_attendees
                    .unwrap_or(defaults.include_attendees)
            },
            skip_duplicates: if cli.no_skip_duplicates {
                false
            } else {
                file.import
                    .skip_duplicates
                    .unwrap_or(defaults.skip_duplicates)
            },
            start_date: cli.start_date.or(file.import.start_date),
            end_date: cli.end_date.or(file.import.end_date),
            limit: cli.limit.or(file.import.limit),
            add_self: cli.add_self.clone().or_else(|| file.import.add_self.clone()),
            batch_size,
            max_attendees: cli.max_attendees.or(file.import.max_attendees),
        };

        let credentials_path = cli
            .credentials
            .clone()
            .or_else(|| file.google.credentials.clone())
            .unwrap_or_else(|| PathBuf::from(Self::DEFAULT_CREDENTIALS));

        let token_path = cli.token.clone().or_else(|| file.google.token.clone());

        let tracing = resolve_tracing(cli, &file.logging)?;

        Ok(Self {
            options,
            credentials_path,
            token_path,
            tracing,
        })
    }
}

fn resolve_tracing(cli: &Cli, logging: &LoggingSettings) -> CliResult<TracingConfig> {
    let mut config = if cli.verbose {
        TracingConfig::verbose()
    } else if cli.quiet {
        TracingConfig::quiet()
    } else if let Some(level) = &logging.level {
        let level = level
            .parse()
            .map_err(|_| CliError::Config(format!("unknown log level {:?}", level)))?;
        TracingConfig::default().with_level(level)
    } else {
        TracingConfig::default()
    };

    match logging.format.as_deref() {
        Some("json") => config = config.with_format(TracingOutputFormat::Json),
        Some("compact") | None => {}
        Some(other) => {
            return Err(CliError::Config(format!(
                "unknown log format {:?} (expected \"compact\" or \"json\")",
                other
            )));
        }
    }

    Ok(config)
}
