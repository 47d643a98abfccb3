//! CLI error types.

use std::fmt;

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI.
#[derive(Debug)]
pub enum CliError {
    /// Bad invocation: missing or contradictory arguments.
    Usage(String),
    /// Configuration file error.
    Config(String),
    /// Source file discovery or parsing failed.
    Ics(calferry_ics::IcsError),
    /// The calendar service rejected us outside the per-event path.
    Google(calferry_google::GcalError),
    /// IO error.
    Io(std::io::Error),
}

impl CliError {
    /// Returns true for errors that should exit with the usage code.
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            Self::Usage(_)
                | Self::Ics(
                    calferry_ics::IcsError::NotFound { .. }
                        | calferry_ics::IcsError::NoIcsFiles { .. }
                )
        )
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Usage(msg) => write!(f, "{}", msg),
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Ics(err) => write!(f, "{}", err),
            Self::Google(err) => write!(f, "calendar service error: {}", err),
            Self::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Ics(err) => Some(err),
            Self::Google(err) => Some(err),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<calferry_ics::IcsError> for CliError {
    fn from(err: calferry_ics::IcsError) -> Self {
        Self::Ics(err)
    }
}

impl From<calferry_google::GcalError> for CliError {
    fn from(err: calferry_google::GcalError) -> Self {
        Self::Google(err)
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}
