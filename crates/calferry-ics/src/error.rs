//! Error types for ICS discovery and parsing.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from reading or parsing ICS source files.
#[derive(Debug, Error)]
pub enum IcsError {
    /// The source path could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// The offending path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file did not contain a parsable `VCALENDAR`.
    #[error("invalid calendar data in {}: {message}", path.display())]
    Syntax {
        /// The offending path.
        path: PathBuf,
        /// The parser's diagnostic.
        message: String,
    },

    /// The source path does not exist.
    #[error("source path {} does not exist", path.display())]
    NotFound {
        /// The missing path.
        path: PathBuf,
    },

    /// A directory was given but contains no `.ics` files.
    #[error("no .ics files found in {}", path.display())]
    NoIcsFiles {
        /// The searched directory.
        path: PathBuf,
    },
}
