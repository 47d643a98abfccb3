//! ICS file discovery and parsing.
//!
//! This crate turns one or more `.ics` files into [`calferry_core::RawEvent`]
//! values, preserving everything the export said (legacy timezone labels,
//! placeholder organizers, opaque recurrence lines) for downstream policy
//! decisions. Malformed `VEVENT` components are skipped and counted rather
//! than failing the whole file.

pub mod discover;
pub mod error;
pub mod parse;

pub use discover::find_ics_files;
pub use error::IcsError;
pub use parse::{ParsedCalendar, parse_ics, parse_ics_file};
