//! The import engine.
//!
//! Drives raw parsed events through normalization, duplicate admission, and
//! the committing executor, producing a final run summary. The engine is
//! written against the [`calferry_google::CalendarTarget`] trait and never
//! constructs an HTTP client itself.
//!
//! Pipeline: `RawEvent` → [`Normalizer`] (payload or filtered verdict) →
//! [`DuplicateTracker`] (proceed or skip) → [`ImportExecutor`] (commit,
//! retry, or simulate) → [`RunController`] (limits, stop signal, summary).

pub mod executor;
pub mod normalize;
pub mod options;
pub mod progress;
pub mod retry;
pub mod runner;
pub mod summary;
pub mod tracker;

pub use executor::{CommitOutcome, ImportExecutor};
pub use normalize::{FilterReason, Normalizer, Verdict};
pub use options::ImportOptions;
pub use progress::{NullProgress, ProgressSink, ProgressUpdate};
pub use retry::RetryPolicy;
pub use runner::RunController;
pub use summary::{FailureNote, RunSummary};
pub use tracker::{Admission, DuplicateTracker, ImportLedger};
