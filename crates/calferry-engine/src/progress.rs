//! Progress reporting.
//!
//! The engine emits one update per processed event; sinks decide how often
//! to actually render (the console sink in the CLI throttles).

/// A snapshot of running totals, emitted after each processed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressUpdate {
    /// Events processed so far.
    pub processed: usize,
    /// Events in the input stream.
    pub total: usize,
    /// Running imported count.
    pub imported: usize,
    /// Running duplicate-skip count.
    pub skipped_duplicate: usize,
    /// Running filtered count.
    pub skipped_filtered: usize,
    /// Running failure count.
    pub failed: usize,
}

/// Receives progress updates from the run controller.
///
/// Purely observational: a sink must not influence control flow.
pub trait ProgressSink {
    fn on_progress(&mut self, update: &ProgressUpdate);
}

/// A sink that discards everything.
#[derive(Debug, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn on_progress(&mut self, _update: &ProgressUpdate) {}
}
