//! The final report of an import run.

use std::collections::BTreeSet;

use serde::Serialize;

/// One event that reached `Failed`, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureNote {
    /// The event's stable identifier.
    pub uid: String,
    /// Why the commit ultimately failed.
    pub reason: String,
}

/// Aggregated counts and diagnostics for one run.
///
/// Built up by the run controller and finalized once at run end; every
/// offered event lands in exactly one of `imported`, `skipped_duplicate`,
/// `skipped_filtered`, or `failed`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    /// Whether this was a dry run.
    pub dry_run: bool,

    /// Events offered to the pipeline (including parse anomalies).
    pub total_offered: usize,

    /// Events committed (or, in a dry run, that would have been).
    pub imported: usize,

    /// Events skipped because the target already had them.
    pub skipped_duplicate: usize,

    /// Events excluded by policy (date range, attendee ceiling) or
    /// unparsable at the source.
    pub skipped_filtered: usize,

    /// Events that reached `Failed` after retries.
    pub failed: usize,

    /// Total attendees carried on imported events.
    pub attendees_imported: usize,

    /// Imported events whose participant list had to be stripped.
    pub imported_without_attendees: usize,

    /// Failure reasons in the order they occurred.
    pub failure_reasons: Vec<FailureNote>,

    /// Legacy timezone names that could not be resolved.
    pub timezone_warnings: BTreeSet<String>,

    /// Dry-run preview: the first few events that would be imported.
    pub preview: Vec<String>,

    /// Set when a fatal condition aborted the run early.
    pub aborted: Option<String>,
}

impl RunSummary {
    /// Returns true if any event failed or the run aborted.
    pub fn has_failures(&self) -> bool {
        self.failed > 0 || self.aborted.is_some()
    }

    /// Events that reached a terminal state.
    pub fn terminal(&self) -> usize {
        self.imported + self.skipped_duplicate + self.skipped_filtered + self.failed
    }

    /// Records a failed event.
    pub(crate) fn record_failure(&mut self, uid: impl Into<String>, reason: impl Into<String>) {
        self.failed += 1;
        self.failure_reasons.push(FailureNote {
            uid: uid.into(),
            reason: reason.into(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_counts() {
        let mut summary = RunSummary {
            imported: 3,
            skipped_duplicate: 2,
            skipped_filtered: 1,
            ..Default::default()
        };
        assert_eq!(summary.terminal(), 6);
        assert!(!summary.has_failures());

        summary.record_failure("uid-1", "server error");
        assert_eq!(summary.terminal(), 7);
        assert!(summary.has_failures());
        assert_eq!(summary.failure_reasons.len(), 1);
    }

    #[test]
    fn aborted_counts_as_failure() {
        let summary = RunSummary {
            aborted: Some("authentication failed".to_string()),
            ..Default::default()
        };
        assert!(summary.has_failures());
    }
}
