//! Progress lines and the final summary block.

use std::io::Write;
use std::time::{Duration, Instant};

use calferry_engine::{ProgressSink, ProgressUpdate, RunSummary};

/// Emit a line at least every this many events.
const PROGRESS_EVERY: usize = 100;

/// Emit a line after this long without one, even mid-batch.
const PROGRESS_QUIET: Duration = Duration::from_secs(10);

/// Throttled progress renderer for the terminal.
///
/// The engine reports every event; printing all of them would drown a big
/// import, so lines appear every [`PROGRESS_EVERY`] events or after
/// [`PROGRESS_QUIET`] of silence, whichever comes first.
pub struct ConsoleProgress<W: Write> {
    out: W,
    last_emit: Option<Instant>,
    last_processed: usize,
}

impl<W: Write> ConsoleProgress<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            last_emit: None,
            last_processed: 0,
        }
    }

    fn due(&self, update: &ProgressUpdate) -> bool {
        if update.processed == update.total {
            return true;
        }
        if update.processed >= self.last_processed + PROGRESS_EVERY {
            return true;
        }
        match self.last_emit {
            Some(at) => at.elapsed() >= PROGRESS_QUIET,
            None => false,
        }
    }
}

impl ConsoleProgress<std::io::Stderr> {
    /// Progress goes to stderr so a redirected summary stays clean.
    pub fn stderr() -> Self {
        Self::new(std::io::stderr())
    }
}

impl<W: Write> ProgressSink for ConsoleProgress<W> {
    fn on_progress(&mut self, update: &ProgressUpdate) {
        if self.last_emit.is_none() {
            self.last_emit = Some(Instant::now());
        }
        if !self.due(update) {
            return;
        }
        let _ = writeln!(
            self.out,
            "{}/{} processed  ({} imported, {} duplicate, {} filtered, {} failed)",
            update.processed,
            update.total,
            update.imported,
            update.skipped_duplicate,
            update.skipped_filtered,
            update.failed
        );
        self.last_emit = Some(Instant::now());
        self.last_processed = update.processed;
    }
}

/// Renders the final summary block.
pub fn render_summary(summary: &RunSummary) -> String {
    let mut out = String::new();

    let heading = if summary.dry_run {
        "Import summary (dry run)"
    } else {
        "Import summary"
    };
    out.push_str(heading);
    out.push('\n');

    push_count(&mut out, "events offered", summary.total_offered);
    push_count(&mut out, "imported", summary.imported);
    push_count(&mut out, "skipped (duplicate)", summary.skipped_duplicate);
    push_count(&mut out, "skipped (filtered)", summary.skipped_filtered);
    push_count(&mut out, "failed", summary.failed);
    if summary.attendees_imported > 0 {
        push_count(&mut out, "attendees carried", summary.attendees_imported);
    }
    if summary.imported_without_attendees > 0 {
        push_count(
            &mut out,
            "imported without attendees",
            summary.imported_without_attendees,
        );
    }

    if summary.dry_run && !summary.preview.is_empty() {
        out.push_str("\nWould import:\n");
        for line in &summary.preview {
            out.push_str("  ");
            out.push_str(line);
            out.push('\n');
        }
        if summary.imported > summary.preview.len() {
            out.push_str(&format!(
                "  ... and {} more\n",
                summary.imported - summary.preview.len()
            ));
        }
    }

    if !summary.failure_reasons.is_empty() {
        out.push_str("\nFailures:\n");
        for note in &summary.failure_reasons {
            out.push_str(&format!("  {}: {}\n", note.uid, note.reason));
        }
    }

    if !summary.timezone_warnings.is_empty() {
        out.push_str("\nUnresolved timezones (events used the calendar default):\n");
        for name in &summary.timezone_warnings {
            out.push_str(&format!("  {}\n", name));
        }
    }

    if let Some(reason) = &summary.aborted {
        out.push_str(&format!("\nRun aborted: {}\n", reason));
    }

    out
}

fn push_count(out: &mut String, label: &str, value: usize) {
    out.push_str(&format!("  {}: {}\n", label, value));
}
