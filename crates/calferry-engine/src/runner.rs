//! The run controller.
//!
//! Wires the pipeline together for one run: prefetches the duplicate
//! ledger, orders the events chronologically, drives each one through
//! normalization, admission, and commit, and closes out the summary.

use tokio::sync::watch;
use tracing::{info, warn};

use calferry_core::{RawEvent, TimezoneMap};
use calferry_google::CalendarTarget;

use crate::executor::{CommitOutcome, ImportExecutor};
use crate::normalize::{Normalizer, Verdict};
use crate::options::ImportOptions;
use crate::progress::{ProgressSink, ProgressUpdate};
use crate::retry::RetryPolicy;
use crate::summary::RunSummary;
use crate::tracker::{Admission, DuplicateTracker, ImportLedger};

/// How many would-be imports a dry run lists in the summary.
const PREVIEW_LIMIT: usize = 10;

/// Drives one import run end to end.
pub struct RunController<'a> {
    target: &'a dyn CalendarTarget,
    options: &'a ImportOptions,
    tz_map: &'a TimezoneMap,
    retry: RetryPolicy,
    stop: Option<watch::Receiver<bool>>,
}

impl<'a> RunController<'a> {
    pub fn new(
        target: &'a dyn CalendarTarget,
        options: &'a ImportOptions,
        tz_map: &'a TimezoneMap,
    ) -> Self {
        Self {
            target,
            options,
            tz_map,
            retry: RetryPolicy::default(),
            stop: None,
        }
    }

    /// Installs a stop signal; when it flips to true the run finishes the
    /// in-flight event and stops cleanly.
    pub fn with_stop_signal(mut self, stop: watch::Receiver<bool>) -> Self {
        self.stop = Some(stop);
        self
    }

    #[cfg(test)]
    fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Runs the import and returns the summary.
    ///
    /// `parse_anomalies` is the count of source components that could not
    /// be parsed; they land in the filtered bucket but do not count toward
    /// the event limit. Never returns an error: fatal conditions abort the
    /// run and are reported in [`RunSummary::aborted`].
    pub async fn run(
        &mut self,
        events: &[RawEvent],
        default_timezone: Option<&str>,
        parse_anomalies: usize,
        progress: &mut dyn ProgressSink,
    ) -> RunSummary {
        let mut summary = RunSummary {
            dry_run: self.options.dry_run,
            total_offered: events.len() + parse_anomalies,
            skipped_filtered: parse_anomalies,
            ..Default::default()
        };

        let calendar_id = self.options.target_calendar.clone();

        let ledger = if self.options.skip_duplicates {
            match self.target.existing_uids(&calendar_id).await {
                Ok(uids) => {
                    info!(known = uids.len(), calendar = %calendar_id, "prefetched existing events");
                    ImportLedger::prefetched(uids)
                }
                Err(err) if err.is_fatal() => {
                    summary.aborted = Some(err.to_string());
                    return summary;
                }
                Err(err) => {
                    // Duplicate suppression degrades to stream-local only.
                    warn!(error = %err, "could not prefetch existing events");
                    ImportLedger::new()
                }
            }
        } else {
            ImportLedger::new()
        };
        let mut ledger = ledger;

        let mut ordered: Vec<&RawEvent> = events.iter().collect();
        ordered.sort_by(|a, b| a.start.cmp(&b.start));

        let mut normalizer = Normalizer::new(self.tz_map, self.options, default_timezone);
        let tracker = DuplicateTracker::new(self.options.skip_duplicates);
        let mut executor =
            ImportExecutor::new(self.target, self.retry.clone(), self.options.batch_size);

        // The limit counts events reaching a terminal state, not anomalies.
        let mut terminal_events = 0usize;
        let mut processed = 0usize;

        for event in ordered {
            if let Some(stop) = &self.stop
                && *stop.borrow()
            {
                summary.aborted = Some("stopped by user".to_string());
                break;
            }
            if let Some(limit) = self.options.limit
                && terminal_events >= limit
            {
                info!(limit, "event limit reached");
                break;
            }

            match normalizer.normalize(event) {
                Verdict::Filtered(reason) => {
                    info!(uid = %event.uid, %reason, "filtered");
                    summary.skipped_filtered += 1;
                    terminal_events += 1;
                }
                Verdict::Import(payload) => {
                    match tracker.admit(&ledger, &event.uid) {
                        Admission::SkipDuplicate => {
                            summary.skipped_duplicate += 1;
                            terminal_events += 1;
                        }
                        Admission::Proceed if self.options.dry_run => {
                            summary.imported += 1;
                            summary.attendees_imported +=
                                payload.attendees.as_ref().map_or(0, Vec::len);
                            terminal_events += 1;
                            ledger.record(&event.uid, None);
                            if summary.preview.len() < PREVIEW_LIMIT {
                                summary.preview.push(preview_line(&payload));
                            }
                        }
                        Admission::Proceed => {
                            match executor.commit(&calendar_id, &payload).await {
                                CommitOutcome::Imported { without_attendees } => {
                                    summary.imported += 1;
                                    terminal_events += 1;
                                    if without_attendees {
                                        summary.imported_without_attendees += 1;
                                    } else {
                                        summary.attendees_imported +=
                                            payload.attendees.as_ref().map_or(0, Vec::len);
                                    }
                                    ledger.record(&event.uid, None);
                                }
                                CommitOutcome::SkippedDuplicate => {
                                    summary.skipped_duplicate += 1;
                                    terminal_events += 1;
                                    ledger.record(&event.uid, None);
                                }
                                CommitOutcome::Failed { reason } => {
                                    warn!(uid = %event.uid, %reason, "import failed");
                                    summary.record_failure(&event.uid, reason);
                                    terminal_events += 1;
                                }
                                CommitOutcome::FatalAuth { reason } => {
                                    summary.aborted = Some(reason);
                                }
                            }
                        }
                    }
                    if summary.aborted.is_some() {
                        break;
                    }
                }
            }

            processed += 1;
            progress.on_progress(&ProgressUpdate {
                processed,
                total: events.len(),
                imported: summary.imported,
                skipped_duplicate: summary.skipped_duplicate,
                skipped_filtered: summary.skipped_filtered,
                failed: summary.failed,
            });
        }

        summary.timezone_warnings = normalizer.timezone_warnings().clone();
        summary
    }
}

fn preview_line(payload: &calferry_google::EventPayload) -> String {
    let when = payload
        .start
        .date_time
        .as_deref()
        .or(payload.start.date.as_deref())
        .unwrap_or("?");
    format!("{}  {}", when, payload.summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::time::Duration;

    use chrono::{TimeZone, Utc};

    use calferry_core::EventTime;
    use calferry_google::{
        BoxFuture, CalendarInfo, EventPayload, GcalError, GcalResult, ImportedEvent,
    };

    use crate::progress::NullProgress;

    /// What the fake returns from the prefetch listing.
    enum Listing {
        Uids(HashSet<String>),
        AuthFailure,
        ServerFailure,
    }

    /// Target with a canned prefetch listing and per-call import responses.
    struct FakeTarget {
        listing: Listing,
        responses: Mutex<Vec<GcalResult<ImportedEvent>>>,
        imported_uids: Mutex<Vec<String>>,
    }

    impl FakeTarget {
        fn accepting(existing: &[&str]) -> Self {
            Self {
                listing: Listing::Uids(existing.iter().map(|s| s.to_string()).collect()),
                responses: Mutex::new(Vec::new()),
                imported_uids: Mutex::new(Vec::new()),
            }
        }

        fn scripted(mut responses: Vec<GcalResult<ImportedEvent>>) -> Self {
            responses.reverse();
            Self {
                listing: Listing::Uids(HashSet::new()),
                responses: Mutex::new(responses),
                imported_uids: Mutex::new(Vec::new()),
            }
        }

        fn with_listing(mut self, listing: Listing) -> Self {
            self.listing = listing;
            self
        }

        fn import_calls(&self) -> usize {
            self.imported_uids.lock().unwrap().len()
        }
    }

    impl CalendarTarget for FakeTarget {
        fn name(&self) -> &str {
            "fake"
        }

        fn is_authenticated(&self) -> bool {
            true
        }

        fn list_calendars(&self) -> BoxFuture<'_, GcalResult<Vec<CalendarInfo>>> {
            Box::pin(async { Ok(Vec::new()) })
        }

        fn existing_uids<'a>(
            &'a self,
            _calendar_id: &'a str,
        ) -> BoxFuture<'a, GcalResult<HashSet<String>>> {
            let result = match &self.listing {
                Listing::Uids(uids) => Ok(uids.clone()),
                Listing::AuthFailure => Err(GcalError::authentication("no token")),
                Listing::ServerFailure => Err(GcalError::server("listing broke")),
            };
            Box::pin(async move { result })
        }

        fn import_event<'a>(
            &'a self,
            _calendar_id: &'a str,
            event: &'a EventPayload,
        ) -> BoxFuture<'a, GcalResult<ImportedEvent>> {
            self.imported_uids
                .lock()
                .unwrap()
                .push(event.ical_uid.clone());
            let response = {
                let mut responses = self.responses.lock().unwrap();
                if responses.is_empty() {
                    Ok(ImportedEvent {
                        id: "evt".to_string(),
                        ical_uid: None,
                    })
                } else {
                    responses.pop().unwrap()
                }
            };
            Box::pin(async move { response })
        }
    }

    fn event(uid: &str, hour: u32) -> RawEvent {
        RawEvent::new(
            uid,
            EventTime::from_utc(Utc.with_ymd_and_hms(2024, 3, 15, hour, 0, 0).unwrap()),
        )
        .with_summary(format!("Event {uid}"))
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 2,
            initial_backoff: Duration::from_millis(1),
            backoff_multiplier: 1.0,
            max_backoff: Duration::from_millis(1),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn imports_everything_on_a_clean_calendar() {
        let target = FakeTarget::accepting(&[]);
        let options = ImportOptions::default();
        let map = TimezoneMap::with_defaults();
        let mut controller =
            RunController::new(&target, &options, &map).with_retry_policy(fast_retry());

        let events = vec![event("u1", 9), event("u2", 10)];
        let summary = controller.run(&events, None, 0, &mut NullProgress).await;

        assert_eq!(summary.imported, 2);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.terminal(), 2);
        assert!(summary.aborted.is_none());
        assert_eq!(target.import_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn prefetched_duplicates_never_hit_the_network() {
        let target = FakeTarget::accepting(&["u1"]);
        let options = ImportOptions::default();
        let map = TimezoneMap::with_defaults();
        let mut controller =
            RunController::new(&target, &options, &map).with_retry_policy(fast_retry());

        let events = vec![event("u1", 9), event("u2", 10)];
        let summary = controller.run(&events, None, 0, &mut NullProgress).await;

        assert_eq!(summary.imported, 1);
        assert_eq!(summary.skipped_duplicate, 1);
        assert_eq!(target.import_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_uid_in_the_stream_is_committed_once() {
        let target = FakeTarget::accepting(&[]);
        let options = ImportOptions::default();
        let map = TimezoneMap::with_defaults();
        let mut controller =
            RunController::new(&target, &options, &map).with_retry_policy(fast_retry());

        let events = vec![event("u1", 9), event("u1", 10)];
        let summary = controller.run(&events, None, 0, &mut NullProgress).await;

        assert_eq!(summary.imported, 1);
        assert_eq!(summary.skipped_duplicate, 1);
        assert_eq!(target.import_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dry_run_commits_nothing_and_previews() {
        let target = FakeTarget::accepting(&["u1"]);
        let options = ImportOptions {
            dry_run: true,
            ..Default::default()
        };
        let map = TimezoneMap::with_defaults();
        let mut controller =
            RunController::new(&target, &options, &map).with_retry_policy(fast_retry());

        let events = vec![event("u1", 9), event("u2", 10)];
        let summary = controller.run(&events, None, 0, &mut NullProgress).await;

        assert!(summary.dry_run);
        assert_eq!(summary.imported, 1);
        assert_eq!(summary.skipped_duplicate, 1);
        assert_eq!(target.import_calls(), 0);
        assert_eq!(summary.preview, vec!["2024-03-15T10:00:00Z  Event u2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn limit_counts_terminal_states() {
        let target = FakeTarget::accepting(&["u1"]);
        let options = ImportOptions {
            limit: Some(2),
            ..Default::default()
        };
        let map = TimezoneMap::with_defaults();
        let mut controller =
            RunController::new(&target, &options, &map).with_retry_policy(fast_retry());

        let events = vec![event("u1", 8), event("u2", 9), event("u3", 10)];
        let summary = controller.run(&events, None, 0, &mut NullProgress).await;

        // u1 is a duplicate, u2 imports; both are terminal so u3 is never
        // offered.
        assert_eq!(summary.skipped_duplicate, 1);
        assert_eq!(summary.imported, 1);
        assert_eq!(target.import_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn parse_anomalies_count_as_filtered_but_not_against_limit() {
        let target = FakeTarget::accepting(&[]);
        let options = ImportOptions {
            limit: Some(1),
            ..Default::default()
        };
        let map = TimezoneMap::with_defaults();
        let mut controller =
            RunController::new(&target, &options, &map).with_retry_policy(fast_retry());

        let events = vec![event("u1", 9)];
        let summary = controller.run(&events, None, 3, &mut NullProgress).await;

        assert_eq!(summary.total_offered, 4);
        assert_eq!(summary.skipped_filtered, 3);
        assert_eq!(summary.imported, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn one_failure_does_not_stop_the_run() {
        let target = FakeTarget::scripted(vec![
            Err(GcalError::bad_request("malformed")),
            Ok(ImportedEvent {
                id: "evt".to_string(),
                ical_uid: None,
            }),
        ]);
        let options = ImportOptions::default();
        let map = TimezoneMap::with_defaults();
        let mut controller =
            RunController::new(&target, &options, &map).with_retry_policy(fast_retry());

        let events = vec![event("u1", 9), event("u2", 10)];
        let summary = controller.run(&events, None, 0, &mut NullProgress).await;

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.imported, 1);
        assert_eq!(summary.failure_reasons.len(), 1);
        assert_eq!(summary.failure_reasons[0].uid, "u1");
        assert!(summary.has_failures());
        assert!(summary.aborted.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn auth_failure_aborts_with_partial_summary() {
        let target = FakeTarget::scripted(vec![
            Ok(ImportedEvent {
                id: "evt".to_string(),
                ical_uid: None,
            }),
            Err(GcalError::authentication("token revoked")),
        ]);
        let options = ImportOptions::default();
        let map = TimezoneMap::with_defaults();
        let mut controller =
            RunController::new(&target, &options, &map).with_retry_policy(fast_retry());

        let events = vec![event("u1", 9), event("u2", 10), event("u3", 11)];
        let summary = controller.run(&events, None, 0, &mut NullProgress).await;

        assert_eq!(summary.imported, 1);
        assert!(summary.aborted.is_some());
        // The third event is never attempted.
        assert_eq!(target.import_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn prefetch_auth_failure_aborts_before_any_commit() {
        let target = FakeTarget::accepting(&[]).with_listing(Listing::AuthFailure);
        let options = ImportOptions::default();
        let map = TimezoneMap::with_defaults();
        let mut controller =
            RunController::new(&target, &options, &map).with_retry_policy(fast_retry());

        let events = vec![event("u1", 9)];
        let summary = controller.run(&events, None, 0, &mut NullProgress).await;

        assert!(summary.aborted.is_some());
        assert_eq!(summary.imported, 0);
        assert_eq!(target.import_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn prefetch_transient_failure_degrades_to_stream_local() {
        let target = FakeTarget::accepting(&[]).with_listing(Listing::ServerFailure);
        let options = ImportOptions::default();
        let map = TimezoneMap::with_defaults();
        let mut controller =
            RunController::new(&target, &options, &map).with_retry_policy(fast_retry());

        let events = vec![event("u1", 9)];
        let summary = controller.run(&events, None, 0, &mut NullProgress).await;

        assert!(summary.aborted.is_none());
        assert_eq!(summary.imported, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_signal_halts_between_events() {
        let target = FakeTarget::accepting(&[]);
        let options = ImportOptions::default();
        let map = TimezoneMap::with_defaults();
        let (tx, rx) = watch::channel(true);
        let mut controller = RunController::new(&target, &options, &map)
            .with_retry_policy(fast_retry())
            .with_stop_signal(rx);

        let events = vec![event("u1", 9), event("u2", 10)];
        let summary = controller.run(&events, None, 0, &mut NullProgress).await;
        drop(tx);

        assert_eq!(summary.aborted.as_deref(), Some("stopped by user"));
        assert_eq!(target.import_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn events_are_processed_chronologically() {
        let target = FakeTarget::accepting(&[]);
        let options = ImportOptions {
            limit: Some(1),
            ..Default::default()
        };
        let map = TimezoneMap::with_defaults();
        let mut controller =
            RunController::new(&target, &options, &map).with_retry_policy(fast_retry());

        // Out of order on purpose; the earliest event is the one imported.
        let events = vec![event("late", 18), event("early", 7)];
        let summary = controller.run(&events, None, 0, &mut NullProgress).await;
        assert_eq!(summary.imported, 1);
        assert_eq!(*target.imported_uids.lock().unwrap(), vec!["early"]);
    }

    #[tokio::test(start_paused = true)]
    async fn progress_is_emitted_per_event() {
        let target = FakeTarget::accepting(&[]);
        let options = ImportOptions::default();
        let map = TimezoneMap::with_defaults();
        let mut controller =
            RunController::new(&target, &options, &map).with_retry_policy(fast_retry());

        let mut progress = CaptureLast::default();
        let events = vec![event("u1", 9), event("u2", 10)];
        let _ = controller.run(&events, None, 0, &mut progress).await;

        let last = progress.0.expect("progress emitted");
        assert_eq!(last.processed, 2);
        assert_eq!(last.total, 2);
        assert_eq!(last.imported, 2);
    }

    #[derive(Default)]
    struct CaptureLast(Option<ProgressUpdate>);

    impl ProgressSink for CaptureLast {
        fn on_progress(&mut self, update: &ProgressUpdate) {
            self.0 = Some(*update);
        }
    }
}
