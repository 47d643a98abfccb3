//! Commit path for one normalized event.
//!
//! The executor owns the retry loop and the request pacing. Everything it
//! returns is a [`CommitOutcome`]; only authentication failures are
//! terminal for the whole run, and even those come back as an outcome so
//! the controller can close out the summary.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use calferry_google::{CalendarTarget, EventPayload, GcalErrorCode};

use crate::retry::RetryPolicy;

/// Pause after this many consecutive requests.
const PACE_EVERY: usize = 5;

/// Short pause between pacing groups.
const PACE_PAUSE: Duration = Duration::from_millis(200);

/// Longer pause between batches.
const BATCH_PAUSE: Duration = Duration::from_secs(2);

/// How one commit attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The event was accepted by the service.
    Imported {
        /// True when the event only went through after its organizer and
        /// attendees were stripped.
        without_attendees: bool,
    },
    /// The service already holds an event with this UID.
    SkippedDuplicate,
    /// The event could not be committed; the run continues.
    Failed {
        /// Operator-facing description of the failure.
        reason: String,
    },
    /// The credential is rejected; the run cannot continue.
    FatalAuth {
        /// Operator-facing description of the failure.
        reason: String,
    },
}

/// Commits payloads to a calendar target with retry and pacing.
pub struct ImportExecutor<'a> {
    target: &'a dyn CalendarTarget,
    policy: RetryPolicy,
    batch_size: usize,
    requests_sent: usize,
}

impl<'a> ImportExecutor<'a> {
    pub fn new(target: &'a dyn CalendarTarget, policy: RetryPolicy, batch_size: usize) -> Self {
        Self {
            target,
            policy,
            batch_size: batch_size.max(1),
            requests_sent: 0,
        }
    }

    /// Commits one payload, retrying transient failures per policy.
    ///
    /// A conflict response means the service already holds the UID and is
    /// reported as a duplicate, not a failure. A participant rejection is
    /// retried once with the organizer and attendees stripped.
    pub async fn commit(&mut self, calendar_id: &str, payload: &EventPayload) -> CommitOutcome {
        let mut current = payload.clone();
        let mut stripped = false;
        let mut attempt: u32 = 1;

        loop {
            self.requests_sent += 1;
            match self.target.import_event(calendar_id, &current).await {
                Ok(imported) => {
                    debug!(uid = %current.ical_uid, event_id = %imported.id, "imported");
                    self.pace().await;
                    return CommitOutcome::Imported {
                        without_attendees: stripped,
                    };
                }
                Err(err) if err.code() == GcalErrorCode::Conflict => {
                    debug!(uid = %current.ical_uid, "already present on target");
                    return CommitOutcome::SkippedDuplicate;
                }
                Err(err)
                    if err.is_participant_rejection()
                        && !stripped
                        && current.has_participants() =>
                {
                    info!(uid = %current.ical_uid, "participants rejected, retrying stripped");
                    current = current.without_participants();
                    stripped = true;
                }
                Err(err) if err.is_fatal() => {
                    return CommitOutcome::FatalAuth {
                        reason: err.to_string(),
                    };
                }
                Err(err) if self.policy.should_retry(&err, attempt) => {
                    let delay = self.policy.delay_after(attempt, err.retry_after());
                    warn!(
                        uid = %current.ical_uid,
                        attempt,
                        delay_secs = delay.as_secs(),
                        error = %err,
                        "transient failure, backing off"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    return CommitOutcome::Failed {
                        reason: err.to_string(),
                    };
                }
            }
        }
    }

    /// Spaces requests out so a large file does not hammer the service.
    ///
    /// Every `batch_size` requests take the long pause; every
    /// [`PACE_EVERY`] requests in between take the short one.
    async fn pace(&self) {
        if self.requests_sent % self.batch_size == 0 {
            debug!(sent = self.requests_sent, "batch boundary, pausing");
            sleep(BATCH_PAUSE).await;
        } else if self.requests_sent % PACE_EVERY == 0 {
            sleep(PACE_PAUSE).await;
        }
    }
}
