//! Event normalization.
//!
//! Converts one [`RawEvent`] into the target-schema payload, applying the
//! filtering policy on the way. Filtering is a verdict, never an error: an
//! excluded event comes back as [`Verdict::Filtered`] with the reason.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{Duration, SecondsFormat};
use tracing::{debug, warn};

use calferry_core::{EventTime, RawEvent, TimezoneMap};
use calferry_google::{
    EventAttendee, EventDateTime, EventOrganizer, EventPayload, EventReminders,
    ExtendedProperties, ReminderOverride,
};

use crate::options::ImportOptions;

/// Reminders past this horizon (4 weeks) are clamped to it.
const MAX_REMINDER_MINUTES: i64 = 40320;

/// The service accepts at most this many reminder overrides.
const MAX_REMINDERS: usize = 5;

/// Why an event was excluded by policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterReason {
    /// The start date falls outside the configured window.
    OutsideDateRange,
    /// The attendee list exceeds the configured safety ceiling.
    TooManyAttendees {
        /// How many attendees the event carries.
        count: usize,
        /// The configured ceiling.
        limit: usize,
    },
}

impl fmt::Display for FilterReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutsideDateRange => write!(f, "outside date range"),
            Self::TooManyAttendees { count, limit } => {
                write!(f, "{} attendees exceeds ceiling of {}", count, limit)
            }
        }
    }
}

/// The result of normalizing one raw event.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// The event passed every filter; here is its payload.
    Import(Box<EventPayload>),
    /// The event is excluded by policy.
    Filtered(FilterReason),
}

/// Converts raw events into import payloads under one set of options.
///
/// The normalizer accumulates the legacy timezone names it failed to
/// resolve; the run controller copies them into the summary.
pub struct Normalizer<'a> {
    tz_map: &'a TimezoneMap,
    options: &'a ImportOptions,
    /// The calendar-level default zone, already resolved to IANA.
    default_timezone: String,
    unresolved: BTreeSet<String>,
}

impl<'a> Normalizer<'a> {
    /// Creates a normalizer.
    ///
    /// `calendar_timezone` is the source file's declared default zone (may
    /// itself be a legacy name); when absent or unresolvable, UTC is used.
    pub fn new(
        tz_map: &'a TimezoneMap,
        options: &'a ImportOptions,
        calendar_timezone: Option<&str>,
    ) -> Self {
        let mut unresolved = BTreeSet::new();
        let default_timezone = match calendar_timezone {
            Some(name) => match tz_map.resolve(name) {
                Ok(iana) => iana,
                Err(_) => {
                    warn!(name, "calendar default timezone unresolved, using UTC");
                    unresolved.insert(name.to_string());
                    "UTC".to_string()
                }
            },
            None => "UTC".to_string(),
        };

        Self {
            tz_map,
            options,
            default_timezone,
            unresolved,
        }
    }

    /// Legacy timezone names that failed resolution so far.
    pub fn timezone_warnings(&self) -> &BTreeSet<String> {
        &self.unresolved
    }

    /// Normalizes one event to a payload or a filtered verdict.
    pub fn normalize(&mut self, event: &RawEvent) -> Verdict {
        let end = self.resolve_end(event);

        let organizer = event
            .organizer_email
            .as_deref()
            .filter(|email| !is_placeholder_organizer(email))
            .map(|email| EventOrganizer {
                email: email.to_string(),
                display_name: event.organizer_name.clone(),
            });

        let attendees = self.build_attendees(event);

        if let (Some(limit), Some(list)) = (self.options.max_attendees, attendees.as_ref())
            && list.len() > limit
        {
            debug!(uid = %event.uid, count = list.len(), limit, "attendee ceiling exceeded");
            return Verdict::Filtered(FilterReason::TooManyAttendees {
                count: list.len(),
                limit,
            });
        }

        // Filter on the window before converting, so events that never
        // reach the target do not record timezone warnings.
        if !self.options.date_window().admits(event.start.wall_date()) {
            debug!(uid = %event.uid, "outside date range");
            return Verdict::Filtered(FilterReason::OutsideDateRange);
        }

        let start = self.convert_time(&event.start);
        let end = self.convert_time(&end);

        let mut payload = EventPayload::new(&event.uid, self.title_for(event), start, end);
        payload.description = event.description.clone();
        payload.location = event.location.clone();
        payload.organizer = organizer;
        payload.attendees = attendees;
        payload.recurrence = (!event.recurrence.is_empty()).then(|| event.recurrence.clone());
        payload.status = event.status.as_deref().map(map_status);
        payload.transparency = event.transparency.as_deref().map(map_transparency);
        payload.visibility = event.classification.as_deref().and_then(map_visibility);
        payload.reminders = build_reminders(&event.reminder_minutes);
        payload.sequence = event.sequence;
        payload.extended_properties = Some(ExtendedProperties::with_source_uid(&event.uid));

        Verdict::Import(Box::new(payload))
    }

    /// Resolves the event end: explicit end, declared duration, or a
    /// default span (1 hour timed, 1 day all-day).
    fn resolve_end(&self, event: &RawEvent) -> EventTime {
        if let Some(end) = &event.end {
            return end.clone();
        }

        let default_span = if event.is_all_day() {
            Duration::days(1)
        } else {
            Duration::hours(1)
        };

        let span = event.duration.unwrap_or(default_span);
        let candidate = event.start.offset_by(span);
        if candidate <= event.start {
            // A zero or sub-day duration on an all-day event still needs a
            // positive span.
            event.start.offset_by(default_span)
        } else {
            candidate
        }
    }

    fn build_attendees(&self, event: &RawEvent) -> Option<Vec<EventAttendee>> {
        if !self.options.include_attendees {
            return None;
        }

        let mut attendees: Vec<EventAttendee> = event
            .attendees
            .iter()
            .filter(|a| !a.resource && !is_resource_address(&a.email))
            .map(|a| EventAttendee {
                email: a.email.clone(),
                display_name: a.display_name.clone(),
                optional: a.optional.then_some(true),
                response_status: Some(a.response_status.as_target_str().to_string()),
            })
            .collect();

        if let Some(self_address) = &self.options.add_self {
            let already_present = attendees
                .iter()
                .any(|a| a.email.eq_ignore_ascii_case(self_address));
            if !already_present {
                attendees.push(EventAttendee {
                    email: self_address.clone(),
                    display_name: None,
                    optional: None,
                    response_status: Some("accepted".to_string()),
                });
            }
        }

        (!attendees.is_empty()).then_some(attendees)
    }

    /// Converts an event time to the wire shape, resolving zone labels.
    fn convert_time(&mut self, time: &EventTime) -> EventDateTime {
        match time {
            EventTime::AllDay(date) => EventDateTime::all_day(date.format("%Y-%m-%d").to_string()),
            EventTime::Utc(dt) => {
                EventDateTime::timed(dt.to_rfc3339_opts(SecondsFormat::Secs, true), None)
            }
            EventTime::Floating(dt) => EventDateTime::timed(
                dt.format("%Y-%m-%dT%H:%M:%S").to_string(),
                Some(self.default_timezone.clone()),
            ),
            EventTime::Zoned { local, tzid } => {
                let zone = match self.tz_map.resolve(tzid) {
                    Ok(iana) => iana,
                    Err(_) => {
                        // Recoverable: fall back to the calendar default and
                        // flag the name in the summary.
                        warn!(tzid = %tzid, "unresolved timezone, using calendar default");
                        self.unresolved.insert(tzid.clone());
                        self.default_timezone.clone()
                    }
                };
                EventDateTime::timed(local.format("%Y-%m-%dT%H:%M:%S").to_string(), Some(zone))
            }
        }
    }

    /// The event title, defaulted for untitled events.
    fn title_for(&self, event: &RawEvent) -> String {
        if !event.is_untitled() {
            return event.summary.clone().unwrap_or_default();
        }

        if let Some(title) = sniff_meeting_link(event) {
            return title.to_string();
        }

        match event
            .busy_status
            .as_deref()
            .map(str::to_ascii_uppercase)
            .as_deref()
        {
            Some("OOF") => "Out of Office".to_string(),
            Some("FREE") => "Free".to_string(),
            Some("TENTATIVE") => "Tentative".to_string(),
            _ => "Busy".to_string(),
        }
    }
}

/// Outlook writes placeholder organizer values when an event has no real
/// organizer: an `invalid:` scheme, or no `@` at all.
fn is_placeholder_organizer(email: &str) -> bool {
    !email.contains('@') || email.to_ascii_lowercase().starts_with("invalid:")
}

/// Addresses in the room/resource namespace must not be invited as people.
fn is_resource_address(email: &str) -> bool {
    email
        .to_ascii_lowercase()
        .ends_with("@resource.calendar.google.com")
}

/// Guesses a title from a meeting link in the description or location.
fn sniff_meeting_link(event: &RawEvent) -> Option<&'static str> {
    let haystack = format!(
        "{} {}",
        event.description.as_deref().unwrap_or(""),
        event.location.as_deref().unwrap_or("")
    )
    .to_ascii_lowercase();

    if haystack.contains("zoom.us") {
        Some("Zoom Meeting")
    } else if haystack.contains("teams.microsoft.com") {
        Some("Teams Meeting")
    } else if haystack.contains("webex.com") {
        Some("Webex Meeting")
    } else if haystack.contains("meet.google.com") {
        Some("Google Meet")
    } else {
        None
    }
}

fn map_status(status: &str) -> String {
    match status.to_ascii_uppercase().as_str() {
        "TENTATIVE" => "tentative".to_string(),
        "CANCELLED" => "cancelled".to_string(),
        _ => "confirmed".to_string(),
    }
}

fn map_transparency(transp: &str) -> String {
    if transp.eq_ignore_ascii_case("TRANSPARENT") {
        "transparent".to_string()
    } else {
        "opaque".to_string()
    }
}

fn map_visibility(class: &str) -> Option<String> {
    match class.to_ascii_uppercase().as_str() {
        "PRIVATE" | "CONFIDENTIAL" => Some("private".to_string()),
        _ => None,
    }
}

/// Clamps, dedupes, and caps alarm offsets into popup reminders.
fn build_reminders(minutes: &[i64]) -> Option<EventReminders> {
    let mut seen = BTreeSet::new();
    let mut overrides = Vec::new();

    for &offset in minutes {
        let clamped = offset.clamp(0, MAX_REMINDER_MINUTES);
        if seen.insert(clamped) {
            overrides.push(ReminderOverride::popup(clamped));
            if overrides.len() == MAX_REMINDERS {
                break;
            }
        }
    }

    (!overrides.is_empty()).then_some(EventReminders {
        use_default: false,
        overrides,
    })
}
