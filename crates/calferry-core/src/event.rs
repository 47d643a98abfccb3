//! Raw event type parsed from an ICS export.
//!
//! This module defines [`RawEvent`], the representation of one `VEVENT` as it
//! comes out of the source file, before normalization into the target
//! calendar's schema. The raw event preserves what the export actually said
//! (including legacy timezone labels and placeholder organizer addresses) so
//! that every policy decision happens in one place downstream.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::time::EventTime;

/// The response status for an event attendee.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    /// The attendee has accepted the invitation.
    Accepted,
    /// The attendee has declined the invitation.
    Declined,
    /// The attendee has tentatively accepted.
    Tentative,
    /// The attendee has not responded.
    #[default]
    NeedsAction,
}

impl ResponseStatus {
    /// Parses an iCalendar `PARTSTAT` value.
    pub fn from_partstat(value: &str) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "ACCEPTED" => Self::Accepted,
            "DECLINED" => Self::Declined,
            "TENTATIVE" => Self::Tentative,
            _ => Self::NeedsAction,
        }
    }

    /// The status vocabulary used by the target calendar service.
    pub fn as_target_str(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Declined => "declined",
            Self::Tentative => "tentative",
            Self::NeedsAction => "needsAction",
        }
    }
}

/// An attendee of a calendar event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAttendee {
    /// The attendee's email address.
    pub email: String,
    /// The attendee's display name, if available.
    pub display_name: Option<String>,
    /// Whether this entry represents a resource (room, equipment).
    pub resource: bool,
    /// Whether this attendee is optional (`ROLE=OPT-PARTICIPANT`).
    pub optional: bool,
    /// The attendee's response status.
    pub response_status: ResponseStatus,
}

impl RawAttendee {
    /// Creates a new attendee with the given email.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            display_name: None,
            resource: false,
            optional: false,
            response_status: ResponseStatus::NeedsAction,
        }
    }

    /// Builder method to set the display name.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Builder method to mark the attendee as a resource.
    pub fn with_resource(mut self, resource: bool) -> Self {
        self.resource = resource;
        self
    }

    /// Builder method to mark the attendee as optional.
    pub fn with_optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    /// Builder method to set the response status.
    pub fn with_response_status(mut self, status: ResponseStatus) -> Self {
        self.response_status = status;
        self
    }
}

/// A raw calendar event parsed from an ICS export.
///
/// Every event carries a UID: the parser synthesizes a deterministic one when
/// the source component lacks it, so downstream identity handling never deals
/// with an absent identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    /// Unique identifier from the source file (or synthesized by the parser).
    pub uid: String,

    /// When the event starts.
    pub start: EventTime,

    /// When the event ends, if the source declared an end.
    pub end: Option<EventTime>,

    /// A declared duration, if the source used `DURATION` instead of an end.
    pub duration: Option<Duration>,

    /// The event title.
    pub summary: Option<String>,

    /// The event description.
    pub description: Option<String>,

    /// The event location.
    pub location: Option<String>,

    /// The organizer's email address, verbatim. Outlook exports use
    /// placeholder values (an `invalid:` prefix, or no `@` at all) to mean
    /// "no organizer"; the normalizer interprets those.
    pub organizer_email: Option<String>,

    /// The organizer's display name.
    pub organizer_name: Option<String>,

    /// Event attendees in source order.
    pub attendees: Vec<RawAttendee>,

    /// Recurrence lines (`RRULE`, `EXDATE`, `RDATE`), forwarded opaquely.
    pub recurrence: Vec<String>,

    /// The event status (`CONFIRMED`, `TENTATIVE`, `CANCELLED`).
    pub status: Option<String>,

    /// Time transparency (`OPAQUE`, `TRANSPARENT`).
    pub transparency: Option<String>,

    /// Access classification (`PUBLIC`, `PRIVATE`, `CONFIDENTIAL`).
    pub classification: Option<String>,

    /// Outlook busy status (`X-MICROSOFT-CDO-BUSYSTATUS`).
    pub busy_status: Option<String>,

    /// Revision sequence number.
    pub sequence: Option<i64>,

    /// Reminder offsets in minutes before the start, from `VALARM` blocks.
    pub reminder_minutes: Vec<i64>,
}

impl RawEvent {
    /// Creates a new raw event with the required fields.
    pub fn new(uid: impl Into<String>, start: EventTime) -> Self {
        Self {
            uid: uid.into(),
            start,
            end: None,
            duration: None,
            summary: None,
            description: None,
            location: None,
            organizer_email: None,
            organizer_name: None,
            attendees: Vec::new(),
            recurrence: Vec::new(),
            status: None,
            transparency: None,
            classification: None,
            busy_status: None,
            sequence: None,
            reminder_minutes: Vec::new(),
        }
    }

    /// Returns true if this is an all-day event.
    pub fn is_all_day(&self) -> bool {
        self.start.is_all_day()
    }

    /// Returns true if the summary is absent or blank.
    pub fn is_untitled(&self) -> bool {
        self.summary.as_ref().is_none_or(|s| s.trim().is_empty())
    }

    /// Builder method to set the end time.
    pub fn with_end(mut self, end: EventTime) -> Self {
        self.end = Some(end);
        self
    }

    /// Builder method to set a declared duration.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Builder method to set the summary.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Builder method to set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Builder method to set the location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Builder method to set the organizer address.
    pub fn with_organizer(mut self, email: impl Into<String>) -> Self {
        self.organizer_email = Some(email.into());
        self
    }

    /// Builder method to set the organizer display name.
    pub fn with_organizer_name(mut self, name: impl Into<String>) -> Self {
        self.organizer_name = Some(name.into());
        self
    }

    /// Builder method to add an attendee.
    pub fn with_attendee(mut self, attendee: RawAttendee) -> Self {
        self.attendees.push(attendee);
        self
    }

    /// Builder method to add a recurrence line.
    pub fn with_recurrence_line(mut self, line: impl Into<String>) -> Self {
        self.recurrence.push(line.into());
        self
    }

    /// Builder method to set the status.
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Builder method to set the transparency.
    pub fn with_transparency(mut self, transparency: impl Into<String>) -> Self {
        self.transparency = Some(transparency.into());
        self
    }

    /// Builder method to set the classification.
    pub fn with_classification(mut self, classification: impl Into<String>) -> Self {
        self.classification = Some(classification.into());
        self
    }

    /// Builder method to set the busy status.
    pub fn with_busy_status(mut self, busy_status: impl Into<String>) -> Self {
        self.busy_status = Some(busy_status.into());
        self
    }

    /// Builder method to set the sequence number.
    pub fn with_sequence(mut self, sequence: i64) -> Self {
        self.sequence = Some(sequence);
        self
    }

    /// Builder method to add a reminder offset in minutes.
    pub fn with_reminder(mut self, minutes: i64) -> Self {
        self.reminder_minutes.push(minutes);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn sample_start() -> EventTime {
        EventTime::from_utc(Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap())
    }

    #[test]
    fn event_creation() {
        let event = RawEvent::new("uid-123", sample_start());
        assert_eq!(event.uid, "uid-123");
        assert!(event.end.is_none());
        assert!(event.duration.is_none());
        assert!(event.is_untitled());
        assert!(!event.is_all_day());
    }

    #[test]
    fn event_builder() {
        let event = RawEvent::new("uid-123", sample_start())
            .with_summary("Quarterly review")
            .with_location("Room 4A")
            .with_organizer("boss@example.com")
            .with_organizer_name("The Boss")
            .with_attendee(RawAttendee::new("dev@example.com"))
            .with_recurrence_line("RRULE:FREQ=WEEKLY;BYDAY=FR")
            .with_status("CONFIRMED")
            .with_sequence(3)
            .with_reminder(15);

        assert!(!event.is_untitled());
        assert_eq!(event.organizer_email.as_deref(), Some("boss@example.com"));
        assert_eq!(event.attendees.len(), 1);
        assert_eq!(event.recurrence, vec!["RRULE:FREQ=WEEKLY;BYDAY=FR"]);
        assert_eq!(event.sequence, Some(3));
        assert_eq!(event.reminder_minutes, vec![15]);
    }

    #[test]
    fn untitled_detection() {
        let event = RawEvent::new("u", sample_start()).with_summary("   ");
        assert!(event.is_untitled());

        let event = RawEvent::new("u", sample_start()).with_summary("Standup");
        assert!(!event.is_untitled());
    }

    #[test]
    fn all_day_detection() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let event = RawEvent::new("u", EventTime::from_date(date));
        assert!(event.is_all_day());
    }

    #[test]
    fn attendee_builder() {
        let attendee = RawAttendee::new("room-4a@example.com")
            .with_display_name("Room 4A")
            .with_resource(true)
            .with_optional(true)
            .with_response_status(ResponseStatus::Accepted);

        assert!(attendee.resource);
        assert!(attendee.optional);
        assert_eq!(attendee.response_status, ResponseStatus::Accepted);
    }

    #[test]
    fn partstat_parsing() {
        assert_eq!(
            ResponseStatus::from_partstat("ACCEPTED"),
            ResponseStatus::Accepted
        );
        assert_eq!(
            ResponseStatus::from_partstat("declined"),
            ResponseStatus::Declined
        );
        assert_eq!(
            ResponseStatus::from_partstat("NEEDS-ACTION"),
            ResponseStatus::NeedsAction
        );
        assert_eq!(
            ResponseStatus::from_partstat("whatever"),
            ResponseStatus::NeedsAction
        );
    }

    #[test]
    fn response_status_target_vocabulary() {
        assert_eq!(ResponseStatus::Accepted.as_target_str(), "accepted");
        assert_eq!(ResponseStatus::NeedsAction.as_target_str(), "needsAction");
    }
}
