//! Wire types for the Calendar v3 `events.import` endpoint.
//!
//! These structs serialize to the exact JSON shape the API expects;
//! `Option` fields are omitted rather than sent as `null`.

use serde::{Deserialize, Serialize};

/// A fully normalized event, ready to be sent to `events.import`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    /// The stable source identifier. `events.import` uses this as the
    /// event's identity, so re-imports of the same UID collide (409)
    /// instead of duplicating.
    #[serde(rename = "iCalUID")]
    pub ical_uid: String,

    /// Event title.
    pub summary: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    pub start: EventDateTime,
    pub end: EventDateTime,

    /// Opaque recurrence lines (`RRULE`/`EXDATE`/`RDATE`), forwarded to the
    /// service for expansion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Vec<String>>,

    /// `confirmed`, `tentative`, or `cancelled`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// `opaque` or `transparent`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transparency: Option<String>,

    /// `default`, `private`, or `confidential`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub organizer: Option<EventOrganizer>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendees: Option<Vec<EventAttendee>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminders: Option<EventReminders>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub extended_properties: Option<ExtendedProperties>,
}

impl EventPayload {
    /// Creates a minimal payload with the required fields.
    pub fn new(
        ical_uid: impl Into<String>,
        summary: impl Into<String>,
        start: EventDateTime,
        end: EventDateTime,
    ) -> Self {
        Self {
            ical_uid: ical_uid.into(),
            summary: summary.into(),
            description: None,
            location: None,
            start,
            end,
            recurrence: None,
            status: None,
            transparency: None,
            visibility: None,
            organizer: None,
            attendees: None,
            reminders: None,
            sequence: None,
            extended_properties: None,
        }
    }

    /// Returns a copy with organizer and attendees removed.
    ///
    /// Used when the service rejects the participant list for an imported
    /// event (the authenticated user is neither organizer nor attendee).
    pub fn without_participants(&self) -> Self {
        let mut stripped = self.clone();
        stripped.organizer = None;
        stripped.attendees = None;
        stripped
    }

    /// Returns true if the payload carries an organizer or any attendees.
    pub fn has_participants(&self) -> bool {
        self.organizer.is_some() || self.attendees.as_ref().is_some_and(|a| !a.is_empty())
    }
}

/// Start or end of an event: either a datetime (optionally zone-qualified)
/// or a bare date for all-day events. Exactly one of `date_time`/`date` is
/// set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl EventDateTime {
    /// A timed boundary, optionally qualified by an IANA zone identifier.
    pub fn timed(date_time: impl Into<String>, time_zone: Option<String>) -> Self {
        Self {
            date_time: Some(date_time.into()),
            time_zone,
            date: None,
        }
    }

    /// An all-day boundary (`YYYY-MM-DD`).
    pub fn all_day(date: impl Into<String>) -> Self {
        Self {
            date_time: None,
            time_zone: None,
            date: Some(date.into()),
        }
    }
}

/// The event organizer as sent to the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventOrganizer {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// An attendee as sent to the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventAttendee {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_status: Option<String>,
}

/// Reminder configuration. When any overrides exist, the calendar default
/// reminders are disabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventReminders {
    pub use_default: bool,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub overrides: Vec<ReminderOverride>,
}

/// One popup reminder, `minutes` before the event start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderOverride {
    pub method: String,
    pub minutes: i64,
}

impl ReminderOverride {
    /// A popup reminder the given number of minutes before the start.
    pub fn popup(minutes: i64) -> Self {
        Self {
            method: "popup".to_string(),
            minutes,
        }
    }
}

/// Extended properties attached to the imported event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendedProperties {
    pub private: PrivateProperties,
}

impl ExtendedProperties {
    /// Tags the event with the source UID for later duplicate detection.
    pub fn with_source_uid(uid: impl Into<String>) -> Self {
        Self {
            private: PrivateProperties {
                outlook_uid: uid.into(),
            },
        }
    }
}

/// The private key/value pairs this tool writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateProperties {
    #[serde(rename = "outlookUID")]
    pub outlook_uid: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_payload() -> EventPayload {
        let mut payload = EventPayload::new(
            "uid-1@example.com",
            "Team Sync",
            EventDateTime::timed(
                "2024-03-15T10:00:00",
                Some("America/New_York".to_string()),
            ),
            EventDateTime::timed(
                "2024-03-15T11:00:00",
                Some("America/New_York".to_string()),
            ),
        );
        payload.extended_properties =
            Some(ExtendedProperties::with_source_uid("uid-1@example.com"));
        payload
    }

    #[test]
    fn serializes_to_api_field_names() {
        let json = serde_json::to_value(sample_payload()).unwrap();

        assert_eq!(json["iCalUID"], "uid-1@example.com");
        assert_eq!(json["start"]["dateTime"], "2024-03-15T10:00:00");
        assert_eq!(json["start"]["timeZone"], "America/New_York");
        assert_eq!(
            json["extendedProperties"]["private"]["outlookUID"],
            "uid-1@example.com"
        );
    }

    #[test]
    fn optional_fields_are_omitted() {
        let json = serde_json::to_value(sample_payload()).unwrap();
        let obj = json.as_object().unwrap();

        assert!(!obj.contains_key("description"));
        assert!(!obj.contains_key("attendees"));
        assert!(!obj.contains_key("recurrence"));
        assert!(!obj.contains_key("status"));
        assert!(!json["start"].as_object().unwrap().contains_key("date"));
    }

    #[test]
    fn all_day_boundary() {
        let json = serde_json::to_value(EventDateTime::all_day("2024-03-15")).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(json["date"], "2024-03-15");
        assert!(!obj.contains_key("dateTime"));
    }

    #[test]
    fn reminders_shape() {
        let reminders = EventReminders {
            use_default: false,
            overrides: vec![ReminderOverride::popup(30), ReminderOverride::popup(1440)],
        };
        let json = serde_json::to_value(&reminders).unwrap();
        assert_eq!(json["useDefault"], false);
        assert_eq!(json["overrides"][0]["method"], "popup");
        assert_eq!(json["overrides"][1]["minutes"], 1440);
    }

    #[test]
    fn without_participants_strips_both() {
        let mut payload = sample_payload();
        payload.organizer = Some(EventOrganizer {
            email: "boss@example.com".to_string(),
            display_name: None,
        });
        payload.attendees = Some(vec![EventAttendee {
            email: "dev@example.com".to_string(),
            display_name: None,
            optional: None,
            response_status: Some("accepted".to_string()),
        }]);
        assert!(payload.has_participants());

        let stripped = payload.without_participants();
        assert!(!stripped.has_participants());
        assert_eq!(stripped.ical_uid, payload.ical_uid);
        // The original is untouched.
        assert!(payload.organizer.is_some());
    }
}
