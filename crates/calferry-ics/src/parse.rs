//! ICS parsing using the icalendar crate's parser.
//!
//! Parsing is line-level rather than through the typed `Calendar` builder:
//! the typed API normalizes away the parameters this tool cares about
//! (`TZID` labels, `CUTYPE`, `ROLE`, `PARTSTAT`) and the raw recurrence
//! lines that must be forwarded verbatim.

use std::path::Path;

use icalendar::{
    CalendarDateTime, DatePerhapsTime,
    parser::{Component, Property, read_calendar, unfold},
};
use tracing::{debug, warn};

use calferry_core::{EventTime, RawAttendee, RawEvent, ResponseStatus};

use crate::error::IcsError;

/// The result of parsing one ICS file.
#[derive(Debug, Clone)]
pub struct ParsedCalendar {
    /// Events in file order.
    pub events: Vec<RawEvent>,
    /// The calendar-level default timezone, if the file declares one
    /// (`X-WR-TIMEZONE`, else the first `VTIMEZONE`'s `TZID`).
    pub default_timezone: Option<String>,
    /// Count of `VEVENT` components that could not be converted.
    pub anomalies: usize,
}

/// Reads and parses one ICS file.
pub fn parse_ics_file(path: &Path) -> Result<ParsedCalendar, IcsError> {
    let content = std::fs::read_to_string(path).map_err(|source| IcsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_ics(&content).map_err(|err| match err {
        IcsError::Syntax { message, .. } => IcsError::Syntax {
            path: path.to_path_buf(),
            message,
        },
        other => other,
    })
}

/// Parses ICS content into raw events.
///
/// A file that is not a valid `VCALENDAR` at all is an error; a `VEVENT`
/// inside a valid calendar that cannot be converted is skipped, logged, and
/// counted in [`ParsedCalendar::anomalies`].
pub fn parse_ics(content: &str) -> Result<ParsedCalendar, IcsError> {
    let unfolded = unfold(content);
    let calendar = read_calendar(&unfolded).map_err(|message| IcsError::Syntax {
        path: Path::new("<inline>").to_path_buf(),
        message,
    })?;

    let default_timezone = calendar
        .properties
        .iter()
        .find(|p| p.name == "X-WR-TIMEZONE")
        .map(|p| p.val.to_string())
        .or_else(|| {
            calendar
                .components
                .iter()
                .find(|c| c.name == "VTIMEZONE")
                .and_then(|tz| tz.find_prop("TZID"))
                .map(|p| p.val.to_string())
        });

    let mut events = Vec::new();
    let mut anomalies = 0;
    for component in calendar.components.iter().filter(|c| c.name == "VEVENT") {
        match parse_vevent(component) {
            Some(event) => events.push(event),
            None => {
                anomalies += 1;
                let uid = component
                    .find_prop("UID")
                    .map(|p| p.val.to_string())
                    .unwrap_or_else(|| "<no uid>".to_string());
                warn!(uid = %uid, "skipping unparsable VEVENT");
            }
        }
    }

    debug!(
        events = events.len(),
        anomalies,
        default_timezone = default_timezone.as_deref().unwrap_or("none"),
        "parsed calendar"
    );

    Ok(ParsedCalendar {
        events,
        default_timezone,
        anomalies,
    })
}

/// Converts one `VEVENT` component into a [`RawEvent`].
///
/// Returns `None` when the component lacks a parsable `DTSTART`; every other
/// field is optional and degrades to absence.
fn parse_vevent(vevent: &Component) -> Option<RawEvent> {
    let start = vevent
        .find_prop("DTSTART")
        .and_then(|p| DatePerhapsTime::try_from(p).ok())
        .map(to_event_time)?;

    let uid = match vevent.find_prop("UID") {
        Some(p) if !p.val.as_ref().trim().is_empty() => p.val.to_string(),
        _ => synthesize_uid(vevent),
    };

    let mut event = RawEvent::new(uid, start);

    if let Some(end) = vevent
        .find_prop("DTEND")
        .and_then(|p| DatePerhapsTime::try_from(p).ok())
        .map(to_event_time)
    {
        event = event.with_end(end);
    }

    if let Some(duration) = vevent
        .find_prop("DURATION")
        .and_then(|p| parse_ics_duration(p.val.as_ref()))
    {
        event = event.with_duration(duration);
    }

    if let Some(summary) = text_prop(vevent, "SUMMARY") {
        event = event.with_summary(summary);
    }
    if let Some(description) = text_prop(vevent, "DESCRIPTION") {
        event = event.with_description(description);
    }
    if let Some(location) = text_prop(vevent, "LOCATION") {
        event = event.with_location(location);
    }

    if let Some(organizer) = vevent.find_prop("ORGANIZER") {
        event = event.with_organizer(strip_mailto(organizer.val.as_ref()));
        if let Some(name) = param_value(organizer, "CN") {
            event = event.with_organizer_name(name);
        }
    }

    for attendee in vevent.properties.iter().filter(|p| p.name == "ATTENDEE") {
        event = event.with_attendee(parse_attendee(attendee));
    }

    for prop in &vevent.properties {
        if prop.name == "RRULE" || prop.name == "EXDATE" || prop.name == "RDATE" {
            event = event.with_recurrence_line(reconstruct_line(prop));
        }
    }

    if let Some(status) = vevent.find_prop("STATUS") {
        event = event.with_status(status.val.to_string());
    }
    if let Some(transp) = vevent.find_prop("TRANSP") {
        event = event.with_transparency(transp.val.to_string());
    }
    if let Some(class) = vevent.find_prop("CLASS") {
        event = event.with_classification(class.val.to_string());
    }
    if let Some(busy) = vevent.find_prop("X-MICROSOFT-CDO-BUSYSTATUS") {
        event = event.with_busy_status(busy.val.to_string());
    }
    if let Some(sequence) = vevent
        .find_prop("SEQUENCE")
        .and_then(|p| p.val.as_ref().parse::<i64>().ok())
    {
        event = event.with_sequence(sequence);
    }

    for alarm in vevent.components.iter().filter(|c| c.name == "VALARM") {
        if let Some(minutes) = alarm
            .find_prop("TRIGGER")
            .and_then(|p| parse_trigger_minutes(p.val.as_ref()))
        {
            event = event.with_reminder(minutes);
        }
    }

    Some(event)
}

/// Derives a deterministic UID for a component that has none.
///
/// The digest covers every property line of the component, so re-running the
/// same export always yields the same identifier. The `@imported` suffix
/// marks synthesized identifiers in the target calendar.
fn synthesize_uid(component: &Component) -> String {
    let mut digest_input = String::new();
    for prop in &component.properties {
        digest_input.push_str(prop.name.as_ref());
        digest_input.push(':');
        digest_input.push_str(prop.val.as_ref());
        digest_input.push('\n');
    }
    format!("{:x}@imported", md5::compute(digest_input.as_bytes()))
}

/// Convert icalendar's DatePerhapsTime to an EventTime, preserving the
/// source timezone label.
fn to_event_time(dpt: DatePerhapsTime) -> EventTime {
    match dpt {
        DatePerhapsTime::Date(d) => EventTime::from_date(d),
        DatePerhapsTime::DateTime(cal_dt) => match cal_dt {
            CalendarDateTime::Utc(dt) => EventTime::from_utc(dt),
            CalendarDateTime::Floating(naive) => EventTime::from_floating(naive),
            CalendarDateTime::WithTimezone { date_time, tzid } => {
                EventTime::from_zoned(date_time, tzid)
            }
        },
    }
}

/// Parse ATTENDEE property with its scheduling parameters.
fn parse_attendee(prop: &Property) -> RawAttendee {
    let mut attendee = RawAttendee::new(strip_mailto(prop.val.as_ref()));

    if let Some(name) = param_value(prop, "CN") {
        attendee = attendee.with_display_name(name);
    }
    if let Some(cutype) = param_value(prop, "CUTYPE") {
        let cutype = cutype.to_ascii_uppercase();
        attendee = attendee.with_resource(cutype == "RESOURCE" || cutype == "ROOM");
    }
    if let Some(role) = param_value(prop, "ROLE") {
        attendee = attendee.with_optional(role.eq_ignore_ascii_case("OPT-PARTICIPANT"));
    }
    if let Some(partstat) = param_value(prop, "PARTSTAT") {
        attendee = attendee.with_response_status(ResponseStatus::from_partstat(&partstat));
    }

    attendee
}

/// Parse a TRIGGER value to minutes before the event start (-PT30M, -P1D).
///
/// Triggers after the start (no leading minus) are reported as negative and
/// filtered out downstream; absolute-time triggers are not supported.
fn parse_trigger_minutes(value: &str) -> Option<i64> {
    let is_before = value.starts_with('-');
    let duration_str = value.trim_start_matches('-');

    let duration = iso8601::duration(duration_str).ok()?;
    let std_duration: std::time::Duration = duration.into();
    let minutes = (std_duration.as_secs() / 60) as i64;

    Some(if is_before { minutes } else { -minutes })
}

/// Parse an ICS DURATION value into a chrono duration.
fn parse_ics_duration(value: &str) -> Option<chrono::Duration> {
    let is_negative = value.starts_with('-');
    let duration_str = value.trim_start_matches(['-', '+']);

    let duration = iso8601::duration(duration_str).ok()?;
    let std_duration: std::time::Duration = duration.into();
    let parsed = chrono::Duration::from_std(std_duration).ok()?;

    Some(if is_negative { -parsed } else { parsed })
}

/// Rebuilds a property as the line it came from, parameters included, so
/// recurrence expressions pass through untouched.
fn reconstruct_line(prop: &Property) -> String {
    let mut line = prop.name.to_string();
    for param in &prop.params {
        line.push(';');
        line.push_str(param.key.as_ref());
        if let Some(val) = &param.val {
            line.push('=');
            line.push_str(val.as_ref());
        }
    }
    line.push(':');
    line.push_str(prop.val.as_ref());
    line
}

fn text_prop(component: &Component, name: &str) -> Option<String> {
    component
        .find_prop(name)
        .map(|p| unescape_text(p.val.as_ref()))
        .filter(|s| !s.is_empty())
}

/// Undo RFC 5545 text escaping (`\n`, `\,`, `\;`, `\\`).
fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(escaped) => out.push(escaped),
            None => out.push('\\'),
        }
    }
    out
}

fn strip_mailto(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.len() >= 7 && trimmed[..7].eq_ignore_ascii_case("mailto:") {
        trimmed[7..].to_string()
    } else {
        trimmed.to_string()
    }
}

fn param_value(prop: &Property, key: &str) -> Option<String> {
    prop.params
        .iter()
        .find(|p| p.key == key)
        .and_then(|p| p.val.as_ref().map(|v| v.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn wrap(vevent: &str) -> String {
        format!("BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//Test//EN\r\n{vevent}END:VCALENDAR\r\n")
    }

    const BASIC_VEVENT: &str = "BEGIN:VEVENT\r\n\
        UID:abc-123\r\n\
        DTSTART:20240315T100000Z\r\n\
        DTEND:20240315T110000Z\r\n\
        SUMMARY:Team Sync\r\n\
        END:VEVENT\r\n";

    #[test]
    fn basic_event() {
        let parsed = parse_ics(&wrap(BASIC_VEVENT)).unwrap();
        assert_eq!(parsed.anomalies, 0);
        assert_eq!(parsed.events.len(), 1);

        let event = &parsed.events[0];
        assert_eq!(event.uid, "abc-123");
        assert_eq!(event.summary.as_deref(), Some("Team Sync"));
        assert_eq!(
            event.start,
            EventTime::from_utc(Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap())
        );
        assert_eq!(
            event.end,
            Some(EventTime::from_utc(
                Utc.with_ymd_and_hms(2024, 3, 15, 11, 0, 0).unwrap()
            ))
        );
    }

    #[test]
    fn legacy_tzid_is_preserved_verbatim() {
        let ics = wrap(
            "BEGIN:VEVENT\r\n\
             UID:tz-1\r\n\
             DTSTART;TZID=Eastern Standard Time:20240315T100000\r\n\
             DTEND;TZID=Eastern Standard Time:20240315T110000\r\n\
             SUMMARY:EST meeting\r\n\
             END:VEVENT\r\n",
        );
        let parsed = parse_ics(&ics).unwrap();
        let event = &parsed.events[0];
        assert_eq!(event.start.tzid(), Some("Eastern Standard Time"));
    }

    #[test]
    fn all_day_event() {
        let ics = wrap(
            "BEGIN:VEVENT\r\n\
             UID:allday-1\r\n\
             DTSTART;VALUE=DATE:20240315\r\n\
             DTEND;VALUE=DATE:20240316\r\n\
             SUMMARY:Conference\r\n\
             END:VEVENT\r\n",
        );
        let parsed = parse_ics(&ics).unwrap();
        let event = &parsed.events[0];
        assert!(event.is_all_day());
        assert_eq!(
            event.start.wall_date(),
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
        );
    }

    #[test]
    fn missing_uid_is_synthesized_deterministically() {
        let ics = wrap(
            "BEGIN:VEVENT\r\n\
             DTSTART:20240315T100000Z\r\n\
             SUMMARY:No UID here\r\n\
             END:VEVENT\r\n",
        );
        let first = parse_ics(&ics).unwrap();
        let second = parse_ics(&ics).unwrap();

        let uid = &first.events[0].uid;
        assert!(uid.ends_with("@imported"), "got {uid}");
        assert_eq!(uid, &second.events[0].uid);
    }

    #[test]
    fn missing_dtstart_counts_as_anomaly() {
        let ics = wrap(
            "BEGIN:VEVENT\r\n\
             UID:broken-1\r\n\
             SUMMARY:No start\r\n\
             END:VEVENT\r\n",
        );
        let parsed = parse_ics(&ics).unwrap();
        assert_eq!(parsed.events.len(), 0);
        assert_eq!(parsed.anomalies, 1);
    }

    #[test]
    fn attendees_with_scheduling_parameters() {
        let ics = wrap(
            "BEGIN:VEVENT\r\n\
             UID:att-1\r\n\
             DTSTART:20240315T100000Z\r\n\
             ORGANIZER;CN=The Boss:mailto:boss@example.com\r\n\
             ATTENDEE;CN=Dev One;PARTSTAT=ACCEPTED:mailto:dev1@example.com\r\n\
             ATTENDEE;CUTYPE=RESOURCE;CN=Room 4A:mailto:room4a@resource.example.com\r\n\
             ATTENDEE;ROLE=OPT-PARTICIPANT;PARTSTAT=TENTATIVE:mailto:maybe@example.com\r\n\
             END:VEVENT\r\n",
        );
        let parsed = parse_ics(&ics).unwrap();
        let event = &parsed.events[0];

        assert_eq!(event.organizer_email.as_deref(), Some("boss@example.com"));
        assert_eq!(event.organizer_name.as_deref(), Some("The Boss"));
        assert_eq!(event.attendees.len(), 3);

        assert_eq!(event.attendees[0].email, "dev1@example.com");
        assert_eq!(event.attendees[0].display_name.as_deref(), Some("Dev One"));
        assert_eq!(event.attendees[0].response_status, ResponseStatus::Accepted);

        assert!(event.attendees[1].resource);
        assert!(!event.attendees[1].optional);

        assert!(event.attendees[2].optional);
        assert_eq!(
            event.attendees[2].response_status,
            ResponseStatus::Tentative
        );
    }

    #[test]
    fn recurrence_lines_forwarded_verbatim() {
        let ics = wrap(
            "BEGIN:VEVENT\r\n\
             UID:rec-1\r\n\
             DTSTART;TZID=America/New_York:20240315T100000\r\n\
             RRULE:FREQ=WEEKLY;BYDAY=FR;UNTIL=20241231T000000Z\r\n\
             EXDATE;TZID=America/New_York:20240419T100000\r\n\
             END:VEVENT\r\n",
        );
        let parsed = parse_ics(&ics).unwrap();
        let event = &parsed.events[0];
        assert_eq!(
            event.recurrence,
            vec![
                "RRULE:FREQ=WEEKLY;BYDAY=FR;UNTIL=20241231T000000Z",
                "EXDATE;TZID=America/New_York:20240419T100000",
            ]
        );
    }

    #[test]
    fn alarms_become_reminder_minutes() {
        let ics = wrap(
            "BEGIN:VEVENT\r\n\
             UID:alarm-1\r\n\
             DTSTART:20240315T100000Z\r\n\
             BEGIN:VALARM\r\n\
             ACTION:DISPLAY\r\n\
             TRIGGER:-PT30M\r\n\
             END:VALARM\r\n\
             BEGIN:VALARM\r\n\
             ACTION:DISPLAY\r\n\
             TRIGGER:-P1D\r\n\
             END:VALARM\r\n\
             END:VEVENT\r\n",
        );
        let parsed = parse_ics(&ics).unwrap();
        assert_eq!(parsed.events[0].reminder_minutes, vec![30, 1440]);
    }

    #[test]
    fn duration_instead_of_dtend() {
        let ics = wrap(
            "BEGIN:VEVENT\r\n\
             UID:dur-1\r\n\
             DTSTART:20240315T100000Z\r\n\
             DURATION:PT1H30M\r\n\
             END:VEVENT\r\n",
        );
        let parsed = parse_ics(&ics).unwrap();
        let event = &parsed.events[0];
        assert!(event.end.is_none());
        assert_eq!(event.duration, Some(chrono::Duration::minutes(90)));
    }

    #[test]
    fn outlook_metadata_fields() {
        let ics = wrap(
            "BEGIN:VEVENT\r\n\
             UID:meta-1\r\n\
             DTSTART:20240315T100000Z\r\n\
             STATUS:TENTATIVE\r\n\
             TRANSP:TRANSPARENT\r\n\
             CLASS:PRIVATE\r\n\
             X-MICROSOFT-CDO-BUSYSTATUS:OOF\r\n\
             SEQUENCE:4\r\n\
             END:VEVENT\r\n",
        );
        let parsed = parse_ics(&ics).unwrap();
        let event = &parsed.events[0];
        assert_eq!(event.status.as_deref(), Some("TENTATIVE"));
        assert_eq!(event.transparency.as_deref(), Some("TRANSPARENT"));
        assert_eq!(event.classification.as_deref(), Some("PRIVATE"));
        assert_eq!(event.busy_status.as_deref(), Some("OOF"));
        assert_eq!(event.sequence, Some(4));
    }

    #[test]
    fn calendar_default_timezone_from_x_wr() {
        let ics = "BEGIN:VCALENDAR\r\n\
                   VERSION:2.0\r\n\
                   X-WR-TIMEZONE:Europe/Paris\r\n\
                   BEGIN:VEVENT\r\n\
                   UID:x-1\r\n\
                   DTSTART:20240315T100000\r\n\
                   END:VEVENT\r\n\
                   END:VCALENDAR\r\n";
        let parsed = parse_ics(ics).unwrap();
        assert_eq!(parsed.default_timezone.as_deref(), Some("Europe/Paris"));
    }

    #[test]
    fn calendar_default_timezone_from_vtimezone() {
        let ics = "BEGIN:VCALENDAR\r\n\
                   VERSION:2.0\r\n\
                   BEGIN:VTIMEZONE\r\n\
                   TZID:Pacific Standard Time\r\n\
                   END:VTIMEZONE\r\n\
                   BEGIN:VEVENT\r\n\
                   UID:x-2\r\n\
                   DTSTART:20240315T100000\r\n\
                   END:VEVENT\r\n\
                   END:VCALENDAR\r\n";
        let parsed = parse_ics(ics).unwrap();
        assert_eq!(
            parsed.default_timezone.as_deref(),
            Some("Pacific Standard Time")
        );
    }

    #[test]
    fn description_unescaping() {
        let ics = wrap(
            "BEGIN:VEVENT\r\n\
             UID:esc-1\r\n\
             DTSTART:20240315T100000Z\r\n\
             DESCRIPTION:Agenda:\\n1. Budget\\, again\\n2. AOB\r\n\
             END:VEVENT\r\n",
        );
        let parsed = parse_ics(&ics).unwrap();
        assert_eq!(
            parsed.events[0].description.as_deref(),
            Some("Agenda:\n1. Budget, again\n2. AOB")
        );
    }

    #[test]
    fn folded_lines_are_unfolded() {
        let ics = "BEGIN:VCALENDAR\r\n\
                   VERSION:2.0\r\n\
                   BEGIN:VEVENT\r\n\
                   UID:fold-1\r\n\
                   DTSTART:20240315T100000Z\r\n\
                   SUMMARY:A rather long meeting title that got\r\n  folded across lines\r\n\
                   END:VEVENT\r\n\
                   END:VCALENDAR\r\n";
        let parsed = parse_ics(ics).unwrap();
        assert_eq!(
            parsed.events[0].summary.as_deref(),
            Some("A rather long meeting title that got folded across lines")
        );
    }

    #[test]
    fn garbage_is_a_syntax_error() {
        assert!(matches!(
            parse_ics("this is not a calendar"),
            Err(IcsError::Syntax { .. })
        ));
    }
}
