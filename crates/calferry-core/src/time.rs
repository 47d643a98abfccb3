//! Time types for calendar events.
//!
//! This module provides [`EventTime`] for representing event start/end times
//! as they appear in an ICS export (UTC instants, floating local times,
//! times qualified by a source timezone label, or all-day dates), and
//! [`DateWindow`] for the date-range admission filter.

use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// The time of a calendar event as the source file states it.
///
/// ICS exports carry four distinct shapes:
/// - **Utc**: an instant with a trailing `Z`
/// - **Floating**: a wall-clock time with no zone at all
/// - **Zoned**: a wall-clock time qualified by a `TZID` parameter, which in
///   Outlook exports is usually a legacy platform name needing translation
/// - **AllDay**: a date without a time component
///
/// Zone resolution is deliberately not performed here; the value preserves
/// exactly what the source said so the normalizer can decide fallbacks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum EventTime {
    /// An instant fixed to UTC.
    Utc(chrono::DateTime<Utc>),
    /// A wall-clock time with no zone information.
    Floating(NaiveDateTime),
    /// A wall-clock time with the source's timezone label.
    Zoned {
        /// The local wall-clock time.
        local: NaiveDateTime,
        /// The source `TZID` value, verbatim.
        tzid: String,
    },
    /// An all-day event date.
    AllDay(NaiveDate),
}

impl EventTime {
    /// Creates an `EventTime::Utc` from a UTC datetime.
    pub fn from_utc(dt: chrono::DateTime<Utc>) -> Self {
        Self::Utc(dt)
    }

    /// Creates an `EventTime::Floating` from a naive datetime.
    pub fn from_floating(dt: NaiveDateTime) -> Self {
        Self::Floating(dt)
    }

    /// Creates an `EventTime::Zoned` from a naive datetime and a zone label.
    pub fn from_zoned(local: NaiveDateTime, tzid: impl Into<String>) -> Self {
        Self::Zoned {
            local,
            tzid: tzid.into(),
        }
    }

    /// Creates an `EventTime::AllDay` from a date.
    pub fn from_date(date: NaiveDate) -> Self {
        Self::AllDay(date)
    }

    /// Returns `true` if this is an all-day event time.
    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::AllDay(_))
    }

    /// Returns the source zone label, if one was given.
    pub fn tzid(&self) -> Option<&str> {
        match self {
            Self::Zoned { tzid, .. } => Some(tzid),
            _ => None,
        }
    }

    /// Returns the wall-clock date of this time.
    ///
    /// For zoned and floating times this is the local date as written in the
    /// source; for UTC instants it is the date in UTC. The date-range filter
    /// compares against this value.
    pub fn wall_date(&self) -> NaiveDate {
        match self {
            Self::Utc(dt) => dt.date_naive(),
            Self::Floating(dt) => dt.date(),
            Self::Zoned { local, .. } => local.date(),
            Self::AllDay(date) => *date,
        }
    }

    /// Returns this time shifted forward by `duration`, preserving the shape.
    ///
    /// All-day dates shift by whole days (a sub-day duration leaves the date
    /// unchanged; callers enforce a minimum one-day span for all-day events).
    pub fn offset_by(&self, duration: Duration) -> Self {
        match self {
            Self::Utc(dt) => Self::Utc(*dt + duration),
            Self::Floating(dt) => Self::Floating(*dt + duration),
            Self::Zoned { local, tzid } => Self::Zoned {
                local: *local + duration,
                tzid: tzid.clone(),
            },
            Self::AllDay(date) => Self::AllDay(*date + Duration::days(duration.num_days())),
        }
    }

    /// Converts to a UTC datetime for ordering purposes.
    ///
    /// Wall-clock times are read as if they were UTC and all-day dates as
    /// midnight; this is only meaningful for comparing times within one
    /// event, not across zones.
    fn ordering_key(&self) -> chrono::DateTime<Utc> {
        match self {
            Self::Utc(dt) => *dt,
            Self::Floating(dt) => dt.and_utc(),
            Self::Zoned { local, .. } => local.and_utc(),
            Self::AllDay(date) => date.and_hms_opt(0, 0, 0).expect("valid time").and_utc(),
        }
    }
}

impl PartialOrd for EventTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ordering_key().cmp(&other.ordering_key())
    }
}

/// The date-range admission filter.
///
/// A half-open window `[start, end)` over wall-clock dates; either bound may
/// be absent. An event starting exactly on `start` is admitted, one starting
/// exactly on `end` is not.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    /// First admitted date (inclusive), if bounded below.
    pub start: Option<NaiveDate>,
    /// First rejected date (exclusive), if bounded above.
    pub end: Option<NaiveDate>,
}

impl DateWindow {
    /// Creates a window with the given optional bounds.
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    /// A window that admits every date.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Returns `true` if neither bound is set.
    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Returns `true` if `date` falls within the window.
    pub fn admits(&self, date: NaiveDate) -> bool {
        self.start.is_none_or(|s| date >= s) && self.end.is_none_or(|e| date < e)
    }
}
