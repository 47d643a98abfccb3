//! Google Calendar API surface.
//!
//! This crate holds everything that talks to (or stands in for) the target
//! calendar service: the wire payload types, the [`CalendarTarget`] trait
//! that the import engine is written against, the `reqwest` client for the
//! Calendar v3 API, the OAuth 2.0 PKCE flow, and token persistence.

pub mod client;
pub mod credentials;
pub mod error;
pub mod oauth;
pub mod payload;
pub mod target;
pub mod tokens;

pub use client::GoogleCalendarClient;
pub use credentials::{GoogleConfig, LoopbackConfig, OAuthCredentials};
pub use error::{GcalError, GcalErrorCode, GcalResult};
pub use oauth::OAuthClient;
pub use payload::{
    EventAttendee, EventDateTime, EventOrganizer, EventPayload, EventReminders,
    ExtendedProperties, ReminderOverride,
};
pub use target::{BoxFuture, CalendarInfo, CalendarTarget, ImportedEvent};
pub use tokens::{TokenInfo, TokenStorage};
