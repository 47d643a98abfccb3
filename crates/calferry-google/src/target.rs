//! The target-calendar abstraction.
//!
//! The import engine is written against [`CalendarTarget`] rather than the
//! concrete HTTP client, so tests can script successes, conflicts, and
//! transient failures without a network.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;

use crate::error::GcalResult;
use crate::payload::EventPayload;

/// A boxed future type for trait methods, keeping the trait object-safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Summary information about one calendar on the target account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarInfo {
    /// The calendar identifier (e.g. `"primary"` or an address).
    pub id: String,
    /// Human-readable calendar name.
    pub summary: String,
    /// Whether this is the account's primary calendar.
    pub primary: bool,
}

/// The remote identity of a successfully imported event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedEvent {
    /// The event id assigned by the target service.
    pub id: String,
    /// The stable identifier the service recorded, echoed back.
    pub ical_uid: Option<String>,
}

/// A calendar service that events can be imported into.
///
/// `import_event` must be notification-free: committing an event never
/// mails its attendees.
pub trait CalendarTarget: Send + Sync {
    /// A short name for logs (e.g. `"google"`).
    fn name(&self) -> &str;

    /// Returns true if the target has a credential to act with.
    fn is_authenticated(&self) -> bool;

    /// Lists the calendars visible to the authenticated account.
    fn list_calendars(&self) -> BoxFuture<'_, GcalResult<Vec<CalendarInfo>>>;

    /// Collects the stable identifiers of events already present on the
    /// given calendar, for duplicate-ledger prefetch. Both the service's
    /// own `iCalUID` and this tool's private source-UID tag count.
    fn existing_uids<'a>(&'a self, calendar_id: &'a str)
    -> BoxFuture<'a, GcalResult<HashSet<String>>>;

    /// Commits one event to the given calendar.
    fn import_event<'a>(
        &'a self,
        calendar_id: &'a str,
        event: &'a EventPayload,
    ) -> BoxFuture<'a, GcalResult<ImportedEvent>>;
}
