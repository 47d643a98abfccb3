//! Google Calendar API client.
//!
//! A low-level HTTP client for the Calendar API v3, covering the three
//! endpoints the import pipeline needs: `calendarList.list`,
//! `events.list` (existing-UID prefetch), and `events.import`.
//! `events.import` is the notification-free write path: unlike
//! `events.insert`, it never mails attendees.

use std::collections::HashSet;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{GcalError, GcalResult};
use crate::payload::EventPayload;
use crate::target::{BoxFuture, CalendarInfo, CalendarTarget, ImportedEvent};

/// Base URL for Google Calendar API v3.
const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Page size for the existing-event prefetch (the API maximum).
const PREFETCH_PAGE_SIZE: usize = 2500;

/// Google Calendar API client.
#[derive(Debug)]
pub struct GoogleCalendarClient {
    http_client: reqwest::Client,
    access_token: String,
}

impl GoogleCalendarClient {
    /// Creates a new client with the given access token.
    pub fn new(access_token: impl Into<String>, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to create HTTP client");

        Self {
            http_client,
            access_token: access_token.into(),
        }
    }

    /// Updates the access token (after refresh).
    pub fn set_access_token(&mut self, token: impl Into<String>) {
        self.access_token = token.into();
    }

    /// Lists the calendars visible to the authenticated account.
    pub async fn calendar_list(&self) -> GcalResult<Vec<CalendarInfo>> {
        let url = format!("{}/users/me/calendarList", CALENDAR_API_BASE);
        let mut calendars = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.http_client.get(&url).bearer_auth(&self.access_token);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request.send().await.map_err(map_send_error)?;
            let body = read_success_body(response).await?;

            let page: CalendarListResponse = serde_json::from_str(&body).map_err(|e| {
                GcalError::invalid_response(format!("failed to parse calendar list: {}", e))
            })?;

            calendars.extend(page.items.into_iter().map(|entry| CalendarInfo {
                id: entry.id,
                summary: entry.summary.unwrap_or_default(),
                primary: entry.primary,
            }));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(count = calendars.len(), "listed calendars");
        Ok(calendars)
    }

    /// Collects the stable identifiers of events already on the calendar.
    ///
    /// Pages through `events.list` without expanding recurrences or
    /// including deleted events, gathering each event's `iCalUID` and the
    /// private source-UID tag written by previous runs.
    pub async fn fetch_existing_uids(&self, calendar_id: &str) -> GcalResult<HashSet<String>> {
        let url = format!(
            "{}/calendars/{}/events",
            CALENDAR_API_BASE,
            urlencoding::encode(calendar_id)
        );

        let mut uids = HashSet::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let mut request = self
                .http_client
                .get(&url)
                .bearer_auth(&self.access_token)
                .query(&[
                    ("maxResults", PREFETCH_PAGE_SIZE.to_string()),
                    ("singleEvents", "false".to_string()),
                    ("showDeleted", "false".to_string()),
                ]);

            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request.send().await.map_err(map_send_error)?;
            let body = read_success_body(response).await?;

            let page: EventListResponse = serde_json::from_str(&body).map_err(|e| {
                GcalError::invalid_response(format!("failed to parse event list: {}", e))
            })?;

            for event in page.items {
                if let Some(uid) = event.ical_uid {
                    uids.insert(uid);
                }
                if let Some(ext) = event.extended_properties
                    && let Some(uid) = ext.private.get("outlookUID")
                {
                    uids.insert(uid.clone());
                }
            }

            pages += 1;
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(
            calendar_id,
            uids = uids.len(),
            pages,
            "prefetched existing event identifiers"
        );
        Ok(uids)
    }

    /// Commits one event via `events.import`.
    pub async fn import(
        &self,
        calendar_id: &str,
        event: &EventPayload,
    ) -> GcalResult<ImportedEvent> {
        let url = format!(
            "{}/calendars/{}/events/import",
            CALENDAR_API_BASE,
            urlencoding::encode(calendar_id)
        );

        let body = serde_json::to_vec(event)
            .map_err(|e| GcalError::internal(format!("failed to serialize event: {}", e)))?;

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.access_token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(map_send_error)?;

        let body = read_success_body(response).await?;

        let imported: ImportResponse = serde_json::from_str(&body).map_err(|e| {
            GcalError::invalid_response(format!("failed to parse import response: {}", e))
        })?;

        Ok(ImportedEvent {
            id: imported.id,
            ical_uid: imported.ical_uid,
        })
    }
}

impl CalendarTarget for GoogleCalendarClient {
    fn name(&self) -> &str {
        "google"
    }

    fn is_authenticated(&self) -> bool {
        !self.access_token.is_empty()
    }

    fn list_calendars(&self) -> BoxFuture<'_, GcalResult<Vec<CalendarInfo>>> {
        Box::pin(self.calendar_list())
    }

    fn existing_uids<'a>(
        &'a self,
        calendar_id: &'a str,
    ) -> BoxFuture<'a, GcalResult<HashSet<String>>> {
        Box::pin(self.fetch_existing_uids(calendar_id))
    }

    fn import_event<'a>(
        &'a self,
        calendar_id: &'a str,
        event: &'a EventPayload,
    ) -> BoxFuture<'a, GcalResult<ImportedEvent>> {
        Box::pin(self.import(calendar_id, event))
    }
}

/// Maps a reqwest send failure to the error taxonomy.
fn map_send_error(e: reqwest::Error) -> GcalError {
    if e.is_timeout() {
        GcalError::network("request timeout")
    } else if e.is_connect() {
        GcalError::network(format!("connection failed: {}", e))
    } else {
        GcalError::network(format!("request failed: {}", e))
    }
}

/// Checks the response status and returns the body text of a success.
///
/// Non-success statuses are mapped onto the error taxonomy; the response
/// body is preserved in the message so callers can inspect the service's
/// structured reason (e.g. participant rejection on 400).
async fn read_success_body(response: reqwest::Response) -> GcalResult<String> {
    let status = response.status();

    if status.is_success() {
        return response
            .text()
            .await
            .map_err(|e| GcalError::network(format!("failed to read response: {}", e)));
    }

    let retry_after = response
        .headers()
        .get("Retry-After")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs);

    let body = response.text().await.unwrap_or_default();
    warn!(status = %status, "API request failed");

    let err = match status {
        reqwest::StatusCode::UNAUTHORIZED => {
            GcalError::authentication("access token expired or invalid")
        }
        reqwest::StatusCode::FORBIDDEN => {
            GcalError::authorization(format!("access denied: {}", body))
        }
        reqwest::StatusCode::NOT_FOUND => {
            GcalError::not_found(format!("calendar or event not found: {}", body))
        }
        reqwest::StatusCode::CONFLICT => {
            GcalError::conflict("an event with this identifier already exists")
        }
        reqwest::StatusCode::TOO_MANY_REQUESTS => GcalError::rate_limited("rate limit exceeded"),
        reqwest::StatusCode::BAD_REQUEST => {
            GcalError::bad_request(format!("API error (400): {}", body))
        }
        s if s.is_server_error() => GcalError::server(format!("API error ({}): {}", status, body)),
        _ => GcalError::server(format!("API error ({}): {}", status, body)),
    };

    match retry_after {
        Some(wait) => Err(err.with_retry_after(wait)),
        None => Err(err),
    }
}

/// Response from the calendarList endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarListResponse {
    #[serde(default)]
    items: Vec<CalendarListEntry>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarListEntry {
    id: String,
    summary: Option<String>,
    #[serde(default)]
    primary: bool,
}

/// Response from the events.list endpoint, trimmed to identity fields.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<ListedEvent>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListedEvent {
    #[serde(rename = "iCalUID")]
    ical_uid: Option<String>,
    extended_properties: Option<ListedExtendedProperties>,
}

#[derive(Debug, Deserialize)]
struct ListedExtendedProperties {
    #[serde(default)]
    private: std::collections::HashMap<String, String>,
}

/// Response from the events.import endpoint.
#[derive(Debug, Deserialize)]
struct ImportResponse {
    id: String,
    #[serde(rename = "iCalUID")]
    ical_uid: Option<String>,
}
