//! Error types for Google Calendar operations.
//!
//! Classification lives on the error code: `is_retryable` drives the retry
//! policy and `is_fatal` marks credential failures that abort a run.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// The category of a calendar API error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GcalErrorCode {
    /// Authentication failed or credentials are invalid/expired.
    AuthenticationFailed,
    /// Authorization failed, the user lacks permission.
    AuthorizationFailed,
    /// Network error: connection failed, timeout, DNS resolution.
    NetworkError,
    /// Rate limit exceeded, too many requests.
    RateLimited,
    /// Server returned a 5xx status.
    ServerError,
    /// Response could not be parsed or had an unexpected shape.
    InvalidResponse,
    /// Resource not found (404).
    NotFound,
    /// The target already has an event with this identifier (409).
    Conflict,
    /// Request was invalid (400): bad parameters, malformed payload.
    BadRequest,
    /// Missing or invalid configuration.
    ConfigurationError,
    /// Unexpected internal state.
    InternalError,
}

impl GcalErrorCode {
    /// Returns true if this error is transient and the operation may be
    /// retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError | Self::RateLimited | Self::ServerError
        )
    }

    /// Returns true if this error invalidates the whole run, not just one
    /// event.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::AuthenticationFailed)
    }

    /// Returns a stable name for this error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed => "authentication_failed",
            Self::AuthorizationFailed => "authorization_failed",
            Self::NetworkError => "network_error",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::InvalidResponse => "invalid_response",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::BadRequest => "bad_request",
            Self::ConfigurationError => "configuration_error",
            Self::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for GcalErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error from the Google Calendar API surface.
#[derive(Debug, Error)]
pub struct GcalError {
    /// The error code categorizing this error.
    code: GcalErrorCode,
    /// A human-readable message describing the error.
    message: String,
    /// A server-provided wait hint, from the `Retry-After` header.
    retry_after: Option<Duration>,
    /// The underlying cause of this error, if any.
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl GcalError {
    /// Creates a new error with the given code and message.
    pub fn new(code: GcalErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            retry_after: None,
            source: None,
        }
    }

    /// Creates an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(GcalErrorCode::AuthenticationFailed, message)
    }

    /// Creates an authorization error.
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(GcalErrorCode::AuthorizationFailed, message)
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(GcalErrorCode::NetworkError, message)
    }

    /// Creates a rate limit error.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(GcalErrorCode::RateLimited, message)
    }

    /// Creates a server error.
    pub fn server(message: impl Into<String>) -> Self {
        Self::new(GcalErrorCode::ServerError, message)
    }

    /// Creates an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(GcalErrorCode::InvalidResponse, message)
    }

    /// Creates a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(GcalErrorCode::NotFound, message)
    }

    /// Creates a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(GcalErrorCode::Conflict, message)
    }

    /// Creates a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(GcalErrorCode::BadRequest, message)
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(GcalErrorCode::ConfigurationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(GcalErrorCode::InternalError, message)
    }

    /// Sets the server-provided wait hint.
    pub fn with_retry_after(mut self, wait: Duration) -> Self {
        self.retry_after = Some(wait);
        self
    }

    /// Sets the source error for this error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error code.
    pub fn code(&self) -> GcalErrorCode {
        self.code
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the server-provided wait hint, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }

    /// Returns true if this error is transient and may be retried.
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }

    /// Returns true if this error invalidates the whole run.
    pub fn is_fatal(&self) -> bool {
        self.code.is_fatal()
    }

    /// Returns true if the service rejected the event because the
    /// authenticated user is neither its organizer nor an attendee.
    /// Such events can be re-submitted without their participant list.
    pub fn is_participant_rejection(&self) -> bool {
        self.code == GcalErrorCode::BadRequest
            && self
                .message
                .contains("participantIsNeitherOrganizerNorAttendee")
    }
}

impl fmt::Display for GcalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// A specialized Result type for calendar API operations.
pub type GcalResult<T> = Result<T, GcalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_retryable() {
        assert!(GcalErrorCode::NetworkError.is_retryable());
        assert!(GcalErrorCode::RateLimited.is_retryable());
        assert!(GcalErrorCode::ServerError.is_retryable());
        assert!(!GcalErrorCode::AuthenticationFailed.is_retryable());
        assert!(!GcalErrorCode::Conflict.is_retryable());
        assert!(!GcalErrorCode::BadRequest.is_retryable());
    }

    #[test]
    fn error_code_fatality() {
        assert!(GcalErrorCode::AuthenticationFailed.is_fatal());
        assert!(!GcalErrorCode::AuthorizationFailed.is_fatal());
        assert!(!GcalErrorCode::RateLimited.is_fatal());
    }

    #[test]
    fn error_creation() {
        let err = GcalError::authentication("token expired");
        assert_eq!(err.code(), GcalErrorCode::AuthenticationFailed);
        assert_eq!(err.message(), "token expired");
        assert!(err.is_fatal());
        assert!(!err.is_retryable());
    }

    #[test]
    fn retry_after_hint() {
        let err =
            GcalError::rate_limited("too many requests").with_retry_after(Duration::from_secs(30));
        assert_eq!(err.retry_after(), Some(Duration::from_secs(30)));
        assert!(err.is_retryable());

        let err = GcalError::rate_limited("too many requests");
        assert_eq!(err.retry_after(), None);
    }

    #[test]
    fn participant_rejection_detection() {
        let err = GcalError::bad_request(
            "API error (400): {\"error\": {\"errors\": [{\"reason\": \
             \"participantIsNeitherOrganizerNorAttendee\"}]}}",
        );
        assert!(err.is_participant_rejection());

        let err = GcalError::bad_request("API error (400): invalid start time");
        assert!(!err.is_participant_rejection());

        let err = GcalError::server("participantIsNeitherOrganizerNorAttendee");
        assert!(!err.is_participant_rejection());
    }

    #[test]
    fn error_display() {
        let err = GcalError::conflict("event already exists");
        let display = format!("{}", err);
        assert!(display.contains("conflict"));
        assert!(display.contains("event already exists"));
    }

    #[test]
    fn error_with_source() {
        use std::error::Error;
        let io_err = std::io::Error::other("connection reset");
        let err = GcalError::network("request failed").with_source(io_err);
        assert!(err.source().is_some());
    }
}
