//! Retry policy for commit failures.

use std::time::Duration;

use calferry_google::GcalError;

/// Exponential backoff policy for transient commit failures.
///
/// Whether a failure is transient at all comes from the error taxonomy
/// (`GcalError::is_retryable`), not from this policy; the policy decides
/// how many attempts to spend and how long to wait between them.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts for one event, the first included.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_backoff: Duration,
    /// Backoff multiplier per subsequent attempt.
    pub backoff_multiplier: f64,
    /// Backoff ceiling.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_secs(1),
            backoff_multiplier: 2.0,
            max_backoff: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Returns true if `error` on attempt number `attempt` (1-based) should
    /// be retried.
    pub fn should_retry(&self, error: &GcalError, attempt: u32) -> bool {
        error.is_retryable() && attempt < self.max_attempts
    }

    /// The delay to wait after attempt number `attempt` (1-based) failed.
    ///
    /// A server-provided `Retry-After` hint overrides the computed backoff
    /// when it is larger.
    pub fn delay_after(&self, attempt: u32, hint: Option<Duration>) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let computed = self
            .initial_backoff
            .mul_f64(self.backoff_multiplier.powi(exponent as i32))
            .min(self.max_backoff);

        match hint {
            Some(hinted) if hinted > computed => hinted,
            _ => computed,
        }
    }
}
