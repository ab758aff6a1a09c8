use std::time::Duration;

/// Bounded retry of the whole submit and poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retry is offered while `attempt_count < max_attempts`.
    pub max_attempts: u32,
    /// Pause before a retry re-submits.
    pub delay: Duration,
    /// Retry failed cycles without waiting for the caller.
    pub auto_retry: bool,
    /// Let automatic retry also follow a deadline timeout.
    pub retry_on_timeout: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
            auto_retry: false,
            retry_on_timeout: false,
        }
    }
}

impl RetryPolicy {
    pub fn allows(&self, attempt_count: u32) -> bool {
        attempt_count < self.max_attempts
    }

    pub fn should_auto_retry(&self, attempt_count: u32, timed_out: bool) -> bool {
        self.auto_retry && self.allows(attempt_count) && (!timed_out || self.retry_on_timeout)
    }
}

/// What a manual `retry()` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Scheduled { attempt: u32 },
    /// The attempt cap is reached; the failure stands.
    Exhausted,
    /// Nothing has failed, so there is nothing to retry.
    NotFailed,
    /// The failure came from a rejected request, there is nothing to resend.
    NoRequest,
}
