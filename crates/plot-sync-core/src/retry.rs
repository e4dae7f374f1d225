//! Retry scheduling for failed remote pushes.
//!
//! Linear backoff: the delay after failure N is `base_delay_ms * N`, up to
//! a configured attempt cap. Deadlines are plain `now_ms` timestamps the
//! orchestrator polls from its tick loop; nothing here owns a timer.

use tracing::debug;

/// Tunables for the retry schedule.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Base delay in milliseconds; attempt N waits `base_delay_ms * N`.
    pub base_delay_ms: u64,
    /// Total failed attempts allowed before giving up.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay_ms: 5_000,
            max_attempts: 3,
        }
    }
}

/// Attempt counter plus the pending retry deadline, if any.
#[derive(Debug)]
pub struct RetryController {
    policy: RetryPolicy,
    attempts: u32,
    next_attempt_at: Option<u64>,
}

impl RetryController {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            attempts: 0,
            next_attempt_at: None,
        }
    }

    /// Failed attempts since the last success.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// True once the attempt cap is reached; no further retries will be
    /// scheduled until `reset`.
    pub fn exhausted(&self) -> bool {
        self.attempts >= self.policy.max_attempts
    }

    /// Record a failed push. Returns the deadline of the scheduled retry,
    /// or `None` when attempts are exhausted.
    pub fn record_failure(&mut self, now_ms: u64) -> Option<u64> {
        self.attempts += 1;
        if self.exhausted() {
            debug!(attempts = self.attempts, "retry attempts exhausted");
            self.next_attempt_at = None;
            return None;
        }

        let delay = self.policy.base_delay_ms * u64::from(self.attempts);
        let deadline = now_ms + delay;
        self.next_attempt_at = Some(deadline);
        debug!(
            attempts = self.attempts,
            delay_ms = delay,
            "retry scheduled"
        );
        Some(deadline)
    }

    /// True when a retry is scheduled and due.
    pub fn due(&self, now_ms: u64) -> bool {
        self.next_attempt_at.map(|t| now_ms >= t).unwrap_or(false)
    }

    /// Consume the deadline if due. Returns true at most once per schedule.
    pub fn take_due(&mut self, now_ms: u64) -> bool {
        if self.due(now_ms) {
            self.next_attempt_at = None;
            true
        } else {
            false
        }
    }

    /// True when a retry is scheduled but not yet due.
    pub fn pending(&self) -> bool {
        self.next_attempt_at.is_some()
    }

    /// Clear the counter and any pending deadline after a success.
    pub fn reset(&mut self) {
        self.attempts = 0;
        self.next_attempt_at = None;
    }

    /// Cancel the pending deadline, keeping the attempt count. Used on
    /// stop and on offline transitions.
    pub fn cancel(&mut self) {
        self.next_attempt_at = None;
    }
}

impl Default for RetryController {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}
