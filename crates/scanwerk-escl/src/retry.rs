// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Busy-retry policy for job submission.
//
// A scanner answers 409 Conflict while a previous job is still running or has
// not been cleared.  That is the only transient answer: every other error
// status stops retrying immediately.

use std::time::Duration;

use reqwest::StatusCode;
use tracing::debug;

/// Attempts per paper source before giving up (~6 s worst case).
pub const DEFAULT_BUSY_ATTEMPTS: u32 = 6;

/// Pause between busy answers.
pub const DEFAULT_BUSY_INTERVAL: Duration = Duration::from_secs(1);

/// Retry configuration for busy answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusyRetryPolicy {
    /// Total submissions per source, including the first one.
    pub max_attempts: u32,
    /// Fixed wait after a busy answer.
    pub interval: Duration,
}

impl Default for BusyRetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_BUSY_ATTEMPTS,
            interval: DEFAULT_BUSY_INTERVAL,
        }
    }
}

/// How a job submission response is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// 2xx: the job exists; its location must be in the response headers.
    Accepted,
    /// 409: try again after the interval.
    Busy,
    /// Anything else: stop retrying this source.
    Rejected,
}

/// Classify a job submission response status.
pub fn classify_status(status: StatusCode) -> Disposition {
    if status.is_success() {
        Disposition::Accepted
    } else if status == StatusCode::CONFLICT {
        Disposition::Busy
    } else {
        Disposition::Rejected
    }
}

impl BusyRetryPolicy {
    /// Delay before the next attempt after a busy answer on `attempt`
    /// (1-based), or `None` once the budget is spent.
    pub fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            debug!(attempt, max = self.max_attempts, "busy retry budget exhausted");
            None
        } else {
            Some(self.interval)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_is_busy() {
        assert_eq!(classify_status(StatusCode::CONFLICT), Disposition::Busy);
    }

    #[test]
    fn created_is_accepted() {
        assert_eq!(classify_status(StatusCode::CREATED), Disposition::Accepted);
        assert_eq!(classify_status(StatusCode::OK), Disposition::Accepted);
    }

    #[test]
    fn other_errors_are_rejections() {
        for status in [
            StatusCode::BAD_REQUEST,
            StatusCode::NOT_FOUND,
            StatusCode::SERVICE_UNAVAILABLE,
            StatusCode::INTERNAL_SERVER_ERROR,
        ] {
            assert_eq!(classify_status(status), Disposition::Rejected);
        }
    }

    #[test]
    fn budget_is_six_attempts() {
        let policy = BusyRetryPolicy::default();
        for attempt in 1..6 {
            assert_eq!(policy.next_delay(attempt), Some(Duration::from_secs(1)));
        }
        assert_eq!(policy.next_delay(6), None);
    }
}
