use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single retry attempt record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RetryAttempt {
    /// 1-based attempt number.
    pub attempt: u8,
    /// Error message from the failed attempt.
    pub error: String,
    /// When this attempt occurred.
    pub timestamp: DateTime<Utc>,
}

impl RetryAttempt {
    pub fn new(attempt: u8, error: impl Into<String>) -> Self {
        Self {
            attempt,
            error: error.into(),
            timestamp: Utc::now(),
        }
    }
}

/// What to do with a job whose last delivery failed transiently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Re-deliver after `delay`; `attempt` is the 1-based retry number.
    Retry { attempt: u8, delay: Duration },
    /// No retries left; the failure is permanent.
    Exhausted,
}

/// Bounded retry budget for queue-driven jobs.
///
/// Retries are re-deliveries through the queue rather than in-process loops,
/// so the attempt count travels with the job itself.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u8,
}

impl RetryPolicy {
    pub fn new(max_retries: u8) -> Self {
        Self { max_retries }
    }

    /// Decide the fate of a job that has already been retried `retries_so_far` times.
    pub fn decide(&self, retries_so_far: u8, delay: Duration) -> RetryDecision {
        if retries_so_far < self.max_retries {
            RetryDecision::Retry {
                attempt: retries_so_far + 1,
                delay,
            }
        } else {
            RetryDecision::Exhausted
        }
    }
}
