use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::retry::RetryAttempt;

/// One invocation of the recipe ingestion pipeline, carried over the MQ.
///
/// Continuations and retries are new messages rather than loops, so a crashed
/// worker resumes from whatever is still queued.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct IngestJob {
    /// Identifier shared by a job and its retries; a continuation gets a fresh one.
    pub job_id: String,
    /// Provider search offset for this page.
    pub offset: u32,
    /// Offset increment applied when chaining to the next page.
    pub batch_size: u32,
    /// Number of retries already spent on this page.
    #[serde(default)]
    pub attempt: u8,
    /// Errors seen by earlier deliveries of this job.
    #[serde(default)]
    pub retry_history: Vec<RetryAttempt>,
}

impl IngestJob {
    pub fn new(offset: u32, batch_size: u32) -> Self {
        Self {
            job_id: Uuid::now_v7().to_string(),
            offset,
            batch_size,
            attempt: 0,
            retry_history: Vec::new(),
        }
    }

    /// The job that fetches the page after this one.
    pub fn next_page(&self) -> Self {
        Self::new(self.offset.saturating_add(self.batch_size), self.batch_size)
    }

    /// The same job redelivered after a failure.
    pub fn retried(&self, attempt: u8, error: impl Into<String>) -> Self {
        let mut job = self.clone();
        job.attempt = attempt;
        job.retry_history.push(RetryAttempt::new(attempt, error));
        job
    }
}
