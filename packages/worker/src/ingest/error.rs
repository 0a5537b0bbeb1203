use std::time::Duration;

use common::config::IngestConfig;
use common::quota::QuotaError;
use mq::MqError;
use thiserror::Error;

use super::store::StoreError;

/// Failure of one pipeline invocation.
///
/// A provider 402 is not an error: it ends the run with
/// [`IngestOutcome::ProviderQuotaExhausted`](super::IngestOutcome).
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Provider returned HTTP {status}")]
    Http { status: u16 },

    #[error("Network error: {0}")]
    Network(String),

    /// Every write of the page failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Call counter unavailable: {0}")]
    Counter(#[from] QuotaError),

    /// The page was stored but the next page could not be queued.
    #[error("Failed to schedule next page: {0}")]
    Schedule(MqError),
}

impl IngestError {
    /// Whether re-running the same job may succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Schedule(_))
    }

    /// Back-off before the retry: HTTP failures wait longer than transport
    /// failures.
    pub fn retry_delay(&self, config: &IngestConfig) -> Duration {
        match self {
            Self::Http { .. } => Duration::from_secs(config.http_retry_delay_secs),
            _ => Duration::from_secs(config.network_retry_delay_secs),
        }
    }
}
