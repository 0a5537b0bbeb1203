pub mod config;
pub mod dlq;
#[cfg(feature = "sea-orm")]
pub mod entity;
pub mod ingest_job;
pub mod labels;
pub mod quota;
pub mod retry;
pub mod slug;

pub use dlq::{DlqEnvelope, DlqErrorCode};
pub use ingest_job::IngestJob;
pub use labels::{Category, Diet};
pub use retry::{RetryAttempt, RetryDecision, RetryPolicy};
