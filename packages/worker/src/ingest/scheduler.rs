use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{DlqEnvelope, IngestJob};
use mq::{Mq, MqError};

/// Where follow-up work for the pipeline goes.
#[async_trait]
pub trait JobScheduler: Send + Sync {
    /// Enqueue `job` to run after `delay`.
    async fn schedule(&self, job: &IngestJob, delay: Duration) -> Result<(), MqError>;

    /// Hand a permanently failed job to the dead-letter queue.
    async fn dead_letter(&self, envelope: &DlqEnvelope) -> Result<(), MqError>;
}

pub struct MqScheduler {
    mq: Arc<Mq>,
    queue_name: String,
    dlq_queue_name: String,
}

impl MqScheduler {
    pub fn new(mq: Arc<Mq>, queue_name: impl Into<String>, dlq_queue_name: impl Into<String>) -> Self {
        Self {
            mq,
            queue_name: queue_name.into(),
            dlq_queue_name: dlq_queue_name.into(),
        }
    }
}

#[async_trait]
impl JobScheduler for MqScheduler {
    async fn schedule(&self, job: &IngestJob, delay: Duration) -> Result<(), MqError> {
        mq::publish_json(&self.mq, &self.queue_name, job, Some(delay)).await
    }

    async fn dead_letter(&self, envelope: &DlqEnvelope) -> Result<(), MqError> {
        mq::publish_json(&self.mq, &self.dlq_queue_name, envelope, None).await
    }
}
