use common::retry::{RetryAttempt, RetryDecision, RetryPolicy};
use common::{DlqEnvelope, DlqErrorCode, IngestJob};
use mq::MqError;
use tracing::{error, info, instrument, warn};

use crate::ingest::{IngestError, IngestOutcome, IngestPipeline, JobScheduler};

/// What became of one delivered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Completed(IngestOutcome),
    /// Re-queued with the given retry number.
    Retrying { attempt: u8 },
    DeadLettered(DlqErrorCode),
}

/// Run one raw queue payload through the pipeline.
///
/// Transient failures are re-published after the error's back-off; a job that
/// has used up its retries, or failed permanently, goes to the dead-letter
/// queue. Only a failure to publish is returned as an error, so the broker
/// keeps the message.
#[instrument(skip_all)]
pub async fn handle_ingest_message(
    payload: serde_json::Value,
    pipeline: &IngestPipeline,
    scheduler: &dyn JobScheduler,
    policy: RetryPolicy,
) -> Result<Disposition, MqError> {
    let job: IngestJob = match serde_json::from_value(payload.clone()) {
        Ok(job) => job,
        Err(e) => {
            error!(error = %e, "Failed to parse IngestJob");
            let message_id = payload
                .get("job_id")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| uuid::Uuid::now_v7().to_string());
            let envelope = DlqEnvelope {
                message_id,
                payload,
                error_code: DlqErrorCode::DeserializationError,
                error_message: format!("Failed to parse IngestJob: {e}"),
                retry_history: vec![],
            };
            scheduler.dead_letter(&envelope).await?;
            return Ok(Disposition::DeadLettered(DlqErrorCode::DeserializationError));
        }
    };

    let err = match pipeline.run(&job).await {
        Ok(outcome) => return Ok(Disposition::Completed(outcome)),
        Err(e) => e,
    };

    if err.is_retryable() {
        let delay = err.retry_delay(pipeline.config());
        if let RetryDecision::Retry { attempt, delay } = policy.decide(job.attempt, delay) {
            warn!(
                job_id = %job.job_id,
                offset = job.offset,
                attempt,
                delay_secs = delay.as_secs(),
                error = %err,
                "Retrying ingest job"
            );
            scheduler
                .schedule(&job.retried(attempt, err.to_string()), delay)
                .await?;
            return Ok(Disposition::Retrying { attempt });
        }
    }

    dead_letter(job, err, scheduler).await
}

async fn dead_letter(
    job: IngestJob,
    err: IngestError,
    scheduler: &dyn JobScheduler,
) -> Result<Disposition, MqError> {
    let error_message = err.to_string();
    let mut retry_history = job.retry_history.clone();
    retry_history.push(RetryAttempt::new(
        job.attempt.saturating_add(1),
        error_message.clone(),
    ));

    let code = if err.is_retryable() {
        DlqErrorCode::MaxRetriesExceeded
    } else {
        DlqErrorCode::PermanentFailure
    };

    error!(
        job_id = %job.job_id,
        offset = job.offset,
        retry_count = retry_history.len(),
        error_code = %code,
        error = %err,
        "Sending ingest job to DLQ"
    );

    let mut replay = job.clone();
    replay.attempt = 0;
    replay.retry_history.clear();

    let envelope = DlqEnvelope {
        message_id: job.job_id.clone(),
        payload: serde_json::to_value(&replay).unwrap_or_default(),
        error_code: code,
        error_message,
        retry_history,
    };
    scheduler.dead_letter(&envelope).await?;
    info!(job_id = %job.job_id, "Ingest job dead-lettered");
    Ok(Disposition::DeadLettered(code))
}
