use std::sync::Arc;

use common::DlqEnvelope;
use mq::{BrokerMessage, Mq};
use sea_orm::{DatabaseConnection, TransactionTrait};
use tracing::{error, info};

use crate::dlq::DlqService;

/// Persist ingest jobs the worker gave up on, so admins can inspect and replay them.
pub async fn consume_ingest_dlq(db: DatabaseConnection, mq: Arc<Mq>, queue_name: String) {
    info!(queue = %queue_name, "Starting ingest DLQ consumer");

    let result = mq
        .process_messages(
            &queue_name,
            None,
            None,
            move |message: BrokerMessage<DlqEnvelope>| {
                let db = db.clone();
                async move {
                    let envelope = message.payload;

                    let txn = db.begin().await.map_err(|e| {
                        error!(error = %e, "Failed to begin DLQ transaction");
                        mq::BroccoliError::Job(format!("Transaction failed: {}", e))
                    })?;

                    let stored = DlqService::new(&txn).send_to_dlq(&envelope).await.map_err(|e| {
                        error!(
                            message_id = %envelope.message_id,
                            error = %e,
                            "Failed to persist DLQ envelope to database"
                        );
                        mq::BroccoliError::Job(format!("DB persistence failed: {}", e))
                    })?;

                    txn.commit().await.map_err(|e| {
                        error!(error = %e, "Failed to commit DLQ entry");
                        mq::BroccoliError::Job(format!("Commit failed: {}", e))
                    })?;

                    info!(
                        dlq_id = stored.id,
                        message_id = %envelope.message_id,
                        error_code = %envelope.error_code,
                        retries = envelope.retry_history.len(),
                        "Persisted ingest DLQ envelope"
                    );

                    Ok(())
                }
            },
        )
        .await;

    if let Err(e) = result {
        error!(error = %e, "Ingest DLQ consumer stopped unexpectedly");
    }
}
