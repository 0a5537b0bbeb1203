use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use common::quota::{DailyQuota, RedisCallCounter};
use common::retry::RetryPolicy;
use mq::{BroccoliError, BrokerMessage, MqConfig, init_mq};
use sea_orm::{ConnectOptions, Database};
use tracing::{error, info};
use worker::ingest::{IngestPipeline, MqScheduler, SeaOrmRecipeStore, SpoonacularClient};
use worker::{Disposition, WorkerAppConfig, handle_ingest_message};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let config = WorkerAppConfig::load().context("Failed to load config")?;
    info!("Worker starting: {}", config.worker.id);

    if config.ingest.api_key.is_empty() {
        anyhow::bail!("ingest.api_key is not set (RECIPES__INGEST__API_KEY)");
    }

    let mut opt = ConnectOptions::new(config.database.url.clone());
    opt.max_connections(10)
        .connect_timeout(Duration::from_secs(8))
        .sqlx_logging(false);
    let db = Database::connect(opt)
        .await
        .context("Failed to connect to database")?;

    let mq = Arc::new(
        init_mq(MqConfig {
            url: config.mq.url.clone(),
            pool_size: config.mq.pool_size,
        })
        .await
        .context("Failed to initialize MQ")?,
    );

    let counter = RedisCallCounter::connect(&config.redis.url)
        .await
        .context("Failed to connect to quota store")?;

    info!(
        queue_name = %config.mq.queue_name,
        dlq_queue_name = %config.mq.dlq_queue_name,
        daily_limit = config.ingest.daily_limit,
        max_retries = config.ingest.max_retries,
        "MQ connected"
    );

    let scheduler = Arc::new(MqScheduler::new(
        Arc::clone(&mq),
        config.mq.queue_name.clone(),
        config.mq.dlq_queue_name.clone(),
    ));
    let pipeline = Arc::new(IngestPipeline::new(
        Arc::new(SpoonacularClient::new(&config.ingest).context("Failed to build HTTP client")?),
        Arc::new(SeaOrmRecipeStore::new(db)),
        scheduler.clone(),
        DailyQuota::new(Arc::new(counter), config.ingest.daily_limit),
        config.ingest.clone(),
    ));
    let policy = RetryPolicy::new(config.ingest.max_retries);

    let result = mq
        .process_messages(
            &config.mq.queue_name,
            Some(config.worker.concurrency),
            None,
            move |message: BrokerMessage<serde_json::Value>| {
                let pipeline = Arc::clone(&pipeline);
                let scheduler = Arc::clone(&scheduler);
                async move {
                    match handle_ingest_message(
                        message.payload,
                        &pipeline,
                        scheduler.as_ref(),
                        policy,
                    )
                    .await
                    {
                        Ok(Disposition::Completed(outcome)) => {
                            info!(?outcome, "Ingest job finished");
                            Ok(())
                        }
                        Ok(_) => Ok(()),
                        Err(e) => {
                            error!(error = %e, "Failed to requeue ingest job");
                            Err(BroccoliError::Publish(e.to_string()))
                        }
                    }
                }
            },
        )
        .await;

    if let Err(e) = result {
        error!(error = %e, "Worker stopped unexpectedly");
    }

    Ok(())
}
