use std::time::Duration;

pub use broccoli_queue::{
    brokers::broker::BrokerMessage,
    error::BroccoliError,
    queue::{BroccoliQueue, ConsumeOptions},
};
use serde::Serialize;
use tracing::debug;

use crate::config::{PublishConfig, delayed};
use crate::error::MqError;

pub type MqQueue = BroccoliQueue;

pub struct MqConfig {
    pub url: String,
    pub pool_size: u8,
}

pub async fn init_mq(config: MqConfig) -> Result<MqQueue, MqError> {
    BroccoliQueue::builder(&config.url)
        .pool_connections(config.pool_size)
        .build()
        .await
        .map_err(MqError::from)
}

/// Publish `message` to `queue`, optionally holding it back for `delay`.
pub async fn publish_json<T>(
    mq: &MqQueue,
    queue: &str,
    message: &T,
    delay: Option<Duration>,
) -> Result<(), MqError>
where
    T: Serialize + Clone + serde::de::DeserializeOwned,
{
    let options: Option<PublishConfig> = delay.filter(|d| !d.is_zero()).map(delayed);
    mq.publish(queue, None, message, options)
        .await
        .map_err(|e| MqError::Publish {
            queue: queue.to_string(),
            message: e.to_string(),
        })?;
    debug!(queue, delay_secs = delay.map(|d| d.as_secs()), "Published message");
    Ok(())
}
