use std::time::Duration;

pub type PublishConfig = broccoli_queue::queue::PublishOptions;
pub type ConsumeConfig = broccoli_queue::queue::ConsumeOptions;

/// Publish options that hold a message back for `delay` before it becomes
/// visible to consumers.
pub fn delayed(delay: Duration) -> PublishConfig {
    PublishConfig::builder()
        .delay(time::Duration::seconds(delay.as_secs() as i64))
        .build()
}
