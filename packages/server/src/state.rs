use std::sync::Arc;

use common::quota::DailyQuota;
use mq::Mq;
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: AppConfig,
    /// `None` when `mq.enabled` is false.
    pub mq: Option<Arc<Mq>>,
    /// Read-only view of the provider call budget.
    pub quota: DailyQuota,
}
