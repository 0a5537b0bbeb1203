use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Start an ingestion run. Omitted fields use the configured defaults.
#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct TriggerIngestRequest {
    /// Provider search offset of the first page.
    #[schema(example = 0)]
    pub offset: Option<u32>,
    /// Offset increment between chained pages.
    #[schema(example = 10)]
    pub batch_size: Option<u32>,
}

pub fn validate_trigger_ingest(payload: &TriggerIngestRequest) -> Result<(), AppError> {
    if let Some(batch) = payload.batch_size
        && !(1..=1000).contains(&batch)
    {
        return Err(AppError::Validation("Batch size must be 1-1000".into()));
    }
    Ok(())
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct TriggerIngestResponse {
    #[schema(example = "01934f3e-8c1a-7c3e-9f2b-5d6e7f8a9b0c")]
    pub job_id: String,
    pub offset: u32,
    pub batch_size: u32,
}

/// Today's provider call budget.
#[derive(Serialize, utoipa::ToSchema)]
pub struct QuotaResponse {
    /// UTC calendar date the counter belongs to.
    #[schema(value_type = String, example = "2025-09-14")]
    pub date: NaiveDate,
    #[schema(example = 12)]
    pub calls: u64,
    #[schema(example = 50)]
    pub limit: u64,
    #[schema(example = 38)]
    pub remaining: u64,
}

impl QuotaResponse {
    pub fn new(date: NaiveDate, calls: u64, limit: u64) -> Self {
        Self {
            date,
            calls,
            limit,
            remaining: limit.saturating_sub(calls),
        }
    }
}
