use std::collections::HashMap;

use chrono::{DateTime, Utc};
use common::entity::dead_letter_message;
use serde::{Deserialize, Serialize};

use crate::dlq::DlqStats;

use super::shared::Pagination;

/// Query parameters for listing DLQ messages.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ListDlqParams {
    /// Filter by resolved status.
    #[param(example = false)]
    pub resolved: Option<bool>,
    /// Filter by error code.
    #[param(example = "MAX_RETRIES_EXCEEDED")]
    pub error_code: Option<String>,
    /// Page number (1-indexed).
    #[param(example = 1)]
    pub page: Option<u64>,
    /// Items per page (1-100, default 20).
    #[param(example = 20)]
    pub per_page: Option<u64>,
}

/// Dead-lettered ingest job.
#[derive(Serialize, utoipa::ToSchema)]
pub struct DlqMessageResponse {
    #[schema(example = 1)]
    pub id: i32,
    /// Job id of the failed ingest job.
    #[schema(example = "01934f3e-8c1a-7c3e-9f2b-5d6e7f8a9b0c")]
    pub message_id: String,
    /// The job as it will be replayed.
    pub payload: serde_json::Value,
    #[schema(example = "MAX_RETRIES_EXCEEDED")]
    pub error_code: String,
    #[schema(example = "Provider returned HTTP 503")]
    pub error_message: String,
    #[schema(example = 4)]
    pub retry_count: i32,
    /// Array of {attempt, error, timestamp}.
    pub retry_history: serde_json::Value,
    pub first_failed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<i32>,
}

impl From<dead_letter_message::Model> for DlqMessageResponse {
    fn from(m: dead_letter_message::Model) -> Self {
        Self {
            id: m.id,
            message_id: m.message_id,
            payload: m.payload,
            error_code: m.error_code,
            error_message: m.error_message,
            retry_count: m.retry_count,
            retry_history: m.retry_history,
            first_failed_at: m.first_failed_at,
            created_at: m.created_at,
            resolved: m.resolved,
            resolved_at: m.resolved_at,
            resolved_by: m.resolved_by,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct DlqListResponse {
    pub data: Vec<DlqMessageResponse>,
    pub pagination: Pagination,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct DlqStatsResponse {
    #[schema(example = 5)]
    pub total_unresolved: u64,
    #[schema(example = 42)]
    pub total_resolved: u64,
    pub unresolved_by_error_code: HashMap<String, u64>,
}

impl From<DlqStats> for DlqStatsResponse {
    fn from(s: DlqStats) -> Self {
        Self {
            total_unresolved: s.total_unresolved,
            total_resolved: s.total_resolved,
            unresolved_by_error_code: s.unresolved_by_error_code,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct DlqRetryResponse {
    #[schema(example = "Job 01934f3e requeued at offset 40")]
    pub message: String,
    /// Id of the fresh job published for the replay.
    pub job_id: String,
}
