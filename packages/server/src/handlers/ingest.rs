use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use common::IngestJob;
use tracing::{info, instrument};

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::ingest::*;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/",
    tag = "Ingestion",
    operation_id = "triggerIngest",
    summary = "Start a recipe ingestion run",
    description = "Queues the first page of a provider ingestion run. The worker chains further pages on its own while the daily call budget lasts. Requires `ingest:run` permission.",
    request_body = TriggerIngestRequest,
    responses(
        (status = 202, description = "Job queued", body = TriggerIngestResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 503, description = "Message queue disabled (QUEUE_UNAVAILABLE)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn trigger_ingest(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<TriggerIngestRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("ingest:run")?;
    validate_trigger_ingest(&payload)?;

    let Some(ref mq) = state.mq else {
        return Err(AppError::QueueUnavailable(
            "Message queue is disabled".into(),
        ));
    };

    let job = IngestJob::new(
        payload.offset.unwrap_or(0),
        payload
            .batch_size
            .unwrap_or(state.config.ingest.default_batch_size),
    );

    mq::publish_json(mq, &state.config.mq.queue_name, &job, None).await?;

    info!(job_id = %job.job_id, offset = job.offset, batch_size = job.batch_size, "Ingest job queued");

    Ok((
        StatusCode::ACCEPTED,
        Json(TriggerIngestResponse {
            job_id: job.job_id,
            offset: job.offset,
            batch_size: job.batch_size,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/quota",
    tag = "Ingestion",
    operation_id = "getIngestQuota",
    summary = "Today's provider call budget",
    description = "Reads the shared daily call counter without consuming a call. Requires `ingest:run` permission.",
    responses(
        (status = 200, description = "Quota state", body = QuotaResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn get_quota(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<QuotaResponse>, AppError> {
    auth_user.require_permission("ingest:run")?;

    let today = chrono::Utc::now().date_naive();
    let calls = state.quota.used_on(today).await?;

    Ok(Json(QuotaResponse::new(today, calls, state.quota.limit())))
}
