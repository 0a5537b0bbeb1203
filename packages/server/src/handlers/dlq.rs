use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use common::IngestJob;
use sea_orm::TransactionTrait;
use tracing::{info, instrument, warn};

use crate::dlq::{DlqService, ResolveResult, dlq_service};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::dlq::*;
use crate::models::shared::{Pagination, page_params};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/",
    tag = "Dead Letter Queue",
    operation_id = "listDlqMessages",
    summary = "List dead-lettered ingest jobs",
    description = "Returns a paginated list of ingest jobs that failed permanently, newest first. Requires `dlq:manage` permission.",
    params(ListDlqParams),
    responses(
        (status = 200, description = "List of DLQ messages", body = DlqListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn list_dlq_messages(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<ListDlqParams>,
) -> Result<Json<DlqListResponse>, AppError> {
    auth_user.require_permission("dlq:manage")?;

    let (page, per_page) = page_params(params.page, params.per_page);

    let (messages, total) = dlq_service(&state.db)
        .list(
            params.resolved,
            params.error_code.as_deref(),
            page,
            per_page,
        )
        .await?;

    Ok(Json(DlqListResponse {
        data: messages.into_iter().map(Into::into).collect(),
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    get,
    path = "/stats",
    tag = "Dead Letter Queue",
    operation_id = "getDlqStats",
    summary = "Get DLQ statistics",
    description = "Counts of resolved and unresolved messages, the latter grouped by error code. Requires `dlq:manage` permission.",
    responses(
        (status = 200, description = "DLQ statistics", body = DlqStatsResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn get_dlq_stats(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<DlqStatsResponse>, AppError> {
    auth_user.require_permission("dlq:manage")?;

    let stats = dlq_service(&state.db).stats().await?;
    Ok(Json(stats.into()))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Dead Letter Queue",
    operation_id = "getDlqMessage",
    summary = "Get DLQ message details",
    description = "Returns a dead-lettered job including its payload and retry history. Requires `dlq:manage` permission.",
    params(("id" = i32, Path, description = "DLQ message ID")),
    responses(
        (status = 200, description = "DLQ message details", body = DlqMessageResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Message not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn get_dlq_message(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<DlqMessageResponse>, AppError> {
    auth_user.require_permission("dlq:manage")?;

    let message = dlq_service(&state.db)
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("DLQ message {} not found", id)))?;

    Ok(Json(message.into()))
}

#[utoipa::path(
    post,
    path = "/{id}/retry",
    tag = "Dead Letter Queue",
    operation_id = "retryDlqMessage",
    summary = "Replay a dead-lettered job",
    description = "Publishes the job again as a fresh job with the same offset and batch size and no retry history, then marks the entry resolved. Requires `dlq:manage` permission.",
    params(("id" = i32, Path, description = "DLQ message ID")),
    responses(
        (status = 200, description = "Job requeued", body = DlqRetryResponse),
        (status = 400, description = "Payload is not an ingest job (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Message not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Message already resolved (CONFLICT)", body = ErrorBody),
        (status = 503, description = "Message queue disabled (QUEUE_UNAVAILABLE)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn retry_dlq_message(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<DlqRetryResponse>, AppError> {
    auth_user.require_permission("dlq:manage")?;

    let txn = state.db.begin().await?;

    let dlq = DlqService::new(&txn);
    let message = dlq
        .get_by_id_for_update(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("DLQ message {} not found", id)))?;

    if message.resolved {
        return Err(AppError::Conflict("Message already resolved".into()));
    }

    let original: IngestJob = serde_json::from_value(message.payload.clone()).map_err(|e| {
        AppError::Validation(format!(
            "Payload is not a replayable ingest job ({e}); resolve it instead"
        ))
    })?;

    let Some(ref mq) = state.mq else {
        return Err(AppError::QueueUnavailable(
            "Message queue is disabled".into(),
        ));
    };

    // A fresh job id keeps a second failure from colliding with this entry.
    let job = IngestJob::new(original.offset, original.batch_size);

    match dlq.resolve(id, Some(auth_user.user_id)).await? {
        ResolveResult::Resolved => {}
        ResolveResult::AlreadyResolved => {
            warn!(id, "DLQ message was resolved concurrently during retry");
        }
        ResolveResult::NotFound => {
            return Err(AppError::Internal(
                "DLQ message disappeared during retry".into(),
            ));
        }
    }

    mq::publish_json(mq, &state.config.mq.queue_name, &job, None).await?;

    txn.commit().await.map_err(|e| {
        tracing::error!(
            id,
            job_id = %job.job_id,
            error = %e,
            "MQ message published but DB commit failed; DLQ entry remains unresolved"
        );
        AppError::Internal(format!("DB commit failed after MQ publish: {}", e))
    })?;

    info!(id, job_id = %job.job_id, offset = job.offset, "DLQ message retried");

    Ok(Json(DlqRetryResponse {
        message: format!(
            "Job {} requeued at offset {}",
            original.job_id, original.offset
        ),
        job_id: job.job_id,
    }))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Dead Letter Queue",
    operation_id = "deleteDlqMessage",
    summary = "Resolve a DLQ message without retrying",
    description = "Marks the entry resolved. Resolving an already resolved entry is a no-op. Requires `dlq:manage` permission.",
    params(("id" = i32, Path, description = "DLQ message ID")),
    responses(
        (status = 204, description = "Message resolved"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Message not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_dlq_message(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("dlq:manage")?;

    match dlq_service(&state.db)
        .resolve(id, Some(auth_user.user_id))
        .await?
    {
        ResolveResult::Resolved => {
            info!(id, "DLQ message resolved");
            Ok(StatusCode::NO_CONTENT)
        }
        ResolveResult::AlreadyResolved => Ok(StatusCode::NO_CONTENT),
        ResolveResult::NotFound => Err(AppError::NotFound(format!(
            "DLQ message {} not found",
            id
        ))),
    }
}
