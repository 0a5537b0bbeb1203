use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::entity::{rating, user};
use sea_orm::sea_query::LockType;
use sea_orm::*;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::handlers::recipe::{find_recipe_by_slug, rating_summaries};
use crate::models::rating::*;
use crate::state::AppState;

#[utoipa::path(
    put,
    path = "/{slug}/rating",
    tag = "Ratings",
    operation_id = "upsertRating",
    summary = "Rate a recipe",
    description = "Creates the caller's rating of the recipe, or replaces it if one exists. Each user holds at most one rating per recipe.",
    params(("slug" = String, Path, description = "Recipe slug")),
    request_body = UpsertRatingRequest,
    responses(
        (status = 201, description = "Rating created", body = RatingResponse),
        (status = 200, description = "Rating updated", body = RatingResponse),
        (status = 400, description = "Value out of range (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Recipe not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(slug = %slug, user_id = auth_user.user_id))]
pub async fn upsert_rating(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(slug): Path<String>,
    AppJson(payload): AppJson<UpsertRatingRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_rating(&payload)?;

    let value = round_rating(payload.value);
    let review = normalize_review(payload.review);
    let now = chrono::Utc::now();

    let txn = state.db.begin().await?;
    let recipe = find_recipe_by_slug(&txn, &slug).await?;

    let existing = rating::Entity::find()
        .filter(rating::Column::UserId.eq(auth_user.user_id))
        .filter(rating::Column::RecipeId.eq(recipe.id))
        .lock(LockType::Update)
        .one(&txn)
        .await?;

    let (status, model) = match existing {
        Some(model) => {
            let mut active: rating::ActiveModel = model.into();
            active.value = Set(value);
            active.review = Set(review);
            active.updated_at = Set(now);
            (StatusCode::OK, active.update(&txn).await?)
        }
        None => {
            let new_rating = rating::ActiveModel {
                user_id: Set(auth_user.user_id),
                recipe_id: Set(recipe.id),
                value: Set(value),
                review: Set(review),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            };
            let model = new_rating.insert(&txn).await.map_err(|e| match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => {
                    AppError::Conflict("Rating was submitted concurrently, retry".into())
                }
                _ => AppError::from(e),
            })?;
            (StatusCode::CREATED, model)
        }
    };

    txn.commit().await?;

    Ok((
        status,
        Json(RatingResponse {
            id: model.id,
            user_id: model.user_id,
            username: auth_user.username,
            recipe_id: model.recipe_id,
            value: model.value,
            review: model.review,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }),
    ))
}

#[utoipa::path(
    delete,
    path = "/{slug}/rating",
    tag = "Ratings",
    operation_id = "deleteRating",
    summary = "Remove your rating",
    description = "Deletes the caller's rating of the recipe.",
    params(("slug" = String, Path, description = "Recipe slug")),
    responses(
        (status = 204, description = "Rating removed"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Recipe or rating not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(slug = %slug, user_id = auth_user.user_id))]
pub async fn delete_rating(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let recipe = find_recipe_by_slug(&state.db, &slug).await?;

    let result = rating::Entity::delete_many()
        .filter(rating::Column::UserId.eq(auth_user.user_id))
        .filter(rating::Column::RecipeId.eq(recipe.id))
        .exec(&state.db)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound("You have not rated this recipe".into()));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/{slug}/ratings",
    tag = "Ratings",
    operation_id = "listRatings",
    summary = "List a recipe's ratings",
    description = "Public. Returns every rating of the recipe, newest first, with the aggregate.",
    params(("slug" = String, Path, description = "Recipe slug")),
    responses(
        (status = 200, description = "Ratings", body = RatingListResponse),
        (status = 404, description = "Recipe not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(slug = %slug))]
pub async fn list_ratings(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<RatingListResponse>, AppError> {
    let recipe = find_recipe_by_slug(&state.db, &slug).await?;

    let rows = rating::Entity::find()
        .filter(rating::Column::RecipeId.eq(recipe.id))
        .find_also_related(user::Entity)
        .order_by_desc(rating::Column::CreatedAt)
        .order_by_desc(rating::Column::Id)
        .all(&state.db)
        .await?;

    let data = rows
        .into_iter()
        .map(|(r, u)| RatingResponse {
            id: r.id,
            user_id: r.user_id,
            username: u.map(|u| u.username).unwrap_or_default(),
            recipe_id: r.recipe_id,
            value: r.value,
            review: r.review,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
        .collect();

    let summary = rating_summaries(&state.db, &[recipe.id])
        .await?
        .remove(&recipe.id)
        .unwrap_or_default();

    Ok(Json(RatingListResponse { data, summary }))
}
