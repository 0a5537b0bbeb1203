use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use common::entity::{comment, rating, recipe, role, user};
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr, LockType};
use sea_orm::*;
use tracing::{info, instrument};

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::handlers::comment::delete_threads;
use crate::handlers::recipe::purge_recipes;
use crate::models::admin::*;
use crate::models::shared::{Pagination, escape_like, page_params};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/users",
    tag = "Admin",
    operation_id = "listUsers",
    summary = "List user accounts",
    description = "Returns accounts oldest first, optionally filtered by role or a username/email substring. Requires `user:manage` permission.",
    params(AdminUserListQuery),
    responses(
        (status = 200, description = "List of users", body = AdminUserListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_users(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<AdminUserListQuery>,
) -> Result<Json<AdminUserListResponse>, AppError> {
    auth_user.require_permission("user:manage")?;

    let (page, per_page) = page_params(query.page, query.per_page);
    let mut select = user::Entity::find();

    if let Some(ref search) = query.search {
        let term = escape_like(search.trim());
        if !term.is_empty() {
            let pattern = format!("%{}%", term.to_lowercase());
            select = select.filter(
                Condition::any()
                    .add(
                        Expr::expr(Func::lower(Expr::col(user::Column::Username)))
                            .like(LikeExpr::new(pattern.clone()).escape('\\')),
                    )
                    .add(
                        Expr::col(user::Column::Email)
                            .like(LikeExpr::new(pattern).escape('\\')),
                    ),
            );
        }
    }
    if let Some(ref role) = query.role {
        select = select.filter(user::Column::Role.eq(role.trim()));
    }

    let total = select
        .clone()
        .paginate(&state.db, per_page)
        .num_items()
        .await?;

    let data = select
        .order_by_asc(user::Column::Id)
        .offset(Some((page - 1) * per_page))
        .limit(Some(per_page))
        .all(&state.db)
        .await?
        .into_iter()
        .map(AdminUserResponse::from)
        .collect();

    Ok(Json(AdminUserListResponse {
        data,
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    post,
    path = "/users/{id}/promote",
    tag = "Admin",
    operation_id = "promoteUser",
    summary = "Grant admin role",
    description = "Gives the user the `admin` role. Takes effect at the user's next login. Requires `user:manage` permission.",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User promoted", body = RoleChangeResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn promote_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<RoleChangeResponse>, AppError> {
    auth_user.require_permission("user:manage")?;

    let user = set_role(&state.db, id, role::ADMIN_ROLE).await?;
    info!(user_id = id, by = auth_user.user_id, "User promoted to admin");

    Ok(Json(RoleChangeResponse {
        message: format!("{}, {} is now an admin", user.username, user.email),
        user: user.into(),
    }))
}

#[utoipa::path(
    post,
    path = "/users/{id}/demote",
    tag = "Admin",
    operation_id = "demoteUser",
    summary = "Revoke admin role",
    description = "Returns the user to the default `user` role. Admins cannot demote themselves. Requires `user:manage` permission.",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User demoted", body = RoleChangeResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Cannot demote yourself (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn demote_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<RoleChangeResponse>, AppError> {
    auth_user.require_permission("user:manage")?;
    if id == auth_user.user_id {
        return Err(AppError::Conflict("You cannot demote yourself".into()));
    }

    let user = set_role(&state.db, id, role::DEFAULT_ROLE).await?;
    info!(user_id = id, by = auth_user.user_id, "User demoted");

    Ok(Json(RoleChangeResponse {
        message: format!("{}, {} is no longer an admin", user.username, user.email),
        user: user.into(),
    }))
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "Admin",
    operation_id = "deleteUser",
    summary = "Delete a user account",
    description = "Deletes the account together with the user's recipes, ratings and comment threads. Admins cannot delete themselves. Requires `user:manage` permission.",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Cannot delete yourself (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("user:manage")?;
    if id == auth_user.user_id {
        return Err(AppError::Conflict("You cannot delete your own account".into()));
    }

    let txn = state.db.begin().await?;

    user::Entity::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let recipe_ids: Vec<i32> = recipe::Entity::find()
        .select_only()
        .column(recipe::Column::Id)
        .filter(recipe::Column::AuthorId.eq(id))
        .into_tuple()
        .all(&txn)
        .await?;
    purge_recipes(&txn, &recipe_ids).await?;

    rating::Entity::delete_many()
        .filter(rating::Column::UserId.eq(id))
        .exec(&txn)
        .await?;

    let comment_ids: Vec<i32> = comment::Entity::find()
        .select_only()
        .column(comment::Column::Id)
        .filter(comment::Column::AuthorId.eq(id))
        .into_tuple()
        .all(&txn)
        .await?;
    delete_threads(&txn, comment_ids).await?;

    user::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    info!(
        user_id = id,
        by = auth_user.user_id,
        recipes = recipe_ids.len(),
        "User deleted"
    );
    Ok(StatusCode::NO_CONTENT)
}

async fn set_role(db: &DatabaseConnection, id: i32, role: &str) -> Result<user::Model, AppError> {
    let existing = user::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    if existing.role == role {
        return Ok(existing);
    }

    let mut active: user::ActiveModel = existing.into();
    active.role = Set(role.to_string());
    Ok(active.update(db).await?)
}
