use std::collections::HashSet;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::entity::{comment, user};
use sea_orm::*;
use tracing::{info, instrument};

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::handlers::recipe::find_recipe_by_slug;
use crate::models::comment::*;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/{slug}/comments",
    tag = "Comments",
    operation_id = "listComments",
    summary = "Get a recipe's comment threads",
    description = "Public. Returns top-level comments oldest first, each with its nested replies and depth.",
    params(("slug" = String, Path, description = "Recipe slug")),
    responses(
        (status = 200, description = "Comment tree", body = CommentTreeResponse),
        (status = 404, description = "Recipe not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(slug = %slug))]
pub async fn list_comments(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<CommentTreeResponse>, AppError> {
    let recipe = find_recipe_by_slug(&state.db, &slug).await?;

    let rows: Vec<CommentRow> = comment::Entity::find()
        .filter(comment::Column::RecipeId.eq(recipe.id))
        .find_also_related(user::Entity)
        .order_by_asc(comment::Column::CreatedAt)
        .order_by_asc(comment::Column::Id)
        .all(&state.db)
        .await?
        .into_iter()
        .map(|(c, u)| to_row(c, u))
        .collect();

    let total = rows.len();
    Ok(Json(CommentTreeResponse {
        data: build_comment_tree(rows),
        total,
    }))
}

#[utoipa::path(
    post,
    path = "/{slug}/comments",
    tag = "Comments",
    operation_id = "createComment",
    summary = "Comment on a recipe",
    description = "Adds a top-level comment, or a reply when `parent_id` names a comment on the same recipe.",
    params(("slug" = String, Path, description = "Recipe slug")),
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment created", body = CommentNode),
        (status = 400, description = "Validation error or parent on another recipe (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Recipe or parent comment not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(slug = %slug, parent_id = ?payload.parent_id))]
pub async fn create_comment(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(slug): Path<String>,
    AppJson(payload): AppJson<CreateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_comment(&payload)?;

    let recipe = find_recipe_by_slug(&state.db, &slug).await?;

    let depth = match payload.parent_id {
        Some(parent_id) => {
            let parent = comment::Entity::find_by_id(parent_id)
                .one(&state.db)
                .await?
                .ok_or_else(|| AppError::NotFound("Parent comment not found".into()))?;
            if parent.recipe_id != recipe.id {
                return Err(AppError::Validation(
                    "Parent comment belongs to a different recipe".into(),
                ));
            }
            comment_depth(&state.db, &parent).await? + 1
        }
        None => 0,
    };

    let now = chrono::Utc::now();
    let model = comment::ActiveModel {
        author_id: Set(auth_user.user_id),
        recipe_id: Set(recipe.id),
        parent_id: Set(payload.parent_id),
        content: Set(payload.content.trim().to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    let row = CommentRow {
        id: model.id,
        parent_id: model.parent_id,
        author_id: model.author_id,
        author: auth_user.username,
        content: model.content,
        created_at: model.created_at,
        updated_at: model.updated_at,
    };

    Ok((StatusCode::CREATED, Json(CommentNode::leaf(row, depth))))
}

#[utoipa::path(
    delete,
    path = "/{slug}/comments/{id}",
    tag = "Comments",
    operation_id = "deleteComment",
    summary = "Delete a comment thread",
    description = "Deletes the comment and every reply beneath it. Only the author or holders of `comment:moderate` may delete.",
    params(
        ("slug" = String, Path, description = "Recipe slug"),
        ("id" = i32, Path, description = "Comment ID"),
    ),
    responses(
        (status = 204, description = "Comment thread deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the author (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Recipe or comment not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(slug = %slug, id))]
pub async fn delete_comment(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((slug, id)): Path<(String, i32)>,
) -> Result<impl IntoResponse, AppError> {
    let recipe = find_recipe_by_slug(&state.db, &slug).await?;

    let txn = state.db.begin().await?;

    let target = comment::Entity::find_by_id(id)
        .filter(comment::Column::RecipeId.eq(recipe.id))
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Comment not found".into()))?;
    auth_user.require_owner_or(Some(target.author_id), "comment:moderate")?;

    let removed = delete_threads(&txn, vec![target.id]).await?;
    txn.commit().await?;

    info!(comment_id = id, removed, "Comment thread deleted");
    Ok(StatusCode::NO_CONTENT)
}

fn to_row(c: comment::Model, author: Option<user::Model>) -> CommentRow {
    CommentRow {
        id: c.id,
        parent_id: c.parent_id,
        author_id: c.author_id,
        author: author.map(|u| u.username).unwrap_or_default(),
        content: c.content,
        created_at: c.created_at,
        updated_at: c.updated_at,
    }
}

/// Number of ancestors above `comment`.
async fn comment_depth<C: ConnectionTrait>(conn: &C, comment: &comment::Model) -> Result<u32, DbErr> {
    let mut depth = 0;
    let mut seen = HashSet::from([comment.id]);
    let mut parent_id = comment.parent_id;

    while let Some(id) = parent_id {
        if !seen.insert(id) {
            break;
        }
        match comment::Entity::find_by_id(id).one(conn).await? {
            Some(parent) => {
                depth += 1;
                parent_id = parent.parent_id;
            }
            None => break,
        }
    }
    Ok(depth)
}

/// Delete the given comments and all replies beneath them. Returns the number removed.
pub(crate) async fn delete_threads<C: ConnectionTrait>(
    conn: &C,
    roots: Vec<i32>,
) -> Result<u64, DbErr> {
    let mut all: HashSet<i32> = roots.iter().copied().collect();
    let mut frontier = roots;

    while !frontier.is_empty() {
        let children: Vec<i32> = comment::Entity::find()
            .select_only()
            .column(comment::Column::Id)
            .filter(comment::Column::ParentId.is_in(frontier))
            .into_tuple()
            .all(conn)
            .await?;
        frontier = children.into_iter().filter(|id| all.insert(*id)).collect();
    }

    if all.is_empty() {
        return Ok(0);
    }
    let result = comment::Entity::delete_many()
        .filter(comment::Column::Id.is_in(all))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}
