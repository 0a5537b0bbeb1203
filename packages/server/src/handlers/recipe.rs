use std::collections::HashMap;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::entity::{comment, nutritional_value, rating, recipe, user};
use common::{Category, Diet};
use sea_orm::prelude::Expr;
use sea_orm::sea_query::extension::postgres::PgBinOper;
use sea_orm::sea_query::{Alias, Func, LikeExpr, LockType, SimpleExpr};
use sea_orm::*;
use tracing::{info, instrument};

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::recipe::*;
use crate::models::shared::{Pagination, escape_like, page_params};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/",
    tag = "Recipes",
    operation_id = "listRecipes",
    summary = "List recipes with filters",
    description = "Public. Returns recipes newest first with their rating aggregate. Text filters are case-insensitive substring matches; `category` and `diet` accept any known label.",
    params(RecipeListQuery),
    responses(
        (status = 200, description = "List of recipes", body = RecipeListResponse),
        (status = 400, description = "Unknown label or bad range (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_recipes(
    State(state): State<AppState>,
    Query(query): Query<RecipeListQuery>,
) -> Result<Json<RecipeListResponse>, AppError> {
    let (page, per_page) = page_params(query.page, query.per_page);
    let select = apply_filters(recipe::Entity::find(), &query)?;

    let total = select
        .clone()
        .paginate(&state.db, per_page)
        .num_items()
        .await?;

    let models = select
        .order_by_desc(recipe::Column::CreatedAt)
        .order_by_desc(recipe::Column::Id)
        .offset(Some((page - 1) * per_page))
        .limit(Some(per_page))
        .all(&state.db)
        .await?;

    let ids: Vec<i32> = models.iter().map(|m| m.id).collect();
    let mut summaries = rating_summaries(&state.db, &ids).await?;

    let data = models
        .into_iter()
        .map(|m| {
            let summary = summaries.remove(&m.id).unwrap_or_default();
            RecipeListItem::new(m, summary)
        })
        .collect();

    Ok(Json(RecipeListResponse {
        data,
        pagination: Pagination::new(page, per_page, total),
    }))
}

fn contains_ci(column: recipe::Column, needle: &str) -> Option<SimpleExpr> {
    let term = escape_like(needle.trim());
    if term.is_empty() {
        return None;
    }
    Some(
        Expr::expr(Func::lower(Expr::col(column)))
            .like(LikeExpr::new(format!("%{}%", term.to_lowercase())).escape('\\')),
    )
}

fn label_contains(column: recipe::Column, label: &str) -> SimpleExpr {
    Expr::col(column).binary(
        PgBinOper::Contains,
        Expr::val(serde_json::json!([label])).cast_as(Alias::new("jsonb")),
    )
}

fn apply_filters(
    mut select: Select<recipe::Entity>,
    query: &RecipeListQuery,
) -> Result<Select<recipe::Entity>, AppError> {
    if let Some(ref raw) = query.category {
        let category: Category = raw
            .parse()
            .map_err(|e: common::labels::ParseLabelError| AppError::Validation(e.to_string()))?;
        select = select.filter(label_contains(recipe::Column::Categories, category.as_str()));
    }
    if let Some(ref raw) = query.diet {
        let diet: Diet = raw
            .parse()
            .map_err(|e: common::labels::ParseLabelError| AppError::Validation(e.to_string()))?;
        select = select.filter(label_contains(recipe::Column::Diets, diet.as_str()));
    }

    if let Some(expr) = query
        .title
        .as_deref()
        .and_then(|t| contains_ci(recipe::Column::Title, t))
    {
        select = select.filter(expr);
    }
    if let Some(expr) = query
        .ingredient
        .as_deref()
        .and_then(|t| contains_ci(recipe::Column::Ingredients, t))
    {
        select = select.filter(expr);
    }
    if let Some(ref search) = query.search
        && let (Some(in_title), Some(in_description)) = (
            contains_ci(recipe::Column::Title, search),
            contains_ci(recipe::Column::Description, search),
        )
    {
        select = select.filter(Condition::any().add(in_title).add(in_description));
    }

    for (min, max, column, name) in [
        (
            query.min_prep_time,
            query.max_prep_time,
            recipe::Column::PrepTime,
            "prep time",
        ),
        (
            query.min_cooking_time,
            query.max_cooking_time,
            recipe::Column::CookingTime,
            "cooking time",
        ),
    ] {
        if let (Some(lo), Some(hi)) = (min, max)
            && lo > hi
        {
            return Err(AppError::Validation(format!(
                "Minimum {name} must not exceed maximum {name}"
            )));
        }
        if let Some(lo) = min {
            select = select.filter(column.gte(lo));
        }
        if let Some(hi) = max {
            select = select.filter(column.lte(hi));
        }
    }

    Ok(select)
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Recipes",
    operation_id = "createRecipe",
    summary = "Upload a recipe",
    description = "Creates a recipe authored by the caller. The slug is derived from the title and suffixed `-2`, `-3`, ... on collision. Requires `recipe:create` permission.",
    request_body = CreateRecipeRequest,
    responses(
        (status = 201, description = "Recipe created", body = RecipeResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(title = %payload.title))]
pub async fn create_recipe(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateRecipeRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("recipe:create")?;
    validate_create_recipe(&payload)?;

    let title = payload.title.trim().to_string();
    let now = chrono::Utc::now();

    let txn = state.db.begin().await?;

    let slug = recipe::unique_slug(&txn, &title).await?;
    let new_recipe = recipe::ActiveModel {
        title: Set(title),
        slug: Set(slug),
        description: Set(payload.description.trim().to_string()),
        ingredients: Set(join_lines(&payload.ingredients)),
        instructions: Set(join_lines(&payload.instructions)),
        categories: Set(labels_to_json(&payload.categories)),
        diets: Set(labels_to_json(&payload.diets)),
        servings: Set(payload.servings),
        prep_time: Set(payload.prep_time),
        cooking_time: Set(payload.cooking_time),
        image_url: Set(payload.image_url),
        api_id: Set(None),
        author_id: Set(Some(auth_user.user_id)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let model = new_recipe.insert(&txn).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict("A recipe with this slug was created concurrently, retry".into())
        }
        _ => AppError::from(e),
    })?;

    let nutrition = match payload.nutritional_value {
        Some(ref n) => Some(upsert_nutrition(&txn, model.id, n).await?),
        None => None,
    };

    txn.commit().await?;

    info!(recipe_id = model.id, slug = %model.slug, "Recipe created");

    Ok((
        StatusCode::CREATED,
        Json(RecipeResponse::new(
            model,
            Some(auth_user.username),
            nutrition,
            RatingSummary::default(),
        )),
    ))
}

#[utoipa::path(
    get,
    path = "/{slug}",
    tag = "Recipes",
    operation_id = "getRecipe",
    summary = "Get a recipe by slug",
    description = "Public. Returns the full recipe with author, nutrition facts and rating aggregate.",
    params(("slug" = String, Path, description = "Recipe slug")),
    responses(
        (status = 200, description = "Recipe details", body = RecipeResponse),
        (status = 404, description = "Recipe not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(slug = %slug))]
pub async fn get_recipe(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<RecipeResponse>, AppError> {
    let model = find_recipe_by_slug(&state.db, &slug).await?;
    Ok(Json(recipe_response(&state.db, model).await?))
}

#[utoipa::path(
    patch,
    path = "/{slug}",
    tag = "Recipes",
    operation_id = "updateRecipe",
    summary = "Update a recipe",
    description = "Partially updates a recipe using PATCH semantics. Only the author or holders of `recipe:manage_all` may edit. The slug never changes. A `nutritional_value` block replaces the stored facts.",
    params(("slug" = String, Path, description = "Recipe slug")),
    request_body = UpdateRecipeRequest,
    responses(
        (status = 200, description = "Recipe updated", body = RecipeResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the author (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Recipe not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(slug = %slug))]
pub async fn update_recipe(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(slug): Path<String>,
    AppJson(payload): AppJson<UpdateRecipeRequest>,
) -> Result<Json<RecipeResponse>, AppError> {
    validate_update_recipe(&payload)?;

    let txn = state.db.begin().await?;

    let existing = find_recipe_by_slug_for_update(&txn, &slug).await?;
    auth_user.require_owner_or(existing.author_id, "recipe:manage_all")?;

    if payload == UpdateRecipeRequest::default() {
        txn.commit().await?;
        return Ok(Json(recipe_response(&state.db, existing).await?));
    }

    let recipe_id = existing.id;
    let mut active: recipe::ActiveModel = existing.into();

    if let Some(ref title) = payload.title {
        active.title = Set(title.trim().to_string());
    }
    if let Some(ref description) = payload.description {
        active.description = Set(description.trim().to_string());
    }
    if let Some(ref ingredients) = payload.ingredients {
        active.ingredients = Set(join_lines(ingredients));
    }
    if let Some(ref instructions) = payload.instructions {
        active.instructions = Set(join_lines(instructions));
    }
    if let Some(ref categories) = payload.categories {
        active.categories = Set(labels_to_json(categories));
    }
    if let Some(ref diets) = payload.diets {
        active.diets = Set(labels_to_json(diets));
    }
    if let Some(servings) = payload.servings {
        active.servings = Set(servings);
    }
    if let Some(prep) = payload.prep_time {
        active.prep_time = Set(prep);
    }
    if let Some(cook) = payload.cooking_time {
        active.cooking_time = Set(cook);
    }
    if let Some(image_url) = payload.image_url {
        active.image_url = Set(image_url);
    }
    active.updated_at = Set(chrono::Utc::now());

    let model = active.update(&txn).await?;

    if let Some(ref n) = payload.nutritional_value {
        upsert_nutrition(&txn, recipe_id, n).await?;
    }

    txn.commit().await?;

    Ok(Json(recipe_response(&state.db, model).await?))
}

#[utoipa::path(
    delete,
    path = "/{slug}",
    tag = "Recipes",
    operation_id = "deleteRecipe",
    summary = "Delete a recipe",
    description = "Deletes a recipe together with its ratings, comments and nutrition facts. Only the author or holders of `recipe:manage_all` may delete.",
    params(("slug" = String, Path, description = "Recipe slug")),
    responses(
        (status = 204, description = "Recipe deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the author (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Recipe not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(slug = %slug))]
pub async fn delete_recipe(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let txn = state.db.begin().await?;

    let existing = find_recipe_by_slug_for_update(&txn, &slug).await?;
    auth_user.require_owner_or(existing.author_id, "recipe:manage_all")?;

    purge_recipes(&txn, &[existing.id]).await?;
    txn.commit().await?;

    info!(recipe_id = existing.id, "Recipe deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Delete recipes and everything hanging off them.
pub(crate) async fn purge_recipes<C: ConnectionTrait>(conn: &C, ids: &[i32]) -> Result<(), DbErr> {
    if ids.is_empty() {
        return Ok(());
    }
    rating::Entity::delete_many()
        .filter(rating::Column::RecipeId.is_in(ids.to_vec()))
        .exec(conn)
        .await?;
    comment::Entity::delete_many()
        .filter(comment::Column::RecipeId.is_in(ids.to_vec()))
        .exec(conn)
        .await?;
    nutritional_value::Entity::delete_many()
        .filter(nutritional_value::Column::RecipeId.is_in(ids.to_vec()))
        .exec(conn)
        .await?;
    recipe::Entity::delete_many()
        .filter(recipe::Column::Id.is_in(ids.to_vec()))
        .exec(conn)
        .await?;
    Ok(())
}

async fn upsert_nutrition<C: ConnectionTrait>(
    conn: &C,
    recipe_id: i32,
    payload: &NutritionPayload,
) -> Result<nutritional_value::Model, DbErr> {
    let n = payload.clamped();
    let existing = nutritional_value::Entity::find()
        .filter(nutritional_value::Column::RecipeId.eq(recipe_id))
        .one(conn)
        .await?;

    let mut active = match existing {
        Some(model) => model.into(),
        None => nutritional_value::ActiveModel {
            recipe_id: Set(recipe_id),
            ..Default::default()
        },
    };
    active.calories_kcal = Set(n.calories_kcal);
    active.protein = Set(n.protein);
    active.fat = Set(n.fat);
    active.carbs = Set(n.carbs);
    active.fiber = Set(n.fiber);
    active.sugars = Set(n.sugars);
    active.sodium = Set(n.sodium);
    active.cholesterol = Set(n.cholesterol);
    active.calcium = Set(n.calcium);
    active.iron = Set(n.iron);
    active.vitamin_c = Set(n.vitamin_c);

    active.save(conn).await?.try_into_model()
}

/// Average and count of ratings for each of `recipe_ids`; unrated recipes are absent.
pub(crate) async fn rating_summaries<C: ConnectionTrait>(
    conn: &C,
    recipe_ids: &[i32],
) -> Result<HashMap<i32, RatingSummary>, DbErr> {
    if recipe_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<(i32, Option<f64>, i64)> = rating::Entity::find()
        .select_only()
        .column(rating::Column::RecipeId)
        .column_as(
            Expr::expr(Func::avg(Expr::col(rating::Column::Value))),
            "average",
        )
        .column_as(rating::Column::Id.count(), "total")
        .filter(rating::Column::RecipeId.is_in(recipe_ids.to_vec()))
        .group_by(rating::Column::RecipeId)
        .into_tuple()
        .all(conn)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(id, avg, total)| (id, RatingSummary::new(avg, std::cmp::Ord::max(total, 0) as u64)))
        .collect())
}

pub(crate) async fn recipe_response<C: ConnectionTrait>(
    conn: &C,
    model: recipe::Model,
) -> Result<RecipeResponse, AppError> {
    let author = match model.author_id {
        Some(author_id) => user::Entity::find_by_id(author_id)
            .one(conn)
            .await?
            .map(|u| u.username),
        None => None,
    };
    let nutrition = nutritional_value::Entity::find()
        .filter(nutritional_value::Column::RecipeId.eq(model.id))
        .one(conn)
        .await?;
    let summary = rating_summaries(conn, &[model.id])
        .await?
        .remove(&model.id)
        .unwrap_or_default();

    Ok(RecipeResponse::new(model, author, nutrition, summary))
}

pub(crate) async fn find_recipe_by_slug<C: ConnectionTrait>(
    db: &C,
    slug: &str,
) -> Result<recipe::Model, AppError> {
    recipe::Entity::find()
        .filter(recipe::Column::Slug.eq(slug))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Recipe not found".into()))
}

async fn find_recipe_by_slug_for_update(
    txn: &DatabaseTransaction,
    slug: &str,
) -> Result<recipe::Model, AppError> {
    recipe::Entity::find()
        .filter(recipe::Column::Slug.eq(slug))
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Recipe not found".into()))
}
