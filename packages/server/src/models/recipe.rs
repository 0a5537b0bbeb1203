use chrono::{DateTime, Utc};
use common::entity::{nutritional_value, recipe};
use common::{Category, Diet};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

use super::shared::{double_option, validate_title};

/// Nutrition facts per serving. Negative amounts are stored as zero.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, utoipa::ToSchema)]
#[serde(default)]
pub struct NutritionPayload {
    #[schema(example = 420.0)]
    pub calories_kcal: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
    pub fiber: f64,
    pub sugars: f64,
    pub sodium: f64,
    pub cholesterol: f64,
    pub calcium: f64,
    pub iron: f64,
    pub vitamin_c: f64,
}

impl NutritionPayload {
    /// Copy with every negative (or NaN) amount replaced by zero.
    pub fn clamped(&self) -> Self {
        let c = |v: f64| if v > 0.0 { v } else { 0.0 };
        Self {
            calories_kcal: c(self.calories_kcal),
            protein: c(self.protein),
            fat: c(self.fat),
            carbs: c(self.carbs),
            fiber: c(self.fiber),
            sugars: c(self.sugars),
            sodium: c(self.sodium),
            cholesterol: c(self.cholesterol),
            calcium: c(self.calcium),
            iron: c(self.iron),
            vitamin_c: c(self.vitamin_c),
        }
    }
}

impl From<nutritional_value::Model> for NutritionPayload {
    fn from(n: nutritional_value::Model) -> Self {
        Self {
            calories_kcal: n.calories_kcal,
            protein: n.protein,
            fat: n.fat,
            carbs: n.carbs,
            fiber: n.fiber,
            sugars: n.sugars,
            sodium: n.sodium,
            cholesterol: n.cholesterol,
            calcium: n.calcium,
            iron: n.iron,
            vitamin_c: n.vitamin_c,
        }
    }
}

/// Request body for uploading a recipe.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateRecipeRequest {
    #[schema(example = "Lemon Drizzle Cake")]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// One entry per ingredient.
    #[schema(example = json!(["225g butter", "225g caster sugar", "4 eggs"]))]
    pub ingredients: Vec<String>,
    /// One entry per step, in order.
    #[schema(example = json!(["Heat the oven to 180C.", "Beat the butter and sugar."]))]
    pub instructions: Vec<String>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub diets: Vec<Diet>,
    #[schema(example = 8)]
    pub servings: i32,
    /// Minutes.
    #[schema(example = 15)]
    pub prep_time: i32,
    /// Minutes.
    #[schema(example = 45)]
    pub cooking_time: i32,
    pub image_url: Option<String>,
    pub nutritional_value: Option<NutritionPayload>,
}

/// PATCH body: absent fields are left unchanged.
#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
pub struct UpdateRecipeRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub ingredients: Option<Vec<String>>,
    pub instructions: Option<Vec<String>>,
    pub categories: Option<Vec<Category>>,
    pub diets: Option<Vec<Diet>>,
    pub servings: Option<i32>,
    pub prep_time: Option<i32>,
    pub cooking_time: Option<i32>,
    /// `null` clears the image.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub image_url: Option<Option<String>>,
    pub nutritional_value: Option<NutritionPayload>,
}

/// Trim each line, drop blank ones and join with newlines.
///
/// Embedded line breaks split an entry into several lines.
pub fn join_lines(lines: &[String]) -> String {
    lines
        .iter()
        .flat_map(|l| l.lines())
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Inverse of [`join_lines`].
pub fn split_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}

/// Sorted, de-duplicated label set as stored in the JSON column.
pub fn labels_to_json<T: Ord + Copy + Serialize>(labels: &[T]) -> serde_json::Value {
    let mut set = labels.to_vec();
    set.sort();
    set.dedup();
    serde_json::to_value(set).unwrap_or_else(|_| serde_json::json!([]))
}

/// Stored labels back to their enum form. Unknown entries are dropped.
pub fn labels_from_json<T: for<'de> Deserialize<'de>>(value: &serde_json::Value) -> Vec<T> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| serde_json::from_value(v.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

fn validate_lines(lines: &[String], name: &str) -> Result<(), AppError> {
    if join_lines(lines).is_empty() {
        return Err(AppError::Validation(format!("{name} must not be empty")));
    }
    Ok(())
}

fn validate_minutes(value: i32, name: &str) -> Result<(), AppError> {
    if !(0..=10_000).contains(&value) {
        return Err(AppError::Validation(format!(
            "{name} must be between 0 and 10000 minutes"
        )));
    }
    Ok(())
}

fn validate_servings(servings: i32) -> Result<(), AppError> {
    if !(1..=1000).contains(&servings) {
        return Err(AppError::Validation("Servings must be 1-1000".into()));
    }
    Ok(())
}

fn validate_image_url(url: &str) -> Result<(), AppError> {
    if url.len() > 2048 || !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(AppError::Validation(
            "Image URL must be an http(s) URL of at most 2048 characters".into(),
        ));
    }
    Ok(())
}

pub fn validate_create_recipe(payload: &CreateRecipeRequest) -> Result<(), AppError> {
    validate_title(&payload.title)?;
    validate_lines(&payload.ingredients, "Ingredients")?;
    validate_lines(&payload.instructions, "Instructions")?;
    validate_servings(payload.servings)?;
    validate_minutes(payload.prep_time, "Prep time")?;
    validate_minutes(payload.cooking_time, "Cooking time")?;
    if let Some(ref url) = payload.image_url {
        validate_image_url(url)?;
    }
    Ok(())
}

pub fn validate_update_recipe(payload: &UpdateRecipeRequest) -> Result<(), AppError> {
    if let Some(ref title) = payload.title {
        validate_title(title)?;
    }
    if let Some(ref ingredients) = payload.ingredients {
        validate_lines(ingredients, "Ingredients")?;
    }
    if let Some(ref instructions) = payload.instructions {
        validate_lines(instructions, "Instructions")?;
    }
    if let Some(servings) = payload.servings {
        validate_servings(servings)?;
    }
    if let Some(prep) = payload.prep_time {
        validate_minutes(prep, "Prep time")?;
    }
    if let Some(cook) = payload.cooking_time {
        validate_minutes(cook, "Cooking time")?;
    }
    if let Some(Some(ref url)) = payload.image_url {
        validate_image_url(url)?;
    }
    Ok(())
}

/// Query parameters for the recipe list.
#[derive(Deserialize, Default, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RecipeListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// Category label, e.g. `dessert` or `main course`.
    pub category: Option<String>,
    /// Diet label, e.g. `vegan` or `gluten-free`.
    pub diet: Option<String>,
    /// Case-insensitive substring of the title.
    pub title: Option<String>,
    /// Case-insensitive substring of the ingredient list.
    pub ingredient: Option<String>,
    /// Case-insensitive substring of the title or description.
    pub search: Option<String>,
    pub min_prep_time: Option<i32>,
    pub max_prep_time: Option<i32>,
    pub min_cooking_time: Option<i32>,
    pub max_cooking_time: Option<i32>,
}

/// Average and count of a recipe's ratings.
#[derive(Serialize, Clone, Copy, Debug, Default, PartialEq, utoipa::ToSchema)]
pub struct RatingSummary {
    /// Mean rating rounded to one decimal, `null` when unrated.
    #[schema(example = 3.5)]
    pub average_rating: Option<f64>,
    #[schema(example = 12)]
    pub total_ratings: u64,
}

impl RatingSummary {
    pub fn new(average: Option<f64>, total: u64) -> Self {
        Self {
            average_rating: average.map(|a| (a * 10.0).round() / 10.0),
            total_ratings: total,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RecipeListItem {
    pub id: i32,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub categories: Vec<Category>,
    pub diets: Vec<Diet>,
    pub servings: i32,
    pub prep_time: i32,
    pub cooking_time: i32,
    pub image_url: Option<String>,
    pub author_id: Option<i32>,
    #[serde(flatten)]
    pub rating: RatingSummary,
    pub created_at: DateTime<Utc>,
}

impl RecipeListItem {
    pub fn new(model: recipe::Model, rating: RatingSummary) -> Self {
        Self {
            categories: labels_from_json(&model.categories),
            diets: labels_from_json(&model.diets),
            id: model.id,
            title: model.title,
            slug: model.slug,
            description: model.description,
            servings: model.servings,
            prep_time: model.prep_time,
            cooking_time: model.cooking_time,
            image_url: model.image_url,
            author_id: model.author_id,
            rating,
            created_at: model.created_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RecipeListResponse {
    pub data: Vec<RecipeListItem>,
    pub pagination: super::shared::Pagination,
}

/// Full recipe.
#[derive(Serialize, utoipa::ToSchema)]
pub struct RecipeResponse {
    pub id: i32,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub categories: Vec<Category>,
    pub diets: Vec<Diet>,
    pub servings: i32,
    pub prep_time: i32,
    pub cooking_time: i32,
    pub image_url: Option<String>,
    /// Provider identifier for ingested recipes.
    pub api_id: Option<i32>,
    pub author_id: Option<i32>,
    /// Author's username, `null` for ingested recipes.
    pub author: Option<String>,
    pub nutritional_value: Option<NutritionPayload>,
    #[serde(flatten)]
    pub rating: RatingSummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RecipeResponse {
    pub fn new(
        model: recipe::Model,
        author: Option<String>,
        nutrition: Option<nutritional_value::Model>,
        rating: RatingSummary,
    ) -> Self {
        Self {
            ingredients: split_lines(&model.ingredients),
            instructions: split_lines(&model.instructions),
            categories: labels_from_json(&model.categories),
            diets: labels_from_json(&model.diets),
            id: model.id,
            title: model.title,
            slug: model.slug,
            description: model.description,
            servings: model.servings,
            prep_time: model.prep_time,
            cooking_time: model.cooking_time,
            image_url: model.image_url,
            api_id: model.api_id,
            author_id: model.author_id,
            author,
            nutritional_value: nutrition.map(NutritionPayload::from),
            rating,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
