//! Persistence of normalized recipes, keyed by provider id.

use async_trait::async_trait;
use chrono::Utc;
use common::entity::{nutritional_value, recipe};
use common::labels::labels_to_json;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QuerySelect, Set, TransactionTrait,
};
use thiserror::Error;
use tracing::debug;

use super::normalize::{NormalizedRecipe, Nutrition};

#[derive(Debug, Error)]
#[error("Recipe store error: {0}")]
pub struct StoreError(pub String);

impl From<DbErr> for StoreError {
    fn from(e: DbErr) -> Self {
        StoreError(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created { id: i32, slug: String },
    Updated { id: i32 },
}

/// Storage for ingested recipes.
#[async_trait]
pub trait RecipeStore: Send + Sync {
    /// Insert or update the recipe with `recipe.api_id`, together with its
    /// nutrition row. The slug is only assigned on insert.
    async fn upsert(&self, recipe: &NormalizedRecipe) -> Result<UpsertOutcome, StoreError>;
}

pub struct SeaOrmRecipeStore {
    db: DatabaseConnection,
}

impl SeaOrmRecipeStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn nutrition_columns(
    model: &mut nutritional_value::ActiveModel,
    n: &Nutrition,
) {
    model.calories_kcal = Set(n.calories_kcal);
    model.protein = Set(n.protein);
    model.fat = Set(n.fat);
    model.carbs = Set(n.carbs);
    model.fiber = Set(n.fiber);
    model.sugars = Set(n.sugars);
    model.sodium = Set(n.sodium);
    model.cholesterol = Set(n.cholesterol);
    model.calcium = Set(n.calcium);
    model.iron = Set(n.iron);
    model.vitamin_c = Set(n.vitamin_c);
}

#[async_trait]
impl RecipeStore for SeaOrmRecipeStore {
    async fn upsert(&self, r: &NormalizedRecipe) -> Result<UpsertOutcome, StoreError> {
        let txn = self.db.begin().await?;
        let now = Utc::now();

        let existing = recipe::Entity::find()
            .filter(recipe::Column::ApiId.eq(r.api_id))
            .lock(LockType::Update)
            .one(&txn)
            .await?;

        let mut model = recipe::ActiveModel {
            title: Set(r.title.clone()),
            description: Set(r.description.clone()),
            ingredients: Set(r.ingredients.join("\n")),
            instructions: Set(r.instructions.join("\n")),
            categories: Set(labels_to_json(&r.categories)),
            diets: Set(labels_to_json(&r.diets)),
            servings: Set(r.servings),
            prep_time: Set(r.prep_time),
            cooking_time: Set(r.cooking_time),
            image_url: Set(r.image_url.clone()),
            author_id: Set(None),
            updated_at: Set(now),
            ..Default::default()
        };

        let (recipe_id, outcome) = match existing {
            Some(found) => {
                model.id = Set(found.id);
                model.update(&txn).await?;
                (found.id, UpsertOutcome::Updated { id: found.id })
            }
            None => {
                let slug = recipe::unique_slug(&txn, &r.title).await?;
                model.slug = Set(slug.clone());
                model.api_id = Set(Some(r.api_id));
                model.created_at = Set(now);
                let inserted = model.insert(&txn).await?;
                (inserted.id, UpsertOutcome::Created { id: inserted.id, slug })
            }
        };

        let existing_nutrition = nutritional_value::Entity::find()
            .filter(nutritional_value::Column::RecipeId.eq(recipe_id))
            .one(&txn)
            .await?;
        match existing_nutrition {
            Some(found) => {
                let mut nv: nutritional_value::ActiveModel = found.into();
                nutrition_columns(&mut nv, &r.nutrition);
                nv.update(&txn).await?;
            }
            None => {
                let mut nv = nutritional_value::ActiveModel {
                    recipe_id: Set(recipe_id),
                    ..Default::default()
                };
                nutrition_columns(&mut nv, &r.nutrition);
                nv.insert(&txn).await?;
            }
        }

        txn.commit().await?;
        debug!(api_id = r.api_id, recipe_id, "Upserted recipe");
        Ok(outcome)
    }
}
