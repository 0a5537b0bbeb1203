use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Per-recipe nutrition facts. Every amount is non-negative.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "nutritional_value")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub recipe_id: i32,
    #[sea_orm(belongs_to, from = "recipe_id", to = "id")]
    pub recipe: HasOne<super::recipe::Entity>,

    pub calories_kcal: f64,
    pub protein: f64, // grams
    pub fat: f64,
    pub carbs: f64,
    pub fiber: f64,
    pub sugars: f64,
    pub sodium: f64, // milligrams
    pub cholesterol: f64,
    pub calcium: f64,
    pub iron: f64,
    pub vitamin_c: f64,
}

impl ActiveModelBehavior for ActiveModel {}
