use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lowest accepted rating value.
pub const MIN_RATING: f64 = -5.0;
/// Highest accepted rating value.
pub const MAX_RATING: f64 = 5.0;

/// A user's score for a recipe. At most one per `(user_id, recipe_id)`;
/// the unique index is created in `seed::ensure_indexes`.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "rating")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    #[sea_orm(indexed)]
    pub recipe_id: i32,
    #[sea_orm(belongs_to, from = "recipe_id", to = "id")]
    pub recipe: HasOne<super::recipe::Entity>,

    /// In `[-5, 5]`, one decimal place.
    pub value: f64,
    #[sea_orm(column_type = "Text", nullable)]
    pub review: Option<String>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
