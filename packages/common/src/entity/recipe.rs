use sea_orm::entity::prelude::*;
use sea_orm::{ExprTrait, QueryFilter, QuerySelect};
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "recipe")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub title: String,
    /// Assigned once at creation; never rewritten by title edits.
    #[sea_orm(unique)]
    pub slug: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    /// One ingredient per line.
    #[sea_orm(column_type = "Text")]
    pub ingredients: String,
    /// One step per line.
    #[sea_orm(column_type = "Text")]
    pub instructions: String,

    /// JSON array of category labels, e.g. `["main course", "salad"]`.
    #[sea_orm(column_type = "JsonBinary")]
    pub categories: serde_json::Value,
    /// JSON array of diet labels, e.g. `["vegan", "gluten_free"]`.
    #[sea_orm(column_type = "JsonBinary")]
    pub diets: serde_json::Value,

    pub servings: i32,
    pub prep_time: i32,    // in minutes
    pub cooking_time: i32, // in minutes
    pub image_url: Option<String>,

    /// Spoonacular recipe ID; NULL for user uploads.
    #[sea_orm(unique)]
    pub api_id: Option<i32>,

    /// NULL for ingested recipes.
    #[sea_orm(indexed)]
    pub author_id: Option<i32>,
    #[sea_orm(belongs_to, from = "author_id", to = "id")]
    pub author: HasOne<super::user::Entity>,

    #[sea_orm(has_one)]
    pub nutritional_value: HasOne<super::nutritional_value::Entity>,

    #[sea_orm(has_many)]
    pub ratings: HasMany<super::rating::Entity>,

    #[sea_orm(has_many)]
    pub comments: HasMany<super::comment::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}

/// Slug for a new recipe titled `title`, suffixed `-2`, `-3`, ... when the
/// plain slug is already taken.
pub async fn unique_slug<C: ConnectionTrait>(conn: &C, title: &str) -> Result<String, DbErr> {
    let base = crate::slug::slugify(title);
    let taken: Vec<String> = Entity::find()
        .select_only()
        .column(Column::Slug)
        .filter(
            Column::Slug
                .eq(base.as_str())
                .or(Column::Slug.starts_with(format!("{base}-"))),
        )
        .into_tuple()
        .all(conn)
        .await?;
    Ok(crate::slug::resolve_collision(&base, &taken))
}
