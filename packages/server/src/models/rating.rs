use chrono::{DateTime, Utc};
use common::entity::rating::{MAX_RATING, MIN_RATING};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

use super::recipe::RatingSummary;

/// Create or replace the caller's rating of a recipe.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpsertRatingRequest {
    /// Between -5 and 5; stored with one decimal.
    #[schema(example = 4.5)]
    pub value: f64,
    #[schema(example = "Moist and lemony.")]
    pub review: Option<String>,
}

/// Round to the one-decimal precision ratings are stored with.
pub fn round_rating(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn validate_rating(payload: &UpsertRatingRequest) -> Result<(), AppError> {
    if !payload.value.is_finite() || !(MIN_RATING..=MAX_RATING).contains(&payload.value) {
        return Err(AppError::Validation(format!(
            "Rating must be between {MIN_RATING} and {MAX_RATING}"
        )));
    }
    if let Some(ref review) = payload.review
        && review.chars().count() > 2000
    {
        return Err(AppError::Validation(
            "Review must be at most 2000 characters".into(),
        ));
    }
    Ok(())
}

/// Blank reviews are stored as NULL.
pub fn normalize_review(review: Option<String>) -> Option<String> {
    review
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RatingResponse {
    pub id: i32,
    pub user_id: i32,
    #[schema(example = "alice_cooks")]
    pub username: String,
    pub recipe_id: i32,
    #[schema(example = 4.5)]
    pub value: f64,
    pub review: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RatingListResponse {
    pub data: Vec<RatingResponse>,
    #[serde(flatten)]
    pub summary: RatingSummary,
}
