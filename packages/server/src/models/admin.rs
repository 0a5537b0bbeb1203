use chrono::{DateTime, Utc};
use common::entity::user;
use serde::{Deserialize, Serialize};

use super::shared::Pagination;

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AdminUserListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// Case-insensitive substring of the username or email.
    pub search: Option<String>,
    /// Exact role name.
    #[param(example = "admin")]
    pub role: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct AdminUserResponse {
    pub id: i32,
    #[schema(example = "alice_cooks")]
    pub username: String,
    #[schema(example = "alice@example.com")]
    pub email: String,
    #[schema(example = "user")]
    pub role: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for AdminUserResponse {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            role: u.role,
            is_active: u.is_active,
            created_at: u.created_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct AdminUserListResponse {
    pub data: Vec<AdminUserResponse>,
    pub pagination: Pagination,
}

/// Result of a role change.
#[derive(Serialize, utoipa::ToSchema)]
pub struct RoleChangeResponse {
    #[schema(example = "alice_cooks, alice@example.com is now an admin")]
    pub message: String,
    pub user: AdminUserResponse,
}
