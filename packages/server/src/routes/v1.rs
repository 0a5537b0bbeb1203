use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers::{admin, auth, comment, dlq, ingest, rating, recipe};
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/auth", auth_routes())
        .nest("/recipes", recipe_routes())
        .nest("/admin", admin_routes())
}

fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(auth::register))
        .routes(routes!(auth::login))
        .routes(routes!(auth::me))
}

fn recipe_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(recipe::list_recipes, recipe::create_recipe))
        .routes(routes!(
            recipe::get_recipe,
            recipe::update_recipe,
            recipe::delete_recipe
        ))
        .routes(routes!(rating::upsert_rating, rating::delete_rating))
        .routes(routes!(rating::list_ratings))
        .routes(routes!(comment::list_comments, comment::create_comment))
        .routes(routes!(comment::delete_comment))
}

fn admin_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(admin::list_users))
        .routes(routes!(admin::delete_user))
        .routes(routes!(admin::promote_user))
        .routes(routes!(admin::demote_user))
        .nest("/ingest", ingest_routes())
        .nest("/dlq", dlq_routes())
}

fn ingest_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(ingest::trigger_ingest))
        .routes(routes!(ingest::get_quota))
}

fn dlq_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(dlq::list_dlq_messages))
        .routes(routes!(dlq::get_dlq_stats))
        .routes(routes!(dlq::get_dlq_message, dlq::delete_dlq_message))
        .routes(routes!(dlq::retry_dlq_message))
}
