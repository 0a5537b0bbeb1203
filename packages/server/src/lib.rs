pub mod config;
pub mod consumers;
pub mod database;
pub mod dlq;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod seed;
pub mod state;
pub mod utils;

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_axum::router::OpenApiRouter;
use utoipa_scalar::{Scalar, Servable as ScalarServable};
use utoipa_swagger_ui::SwaggerUi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Recipes API",
        version = "1.0.0",
        description = "Recipe sharing with ratings, threaded comments and provider ingestion"
    ),
    tags(
        (name = "Auth", description = "Registration, login and token introspection"),
        (name = "Recipes", description = "Recipe CRUD and search"),
        (name = "Ratings", description = "One rating per user and recipe"),
        (name = "Comments", description = "Threaded recipe discussions"),
        (name = "Admin", description = "User role management"),
        (name = "Ingestion", description = "Provider ingestion runs and the daily call budget"),
        (name = "Dead Letter Queue", description = "Ingest jobs that failed permanently"),
    ),
    modifiers(&SecurityAddon),
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_default();
        components.add_security_scheme(
            "jwt",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .nest("/api", routes::api_routes())
        .split_for_parts();

    router
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api.clone()))
        .merge(Scalar::with_url("/scalar", api))
}
