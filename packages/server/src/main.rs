use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::http::{HeaderValue, Method, header};
use common::quota::{CallCounter, DailyQuota, MemoryCallCounter, RedisCallCounter};
use mq::{MqConfig, init_mq};
use server::config::{AppConfig, CorsConfig};
use server::state::AppState;
use server::{build_router, consumers, database, seed};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let config = AppConfig::load().context("Failed to load config")?;

    let db = database::init_db(&config.database.url)
        .await
        .context("Failed to initialize database")?;
    seed::seed_role_permissions(&db)
        .await
        .context("Failed to seed roles")?;
    seed::ensure_indexes(&db).await?;

    let mq = if config.mq.enabled {
        let mq = Arc::new(
            init_mq(MqConfig {
                url: config.mq.url.clone(),
                pool_size: config.mq.pool_size,
            })
            .await
            .context("Failed to initialize MQ")?,
        );
        tokio::spawn(consumers::consume_ingest_dlq(
            db.clone(),
            Arc::clone(&mq),
            config.mq.dlq_queue_name.clone(),
        ));
        info!(queue_name = %config.mq.queue_name, "MQ connected");
        Some(mq)
    } else {
        warn!("MQ disabled; ingestion endpoints will answer 503");
        None
    };

    let counter: Arc<dyn CallCounter> = match RedisCallCounter::connect(&config.redis.url).await {
        Ok(counter) => Arc::new(counter),
        Err(e) => {
            warn!(error = %e, "Quota store unreachable; quota endpoint reports this process only");
            Arc::new(MemoryCallCounter::new())
        }
    };
    let quota = DailyQuota::new(counter, config.ingest.daily_limit);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server.host / server.port")?;
    let cors = cors_layer(&config.server.cors);

    let state = AppState {
        db,
        config,
        mq,
        quota,
    };
    let app = build_router(state).layer(cors);

    info!("Server running at http://{}", addr);
    info!("API docs at http://{}/swagger-ui", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn cors_layer(cors: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = cors
        .allow_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(cors.max_age))
}
