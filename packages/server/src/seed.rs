use common::entity::{comment, dead_letter_message, rating, role, role_permission};
use sea_orm::sea_query::{Index, OnConflict, PostgresQueryBuilder};
use sea_orm::*;
use tracing::info;

/// Default roles seeded on startup.
const DEFAULT_ROLES: &[&str] = &[role::ADMIN_ROLE, role::DEFAULT_ROLE];

/// Default role-permission mappings seeded on startup.
const DEFAULT_MAPPINGS: &[(&str, &str)] = &[
    // Admin: all permissions
    ("admin", "recipe:create"),
    ("admin", "recipe:manage_all"),
    ("admin", "comment:moderate"),
    ("admin", "user:manage"),
    ("admin", "ingest:run"),
    ("admin", "dlq:manage"),
    // Regular user
    ("user", "recipe:create"),
];

/// Seed the `role` and `role_permission` tables with defaults.
pub async fn seed_role_permissions(db: &DatabaseConnection) -> Result<(), DbErr> {
    let mut roles_inserted = 0u32;
    for &name in DEFAULT_ROLES {
        let model = role::ActiveModel {
            name: Set(name.to_string()),
        };

        let result = role::Entity::insert(model)
            .on_conflict(OnConflict::column(role::Column::Name).do_nothing().to_owned())
            .exec_without_returning(db)
            .await;

        match result {
            Ok(_) => roles_inserted += 1,
            Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    if roles_inserted > 0 {
        info!("Seeded {} new roles", roles_inserted);
    }

    let mut perms_inserted = 0u32;
    for &(role, permission) in DEFAULT_MAPPINGS {
        let model = role_permission::ActiveModel {
            role: Set(role.to_string()),
            permission: Set(permission.to_string()),
        };

        let result = role_permission::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    role_permission::Column::Role,
                    role_permission::Column::Permission,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(db)
            .await;

        match result {
            Ok(_) => perms_inserted += 1,
            Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    if perms_inserted > 0 {
        info!("Seeded {} new role-permission mappings", perms_inserted);
    }

    Ok(())
}

/// Ensure required database indexes exist.
///
/// Schema sync only knows single-column indexes, so composite ones are
/// created here on startup. Failures are logged and do not abort startup.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    // One rating per user and recipe.
    let rating_unique = Index::create()
        .if_not_exists()
        .unique()
        .name("idx_rating_user_recipe")
        .table(rating::Entity)
        .col(rating::Column::UserId)
        .col(rating::Column::RecipeId)
        .to_string(PostgresQueryBuilder);

    // Comment threads are loaded per recipe in creation order.
    let comment_thread = Index::create()
        .if_not_exists()
        .name("idx_comment_recipe_created")
        .table(comment::Entity)
        .col(comment::Column::RecipeId)
        .col(comment::Column::CreatedAt)
        .to_string(PostgresQueryBuilder);

    // DLQ listing: unresolved first, newest first.
    let dlq_listing = Index::create()
        .if_not_exists()
        .name("idx_dlq_resolved_created")
        .table(dead_letter_message::Entity)
        .col(dead_letter_message::Column::Resolved)
        .col(dead_letter_message::Column::CreatedAt)
        .to_string(PostgresQueryBuilder);

    for (name, stmt) in [
        ("idx_rating_user_recipe", rating_unique),
        ("idx_comment_recipe_created", comment_thread),
        ("idx_dlq_resolved_created", dlq_listing),
    ] {
        match db.execute_unprepared(&stmt).await {
            Ok(_) => info!("Ensured index {} exists", name),
            Err(e) => tracing::warn!("Failed to create index {}: {}", name, e),
        }
    }

    Ok(())
}
