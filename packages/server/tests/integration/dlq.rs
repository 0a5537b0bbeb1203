use chrono::Utc;
use common::entity::dead_letter_message;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde_json::json;

use crate::common::{TestApp, routes};

async fn create_dlq_entry(app: &TestApp, offset: u32, error_code: &str, resolved: bool) -> i32 {
    let now = Utc::now();
    let job_id = format!("test-job-{offset}");
    let model = dead_letter_message::ActiveModel {
        message_id: Set(job_id.clone()),
        payload: Set(json!({
            "job_id": job_id,
            "offset": offset,
            "batch_size": 10,
            "attempt": 3,
        })),
        error_code: Set(error_code.to_string()),
        error_message: Set("Provider returned 500".to_string()),
        retry_count: Set(3),
        retry_history: Set(json!([
            {"attempt": 1, "error": "Error 1", "timestamp": now.to_rfc3339()},
            {"attempt": 2, "error": "Error 2", "timestamp": now.to_rfc3339()},
            {"attempt": 3, "error": "Error 3", "timestamp": now.to_rfc3339()},
        ])),
        first_failed_at: Set(now),
        created_at: Set(now),
        resolved: Set(resolved),
        resolved_at: Set(if resolved { Some(now) } else { None }),
        ..Default::default()
    };

    let result = model
        .insert(&app.db)
        .await
        .expect("Failed to create DLQ entry");
    result.id
}

mod dlq_listing {
    use super::*;

    #[tokio::test]
    async fn admin_can_list_dlq_messages() {
        let app = TestApp::spawn().await;
        let admin_token = app
            .create_user_with_role("admin1", "password123", "admin")
            .await;

        create_dlq_entry(&app, 0, "MAX_RETRIES_EXCEEDED", false).await;
        create_dlq_entry(&app, 10, "PERMANENT_FAILURE", false).await;
        create_dlq_entry(&app, 20, "MAX_RETRIES_EXCEEDED", true).await;

        let res = app.get_with_token(routes::DLQ, &admin_token).await;
        assert_eq!(res.status, 200, "{}", res.text);

        let data = res.body["data"].as_array().expect("data should be array");
        assert_eq!(data.len(), 3);
        assert_eq!(res.body["pagination"]["total"], 3);
    }

    #[tokio::test]
    async fn can_filter_by_resolved_and_error_code() {
        let app = TestApp::spawn().await;
        let admin_token = app
            .create_user_with_role("admin1", "password123", "admin")
            .await;

        create_dlq_entry(&app, 0, "MAX_RETRIES_EXCEEDED", false).await;
        create_dlq_entry(&app, 10, "PERMANENT_FAILURE", false).await;
        create_dlq_entry(&app, 20, "MAX_RETRIES_EXCEEDED", true).await;

        let res = app
            .get_with_token(&format!("{}?resolved=false", routes::DLQ), &admin_token)
            .await;
        assert_eq!(res.body["pagination"]["total"], 2);

        let res = app
            .get_with_token(
                &format!("{}?resolved=false&error_code=MAX_RETRIES_EXCEEDED", routes::DLQ),
                &admin_token,
            )
            .await;
        let data = res.body["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["payload"]["offset"], 0);
    }

    #[tokio::test]
    async fn stats_group_unresolved_by_error_code() {
        let app = TestApp::spawn().await;
        let admin_token = app
            .create_user_with_role("admin1", "password123", "admin")
            .await;

        create_dlq_entry(&app, 0, "MAX_RETRIES_EXCEEDED", false).await;
        create_dlq_entry(&app, 10, "MAX_RETRIES_EXCEEDED", false).await;
        create_dlq_entry(&app, 20, "PERMANENT_FAILURE", false).await;
        create_dlq_entry(&app, 30, "PERMANENT_FAILURE", true).await;

        let res = app.get_with_token(routes::DLQ_STATS, &admin_token).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["total_unresolved"], 3);
        assert_eq!(res.body["total_resolved"], 1);
        assert_eq!(
            res.body["unresolved_by_error_code"]["MAX_RETRIES_EXCEEDED"],
            2
        );
        assert_eq!(res.body["unresolved_by_error_code"]["PERMANENT_FAILURE"], 1);
    }

    #[tokio::test]
    async fn regular_user_cannot_access_dlq() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "password123").await;

        let res = app.get_with_token(routes::DLQ, &token).await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }
}

mod dlq_single {
    use super::*;

    #[tokio::test]
    async fn admin_can_get_message_details() {
        let app = TestApp::spawn().await;
        let admin_token = app
            .create_user_with_role("admin1", "password123", "admin")
            .await;
        let id = create_dlq_entry(&app, 40, "MAX_RETRIES_EXCEEDED", false).await;

        let res = app
            .get_with_token(&routes::dlq_message(id), &admin_token)
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["id"], id);
        assert_eq!(res.body["message_id"], "test-job-40");
        assert_eq!(res.body["retry_count"], 3);
        assert_eq!(res.body["retry_history"].as_array().unwrap().len(), 3);
        assert_eq!(res.body["resolved"], false);
    }

    #[tokio::test]
    async fn unknown_message_returns_404() {
        let app = TestApp::spawn().await;
        let admin_token = app
            .create_user_with_role("admin1", "password123", "admin")
            .await;

        let res = app
            .get_with_token(&routes::dlq_message(99999), &admin_token)
            .await;

        assert_eq!(res.status, 404);
    }
}

mod dlq_resolution {
    use super::*;

    #[tokio::test]
    async fn delete_marks_message_resolved_and_is_idempotent() {
        let app = TestApp::spawn().await;
        let admin_token = app
            .create_user_with_role("admin1", "password123", "admin")
            .await;
        let admin_id = app.user_id("admin1").await;
        let id = create_dlq_entry(&app, 50, "PERMANENT_FAILURE", false).await;

        let res = app
            .delete_with_token(&routes::dlq_message(id), &admin_token)
            .await;
        assert_eq!(res.status, 204, "{}", res.text);

        let stored = dead_letter_message::Entity::find_by_id(id)
            .one(&app.db)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.resolved);
        assert!(stored.resolved_at.is_some());
        assert_eq!(stored.resolved_by, Some(admin_id));

        let res = app
            .delete_with_token(&routes::dlq_message(id), &admin_token)
            .await;
        assert_eq!(res.status, 204);
    }

    #[tokio::test]
    async fn delete_unknown_message_returns_404() {
        let app = TestApp::spawn().await;
        let admin_token = app
            .create_user_with_role("admin1", "password123", "admin")
            .await;

        let res = app
            .delete_with_token(&routes::dlq_message(99999), &admin_token)
            .await;

        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn retry_of_resolved_message_is_a_conflict() {
        let app = TestApp::spawn().await;
        let admin_token = app
            .create_user_with_role("admin1", "password123", "admin")
            .await;
        let id = create_dlq_entry(&app, 60, "MAX_RETRIES_EXCEEDED", true).await;

        let res = app
            .post_with_token(&routes::dlq_retry(id), &json!({}), &admin_token)
            .await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn retry_without_message_queue_leaves_message_unresolved() {
        let app = TestApp::spawn().await;
        let admin_token = app
            .create_user_with_role("admin1", "password123", "admin")
            .await;
        let id = create_dlq_entry(&app, 70, "MAX_RETRIES_EXCEEDED", false).await;

        let res = app
            .post_with_token(&routes::dlq_retry(id), &json!({}), &admin_token)
            .await;
        assert_eq!(res.status, 503, "{}", res.text);

        let stored = dead_letter_message::Entity::find_by_id(id)
            .one(&app.db)
            .await
            .unwrap()
            .unwrap();
        assert!(!stored.resolved);
    }

    #[tokio::test]
    async fn retry_of_unreadable_payload_is_rejected() {
        let app = TestApp::spawn().await;
        let admin_token = app
            .create_user_with_role("admin1", "password123", "admin")
            .await;

        let now = Utc::now();
        let id = dead_letter_message::ActiveModel {
            message_id: Set("garbled".to_string()),
            payload: Set(json!({"raw": "not a job"})),
            error_code: Set("DESERIALIZATION_ERROR".to_string()),
            error_message: Set("missing field `offset`".to_string()),
            retry_count: Set(0),
            retry_history: Set(json!([])),
            first_failed_at: Set(now),
            created_at: Set(now),
            resolved: Set(false),
            ..Default::default()
        }
        .insert(&app.db)
        .await
        .unwrap()
        .id;

        let res = app
            .post_with_token(&routes::dlq_retry(id), &json!({}), &admin_token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}
