use serde_json::json;

use crate::common::{TEST_DAILY_LIMIT, TestApp, routes};

#[tokio::test]
async fn trigger_without_message_queue_returns_503() {
    let app = TestApp::spawn().await;
    let admin = app
        .create_user_with_role("admin1", "password123", "admin")
        .await;

    let res = app
        .post_with_token(routes::INGEST, &json!({"offset": 0, "batch_size": 10}), &admin)
        .await;

    assert_eq!(res.status, 503, "{}", res.text);
    assert_eq!(res.body["code"], "QUEUE_UNAVAILABLE");
}

#[tokio::test]
async fn trigger_validates_batch_size_before_touching_the_queue() {
    let app = TestApp::spawn().await;
    let admin = app
        .create_user_with_role("admin1", "password123", "admin")
        .await;

    let res = app
        .post_with_token(routes::INGEST, &json!({"batch_size": 0}), &admin)
        .await;

    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn regular_user_cannot_trigger_ingestion() {
    let app = TestApp::spawn().await;
    let token = app.create_authenticated_user("alice", "password123").await;

    let res = app.post_with_token(routes::INGEST, &json!({}), &token).await;

    assert_eq!(res.status, 403);
    assert_eq!(res.body["code"], "PERMISSION_DENIED");
}

#[tokio::test]
async fn quota_reports_todays_budget() {
    let app = TestApp::spawn().await;
    let admin = app
        .create_user_with_role("admin1", "password123", "admin")
        .await;

    let res = app.get_with_token(routes::QUOTA, &admin).await;

    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["calls"], 0);
    assert_eq!(res.body["limit"], TEST_DAILY_LIMIT);
    assert_eq!(res.body["remaining"], TEST_DAILY_LIMIT);
    assert_eq!(
        res.body["date"],
        chrono::Utc::now().date_naive().to_string()
    );
}

#[tokio::test]
async fn regular_user_cannot_read_quota() {
    let app = TestApp::spawn().await;
    let token = app.create_authenticated_user("alice", "password123").await;

    let res = app.get_with_token(routes::QUOTA, &token).await;

    assert_eq!(res.status, 403);
}
