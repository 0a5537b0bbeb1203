use serde_json::json;

use crate::common::{TestApp, routes};

mod threads {
    use super::*;

    #[tokio::test]
    async fn replies_are_nested_under_their_parent() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "password123").await;
        let bob = app.create_authenticated_user("bob", "password123").await;
        let slug = app.create_recipe(&alice, "Garlic Pasta").await;

        let root = app.create_comment(&slug, &bob, "More garlic?", None).await;
        let reply = app
            .create_comment(&slug, &alice, "Always more garlic", Some(root))
            .await;
        app.create_comment(&slug, &bob, "Agreed", Some(reply)).await;
        app.create_comment(&slug, &alice, "Second thread", None).await;

        let res = app.get_without_token(&routes::comments(&slug)).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["total"], 4);
        let data = res.body["data"].as_array().unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0]["content"], "More garlic?");
        assert_eq!(data[0]["author"], "bob");
        assert_eq!(data[0]["depth"], 0);
        assert_eq!(data[0]["replies"][0]["content"], "Always more garlic");
        assert_eq!(data[0]["replies"][0]["depth"], 1);
        assert_eq!(data[0]["replies"][0]["replies"][0]["content"], "Agreed");
        assert_eq!(data[0]["replies"][0]["replies"][0]["depth"], 2);
        assert_eq!(data[1]["content"], "Second thread");
    }

    #[tokio::test]
    async fn created_reply_reports_its_depth() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "password123").await;
        let slug = app.create_recipe(&alice, "Garlic Pasta").await;
        let root = app.create_comment(&slug, &alice, "Root", None).await;

        let res = app
            .post_with_token(
                &routes::comments(&slug),
                &json!({"content": "Child", "parent_id": root}),
                &alice,
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["depth"], 1);
        assert_eq!(res.body["parent_id"], root);
        assert_eq!(res.body["replies"], json!([]));
    }

    #[tokio::test]
    async fn parent_from_another_recipe_is_rejected() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "password123").await;
        let pasta = app.create_recipe(&alice, "Garlic Pasta").await;
        let soup = app.create_recipe(&alice, "Tomato Soup").await;
        let on_pasta = app.create_comment(&pasta, &alice, "Pasta note", None).await;

        let res = app
            .post_with_token(
                &routes::comments(&soup),
                &json!({"content": "Cross-post", "parent_id": on_pasta}),
                &alice,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn missing_parent_returns_404() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "password123").await;
        let slug = app.create_recipe(&alice, "Garlic Pasta").await;

        let res = app
            .post_with_token(
                &routes::comments(&slug),
                &json!({"content": "Hello", "parent_id": 99999}),
                &alice,
            )
            .await;

        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn blank_comment_is_rejected() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "password123").await;
        let slug = app.create_recipe(&alice, "Garlic Pasta").await;

        let res = app
            .post_with_token(&routes::comments(&slug), &json!({"content": "   "}), &alice)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}

mod delete {
    use super::*;

    #[tokio::test]
    async fn deleting_a_comment_removes_its_replies() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "password123").await;
        let bob = app.create_authenticated_user("bob", "password123").await;
        let slug = app.create_recipe(&alice, "Garlic Pasta").await;

        let root = app.create_comment(&slug, &bob, "Root", None).await;
        let child = app.create_comment(&slug, &alice, "Child", Some(root)).await;
        app.create_comment(&slug, &bob, "Grandchild", Some(child)).await;
        app.create_comment(&slug, &alice, "Unrelated", None).await;

        let res = app
            .delete_with_token(&routes::comment(&slug, root), &bob)
            .await;
        assert_eq!(res.status, 204, "{}", res.text);

        let res = app.get_without_token(&routes::comments(&slug)).await;
        assert_eq!(res.body["total"], 1);
        assert_eq!(res.body["data"][0]["content"], "Unrelated");
    }

    #[tokio::test]
    async fn other_user_cannot_delete_a_comment() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "password123").await;
        let bob = app.create_authenticated_user("bob", "password123").await;
        let slug = app.create_recipe(&alice, "Garlic Pasta").await;
        let id = app.create_comment(&slug, &bob, "Mine", None).await;

        let res = app.delete_with_token(&routes::comment(&slug, id), &alice).await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }

    #[tokio::test]
    async fn moderator_can_delete_any_comment() {
        let app = TestApp::spawn().await;
        let bob = app.create_authenticated_user("bob", "password123").await;
        let admin = app
            .create_user_with_role("admin1", "password123", "admin")
            .await;
        let slug = app.create_recipe(&bob, "Garlic Pasta").await;
        let id = app.create_comment(&slug, &bob, "Spam", None).await;

        let res = app.delete_with_token(&routes::comment(&slug, id), &admin).await;

        assert_eq!(res.status, 204);
    }

    #[tokio::test]
    async fn comment_must_belong_to_the_recipe_in_the_path() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "password123").await;
        let pasta = app.create_recipe(&alice, "Garlic Pasta").await;
        let soup = app.create_recipe(&alice, "Tomato Soup").await;
        let id = app.create_comment(&pasta, &alice, "Pasta note", None).await;

        let res = app.delete_with_token(&routes::comment(&soup, id), &alice).await;

        assert_eq!(res.status, 404);
    }
}
