use common::entity::{comment, rating, recipe};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::json;

use crate::common::{TestApp, routes};

mod user_listing {
    use super::*;

    #[tokio::test]
    async fn admin_can_list_and_search_users() {
        let app = TestApp::spawn().await;
        let admin = app
            .create_user_with_role("admin1", "password123", "admin")
            .await;
        app.create_authenticated_user("alice", "password123").await;
        app.create_authenticated_user("bob", "password123").await;

        let res = app.get_with_token(routes::USERS, &admin).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["pagination"]["total"], 3);

        let res = app
            .get_with_token(&format!("{}?search=ALI", routes::USERS), &admin)
            .await;
        let data = res.body["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["username"], "alice");
        assert_eq!(data[0]["email"], "alice@example.com");

        let res = app
            .get_with_token(&format!("{}?role=admin", routes::USERS), &admin)
            .await;
        let data = res.body["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["username"], "admin1");
    }

    #[tokio::test]
    async fn regular_user_cannot_list_users() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "password123").await;

        let res = app.get_with_token(routes::USERS, &token).await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }
}

mod roles {
    use super::*;

    #[tokio::test]
    async fn admin_can_promote_and_demote_a_user() {
        let app = TestApp::spawn().await;
        let admin = app
            .create_user_with_role("admin1", "password123", "admin")
            .await;
        app.create_authenticated_user("alice", "password123").await;
        let alice_id = app.user_id("alice").await;

        let res = app
            .post_with_token(&routes::promote(alice_id), &json!({}), &admin)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["user"]["role"], "admin");
        assert_eq!(res.body["message"], "alice, alice@example.com is now an admin");

        let login = app
            .post_without_token(
                routes::LOGIN,
                &json!({"email": "alice@example.com", "password": "password123"}),
            )
            .await;
        let permissions = login.body["permissions"].as_array().unwrap();
        assert!(permissions.contains(&json!("user:manage")));

        let res = app
            .post_with_token(&routes::demote(alice_id), &json!({}), &admin)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["user"]["role"], "user");
        assert_eq!(
            res.body["message"],
            "alice, alice@example.com is no longer an admin"
        );
    }

    #[tokio::test]
    async fn admin_cannot_demote_themselves() {
        let app = TestApp::spawn().await;
        let admin = app
            .create_user_with_role("admin1", "password123", "admin")
            .await;
        let admin_id = app.user_id("admin1").await;

        let res = app
            .post_with_token(&routes::demote(admin_id), &json!({}), &admin)
            .await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn promoting_an_unknown_user_returns_404() {
        let app = TestApp::spawn().await;
        let admin = app
            .create_user_with_role("admin1", "password123", "admin")
            .await;

        let res = app
            .post_with_token(&routes::promote(99999), &json!({}), &admin)
            .await;

        assert_eq!(res.status, 404);
    }
}

mod deletion {
    use super::*;

    #[tokio::test]
    async fn deleting_a_user_removes_their_content() {
        let app = TestApp::spawn().await;
        let admin = app
            .create_user_with_role("admin1", "password123", "admin")
            .await;
        let alice = app.create_authenticated_user("alice", "password123").await;
        let bob = app.create_authenticated_user("bob", "password123").await;

        let alice_recipe = app.create_recipe(&alice, "Garlic Pasta").await;
        let bob_recipe = app.create_recipe(&bob, "Tomato Soup").await;

        // Bob's rating and comment on Alice's recipe disappear with the recipe.
        let res = app
            .put_with_token(&routes::rating(&alice_recipe), &json!({"value": 3.0}), &bob)
            .await;
        assert_eq!(res.status, 201);
        app.create_comment(&alice_recipe, &bob, "Nice", None).await;

        // Alice's activity on Bob's recipe, including replies to her comment.
        let res = app
            .put_with_token(&routes::rating(&bob_recipe), &json!({"value": 5.0}), &alice)
            .await;
        assert_eq!(res.status, 201);
        let hers = app.create_comment(&bob_recipe, &alice, "Yum", None).await;
        app.create_comment(&bob_recipe, &bob, "Thanks!", Some(hers)).await;
        app.create_comment(&bob_recipe, &bob, "Recipe notes", None).await;

        let alice_id = app.user_id("alice").await;
        let res = app.delete_with_token(&routes::user(alice_id), &admin).await;
        assert_eq!(res.status, 204, "{}", res.text);

        let res = app.get_without_token(&routes::recipe(&alice_recipe)).await;
        assert_eq!(res.status, 404);

        let res = app.get_without_token(&routes::recipe(&bob_recipe)).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["total_ratings"], 0);

        let res = app.get_without_token(&routes::comments(&bob_recipe)).await;
        assert_eq!(res.body["total"], 1);
        assert_eq!(res.body["data"][0]["content"], "Recipe notes");

        let remaining_recipes = recipe::Entity::find()
            .filter(recipe::Column::AuthorId.eq(alice_id))
            .count(&app.db)
            .await
            .unwrap();
        assert_eq!(remaining_recipes, 0);
        assert_eq!(rating::Entity::find().count(&app.db).await.unwrap(), 0);
        assert_eq!(comment::Entity::find().count(&app.db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn admin_cannot_delete_themselves() {
        let app = TestApp::spawn().await;
        let admin = app
            .create_user_with_role("admin1", "password123", "admin")
            .await;
        let admin_id = app.user_id("admin1").await;

        let res = app.delete_with_token(&routes::user(admin_id), &admin).await;

        assert_eq!(res.status, 409);
    }

    #[tokio::test]
    async fn regular_user_cannot_delete_users() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "password123").await;
        app.create_authenticated_user("bob", "password123").await;
        let bob_id = app.user_id("bob").await;

        let res = app.delete_with_token(&routes::user(bob_id), &alice).await;

        assert_eq!(res.status, 403);
    }
}
