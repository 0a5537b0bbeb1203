use serde_json::json;

use crate::common::{TestApp, recipe_body, routes};

mod create {
    use super::*;

    #[tokio::test]
    async fn user_can_create_a_recipe_and_gets_a_slug() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "password123").await;

        let res = app
            .post_with_token(routes::RECIPES, &recipe_body("Garlic Pasta!"), &token)
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["slug"], "garlic-pasta");
        assert_eq!(res.body["author"], "alice");
        assert_eq!(res.body["ingredients"].as_array().unwrap().len(), 3);
        assert_eq!(res.body["categories"], json!(["main course"]));
        assert_eq!(res.body["diets"], json!(["vegetarian"]));
        assert!(res.body["average_rating"].is_null());
        assert_eq!(res.body["total_ratings"], 0);
        assert!(res.body["api_id"].is_null());
    }

    #[tokio::test]
    async fn colliding_titles_get_numbered_slugs() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "password123").await;

        let first = app.create_recipe(&token, "Tomato Soup").await;
        let second = app.create_recipe(&token, "Tomato Soup").await;
        let third = app.create_recipe(&token, "tomato   soup").await;

        assert_eq!(first, "tomato-soup");
        assert_eq!(second, "tomato-soup-2");
        assert_eq!(third, "tomato-soup-3");
    }

    #[tokio::test]
    async fn nutrition_facts_are_stored_with_the_recipe() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "password123").await;

        let mut body = recipe_body("Protein Bowl");
        body["nutritional_value"] = json!({"calories_kcal": 520.5, "protein": 38.0});

        let res = app.post_with_token(routes::RECIPES, &body, &token).await;
        assert_eq!(res.status, 201, "{}", res.text);

        let got = app.get_without_token(&routes::recipe("protein-bowl")).await;
        assert_eq!(got.status, 200);
        assert_eq!(got.body["nutritional_value"]["calories_kcal"], 520.5);
        assert_eq!(got.body["nutritional_value"]["protein"], 38.0);
        assert_eq!(got.body["nutritional_value"]["fat"], 0.0);
    }

    #[tokio::test]
    async fn anonymous_user_cannot_create_a_recipe() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(routes::RECIPES, &recipe_body("Pancakes"))
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_MISSING");
    }

    #[tokio::test]
    async fn blank_title_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "password123").await;

        let res = app
            .post_with_token(routes::RECIPES, &recipe_body("   "), &token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn zero_servings_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "password123").await;

        let mut body = recipe_body("Pancakes");
        body["servings"] = json!(0);

        let res = app.post_with_token(routes::RECIPES, &body, &token).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn unknown_category_label_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "password123").await;

        let mut body = recipe_body("Pancakes");
        body["categories"] = json!(["spaceship"]);

        let res = app.post_with_token(routes::RECIPES, &body, &token).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}

mod read {
    use super::*;

    #[tokio::test]
    async fn anyone_can_read_a_recipe_by_slug() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "password123").await;
        let slug = app.create_recipe(&token, "Lemon Tart").await;

        let res = app.get_without_token(&routes::recipe(&slug)).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["title"], "Lemon Tart");
        assert_eq!(
            res.body["instructions"],
            json!(["Boil the pasta", "Fry the garlic", "Toss together"])
        );
    }

    #[tokio::test]
    async fn unknown_slug_returns_404() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(&routes::recipe("no-such-dish")).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }
}

mod listing {
    use super::*;

    async fn seed(app: &TestApp, token: &str) {
        let mut soup = recipe_body("Vegan Lentil Soup");
        soup["categories"] = json!(["soup"]);
        soup["diets"] = json!(["vegan", "gluten_free"]);
        soup["ingredients"] = json!(["red lentils", "carrot", "cumin"]);
        soup["prep_time"] = json!(10);
        soup["cooking_time"] = json!(40);
        let res = app.post_with_token(routes::RECIPES, &soup, token).await;
        assert_eq!(res.status, 201, "{}", res.text);

        let mut cake = recipe_body("Chocolate Cake");
        cake["description"] = json!("Rich and fudgy");
        cake["categories"] = json!(["dessert"]);
        cake["diets"] = json!([]);
        cake["ingredients"] = json!(["dark chocolate", "butter", "eggs"]);
        cake["prep_time"] = json!(20);
        cake["cooking_time"] = json!(35);
        let res = app.post_with_token(routes::RECIPES, &cake, token).await;
        assert_eq!(res.status, 201, "{}", res.text);

        app.create_recipe(token, "Garlic Pasta").await;
    }

    #[tokio::test]
    async fn lists_newest_first_with_pagination() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "password123").await;
        seed(&app, &token).await;

        let res = app
            .get_without_token(&format!("{}?per_page=2", routes::RECIPES))
            .await;

        assert_eq!(res.status, 200);
        let data = res.body["data"].as_array().unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0]["slug"], "garlic-pasta");
        assert_eq!(res.body["pagination"]["total"], 3);
        assert_eq!(res.body["pagination"]["total_pages"], 2);
    }

    #[tokio::test]
    async fn filters_by_category_and_diet() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "password123").await;
        seed(&app, &token).await;

        let res = app
            .get_without_token(&format!("{}?category=soup", routes::RECIPES))
            .await;
        let data = res.body["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["slug"], "vegan-lentil-soup");

        let res = app
            .get_without_token(&format!("{}?diet=gluten-free", routes::RECIPES))
            .await;
        let data = res.body["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["slug"], "vegan-lentil-soup");

        let res = app
            .get_without_token(&format!("{}?category=main%20course", routes::RECIPES))
            .await;
        let data = res.body["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["slug"], "garlic-pasta");
    }

    #[tokio::test]
    async fn filters_by_text_fields_case_insensitively() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "password123").await;
        seed(&app, &token).await;

        let res = app
            .get_without_token(&format!("{}?ingredient=CHOCOLATE", routes::RECIPES))
            .await;
        assert_eq!(res.body["pagination"]["total"], 1);
        assert_eq!(res.body["data"][0]["slug"], "chocolate-cake");

        let res = app
            .get_without_token(&format!("{}?search=fudgy", routes::RECIPES))
            .await;
        assert_eq!(res.body["pagination"]["total"], 1);
        assert_eq!(res.body["data"][0]["slug"], "chocolate-cake");

        let res = app
            .get_without_token(&format!("{}?title=lentil", routes::RECIPES))
            .await;
        assert_eq!(res.body["pagination"]["total"], 1);
    }

    #[tokio::test]
    async fn filters_by_time_ranges() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "password123").await;
        seed(&app, &token).await;

        let res = app
            .get_without_token(&format!(
                "{}?min_prep_time=10&max_cooking_time=36",
                routes::RECIPES
            ))
            .await;

        assert_eq!(res.status, 200);
        let data = res.body["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["slug"], "chocolate-cake");
    }

    #[tokio::test]
    async fn inverted_range_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .get_without_token(&format!(
                "{}?min_prep_time=30&max_prep_time=10",
                routes::RECIPES
            ))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn unknown_diet_filter_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .get_without_token(&format!("{}?diet=paleo", routes::RECIPES))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn like_wildcards_in_filters_are_literal() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "password123").await;
        seed(&app, &token).await;

        let res = app
            .get_without_token(&format!("{}?title=%25", routes::RECIPES))
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["pagination"]["total"], 0);
    }

    #[tokio::test]
    async fn page_far_past_the_end_is_empty_not_an_error() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "password123").await;
        seed(&app, &token).await;

        let res = app
            .get_without_token(&format!("{}?page=18446744073709551615", routes::RECIPES))
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert!(res.body["data"].as_array().unwrap().is_empty());
        assert_eq!(res.body["pagination"]["total"], 3);
    }
}

mod update {
    use super::*;

    #[tokio::test]
    async fn author_can_update_fields_and_slug_is_stable() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "password123").await;
        let slug = app.create_recipe(&token, "Garlic Pasta").await;

        let res = app
            .patch_with_token(
                &routes::recipe(&slug),
                &json!({"title": "Spicy Garlic Pasta", "servings": 4, "image_url": "https://img.example.com/p.jpg"}),
                &token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["title"], "Spicy Garlic Pasta");
        assert_eq!(res.body["slug"], "garlic-pasta");
        assert_eq!(res.body["servings"], 4);
        assert_eq!(res.body["image_url"], "https://img.example.com/p.jpg");

        let res = app
            .patch_with_token(&routes::recipe(&slug), &json!({"image_url": null}), &token)
            .await;
        assert_eq!(res.status, 200);
        assert!(res.body["image_url"].is_null());
        assert_eq!(res.body["servings"], 4);
    }

    #[tokio::test]
    async fn other_user_cannot_update_a_recipe() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "password123").await;
        let bob = app.create_authenticated_user("bob", "password123").await;
        let slug = app.create_recipe(&alice, "Garlic Pasta").await;

        let res = app
            .patch_with_token(&routes::recipe(&slug), &json!({"title": "Mine now"}), &bob)
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }

    #[tokio::test]
    async fn admin_can_update_any_recipe() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "password123").await;
        let admin = app
            .create_user_with_role("admin1", "password123", "admin")
            .await;
        let slug = app.create_recipe(&alice, "Garlic Pasta").await;

        let res = app
            .patch_with_token(&routes::recipe(&slug), &json!({"prep_time": 7}), &admin)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["prep_time"], 7);
        assert_eq!(res.body["author"], "alice");
    }

    #[tokio::test]
    async fn empty_patch_returns_recipe_unchanged() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "password123").await;
        let slug = app.create_recipe(&token, "Garlic Pasta").await;

        let res = app
            .patch_with_token(&routes::recipe(&slug), &json!({}), &token)
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["title"], "Garlic Pasta");
    }
}

mod delete {
    use super::*;

    #[tokio::test]
    async fn author_can_delete_recipe_with_its_ratings_and_comments() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "password123").await;
        let bob = app.create_authenticated_user("bob", "password123").await;
        let slug = app.create_recipe(&alice, "Garlic Pasta").await;

        let rated = app
            .put_with_token(&routes::rating(&slug), &json!({"value": 4.0}), &bob)
            .await;
        assert_eq!(rated.status, 201, "{}", rated.text);
        app.create_comment(&slug, &bob, "Looks great", None).await;

        let res = app.delete_with_token(&routes::recipe(&slug), &alice).await;
        assert_eq!(res.status, 204);

        let res = app.get_without_token(&routes::recipe(&slug)).await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn other_user_cannot_delete_a_recipe() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "password123").await;
        let bob = app.create_authenticated_user("bob", "password123").await;
        let slug = app.create_recipe(&alice, "Garlic Pasta").await;

        let res = app.delete_with_token(&routes::recipe(&slug), &bob).await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }
}
