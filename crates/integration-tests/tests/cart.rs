//! Cart add, view and remove through the HTTP routes.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::StatusCode;

use product_manager_core::ProductId;
use product_manager_integration_tests::TestApp;
use product_manager_storefront::db::CartStore;

async fn with_laptop() -> (TestApp, ProductId) {
    let mut app = TestApp::new();
    app.register("alice@example.com").await;
    let id = app.create_product("Laptop", "laptop", "999.99", &[]).await;
    // Drain the creation message.
    app.get("/").await;
    (app, id)
}

#[tokio::test]
async fn test_add_then_increment() {
    let (mut app, id) = with_laptop().await;
    let user = app.user_id("alice@example.com").await;

    let first = app.get(&format!("/cart/add/{id}?qty=3")).await;
    assert_eq!(first.status, StatusCode::SEE_OTHER);
    assert_eq!(first.location.as_deref(), Some("/"));
    assert!(app.get("/").await.body.contains("Added 3 x Laptop to cart!"));

    app.get(&format!("/cart/add/{id}?qty=2")).await;
    assert!(
        app.get("/")
            .await
            .body
            .contains("Added 2 more Laptop(s)! Total: 5")
    );

    let lines = app.store.list_cart(user).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].quantity.get(), 5);
}

#[tokio::test]
async fn test_unusable_quantity_defaults_to_one() {
    let (mut app, id) = with_laptop().await;
    let user = app.user_id("alice@example.com").await;

    app.get(&format!("/cart/add/{id}?qty=abc")).await;
    let page = app.get("/").await;
    assert!(page.body.contains("Invalid quantity! Defaulted to 1."));
    assert!(page.body.contains("Added 1 x Laptop to cart!"));

    app.get(&format!("/cart/add/{id}?qty=-5")).await;
    assert!(app.get("/").await.body.contains("Invalid quantity! Defaulted to 1."));

    let lines = app.store.list_cart(user).await.unwrap();
    assert_eq!(lines[0].quantity.get(), 2);
}

#[tokio::test]
async fn test_missing_quantity_adds_one_without_warning() {
    let (mut app, id) = with_laptop().await;

    app.get(&format!("/cart/add/{id}")).await;
    let page = app.get("/").await;
    assert!(page.body.contains("Added 1 x Laptop to cart!"));
    assert!(!page.body.contains("Invalid quantity!"));
}

#[tokio::test]
async fn test_add_missing_product_is_not_found() {
    let (mut app, _) = with_laptop().await;
    let response = app.get("/cart/add/999?qty=1").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(app.store.cart_item_count().await, 0);
}

#[tokio::test]
async fn test_cart_total() {
    let mut app = TestApp::new();
    app.register("alice@example.com").await;
    let a = app.create_product("Pen", "pen", "10.00", &[]).await;
    let b = app.create_product("Notebook", "notebook", "15.00", &[]).await;

    app.get(&format!("/cart/add/{a}?qty=2")).await;
    app.get(&format!("/cart/add/{b}?qty=1")).await;

    let cart = app.get("/cart").await;
    assert_eq!(cart.status, StatusCode::OK);
    assert!(cart.body.contains("$20.00"));
    assert!(cart.body.contains("$35.00"));
}

#[tokio::test]
async fn test_empty_cart() {
    let mut app = TestApp::new();
    app.register("alice@example.com").await;

    let cart = app.get("/cart").await;
    assert!(cart.body.contains("Your cart is empty."));
}

#[tokio::test]
async fn test_cart_total_follows_current_price() {
    let (mut app, id) = with_laptop().await;
    app.get(&format!("/cart/add/{id}?qty=2")).await;
    assert!(app.get("/cart").await.body.contains("$1999.98"));

    let parts = product_manager_integration_tests::product_parts("Laptop", "laptop", "500.00", &[]);
    app.post_multipart(&format!("/products/{id}/edit"), &parts).await;

    assert!(app.get("/cart").await.body.contains("$1000.00"));
}

#[tokio::test]
async fn test_remove_own_line() {
    let (mut app, id) = with_laptop().await;
    let user = app.user_id("alice@example.com").await;
    app.get(&format!("/cart/add/{id}")).await;
    let item = app.store.list_cart(user).await.unwrap()[0].item_id;

    let response = app.post(&format!("/cart/remove/{item}")).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location.as_deref(), Some("/cart"));

    let cart = app.get("/cart").await;
    assert!(cart.body.contains("Item removed from cart."));
    assert!(cart.body.contains("Your cart is empty."));
}

#[tokio::test]
async fn test_remove_other_users_line_is_not_found() {
    let (mut alice, id) = with_laptop().await;
    let alice_id = alice.user_id("alice@example.com").await;
    alice.get(&format!("/cart/add/{id}?qty=4")).await;
    let item = alice.store.list_cart(alice_id).await.unwrap()[0].item_id;

    let mut bob = alice.other_client();
    bob.register("bob@example.com").await;
    let response = bob.post(&format!("/cart/remove/{item}")).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let lines = alice.store.list_cart(alice_id).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].quantity.get(), 4);

    let bob_id = bob.user_id("bob@example.com").await;
    assert!(bob.store.list_cart(bob_id).await.unwrap().is_empty());
}
