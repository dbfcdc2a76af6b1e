//! Login, registration and access-control tests.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;

use product_manager_integration_tests::{TEST_PASSWORD, TestApp};

#[tokio::test]
async fn test_health_endpoints() {
    let mut app = TestApp::new();

    let live = app.get("/health").await;
    assert_eq!(live.status, StatusCode::OK);
    assert_eq!(live.body, "ok");

    let ready = app.get("/health/ready").await;
    assert_eq!(ready.status, StatusCode::OK);
}

#[tokio::test]
async fn test_protected_pages_redirect_to_login() {
    let mut app = TestApp::new();

    let list = app.get("/").await;
    assert_eq!(list.status, StatusCode::SEE_OTHER);
    assert_eq!(list.location.as_deref(), Some("/auth/login"));

    let cart = app.get("/cart").await;
    assert_eq!(cart.location.as_deref(), Some("/auth/login?next=%2Fcart"));

    let add = app.get("/cart/add/1?qty=2").await;
    assert_eq!(
        add.location.as_deref(),
        Some("/auth/login?next=%2Fcart%2Fadd%2F1%3Fqty%3D2")
    );
}

#[tokio::test]
async fn test_nested_pages_keep_full_path_in_next() {
    let mut app = TestApp::new();

    let detail = app.get("/products/5").await;
    assert_eq!(
        detail.location.as_deref(),
        Some("/auth/login?next=%2Fproducts%2F5")
    );

    let edit = app.get("/products/5/edit").await;
    assert_eq!(
        edit.location.as_deref(),
        Some("/auth/login?next=%2Fproducts%2F5%2Fedit")
    );
}

#[tokio::test]
async fn test_login_returns_to_product_page() {
    let mut app = TestApp::new();
    app.register("fay@example.com").await;
    let id = app.create_product("Laptop", "laptop", "999.99", &[]).await;
    app.post("/auth/logout").await;

    let path = format!("/products/{id}");
    let bounced = app.get(&path).await;
    let next = format!("/auth/login?next=%2Fproducts%2F{id}");
    assert_eq!(bounced.location.as_deref(), Some(next.as_str()));

    let login = app
        .post_form(
            "/auth/login",
            &[
                ("email", "fay@example.com"),
                ("password", TEST_PASSWORD),
                ("next", path.as_str()),
            ],
        )
        .await;
    assert_eq!(login.location.as_deref(), Some(path.as_str()));

    let detail = app.get(&path).await;
    assert_eq!(detail.status, StatusCode::OK);
    assert!(detail.body.contains("Laptop"));
}

#[tokio::test]
async fn test_register_logs_in() {
    let mut app = TestApp::new();
    let response = app.register("alice@example.com").await;
    assert_eq!(response.location.as_deref(), Some("/"));

    let list = app.get("/").await;
    assert_eq!(list.status, StatusCode::OK);
    assert!(list.body.contains("alice@example.com"));
    assert!(list.body.contains("No products yet."));
}

#[tokio::test]
async fn test_register_rejects_mismatched_passwords() {
    let mut app = TestApp::new();
    let response = app
        .post_form(
            "/auth/register",
            &[
                ("email", "bob@example.com"),
                ("password", TEST_PASSWORD),
                ("password_confirm", "something else"),
            ],
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body.contains("Passwords do not match."));
    assert!(response.body.contains("bob@example.com"));
}

#[tokio::test]
async fn test_register_rejects_duplicate_email() {
    let mut app = TestApp::new();
    app.register("carol@example.com").await;

    let mut other = app.other_client();
    let response = other
        .post_form(
            "/auth/register",
            &[
                ("email", "carol@example.com"),
                ("password", TEST_PASSWORD),
                ("password_confirm", TEST_PASSWORD),
            ],
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body.contains("An account with this email already exists."));
}

#[tokio::test]
async fn test_login_logout_round() {
    let mut app = TestApp::new();
    app.register("dave@example.com").await;

    let logout = app.post("/auth/logout").await;
    assert_eq!(logout.location.as_deref(), Some("/auth/login"));
    assert_eq!(app.get("/").await.status, StatusCode::SEE_OTHER);

    let wrong = app
        .post_form(
            "/auth/login",
            &[("email", "dave@example.com"), ("password", "wrong password")],
        )
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert!(wrong.body.contains("Invalid email or password."));

    let login = app
        .post_form(
            "/auth/login",
            &[
                ("email", "dave@example.com"),
                ("password", TEST_PASSWORD),
                ("next", "/cart"),
            ],
        )
        .await;
    assert_eq!(login.status, StatusCode::SEE_OTHER);
    assert_eq!(login.location.as_deref(), Some("/cart"));
    assert_eq!(app.get("/cart").await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_login_ignores_offsite_next() {
    let mut app = TestApp::new();
    app.register("erin@example.com").await;
    app.post("/auth/logout").await;

    let login = app
        .post_form(
            "/auth/login",
            &[
                ("email", "erin@example.com"),
                ("password", TEST_PASSWORD),
                ("next", "//evil.example.com"),
            ],
        )
        .await;
    assert_eq!(login.location.as_deref(), Some("/"));
}

#[tokio::test]
async fn test_responses_carry_request_id_and_security_headers() {
    let mut app = TestApp::new();
    let response = app.get("/auth/login").await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.headers.contains_key("x-request-id"));
    assert_eq!(response.headers.get("x-frame-options").unwrap(), "DENY");
    assert!(response.headers.contains_key("content-security-policy"));
}
