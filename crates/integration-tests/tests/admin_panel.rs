//! Integration tests for the admin panel.
//!
//! The fake backend only accepts `/admin/*` calls carrying
//! [`ADMIN_TOKEN`](verdant_integration_tests::ADMIN_TOKEN), so every mutation
//! seen here also proves the service token was sent. Pages need a session
//! logged in with the seeded admin account.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use verdant_integration_tests::{ADMIN_EMAIL, ADMIN_PASSWORD, FakeBackend, TestClient};

/// A client logged in to the admin panel.
async fn admin_client(backend: &FakeBackend) -> TestClient {
    let mut client = TestClient::new(backend.admin());
    let login = client.login_admin().await;
    assert_eq!(login.status, StatusCode::SEE_OTHER);
    client
}

// =============================================================================
// Login
// =============================================================================

#[tokio::test]
async fn test_anonymous_pages_redirect_to_login() {
    let backend = FakeBackend::start().await;
    let mut client = TestClient::new(backend.admin());

    let dashboard = client.get("/").await;
    assert_eq!(dashboard.status, StatusCode::SEE_OTHER);
    assert_eq!(dashboard.location(), Some("/auth/login?next=%2F"));

    let orders = client.get("/orders?status=cancelled").await;
    assert_eq!(
        orders.location(),
        Some("/auth/login?next=%2Forders%3Fstatus%3Dcancelled")
    );

    let login = client.get("/auth/login").await;
    assert_eq!(login.status, StatusCode::OK);
    assert!(login.body.contains("Admin login"));
    assert!(!login.body.contains("Dashboard"));
}

#[tokio::test]
async fn test_anonymous_mutations_are_refused() {
    let backend = FakeBackend::start().await;
    let mut client = TestClient::new(backend.admin());

    let delete = client.post_form("/products/2/delete", &[]).await;
    assert_eq!(delete.location(), Some("/auth/login"));
    assert!(backend.data.product(2).is_some());

    let update = client
        .post_form("/products/1/update", &[("price", "1")])
        .await;
    assert_eq!(update.status, StatusCode::SEE_OTHER);
    assert_eq!(backend.data.product(1).unwrap()["price"], 250);

    client
        .post_form("/orders/100/status", &[("status", "cancelled")])
        .await;
    let stored = backend.data.orders();
    let order = stored.iter().find(|o| o["id"] == 100).unwrap();
    assert_eq!(order["status"], "delivered");
}

#[tokio::test]
async fn test_customer_account_is_forbidden() {
    let backend = FakeBackend::start().await;
    let mut client = TestClient::new(backend.admin());

    let login = client.login().await;
    assert_eq!(login.status, StatusCode::FORBIDDEN);
    assert!(login.body.contains("This account does not have admin access"));

    // No session was granted.
    let dashboard = client.get("/").await;
    assert_eq!(dashboard.status, StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_wrong_password_is_rejected() {
    let backend = FakeBackend::start().await;
    let mut client = TestClient::new(backend.admin());

    let login = client
        .post_form(
            "/auth/login",
            &[("email", ADMIN_EMAIL), ("password", "not-the-password")],
        )
        .await;
    assert_eq!(login.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(login.body.contains("Invalid email or password"));
    assert!(login.body.contains(ADMIN_EMAIL));
}

#[tokio::test]
async fn test_login_returns_to_requested_page() {
    let backend = FakeBackend::start().await;
    let mut client = TestClient::new(backend.admin());

    let login = client
        .post_form(
            "/auth/login",
            &[
                ("email", ADMIN_EMAIL),
                ("password", ADMIN_PASSWORD),
                ("next", "/reports"),
            ],
        )
        .await;
    assert_eq!(login.location(), Some("/reports"));

    let page = client.get("/reports").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Welcome back, Lata Pillai"));
    assert!(page.body.contains("Log out"));
}

#[tokio::test]
async fn test_logout_ends_session() {
    let backend = FakeBackend::start().await;
    let mut client = admin_client(&backend).await;
    assert_eq!(client.get("/").await.status, StatusCode::OK);

    let logout = client.post_form("/auth/logout", &[]).await;
    assert_eq!(logout.location(), Some("/auth/login"));

    assert_eq!(client.get("/").await.status, StatusCode::SEE_OTHER);
}

// =============================================================================
// Dashboard and reports
// =============================================================================

#[tokio::test]
async fn test_dashboard_excludes_cancelled_revenue() {
    let backend = FakeBackend::start().await;
    let mut client = admin_client(&backend).await;

    let page = client.get("/").await;
    assert_eq!(page.status, StatusCode::OK);
    // Order 101 is cancelled; only order 100 counts
    assert!(page.body.contains("₹500.00"));
    assert!(page.body.contains("1 paid orders"));
    assert!(page.body.contains("#100"));
    assert!(page.body.contains("#101"));
    // Argan Hair Oil is out of stock, Neem Face Wash is low
    assert!(page.body.contains("1 low, 1 out of stock"));
}

#[tokio::test]
async fn test_reports_page() {
    let backend = FakeBackend::start().await;
    let mut client = admin_client(&backend).await;

    let page = client.get("/reports").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Cash on Delivery"));
    assert!(page.body.contains("Rose Water Toner"));
    assert!(page.body.contains("Delivered"));
    assert!(page.body.contains("Cancelled"));
}

#[tokio::test]
async fn test_health_checks_are_public() {
    let backend = FakeBackend::start().await;
    let mut client = TestClient::new(backend.admin());

    assert_eq!(client.get("/health").await.status, StatusCode::OK);
    assert_eq!(client.get("/health/ready").await.status, StatusCode::OK);
}

// =============================================================================
// Orders
// =============================================================================

#[tokio::test]
async fn test_order_filter() {
    let backend = FakeBackend::start().await;
    let mut client = admin_client(&backend).await;

    let all = client.get("/orders").await;
    assert!(all.body.contains("#100"));
    assert!(all.body.contains("#101"));

    let cancelled = client.get("/orders?status=cancelled").await;
    assert_eq!(cancelled.status, StatusCode::OK);
    assert!(cancelled.body.contains("#101"));
    assert!(!cancelled.body.contains("#100"));

    let invalid = client.get("/orders?status=teleported").await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_order_detail_and_status_change() {
    let backend = FakeBackend::start().await;
    let mut client = admin_client(&backend).await;

    let detail = client.get("/orders/100").await;
    assert_eq!(detail.status, StatusCode::OK);
    assert!(detail.body.contains("Asha Rao"));
    assert!(detail.body.contains("Rose Water Toner"));

    let response = client
        .post_form("/orders/100/status", &[("status", "shipped")])
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/orders/100"));

    let stored = backend.data.orders();
    let order = stored.iter().find(|o| o["id"] == 100).unwrap();
    assert_eq!(order["status"], "shipped");

    let detail = client.get("/orders/100").await;
    assert!(detail.body.contains("Order #100 marked as Shipped"));
}

#[tokio::test]
async fn test_unknown_order_is_not_found() {
    let backend = FakeBackend::start().await;
    let mut client = admin_client(&backend).await;

    assert_eq!(client.get("/orders/999").await.status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Products
// =============================================================================

#[tokio::test]
async fn test_product_update() {
    let backend = FakeBackend::start().await;
    let mut client = admin_client(&backend).await;

    let response = client
        .post_form("/products/1/update", &[("price", "199"), ("stock", "40")])
        .await;
    assert_eq!(response.location(), Some("/products"));

    let stored = backend.data.product(1).unwrap();
    assert_eq!(stored["stock"], 40);

    let page = client.get("/products").await;
    assert!(page.body.contains("Rose Water Toner updated"));
    assert!(page.body.contains("₹199.00"));
}

#[tokio::test]
async fn test_product_update_rejects_bad_input() {
    let backend = FakeBackend::start().await;
    let mut client = admin_client(&backend).await;

    client
        .post_form("/products/1/update", &[("price", "-5"), ("stock", "")])
        .await;
    assert_eq!(backend.data.product(1).unwrap()["price"], 250);

    client
        .post_form("/products/1/update", &[("price", ""), ("stock", "")])
        .await;
    let page = client.get("/products").await;
    assert!(page.body.contains("Nothing to update"));
}

#[tokio::test]
async fn test_product_delete() {
    let backend = FakeBackend::start().await;
    let mut client = admin_client(&backend).await;

    let response = client.post_form("/products/2/delete", &[]).await;
    assert_eq!(response.location(), Some("/products"));
    assert!(backend.data.product(2).is_none());

    let page = client.get("/products").await;
    assert!(page.body.contains("Product #2 deleted"));
    assert!(!page.body.contains("Neem Face Wash"));
}

#[tokio::test]
async fn test_admin_change_visible_to_storefront_after_refresh() {
    let backend = FakeBackend::start().await;
    let mut admin = admin_client(&backend).await;
    let mut shop = TestClient::new(backend.storefront());

    let before = shop.get("/products/3").await;
    assert!(before.body.contains("Out of stock"));

    admin
        .post_form("/products/3/update", &[("stock", "12")])
        .await;
    shop.login_admin().await;
    shop.post_form("/products/refresh", &[]).await;

    let added = shop.htmx_post("/cart/add", &[("product_id", "3")]).await;
    assert_eq!(added.toast().unwrap().0, "success");
}
