//! Integration tests for the shared catalog snapshot.
//!
//! Every visitor reads the same snapshot, so replacing it is reserved for
//! admins and throttled, and a failed load can be retried by anyone.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use verdant_integration_tests::{FakeBackend, TestClient};

// =============================================================================
// Refresh access
// =============================================================================

#[tokio::test]
async fn test_refresh_requires_login() {
    let backend = FakeBackend::start().await;
    let mut client = TestClient::new(backend.storefront());

    let response = client.post_form("/products/refresh", &[]).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(
        response.location(),
        Some("/auth/login?next=%2Fproducts%2Frefresh")
    );
}

#[tokio::test]
async fn test_refresh_forbidden_for_customers() {
    let backend = FakeBackend::start().await;
    let mut client = TestClient::new(backend.storefront());
    client.get("/products").await;
    client.login().await;

    backend.data.set_stock(3, 9);
    let response = client.post_form("/products/refresh", &[]).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    // The snapshot was not replaced.
    let page = client.get("/products/3").await;
    assert!(page.body.contains("Out of stock"));
}

#[tokio::test]
async fn test_admin_refresh_replaces_snapshot() {
    let backend = FakeBackend::start().await;
    let mut client = TestClient::new(backend.storefront());
    client.get("/products").await;
    client.login_admin().await;

    backend.data.set_stock(3, 9);
    let response = client.post_form("/products/refresh", &[]).await;
    assert_eq!(response.location(), Some("/products"));

    let page = client.get("/products").await;
    assert!(page.body.contains("Catalog refreshed: 3 products"));
    let added = client.htmx_post("/cart/add", &[("product_id", "3")]).await;
    assert_eq!(added.toast().unwrap().0, "success");
}

#[tokio::test]
async fn test_refresh_burst_is_throttled() {
    let backend = FakeBackend::start().await;
    let mut client = TestClient::new(backend.storefront());

    let mut statuses = Vec::new();
    for _ in 0..5 {
        statuses.push(client.post_form("/products/refresh", &[]).await.status);
    }

    assert_eq!(&statuses[..3], &[StatusCode::SEE_OTHER; 3]);
    assert_eq!(&statuses[3..], &[StatusCode::TOO_MANY_REQUESTS; 2]);
}

// =============================================================================
// Backend failures
// =============================================================================

#[tokio::test]
async fn test_failed_refresh_keeps_products_listed() {
    let backend = FakeBackend::start().await;
    let mut client = TestClient::new(backend.storefront());
    client.get("/products").await;
    client.login_admin().await;

    backend.data.set_products_down(true);
    client.post_form("/products/refresh", &[]).await;

    let page = client.get("/products").await;
    assert!(page.body.contains("Could not refresh products"));
    assert!(page.body.contains("Rose Water Toner"));
    assert!(!page.body.contains("could not be loaded"));
}

#[tokio::test]
async fn test_failed_load_can_be_retried_by_visitors() {
    let backend = FakeBackend::start().await;
    let mut client = TestClient::new(backend.storefront());

    backend.data.set_products_down(true);
    let page = client.get("/products").await;
    assert!(page.body.contains("Products could not be loaded"));
    assert!(page.body.contains("action=\"/products/retry\""));

    backend.data.set_products_down(false);
    let response = client.post_form("/products/retry", &[]).await;
    assert_eq!(response.location(), Some("/products"));

    let page = client.get("/products").await;
    assert!(!page.body.contains("could not be loaded"));
    assert!(page.body.contains("Rose Water Toner"));
}

#[tokio::test]
async fn test_retry_leaves_healthy_catalog_alone() {
    let backend = FakeBackend::start().await;
    let mut client = TestClient::new(backend.storefront());
    client.get("/products").await;

    backend.data.set_stock(3, 9);
    client.post_form("/products/retry", &[]).await;

    let page = client.get("/products/3").await;
    assert!(page.body.contains("Out of stock"));
}
