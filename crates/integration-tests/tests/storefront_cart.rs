//! Integration tests for the session cart.
//!
//! Each test starts its own fake backend and storefront router; the cart
//! lives in the session cookie the test client carries.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::json;
use verdant_integration_tests::{FakeBackend, TestClient};

// =============================================================================
// Adding items
// =============================================================================

#[tokio::test]
async fn test_htmx_add_returns_badge_and_toast() {
    let backend = FakeBackend::start().await;
    let mut client = TestClient::new(backend.storefront());

    let response = client
        .htmx_post("/cart/add", &[("product_id", "1"), ("variant", "100ml")])
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("id=\"cart-count\""));
    assert!(response.body.contains(">1<"));
    let (kind, message) = response.toast().unwrap();
    assert_eq!(kind, "success");
    assert_eq!(message, "Rose Water Toner (100ml) added to cart");
}

#[tokio::test]
async fn test_cart_persists_across_requests() {
    let backend = FakeBackend::start().await;
    let mut client = TestClient::new(backend.storefront());

    client
        .htmx_post("/cart/add", &[("product_id", "1"), ("quantity", "2")])
        .await;
    client.htmx_post("/cart/add", &[("product_id", "2")]).await;

    let count = client.get("/cart/count").await;
    assert!(count.body.contains(">3<"));

    let page = client.get("/cart").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Rose Water Toner"));
    assert!(page.body.contains("Neem Face Wash"));
}

#[tokio::test]
async fn test_out_of_stock_product_is_refused() {
    let backend = FakeBackend::start().await;
    let mut client = TestClient::new(backend.storefront());

    let response = client.htmx_post("/cart/add", &[("product_id", "3")]).await;

    let (kind, message) = response.toast().unwrap();
    assert_eq!(kind, "error");
    assert_eq!(message, "Argan Hair Oil is out of stock");
    assert!(!response.body.contains("badge"));
}

#[tokio::test]
async fn test_quantity_capped_by_stock() {
    let backend = FakeBackend::start().await;
    let mut client = TestClient::new(backend.storefront());

    let response = client
        .htmx_post("/cart/add", &[("product_id", "2"), ("quantity", "5")])
        .await;

    let (kind, message) = response.toast().unwrap();
    assert_eq!(kind, "error");
    assert!(message.contains("Only 2 units of Neem Face Wash available"));
}

#[tokio::test]
async fn test_unknown_variant_is_refused() {
    let backend = FakeBackend::start().await;
    let mut client = TestClient::new(backend.storefront());

    let response = client
        .htmx_post("/cart/add", &[("product_id", "1"), ("variant", "5l")])
        .await;

    let (kind, _) = response.toast().unwrap();
    assert_eq!(kind, "error");
    assert!(!client.get("/cart/count").await.body.contains("badge"));
}

#[tokio::test]
async fn test_product_newer_than_catalog_stays_in_cart() {
    let backend = FakeBackend::start().await;
    let router = backend.storefront();
    let mut client = TestClient::new(router.clone());
    client.get("/products").await;

    backend.data.insert_product(json!({
        "id": 4,
        "name": "Aloe Day Cream",
        "price": 320,
        "stock": 6,
        "category": "Skincare"
    }));
    let response = client.htmx_post("/cart/add", &[("product_id", "4")]).await;
    assert_eq!(
        response.toast().unwrap(),
        ("success".to_string(), "Aloe Day Cream added to cart".to_string())
    );

    // The line survives rehydration on the following requests.
    assert!(client.get("/cart/count").await.body.contains(">1<"));
    let page = client.get("/cart").await;
    assert!(page.body.contains("Aloe Day Cream"));
    assert!(!page.body.contains("Your cart is empty."));

    // The shared snapshot now lists it for other visitors too.
    let listing = TestClient::new(router).get("/products").await;
    assert!(listing.body.contains("Aloe Day Cream"));
}

#[tokio::test]
async fn test_non_htmx_add_redirects_with_flash() {
    let backend = FakeBackend::start().await;
    let mut client = TestClient::new(backend.storefront());

    let response = client.post_form("/cart/add", &[("product_id", "1")]).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/cart"));

    let page = client.get("/cart").await;
    assert!(page.body.contains("Rose Water Toner added to cart"));

    // The flash is shown once.
    let again = client.get("/cart").await;
    assert!(!again.body.contains("added to cart"));
}

// =============================================================================
// Changing and removing lines
// =============================================================================

#[tokio::test]
async fn test_remove_and_clear() {
    let backend = FakeBackend::start().await;
    let mut client = TestClient::new(backend.storefront());

    client.htmx_post("/cart/add", &[("product_id", "1")]).await;
    client.htmx_post("/cart/add", &[("product_id", "2")]).await;

    let removed = client
        .htmx_post("/cart/remove", &[("cart_item_id", "2")])
        .await;
    assert!(removed.body.contains("Rose Water Toner"));
    assert!(!removed.body.contains("Neem Face Wash"));

    let cleared = client.htmx_post("/cart/clear", &[]).await;
    assert!(cleared.body.contains("Your cart is empty."));
    assert_eq!(cleared.toast().unwrap().1, "Cart cleared");
}

#[tokio::test]
async fn test_update_to_zero_removes_line() {
    let backend = FakeBackend::start().await;
    let mut client = TestClient::new(backend.storefront());

    client.htmx_post("/cart/add", &[("product_id", "2")]).await;
    let response = client
        .htmx_post("/cart/update", &[("cart_item_id", "2"), ("quantity", "0")])
        .await;

    assert!(response.body.contains("Your cart is empty."));
}

#[tokio::test]
async fn test_stale_stock_is_reported_on_cart_page() {
    let backend = FakeBackend::start().await;
    let router = backend.storefront();
    let mut client = TestClient::new(router.clone());

    client
        .htmx_post("/cart/add", &[("product_id", "1"), ("quantity", "4")])
        .await;
    backend.data.set_stock(1, 1);
    let mut admin = TestClient::new(router);
    admin.login_admin().await;
    let refreshed = admin.post_form("/products/refresh", &[]).await;
    assert_eq!(refreshed.location(), Some("/products"));

    let page = client.get("/cart").await;
    assert!(page.body.contains("Only 1 units of Rose Water Toner available"));
}
