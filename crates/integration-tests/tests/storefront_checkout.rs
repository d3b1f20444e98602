//! Integration tests for checkout and order confirmation.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use verdant_integration_tests::{FakeBackend, TestClient, checkout_fields};

// =============================================================================
// Placing orders
// =============================================================================

#[tokio::test]
async fn test_successful_checkout() {
    let backend = FakeBackend::start().await;
    let mut client = TestClient::new(backend.storefront());

    client
        .htmx_post("/cart/add", &[("product_id", "1"), ("quantity", "2")])
        .await;

    let form = client.get("/checkout").await;
    assert_eq!(form.status, StatusCode::OK);
    assert!(form.body.contains("Rose Water Toner"));

    let response = client.post_form("/checkout", &checkout_fields()).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/orders/200"));

    // Backend received the order and decremented stock
    let orders = backend.data.orders();
    let placed = orders.iter().find(|o| o["id"] == 200).unwrap();
    assert_eq!(placed["customer_email"], "meera@example.com");
    assert_eq!(placed["shipping_address"], "7 Temple Street, Madurai, TN 625001");
    assert_eq!(placed["items"][0]["quantity"], 2);
    assert_eq!(backend.data.product(1).unwrap()["stock"], 8);

    let confirmation = client.get("/orders/200").await;
    assert_eq!(confirmation.status, StatusCode::OK);
    assert!(confirmation.body.contains("Order #200 placed successfully"));
    assert!(confirmation.body.contains("Meera Iyer"));

    // Cart is emptied
    let count = client.get("/cart/count").await;
    assert!(!count.body.contains("badge"));
}

#[tokio::test]
async fn test_guest_order_history_uses_checkout_email() {
    let backend = FakeBackend::start().await;
    let mut client = TestClient::new(backend.storefront());

    client.htmx_post("/cart/add", &[("product_id", "2")]).await;
    client.post_form("/checkout", &checkout_fields()).await;

    let history = client.get("/orders").await;
    assert_eq!(history.status, StatusCode::OK);
    assert!(history.body.contains("#200"));
    // Orders of other customers are not listed
    assert!(!history.body.contains("#100"));
}

#[tokio::test]
async fn test_checkout_prefills_saved_email() {
    let backend = FakeBackend::start().await;
    let mut client = TestClient::new(backend.storefront());

    client.htmx_post("/cart/add", &[("product_id", "2")]).await;
    client.post_form("/checkout", &checkout_fields()).await;
    client.htmx_post("/cart/add", &[("product_id", "1")]).await;

    let form = client.get("/checkout").await;
    assert!(form.body.contains("meera@example.com"));
}

// =============================================================================
// Rejections
// =============================================================================

#[tokio::test]
async fn test_backend_stock_rejection_clears_cart() {
    let backend = FakeBackend::start().await;
    let mut client = TestClient::new(backend.storefront());

    client.htmx_post("/cart/add", &[("product_id", "1")]).await;
    backend
        .data
        .reject_orders("Insufficient stock for Rose Water Toner");

    let response = client.post_form("/checkout", &checkout_fields()).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/cart"));

    let cart = client.get("/cart").await;
    assert!(cart.body.contains(
        "Insufficient stock for Rose Water Toner. Your cart has been cleared; please add the items again"
    ));
    assert!(cart.body.contains("Your cart is empty."));
    assert_eq!(backend.data.orders().len(), 2);
}

#[tokio::test]
async fn test_stock_changed_since_adding() {
    let backend = FakeBackend::start().await;
    let mut client = TestClient::new(backend.storefront());

    client
        .htmx_post("/cart/add", &[("product_id", "1"), ("quantity", "3")])
        .await;
    backend.data.set_stock(1, 2);

    let response = client.post_form("/checkout", &checkout_fields()).await;
    assert_eq!(response.location(), Some("/cart"));

    let cart = client.get("/cart").await;
    assert!(cart.body.contains("Only 2 units of Rose Water Toner available"));
    // Lines are kept so the visitor can adjust them
    assert!(client.get("/cart/count").await.body.contains(">3<"));
    assert_eq!(backend.data.orders().len(), 2);
}

#[tokio::test]
async fn test_invalid_form_is_rerendered() {
    let backend = FakeBackend::start().await;
    let mut client = TestClient::new(backend.storefront());

    client.htmx_post("/cart/add", &[("product_id", "1")]).await;

    let mut fields = checkout_fields();
    for field in &mut fields {
        if field.0 == "phone" {
            field.1 = "12345";
        }
    }
    let response = client.post_form("/checkout", &fields).await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body.contains("Please enter a valid phone number"));
    // Entered values are kept
    assert!(response.body.contains("7 Temple Street"));
    assert_eq!(backend.data.orders().len(), 2);
}

#[tokio::test]
async fn test_empty_cart_cannot_check_out() {
    let backend = FakeBackend::start().await;
    let mut client = TestClient::new(backend.storefront());

    let page = client.get("/checkout").await;
    assert_eq!(page.status, StatusCode::SEE_OTHER);
    assert_eq!(page.location(), Some("/cart"));

    let response = client.post_form("/checkout", &checkout_fields()).await;
    assert_eq!(response.location(), Some("/cart"));
    assert!(client.get("/cart").await.body.contains("Your cart is empty"));
}

#[tokio::test]
async fn test_unknown_order_is_not_found() {
    let backend = FakeBackend::start().await;
    let mut client = TestClient::new(backend.storefront());

    let response = client.get("/orders/999").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
