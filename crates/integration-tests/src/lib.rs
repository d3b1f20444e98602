//! Integration tests for Verdant Organics.
//!
//! Tests run the storefront and admin routers in-process against
//! [`FakeBackend`], an axum server on an ephemeral port that speaks the
//! backend's REST API from in-memory data. No external services are needed:
//!
//! ```bash
//! cargo test -p verdant-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `storefront_cart` - Cart fragments, toasts and session persistence
//! - `storefront_checkout` - Order placement, stock rejection, confirmation
//! - `storefront_catalog` - Listing, refresh access and failed-load recovery
//! - `storefront_auth` - Login, signup, account and wishlist
//! - `admin_panel` - Login, products, orders, status changes and reports

#![allow(clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderMap, Request, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;
use url::Url;

/// Service token the fake backend accepts on `/admin/*`.
pub const ADMIN_TOKEN: &str = "eyJhbGciOiJIUzI1NiJ9.kV3xQ9mZr7TbW2pLc8NfYs";

/// Seeded customer account.
pub const CUSTOMER_EMAIL: &str = "asha@example.com";
pub const CUSTOMER_PASSWORD: &str = "correct-horse-9";

/// Seeded account with the backend's admin role.
pub const ADMIN_EMAIL: &str = "lata@verdant.example";
pub const ADMIN_PASSWORD: &str = "greenhouse-ledger-4";

// =============================================================================
// Fake backend
// =============================================================================

#[derive(Debug, Clone)]
struct Account {
    user: Value,
    password: String,
}

#[derive(Debug, Default)]
struct Data {
    products: Vec<Value>,
    orders: Vec<Value>,
    accounts: Vec<Account>,
    wishlists: HashMap<i64, Vec<i64>>,
    next_order_id: i64,
    /// When set, `POST /orders` fails with this message.
    order_rejection: Option<String>,
    /// When set, `GET /products` answers 503.
    products_down: bool,
}

/// Shared handle to the fake backend's data.
#[derive(Debug, Clone, Default)]
pub struct BackendData {
    inner: Arc<Mutex<Data>>,
}

impl BackendData {
    fn lock(&self) -> MutexGuard<'_, Data> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn seeded() -> Self {
        let data = Data {
            products: vec![
                json!({
                    "id": 1,
                    "name": "Rose Water Toner",
                    "brand": "Verdant",
                    "price": 250,
                    "original_price": 300,
                    "stock": 10,
                    "category": "Skincare",
                    "images": ["/uploads/rose-toner.jpg"],
                    "rating": 4.5,
                    "review_count": 12,
                    "variants": [
                        {"size": "100ml", "price": 250},
                        {"size": "200ml", "price": 420}
                    ]
                }),
                json!({
                    "id": 2,
                    "title": "Neem Face Wash",
                    "price": "180.00",
                    "stock_quantity": 2,
                    "category": {"id": 4, "name": "Skincare"},
                    "image_url": "uploads/neem.jpg"
                }),
                json!({
                    "product_id": 3,
                    "name": "Argan Hair Oil",
                    "price": 560,
                    "mrp": 600,
                    "stock": 0,
                    "category_name": "Haircare"
                }),
            ],
            orders: vec![
                json!({
                    "id": 100,
                    "customer_name": "Asha Rao",
                    "customer_email": CUSTOMER_EMAIL,
                    "shipping_address": "12 Lake Road, Chennai 600001",
                    "payment_method": "cod",
                    "status": "delivered",
                    "total": 500,
                    "created_at": "2026-03-01T10:00:00Z",
                    "items": [{"product_id": 1, "name": "Rose Water Toner", "quantity": 2, "price": 250}]
                }),
                json!({
                    "id": 101,
                    "customer_name": "Ravi Menon",
                    "customer_email": "ravi@example.com",
                    "payment_method": "card",
                    "status": "cancelled",
                    "total_amount": "180.00",
                    "created_at": "2026-03-04 09:30:00",
                    "order_items": [{"product_id": 2, "name": "Neem Face Wash", "quantity": 1, "price": 180}]
                }),
            ],
            accounts: vec![
                Account {
                    user: json!({
                        "id": 1,
                        "name": "Asha Rao",
                        "email": CUSTOMER_EMAIL,
                        "role": "user",
                        "phone": "9876543210"
                    }),
                    password: CUSTOMER_PASSWORD.to_string(),
                },
                Account {
                    user: json!({
                        "id": 2,
                        "name": "Lata Pillai",
                        "email": ADMIN_EMAIL,
                        "role": "admin"
                    }),
                    password: ADMIN_PASSWORD.to_string(),
                },
            ],
            wishlists: HashMap::new(),
            next_order_id: 200,
            order_rejection: None,
            products_down: false,
        };
        Self {
            inner: Arc::new(Mutex::new(data)),
        }
    }

    /// Make the next order submissions fail with `message`.
    pub fn reject_orders(&self, message: &str) {
        self.lock().order_rejection = Some(message.to_string());
    }

    /// Make `GET /products` fail (or recover).
    pub fn set_products_down(&self, down: bool) {
        self.lock().products_down = down;
    }

    /// Change a product's stock behind the storefront's back.
    pub fn set_stock(&self, id: i64, stock: u32) {
        if let Some(product) = find_product(&mut self.lock().products, id) {
            let key = stock_key(product);
            product[key] = json!(stock);
        }
    }

    /// Add a product record, as if created after the storefront loaded.
    pub fn insert_product(&self, product: Value) {
        self.lock().products.push(product);
    }

    /// Current raw record of a product.
    #[must_use]
    pub fn product(&self, id: i64) -> Option<Value> {
        find_product(&mut self.lock().products, id).map(|p| p.clone())
    }

    /// Every order, as stored.
    #[must_use]
    pub fn orders(&self) -> Vec<Value> {
        self.lock().orders.clone()
    }

    /// Product ids on a user's wishlist.
    #[must_use]
    pub fn wishlist(&self, user_id: i64) -> Vec<i64> {
        self.lock().wishlists.get(&user_id).cloned().unwrap_or_default()
    }
}

fn find_product(products: &mut [Value], id: i64) -> Option<&mut Value> {
    products.iter_mut().find(|p| {
        p.get("id")
            .or_else(|| p.get("product_id"))
            .and_then(Value::as_i64)
            == Some(id)
    })
}

/// Key the record keeps its stock under.
fn stock_key(product: &Value) -> &'static str {
    ["stock", "stock_quantity", "quantity", "inventory"]
        .into_iter()
        .find(|key| product.get(key).is_some())
        .unwrap_or("stock")
}

fn normalized_id(product: &Value) -> Option<i64> {
    product
        .get("id")
        .or_else(|| product.get("product_id"))
        .and_then(Value::as_i64)
}

fn failure(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({"success": false, "message": message}))).into_response()
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

fn token_for(user: &Value) -> String {
    format!("token-{}", user["id"])
}

/// The account the request's bearer token belongs to.
fn account_for(data: &Data, headers: &HeaderMap) -> Option<Account> {
    let token = bearer(headers)?;
    data.accounts
        .iter()
        .find(|account| token_for(&account.user) == token)
        .cloned()
}

fn is_admin(headers: &HeaderMap) -> bool {
    bearer(headers) == Some(ADMIN_TOKEN)
}

async fn list_products(State(data): State<BackendData>) -> Response {
    let data = data.lock();
    if data.products_down {
        return failure(StatusCode::SERVICE_UNAVAILABLE, "Catalog unavailable");
    }
    let products = data.products.clone();
    Json(json!({"success": true, "data": {"products": products}})).into_response()
}

async fn show_product(State(data): State<BackendData>, Path(id): Path<i64>) -> Response {
    match data.product(id) {
        Some(product) => Json(json!({"success": true, "product": product})).into_response(),
        None => failure(StatusCode::NOT_FOUND, "Product not found"),
    }
}

async fn product_reviews(Path(id): Path<i64>) -> Response {
    let reviews = if id == 1 {
        json!([
            {"id": 1, "user_name": "Priya", "rating": 5, "comment": "Lovely scent"},
            {"id": 2, "rating": "bad"}
        ])
    } else {
        json!([])
    };
    Json(json!({"success": true, "reviews": reviews})).into_response()
}

async fn create_order(State(data): State<BackendData>, Json(payload): Json<Value>) -> Response {
    let mut data = data.lock();
    if let Some(message) = data.order_rejection.clone() {
        return failure(StatusCode::BAD_REQUEST, &message);
    }

    let items = payload["items"].as_array().cloned().unwrap_or_default();
    for item in &items {
        let id = item["product_id"].as_i64().unwrap_or_default();
        let quantity = item["quantity"].as_i64().unwrap_or_default();
        let Some(product) = find_product(&mut data.products, id) else {
            return failure(StatusCode::BAD_REQUEST, "Unknown product");
        };
        let key = stock_key(product);
        let stock = product[key].as_i64().unwrap_or_default();
        if stock < quantity {
            return failure(StatusCode::BAD_REQUEST, "Insufficient stock");
        }
        product[key] = json!(stock - quantity);
    }

    let id = data.next_order_id;
    data.next_order_id += 1;
    let mut order = payload;
    order["id"] = json!(id);
    order["status"] = json!("pending");
    order["created_at"] = json!("2026-03-10T12:00:00Z");
    data.orders.push(order);

    (
        StatusCode::CREATED,
        Json(json!({"success": true, "message": "Order placed", "order": {"id": id}})),
    )
        .into_response()
}

async fn orders_by_email(
    State(data): State<BackendData>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let email = query.get("email").map(|e| e.to_lowercase());
    let orders: Vec<Value> = data
        .lock()
        .orders
        .iter()
        .filter(|order| {
            order["customer_email"].as_str().map(str::to_lowercase) == email
        })
        .cloned()
        .collect();
    Json(json!({"success": true, "orders": orders})).into_response()
}

async fn show_order(State(data): State<BackendData>, Path(id): Path<i64>) -> Response {
    let order = data
        .lock()
        .orders
        .iter()
        .find(|order| order["id"].as_i64() == Some(id))
        .cloned();
    match order {
        Some(order) => Json(json!({"success": true, "data": order})).into_response(),
        None => failure(StatusCode::NOT_FOUND, "Order not found"),
    }
}

async fn login(State(data): State<BackendData>, Json(body): Json<Value>) -> Response {
    let data = data.lock();
    let account = data.accounts.iter().find(|account| {
        account.user["email"] == body["email"] && body["password"] == json!(account.password)
    });
    match account {
        Some(account) => Json(json!({
            "success": true,
            "data": {"token": token_for(&account.user), "user": account.user}
        }))
        .into_response(),
        None => failure(StatusCode::UNAUTHORIZED, "Invalid email or password"),
    }
}

async fn signup(State(data): State<BackendData>, Json(body): Json<Value>) -> Response {
    let mut data = data.lock();
    if data
        .accounts
        .iter()
        .any(|account| account.user["email"] == body["email"])
    {
        return failure(StatusCode::CONFLICT, "Email already registered");
    }
    let id = i64::try_from(data.accounts.len()).unwrap_or_default() + 1;
    let user = json!({
        "id": id,
        "name": body["name"],
        "email": body["email"],
        "phone": body.get("phone").cloned().unwrap_or(Value::Null),
        "role": "user"
    });
    data.accounts.push(Account {
        user: user.clone(),
        password: body["password"].as_str().unwrap_or_default().to_string(),
    });
    (
        StatusCode::CREATED,
        Json(json!({"success": true, "token": token_for(&user), "user": user})),
    )
        .into_response()
}

async fn me(State(data): State<BackendData>, headers: HeaderMap) -> Response {
    match account_for(&data.lock(), &headers) {
        Some(account) => Json(json!({"success": true, "user": account.user})).into_response(),
        None => failure(StatusCode::UNAUTHORIZED, "Invalid token"),
    }
}

async fn update_profile(
    State(data): State<BackendData>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut data = data.lock();
    let Some(token) = bearer(&headers).map(str::to_owned) else {
        return failure(StatusCode::UNAUTHORIZED, "Missing token");
    };
    let Some(account) = data
        .accounts
        .iter_mut()
        .find(|account| token_for(&account.user) == token)
    else {
        return failure(StatusCode::UNAUTHORIZED, "Invalid token");
    };
    for field in ["name", "phone", "address"] {
        if let Some(value) = body.get(field) {
            account.user[field] = value.clone();
        }
    }
    Json(json!({"success": true, "user": account.user})).into_response()
}

async fn wishlist(State(data): State<BackendData>, headers: HeaderMap) -> Response {
    let mut data = data.lock();
    let Some(account) = account_for(&data, &headers) else {
        return failure(StatusCode::UNAUTHORIZED, "Invalid token");
    };
    let user_id = account.user["id"].as_i64().unwrap_or_default();
    let ids = data.wishlists.get(&user_id).cloned().unwrap_or_default();
    let products: Vec<Value> = ids
        .iter()
        .filter_map(|id| find_product(&mut data.products, *id).map(|p| p.clone()))
        .collect();
    Json(json!({"success": true, "wishlist": products})).into_response()
}

async fn add_to_wishlist(
    State(data): State<BackendData>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut data = data.lock();
    let Some(account) = account_for(&data, &headers) else {
        return failure(StatusCode::UNAUTHORIZED, "Invalid token");
    };
    let user_id = account.user["id"].as_i64().unwrap_or_default();
    let product_id = body["product_id"].as_i64().unwrap_or_default();
    let list = data.wishlists.entry(user_id).or_default();
    if list.contains(&product_id) {
        return failure(StatusCode::BAD_REQUEST, "Already in wishlist");
    }
    list.push(product_id);
    Json(json!({"success": true, "message": "Added"})).into_response()
}

async fn remove_from_wishlist(
    State(data): State<BackendData>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    let mut data = data.lock();
    let Some(account) = account_for(&data, &headers) else {
        return failure(StatusCode::UNAUTHORIZED, "Invalid token");
    };
    let user_id = account.user["id"].as_i64().unwrap_or_default();
    data.wishlists
        .entry(user_id)
        .or_default()
        .retain(|product_id| *product_id != id);
    Json(json!({"success": true})).into_response()
}

async fn admin_orders(State(data): State<BackendData>, headers: HeaderMap) -> Response {
    if !is_admin(&headers) {
        return failure(StatusCode::FORBIDDEN, "Admin access required");
    }
    let orders = data.lock().orders.clone();
    Json(json!({"success": true, "data": {"orders": orders}})).into_response()
}

async fn admin_order_status(
    State(data): State<BackendData>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    if !is_admin(&headers) {
        return failure(StatusCode::FORBIDDEN, "Admin access required");
    }
    let mut data = data.lock();
    match data
        .orders
        .iter_mut()
        .find(|order| order["id"].as_i64() == Some(id))
    {
        Some(order) => {
            order["status"] = body["status"].clone();
            Json(json!({"success": true, "order": order})).into_response()
        }
        None => failure(StatusCode::NOT_FOUND, "Order not found"),
    }
}

async fn admin_update_product(
    State(data): State<BackendData>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    if !is_admin(&headers) {
        return failure(StatusCode::FORBIDDEN, "Admin access required");
    }
    let mut data = data.lock();
    let Some(product) = find_product(&mut data.products, id) else {
        return failure(StatusCode::NOT_FOUND, "Product not found");
    };
    if let Some(price) = body.get("price") {
        product["price"] = price.clone();
    }
    if let Some(stock) = body.get("stock") {
        let key = stock_key(product);
        product[key] = stock.clone();
    }
    Json(json!({"success": true, "product": product})).into_response()
}

async fn admin_delete_product(
    State(data): State<BackendData>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    if !is_admin(&headers) {
        return failure(StatusCode::FORBIDDEN, "Admin access required");
    }
    let mut data = data.lock();
    let before = data.products.len();
    data.products.retain(|p| normalized_id(p) != Some(id));
    if data.products.len() == before {
        return failure(StatusCode::NOT_FOUND, "Product not found");
    }
    Json(json!({"success": true, "message": "Product deleted"})).into_response()
}

/// In-process stand-in for the backend REST API.
pub struct FakeBackend {
    /// API root, e.g. `http://127.0.0.1:41234/api`.
    pub url: Url,
    pub data: BackendData,
}

impl FakeBackend {
    /// Serve the seeded backend on an ephemeral port.
    pub async fn start() -> Self {
        let data = BackendData::seeded();
        let api = Router::new()
            .route("/products", get(list_products))
            .route("/products/{id}", get(show_product))
            .route("/reviews/product/{id}", get(product_reviews))
            .route("/orders", get(orders_by_email).post(create_order))
            .route("/orders/{id}", get(show_order))
            .route("/auth/login", post(login))
            .route("/auth/signup", post(signup))
            .route("/auth/me", get(me))
            .route("/auth/profile", put(update_profile))
            .route("/wishlist", get(wishlist).post(add_to_wishlist))
            .route("/wishlist/{id}", axum::routing::delete(remove_from_wishlist))
            .route("/admin/orders", get(admin_orders))
            .route("/admin/orders/{id}/status", put(admin_order_status))
            .route(
                "/admin/products/{id}",
                put(admin_update_product).delete(admin_delete_product),
            )
            .with_state(data.clone());
        let app = Router::new().nest("/api", api);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake backend");
        let addr = listener.local_addr().expect("fake backend address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake backend");
        });

        let url = Url::parse(&format!("http://{addr}/api")).expect("fake backend url");
        Self { url, data }
    }

    /// Storefront router talking to this backend.
    #[must_use]
    pub fn storefront(&self) -> Router {
        let config = verdant_storefront::config::StorefrontConfig::for_backend(self.url.clone());
        verdant_storefront::app(verdant_storefront::state::AppState::new(config))
    }

    /// Admin router talking to this backend.
    #[must_use]
    pub fn admin(&self) -> Router {
        let config = verdant_admin::config::AdminConfig::for_backend(
            self.url.clone(),
            SecretString::from(ADMIN_TOKEN),
        );
        verdant_admin::app(verdant_admin::state::AppState::new(config))
    }
}

// =============================================================================
// Test client
// =============================================================================

/// A response with its body read.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    /// `Location` of a redirect.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }

    /// Decoded `HX-Trigger` toast, as `(kind, message)`.
    #[must_use]
    pub fn toast(&self) -> Option<(String, String)> {
        let raw = self.headers.get("hx-trigger")?.to_str().ok()?;
        let value: Value = serde_json::from_str(raw).ok()?;
        let toast = value.get("showToast")?;
        Some((
            toast["kind"].as_str()?.to_string(),
            toast["message"].as_str()?.to_string(),
        ))
    }
}

/// Drives a router with `oneshot`, carrying the session cookie between
/// requests like a browser would.
pub struct TestClient {
    router: Router,
    cookie: Option<String>,
}

impl TestClient {
    #[must_use]
    pub const fn new(router: Router) -> Self {
        Self {
            router,
            cookie: None,
        }
    }

    pub async fn send(&mut self, mut request: Request<Body>) -> TestResponse {
        if let Some(cookie) = &self.cookie {
            request
                .headers_mut()
                .insert(header::COOKIE, cookie.parse().expect("cookie header"));
        }
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        if let Some(set_cookie) = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
        {
            self.cookie = set_cookie.split(';').next().map(str::to_owned);
        }

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    pub async fn get(&mut self, path: &str) -> TestResponse {
        let request = Request::get(path).body(Body::empty()).expect("request");
        self.send(request).await
    }

    pub async fn post_form(&mut self, path: &str, fields: &[(&str, &str)]) -> TestResponse {
        self.send(form_request(path, fields, false)).await
    }

    /// POST as HTMX does, expecting a fragment back.
    pub async fn htmx_post(&mut self, path: &str, fields: &[(&str, &str)]) -> TestResponse {
        self.send(form_request(path, fields, true)).await
    }

    /// Log in as the seeded customer.
    pub async fn login(&mut self) -> TestResponse {
        self.post_form(
            "/auth/login",
            &[("email", CUSTOMER_EMAIL), ("password", CUSTOMER_PASSWORD)],
        )
        .await
    }

    /// Log in as the seeded admin.
    pub async fn login_admin(&mut self) -> TestResponse {
        self.post_form(
            "/auth/login",
            &[("email", ADMIN_EMAIL), ("password", ADMIN_PASSWORD)],
        )
        .await
    }
}

fn form_request(path: &str, fields: &[(&str, &str)], htmx: bool) -> Request<Body> {
    let body = fields
        .iter()
        .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&");
    let mut builder = Request::post(path).header(
        header::CONTENT_TYPE,
        "application/x-www-form-urlencoded",
    );
    if htmx {
        builder = builder.header("HX-Request", "true");
    }
    builder.body(Body::from(body)).expect("request")
}

/// A checkout form that passes validation.
#[must_use]
pub fn checkout_fields() -> Vec<(&'static str, &'static str)> {
    vec![
        ("name", "Meera Iyer"),
        ("email", "meera@example.com"),
        ("phone", "+91 98765 43210"),
        ("address", "7 Temple Street"),
        ("city", "Madurai"),
        ("state", "TN"),
        ("postal_code", "625001"),
        ("payment_method", "upi"),
    ]
}
