//! Product route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::Response,
};
use tower_sessions::Session;
use tracing::{instrument, warn};

use verdant_core::{CurrencyCode, Product, ProductId};

use crate::api::Review;
use crate::catalog::fetch_product;
use crate::error::{AppError, Result};
use crate::filters;
use crate::images::ImageResolver;
use crate::listing::{self, CATEGORIES, FilterQuery, FilterSpec, SortOrder};
use crate::middleware::RequireAdmin;
use crate::routes::{Layout, Shopper};
use crate::services::WishlistStore;
use crate::state::AppState;

// =============================================================================
// Views
// =============================================================================

/// Product display data for cards and the detail page.
#[derive(Clone)]
pub struct ProductView {
    pub id: ProductId,
    pub name: String,
    pub brand: Option<String>,
    pub description: Option<String>,
    pub category: String,
    pub price: String,
    /// Original price when discounted.
    pub original_price: Option<String>,
    pub discount_percent: Option<u32>,
    pub image: String,
    pub images: Vec<String>,
    pub rating: f64,
    pub review_count: u32,
    pub stock: u32,
    pub in_stock: bool,
    pub variants: Vec<VariantView>,
}

/// Variant display data.
#[derive(Clone)]
pub struct VariantView {
    pub size: String,
    pub price: String,
}

impl ProductView {
    #[must_use]
    pub fn new(product: &Product, images: &ImageResolver, currency: CurrencyCode) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            brand: product.brand.clone(),
            description: product.description.clone(),
            category: product.category.clone(),
            price: currency.format(product.price),
            original_price: product
                .has_discount()
                .then(|| currency.format(product.original_price)),
            discount_percent: product.discount_percent(),
            image: images.resolve_first(&product.images, &product.name),
            images: product
                .images
                .iter()
                .map(|path| images.resolve(Some(path), &product.name))
                .collect(),
            rating: product.rating,
            review_count: product.review_count,
            stock: product.stock,
            in_stock: product.is_in_stock(),
            variants: product
                .variants
                .iter()
                .map(|v| VariantView {
                    size: v.size.clone(),
                    price: currency.format(v.price),
                })
                .collect(),
        }
    }

    /// Views for a list of products.
    #[must_use]
    pub fn list<'a>(
        products: impl IntoIterator<Item = &'a Product>,
        state: &AppState,
    ) -> Vec<Self> {
        products
            .into_iter()
            .map(|p| Self::new(p, state.images(), state.currency()))
            .collect()
    }
}

/// Review display data.
#[derive(Clone)]
pub struct ReviewView {
    pub author: String,
    pub rating: f64,
    pub comment: String,
    pub date: Option<String>,
}

impl From<Review> for ReviewView {
    fn from(review: Review) -> Self {
        Self {
            author: review
                .author
                .filter(|a| !a.trim().is_empty())
                .unwrap_or_else(|| "Verified buyer".to_string()),
            rating: review.rating,
            comment: review.comment,
            date: review
                .created_at
                .as_deref()
                .and_then(verdant_core::parse_timestamp)
                .map(|t| t.format("%B %-d, %Y").to_string()),
        }
    }
}

/// A link in the category or sort navigation.
#[derive(Clone)]
pub struct NavLink {
    pub label: String,
    pub url: String,
    pub active: bool,
}

/// An option of the sort selector.
#[derive(Clone)]
pub struct SortOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

/// Pagination display data.
#[derive(Clone)]
pub struct PaginationView {
    pub page: u32,
    pub total_pages: u32,
    pub previous_url: Option<String>,
    pub next_url: Option<String>,
}

fn listing_url(spec: &FilterSpec) -> String {
    let query = spec.to_query_string();
    if query.is_empty() {
        "/products".to_string()
    } else {
        format!("/products?{query}")
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Product listing template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub layout: Layout,
    pub title: String,
    pub products: Vec<ProductView>,
    pub total_count: usize,
    pub categories: Vec<NavLink>,
    pub sorts: Vec<SortOption>,
    pub search: String,
    pub category: String,
    pub min_price: String,
    pub max_price: String,
    pub pagination: PaginationView,
    pub catalog_error: Option<String>,
}

/// Product detail template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub layout: Layout,
    pub product: ProductView,
    pub reviews: Vec<ReviewView>,
    pub logged_in: bool,
    pub wishlisted: bool,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the product listing.
#[instrument(skip(state, session, query))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<FilterQuery>,
) -> Result<Response> {
    let spec = FilterSpec::from(query);
    let shopper = Shopper::load(&state, session).await;
    let catalog = shopper.catalog().clone();
    let page = listing::derive(catalog.all(), &spec);

    let title = spec
        .category
        .as_deref()
        .and_then(listing::category_name_for_slug)
        .map_or_else(|| "All Products".to_string(), str::to_string);

    let categories = std::iter::once(NavLink {
        label: "All".to_string(),
        url: listing_url(&FilterSpec {
            category: None,
            page: None,
            ..spec.clone()
        }),
        active: spec.category.is_none(),
    })
    .chain(CATEGORIES.iter().map(|&(slug, _, name)| NavLink {
        label: name.to_string(),
        url: listing_url(&FilterSpec {
            category: Some(slug.to_string()),
            page: None,
            ..spec.clone()
        }),
        active: spec.category.as_deref() == Some(slug),
    }))
    .collect();

    let sorts = SortOrder::ALL
        .iter()
        .map(|&sort| SortOption {
            value: sort.as_str(),
            label: sort.label(),
            selected: sort == spec.sort,
        })
        .collect();

    let pagination = PaginationView {
        page: page.page,
        total_pages: page.total_pages,
        previous_url: page
            .has_previous()
            .then(|| listing_url(&spec.with_page(page.page - 1))),
        next_url: page
            .has_next()
            .then(|| listing_url(&spec.with_page(page.page + 1))),
    };

    let products = ProductView::list(page.items.iter().copied(), &state);
    let total_count = page.total_count;
    let catalog_error = state.catalog().last_error();

    shopper
        .page(|layout| ProductsIndexTemplate {
            layout,
            title,
            products,
            total_count,
            categories,
            sorts,
            search: spec.search.clone().unwrap_or_default(),
            category: spec.category.clone().unwrap_or_default(),
            min_price: spec.min_price.map(|p| p.normalize().to_string()).unwrap_or_default(),
            max_price: spec.max_price.map(|p| p.normalize().to_string()).unwrap_or_default(),
            pagination,
            catalog_error,
        })
        .await
}

/// Display a product with its reviews.
///
/// Products missing from the catalog snapshot are fetched directly; review
/// failures show an empty list.
#[instrument(skip(state, session))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ProductId>,
) -> Result<Response> {
    let shopper = Shopper::load(&state, session).await;

    let product = match shopper.catalog().by_id(id) {
        Some(product) => product.clone(),
        None => fetch_product(state.api(), id)
            .await
            .map_err(|_| AppError::NotFound(format!("product {id}")))?,
    };

    let reviews = match state.api().reviews(id).await {
        Ok(reviews) => reviews.into_iter().map(ReviewView::from).collect(),
        Err(e) => {
            warn!(product_id = %id, error = %e, "Failed to load reviews");
            Vec::new()
        }
    };

    let logged_in = shopper.user().is_some();
    let wishlisted = if logged_in {
        WishlistStore::fetch(state.api(), shopper.token().as_deref())
            .await
            .is_member(id)
    } else {
        false
    };

    let view = ProductView::new(&product, state.images(), state.currency());
    shopper
        .page(|layout| ProductShowTemplate {
            layout,
            product: view,
            reviews,
            logged_in,
            wishlisted,
        })
        .await
}

/// Re-fetch the catalog from the backend. Admins only.
#[instrument(skip(state, session, admin), fields(user_id = %admin.user.id))]
pub async fn refresh(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Response> {
    let result = state.catalog().refresh().await;
    let mut shopper = Shopper::load(&state, session).await;
    match result {
        Ok(count) => shopper
            .toaster()
            .info(format!("Catalog refreshed: {count} products")),
        Err(e) => {
            warn!(error = %e, "Catalog refresh failed");
            shopper.toaster().error("Could not refresh products");
        }
    }
    shopper.redirect("/products").await
}

/// Try loading the catalog again after a failed fetch. A healthy catalog is
/// left as it is.
#[instrument(skip(state, session))]
pub async fn retry(State(state): State<AppState>, session: Session) -> Result<Response> {
    let result = state.catalog().retry().await;
    let mut shopper = Shopper::load(&state, session).await;
    if let Err(e) = result {
        warn!(error = %e, "Catalog retry failed");
        shopper.toaster().error("Products are still unavailable");
    }
    shopper.redirect("/products").await
}
