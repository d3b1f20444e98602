//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::Response};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::Result;
use crate::filters;
use crate::listing::{self, CATEGORIES, FilterSpec, SortOrder};
use crate::routes::products::ProductView;
use crate::routes::{Layout, Shopper};
use crate::state::AppState;

/// Products shown per home page section.
const SECTION_SIZE: u32 = 8;

/// Category tile data.
#[derive(Clone)]
pub struct CategoryTile {
    pub slug: &'static str,
    pub name: &'static str,
}

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub layout: Layout,
    pub categories: Vec<CategoryTile>,
    pub new_arrivals: Vec<ProductView>,
    pub best_sellers: Vec<ProductView>,
}

/// Display the home page.
#[instrument(skip(state, session))]
pub async fn home(State(state): State<AppState>, session: Session) -> Result<Response> {
    let shopper = Shopper::load(&state, session).await;
    let catalog = shopper.catalog().clone();

    let section = |sort: SortOrder| {
        let spec = FilterSpec {
            sort,
            limit: Some(SECTION_SIZE),
            ..FilterSpec::default()
        };
        ProductView::list(listing::derive(catalog.all(), &spec).items, &state)
    };
    let new_arrivals = section(SortOrder::Newest);
    let best_sellers = section(SortOrder::Popular);

    let categories = CATEGORIES
        .iter()
        .map(|&(slug, _, name)| CategoryTile { slug, name })
        .collect();

    shopper
        .page(|layout| HomeTemplate {
            layout,
            categories,
            new_arrivals,
            best_sellers,
        })
        .await
}
