//! Product listing: filtering, sorting and pagination.
//!
//! [`derive`] is a pure function from the full catalog and a [`FilterSpec`]
//! to one page of products. A `FilterSpec` is read from and written back to the
//! query string, so every listing state has a shareable URL.

use std::cmp::Ordering;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;

use verdant_core::{CategoryId, Product};

/// Lower bound of the price window when none is given.
pub const DEFAULT_MIN_PRICE: Decimal = Decimal::ZERO;

/// Upper bound of the price window when none is given.
pub const DEFAULT_MAX_PRICE: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);

/// Products per page when none is given.
pub const DEFAULT_LIMIT: u32 = 12;

/// Largest page size a visitor can request.
pub const MAX_LIMIT: u32 = 100;

/// URL slug, category id and display name of every browsable category.
pub const CATEGORIES: &[(&str, i64, &str)] = &[
    ("face-care", 1, "Face Care"),
    ("body-care", 2, "Body Care"),
    ("hair-care", 3, "Hair Care"),
    ("makeup", 4, "Makeup"),
    ("fragrance", 5, "Fragrance"),
    ("gift-sets", 6, "Gift Sets"),
];

/// Category id for a URL slug.
#[must_use]
pub fn category_id_for_slug(slug: &str) -> Option<CategoryId> {
    let slug = slug.trim();
    CATEGORIES
        .iter()
        .find(|(s, _, _)| s.eq_ignore_ascii_case(slug))
        .map(|&(_, id, _)| CategoryId::new(id))
}

/// Display name for a URL slug.
#[must_use]
pub fn category_name_for_slug(slug: &str) -> Option<&'static str> {
    CATEGORIES
        .iter()
        .find(|(s, _, _)| s.eq_ignore_ascii_case(slug.trim()))
        .map(|&(_, _, name)| name)
}

// =============================================================================
// Sort order
// =============================================================================

/// Listing sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    PriceAsc,
    PriceDesc,
    /// Highest rated first.
    Rating,
    /// Alphabetical, ignoring case and accents.
    Name,
    /// Most reviewed first.
    Popular,
    /// Most recently created first.
    #[default]
    Newest,
}

impl SortOrder {
    pub const ALL: [Self; 6] = [
        Self::Newest,
        Self::Popular,
        Self::Rating,
        Self::PriceAsc,
        Self::PriceDesc,
        Self::Name,
    ];

    /// Query-string value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PriceAsc => "price-asc",
            Self::PriceDesc => "price-desc",
            Self::Rating => "rating",
            Self::Name => "name",
            Self::Popular => "popular",
            Self::Newest => "newest",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::PriceAsc => "Price: Low to High",
            Self::PriceDesc => "Price: High to Low",
            Self::Rating => "Top Rated",
            Self::Name => "Name",
            Self::Popular => "Most Popular",
            Self::Newest => "Newest",
        }
    }

    fn compare(self, a: &Product, b: &Product) -> Ordering {
        match self {
            Self::PriceAsc => a.price.cmp(&b.price),
            Self::PriceDesc => b.price.cmp(&a.price),
            Self::Rating => b.rating.total_cmp(&a.rating),
            Self::Name => collation_key(&a.name).cmp(&collation_key(&b.name)),
            Self::Popular => b.review_count.cmp(&a.review_count),
            Self::Newest => b.created_at.cmp(&a.created_at),
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|sort| sort.as_str() == s.trim())
            .ok_or_else(|| format!("unknown sort order: {s}"))
    }
}

/// Lower-cased name with common Latin accents folded, for alphabetical sorting.
fn collation_key(name: &str) -> String {
    name.chars()
        .flat_map(char::to_lowercase)
        .map(fold_accent)
        .collect()
}

const fn fold_accent(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' => 'a',
        'ç' | 'ć' | 'č' => 'c',
        'è' | 'é' | 'ê' | 'ë' | 'ē' => 'e',
        'ì' | 'í' | 'î' | 'ï' | 'ī' => 'i',
        'ñ' | 'ń' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' => 'o',
        'ù' | 'ú' | 'û' | 'ü' | 'ū' => 'u',
        'ý' | 'ÿ' => 'y',
        'š' | 'ś' => 's',
        'ž' | 'ź' | 'ż' => 'z',
        other => other,
    }
}

// =============================================================================
// FilterSpec
// =============================================================================

/// Raw listing query parameters, exactly as they appear in the URL.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    #[serde(rename = "minPrice")]
    pub min_price: Option<String>,
    #[serde(rename = "maxPrice")]
    pub max_price: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Parsed listing state. Unparseable parameters fall back to defaults.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterSpec {
    /// Category slug, e.g. `face-care`.
    pub category: Option<String>,
    pub search: Option<String>,
    pub sort: SortOrder,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn parse_param<T: FromStr>(value: Option<&String>) -> Option<T> {
    value.and_then(|v| v.trim().parse().ok())
}

impl From<FilterQuery> for FilterSpec {
    fn from(query: FilterQuery) -> Self {
        Self {
            sort: parse_param(query.sort.as_ref()).unwrap_or_default(),
            min_price: parse_param(query.min_price.as_ref()),
            max_price: parse_param(query.max_price.as_ref()),
            page: parse_param(query.page.as_ref()),
            limit: parse_param(query.limit.as_ref()),
            category: non_empty(query.category),
            search: non_empty(query.search),
        }
    }
}

impl FilterSpec {
    /// Page number, treating anything below 1 as 1.
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Page size within `1..=MAX_LIMIT`.
    #[must_use]
    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    #[must_use]
    pub fn min_price(&self) -> Decimal {
        self.min_price.unwrap_or(DEFAULT_MIN_PRICE)
    }

    #[must_use]
    pub fn max_price(&self) -> Decimal {
        self.max_price.unwrap_or(DEFAULT_MAX_PRICE)
    }

    /// Same filters on another page.
    #[must_use]
    pub fn with_page(&self, page: u32) -> Self {
        Self {
            page: Some(page),
            ..self.clone()
        }
    }

    /// Query string for this spec, without the leading `?`. Defaults are
    /// omitted.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        let mut pairs: Vec<(&str, String)> = Vec::new();
        if let Some(category) = &self.category {
            pairs.push(("category", category.clone()));
        }
        if let Some(search) = &self.search {
            pairs.push(("search", search.clone()));
        }
        if self.sort != SortOrder::default() {
            pairs.push(("sort", self.sort.as_str().to_owned()));
        }
        if let Some(min) = self.min_price {
            pairs.push(("minPrice", min.normalize().to_string()));
        }
        if let Some(max) = self.max_price {
            pairs.push(("maxPrice", max.normalize().to_string()));
        }
        if let Some(page) = self.page.filter(|&p| p > 1) {
            pairs.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        pairs
            .into_iter()
            .map(|(key, value)| format!("{key}={}", urlencoding::encode(&value)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

// =============================================================================
// Derivation
// =============================================================================

/// One page of a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingPage<'a> {
    pub items: Vec<&'a Product>,
    /// Products matching the filters, across all pages.
    pub total_count: usize,
    pub page: u32,
    pub limit: u32,
    /// At least 1, even when nothing matches.
    pub total_pages: u32,
}

impl ListingPage<'_> {
    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.page > 1
    }

    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

/// Filter, sort and paginate `products` according to `spec`.
#[must_use]
pub fn derive<'a>(products: &'a [Product], spec: &FilterSpec) -> ListingPage<'a> {
    let category = spec.category.as_deref().map(category_id_for_slug);
    let needle = spec
        .search
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());
    let (min, max) = (spec.min_price(), spec.max_price());

    let mut matching: Vec<&Product> = products
        .iter()
        .filter(|p| match category {
            None => true,
            // An unknown slug matches nothing.
            Some(None) => false,
            Some(Some(id)) => p.category_id == Some(id),
        })
        .filter(|p| needle.as_deref().is_none_or(|n| matches_search(p, n)))
        .filter(|p| p.price >= min && p.price <= max)
        .collect();

    // Vec::sort_by is stable: ties keep catalog order.
    matching.sort_by(|a, b| spec.sort.compare(a, b));

    let page = spec.page();
    let limit = spec.limit();
    let total_count = matching.len();
    let total_pages = u32::try_from(total_count.div_ceil(limit as usize))
        .unwrap_or(u32::MAX)
        .max(1);
    let start = (page as usize - 1).saturating_mul(limit as usize);
    let items = matching
        .into_iter()
        .skip(start)
        .take(limit as usize)
        .collect();

    ListingPage {
        items,
        total_count,
        page,
        limit,
        total_pages,
    }
}

fn matches_search(product: &Product, needle: &str) -> bool {
    let contains = |field: &str| field.to_lowercase().contains(needle);
    contains(&product.name)
        || product.description.as_deref().is_some_and(contains)
        || product.brand.as_deref().is_some_and(contains)
}
