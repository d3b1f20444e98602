//! Image URL resolution.
//!
//! Product records reference images in several ways: absolute URLs, data
//! URLs, paths under the backend's `/uploads/` directory, or bare filenames.
//! Missing images and links to placeholder services are replaced with an
//! inline SVG that names the product, so a page never renders a broken image.
//!
//! Resolution walks an ordered rule table; the first matching rule wins and
//! the last rule matches everything.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use url::Url;

/// Hosts of third-party placeholder services that are treated as "no image".
const PLACEHOLDER_HOSTS: &[&str] = &[
    "via.placeholder.com",
    "placehold.co",
    "placeholder.com",
    "dummyimage.com",
];

/// Label used when the caller has nothing better.
const DEFAULT_LABEL: &str = "Verdant Organics";

/// Labels longer than this are truncated in the placeholder.
const MAX_LABEL_CHARS: usize = 40;

type Matcher = fn(&str) -> bool;
type Resolution = fn(&ImageResolver, &str, &str) -> String;

struct Rule {
    matches: Matcher,
    resolve: Resolution,
}

const RULES: &[Rule] = &[
    Rule {
        matches: is_missing,
        resolve: resolve_placeholder,
    },
    Rule {
        matches: is_http_url,
        resolve: resolve_unchanged,
    },
    Rule {
        matches: is_data_image,
        resolve: resolve_unchanged,
    },
    Rule {
        matches: is_uploads_path,
        resolve: resolve_uploads_path,
    },
    Rule {
        matches: always,
        resolve: resolve_filename,
    },
];

/// Resolves raw image references to browser-loadable URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageResolver {
    /// Backend origin without a trailing slash, e.g. `http://localhost:5000`.
    origin: String,
}

impl ImageResolver {
    /// Resolver for a backend serving uploads at `http://{host}:{port}`.
    #[must_use]
    pub fn for_host(host: &str, port: u16) -> Self {
        Self {
            origin: format!("http://{host}:{port}"),
        }
    }

    /// Resolver using the host of `base_url` and the given uploads port.
    #[must_use]
    pub fn from_base_url(base_url: &Url, port: u16) -> Self {
        Self::for_host(base_url.host_str().unwrap_or("localhost"), port)
    }

    /// The backend origin uploads are served from.
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Resolve `path` to a URL. Never fails.
    ///
    /// `fallback_label` is embedded in the placeholder when there is no
    /// usable image.
    #[must_use]
    pub fn resolve(&self, path: Option<&str>, fallback_label: &str) -> String {
        let input = path.map_or("", str::trim);
        RULES
            .iter()
            .find(|rule| (rule.matches)(input))
            .map_or_else(
                || placeholder(fallback_label),
                |rule| (rule.resolve)(self, input, fallback_label),
            )
    }

    /// Resolve the first image of a list.
    #[must_use]
    pub fn resolve_first(&self, images: &[String], fallback_label: &str) -> String {
        self.resolve(images.first().map(String::as_str), fallback_label)
    }
}

// =============================================================================
// Matchers
// =============================================================================

fn is_missing(input: &str) -> bool {
    input.is_empty() || is_placeholder_service(input)
}

fn is_placeholder_service(input: &str) -> bool {
    if !is_http_url(input) {
        return false;
    }
    Url::parse(input)
        .ok()
        .and_then(|url| url.host_str().map(str::to_ascii_lowercase))
        .is_some_and(|host| {
            PLACEHOLDER_HOSTS
                .iter()
                .any(|known| host == *known || host.ends_with(&format!(".{known}")))
        })
}

fn is_http_url(input: &str) -> bool {
    let lower = input.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn is_data_image(input: &str) -> bool {
    input.starts_with("data:image")
}

fn is_uploads_path(input: &str) -> bool {
    input.starts_with("/uploads/") || input.starts_with("uploads/")
}

const fn always(_input: &str) -> bool {
    true
}

// =============================================================================
// Resolutions
// =============================================================================

fn resolve_placeholder(_resolver: &ImageResolver, _input: &str, label: &str) -> String {
    placeholder(label)
}

fn resolve_unchanged(_resolver: &ImageResolver, input: &str, _label: &str) -> String {
    input.to_owned()
}

fn resolve_uploads_path(resolver: &ImageResolver, input: &str, _label: &str) -> String {
    format!("{}/{}", resolver.origin, input.trim_start_matches('/'))
}

fn resolve_filename(resolver: &ImageResolver, input: &str, _label: &str) -> String {
    format!(
        "{}/uploads/{}",
        resolver.origin,
        input.trim_start_matches('/')
    )
}

/// Inline SVG placeholder naming `label`.
///
/// Deterministic: the same label always yields the same URL.
#[must_use]
pub fn placeholder(label: &str) -> String {
    let label = label.trim();
    let label = if label.is_empty() {
        DEFAULT_LABEL
    } else {
        label
    };
    let text: String = if label.chars().count() > MAX_LABEL_CHARS {
        let mut truncated: String = label.chars().take(MAX_LABEL_CHARS - 1).collect();
        truncated.push('…');
        truncated
    } else {
        label.to_owned()
    };

    let svg = format!(
        concat!(
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="400" height="400" viewBox="0 0 400 400">"##,
            r##"<rect width="400" height="400" fill="#f3efe6"/>"##,
            r##"<text x="200" y="200" font-family="Georgia, serif" font-size="20" fill="#5f7350" "##,
            r##"text-anchor="middle" dominant-baseline="middle">{}</text></svg>"##,
        ),
        escape_xml(&text)
    );
    format!("data:image/svg+xml;base64,{}", STANDARD.encode(svg))
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
