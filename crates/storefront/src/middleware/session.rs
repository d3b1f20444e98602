//! Session middleware configuration.
//!
//! The session is the visitor's durable storage: the cart, the bearer token,
//! the cached user and the checkout email all live here between requests.
//! Sessions are held in a bounded moka cache that evicts each record once
//! its expiry passes, so they do not survive a restart.

use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_moka_store::MokaStore;

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "verdant_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Most sessions held at once; the least recently used go first.
pub const MAX_SESSIONS: u64 = 100_000;

/// Create the in-memory session store.
#[must_use]
pub fn create_session_store(max_sessions: u64) -> MokaStore {
    MokaStore::new(Some(max_sessions))
}

/// Create the session layer.
#[must_use]
pub fn create_session_layer(config: &StorefrontConfig) -> SessionManagerLayer<MokaStore> {
    // Secure cookies only when served over HTTPS
    let is_secure = config.base_url.scheme() == "https";

    SessionManagerLayer::new(create_session_store(MAX_SESSIONS))
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(is_secure)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use tower_sessions::SessionStore;
    use tower_sessions::cookie::time::{Duration, OffsetDateTime};
    use tower_sessions::session::{Id, Record};

    use super::*;

    fn record(expires_in: Duration) -> Record {
        Record {
            id: Id::default(),
            data: HashMap::from([("cart".to_string(), serde_json::json!("[]"))]),
            expiry_date: OffsetDateTime::now_utc() + expires_in,
        }
    }

    #[tokio::test]
    async fn test_live_session_is_kept() {
        let store = create_session_store(10);
        let live = record(Duration::hours(1));
        store.save(&live).await.unwrap();

        let loaded = store.load(&live.id).await.unwrap().unwrap();
        assert_eq!(loaded.data, live.data);
    }

    #[tokio::test]
    async fn test_expired_session_is_evicted() {
        let store = create_session_store(10);
        let stale = record(Duration::seconds(-1));
        store.save(&stale).await.unwrap();

        assert!(store.load(&stale.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_deleted_session_is_gone() {
        let store = create_session_store(10);
        let live = record(Duration::hours(1));
        store.save(&live).await.unwrap();
        store.delete(&live.id).await.unwrap();

        assert!(store.load(&live.id).await.unwrap().is_none());
    }
}
