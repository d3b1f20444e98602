//! Durable key/value storage for the per-visitor stores.
//!
//! The cart, auth and wishlist stores persist through the [`LocalStorage`]
//! trait. In the running storefront the backing is the visitor's session
//! ([`SessionStorage`]); tests use [`MemoryStorage`].
//!
//! Reads are best-effort: a value that fails to decode is treated as absent.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tower_sessions::Session;
use tracing::{debug, warn};

use crate::models::keys;

/// String key/value storage with local-storage semantics.
pub trait LocalStorage: Send {
    /// Read a raw value.
    fn get_item(&self, key: &str) -> Option<String>;

    /// Write a raw value, replacing any existing one.
    fn set_item(&mut self, key: &str, value: String);

    /// Delete a value. Removing a missing key is a no-op.
    fn remove_item(&mut self, key: &str);
}

/// Read and decode a JSON value. Missing or undecodable values yield `None`.
pub fn read_json<T: DeserializeOwned>(storage: &dyn LocalStorage, key: &str) -> Option<T> {
    let raw = storage.get_item(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(key, error = %e, "Discarding undecodable stored value");
            None
        }
    }
}

/// Encode a value as JSON and store it.
pub fn write_json<T: Serialize>(storage: &mut dyn LocalStorage, key: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(raw) => storage.set_item(key, raw),
        Err(e) => warn!(key, error = %e, "Failed to encode value for storage"),
    }
}

// =============================================================================
// In-memory storage
// =============================================================================

/// Storage held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: HashMap<String, String>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl LocalStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.get(key).cloned()
    }

    fn set_item(&mut self, key: &str, value: String) {
        self.items.insert(key.to_owned(), value);
    }

    fn remove_item(&mut self, key: &str) {
        self.items.remove(key);
    }
}

// =============================================================================
// Session-backed storage
// =============================================================================

/// Storage backed by the visitor's session.
///
/// The persisted keys are loaded up front so the stores can work
/// synchronously; changes are buffered and written back by
/// [`SessionStorage::commit`].
#[derive(Debug, Clone)]
pub struct SessionStorage {
    session: Session,
    items: HashMap<String, String>,
    dirty: HashSet<String>,
}

impl SessionStorage {
    /// Load the persisted keys from the session.
    ///
    /// A key that cannot be read is treated as absent.
    pub async fn load(session: Session) -> Self {
        let mut items = HashMap::new();
        for key in keys::PERSISTED {
            match session.get::<String>(key).await {
                Ok(Some(value)) => {
                    items.insert(key.to_owned(), value);
                }
                Ok(None) => {}
                Err(e) => debug!(key, error = %e, "Failed to read session key"),
            }
        }
        Self {
            session,
            items,
            dirty: HashSet::new(),
        }
    }

    /// The underlying session.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Whether any key changed since loading.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Write every changed key back to the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store rejects a write.
    pub async fn commit(self) -> Result<(), tower_sessions::session::Error> {
        for key in &self.dirty {
            match self.items.get(key) {
                Some(value) => self.session.insert(key, value).await?,
                None => {
                    self.session.remove::<String>(key).await?;
                }
            }
        }
        Ok(())
    }
}

impl LocalStorage for SessionStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.get(key).cloned()
    }

    fn set_item(&mut self, key: &str, value: String) {
        self.items.insert(key.to_owned(), value);
        self.dirty.insert(key.to_owned());
    }

    fn remove_item(&mut self, key: &str) {
        if self.items.remove(key).is_some() {
            self.dirty.insert(key.to_owned());
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use crate::middleware::session::create_session_store;

    use super::*;

    #[test]
    fn test_read_json_treats_garbage_as_absent() {
        let mut storage = MemoryStorage::new();
        storage.set_item(keys::CART, "{not json".to_string());
        assert!(read_json::<Vec<u32>>(&storage, keys::CART).is_none());

        write_json(&mut storage, keys::CART, &vec![1_u32, 2]);
        assert_eq!(read_json::<Vec<u32>>(&storage, keys::CART), Some(vec![1, 2]));
    }

    #[tokio::test]
    async fn test_session_storage_commits_changes() {
        let session = Session::new(None, Arc::new(create_session_store(16)), None);
        session
            .insert(keys::TOKEN, "old-token".to_string())
            .await
            .unwrap();

        let mut storage = SessionStorage::load(session.clone()).await;
        assert_eq!(storage.get_item(keys::TOKEN).as_deref(), Some("old-token"));
        assert!(!storage.has_changes());

        storage.remove_item(keys::TOKEN);
        storage.set_item(keys::CUSTOMER_EMAIL, "a@example.com".to_string());
        assert!(storage.has_changes());
        storage.commit().await.unwrap();

        assert_eq!(session.get::<String>(keys::TOKEN).await.unwrap(), None);
        assert_eq!(
            session
                .get::<String>(keys::CUSTOMER_EMAIL)
                .await
                .unwrap()
                .as_deref(),
            Some("a@example.com")
        );
    }
}
