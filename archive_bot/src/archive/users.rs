use std::sync::Arc;

use anyhow::Result;
use archive_core::cache::RecencyCache;
use archive_core::upload::UserId;
use teloxide::types::User;

use crate::archive::storage::ArchiveStorage;

/// Keeps the users tree up to date without writing on every message.
///
/// Users seen recently are remembered in a [`RecencyCache`]; only a cache miss
/// reaches storage.
#[derive(Clone)]
pub struct UserRegistry {
    cache: Arc<RecencyCache<UserId>>,
    storage: ArchiveStorage,
}

impl UserRegistry {
    pub fn new(cache: Arc<RecencyCache<UserId>>, storage: ArchiveStorage) -> Self {
        Self { cache, storage }
    }

    pub fn register(&self, user: &User) -> Result<()> {
        let name = match &user.last_name {
            Some(last_name) => format!("{} {}", user.first_name, last_name),
            None => user.first_name.clone(),
        };
        self.register_identity(user.id.0 as i64, user.username.clone(), name)?;
        Ok(())
    }

    /// Returns true when storage was written.
    pub fn register_identity(&self, user_id: UserId, username: Option<String>, name: String) -> Result<bool> {
        if self.cache.add(user_id) {
            return Ok(false);
        }

        log::debug!("Registering user {}", user_id);
        if let Err(e) = self.storage.register_user(user_id, username, name) {
            // Not stored, so the next update from this user must try again.
            self.cache.remove(&user_id);
            return Err(e);
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(cache_size: usize) -> (UserRegistry, ArchiveStorage) {
        let db = sled::Config::new().temporary(true).open().unwrap();
        let storage = ArchiveStorage::new(&db).unwrap();
        let cache = Arc::new(RecencyCache::new(cache_size).unwrap());
        (UserRegistry::new(cache, storage.clone()), storage)
    }

    #[test]
    fn test_repeat_messages_skip_storage() {
        let (registry, storage) = registry(10);

        assert!(registry.register_identity(1, None, "First".to_string()).unwrap());
        assert!(!registry.register_identity(1, None, "Renamed".to_string()).unwrap());

        assert_eq!(storage.get_user(1).unwrap().unwrap().name, "First");
    }

    #[test]
    fn test_evicted_user_is_written_again() {
        let (registry, storage) = registry(1);

        registry.register_identity(1, None, "First".to_string()).unwrap();
        registry.register_identity(2, None, "Second".to_string()).unwrap();
        assert!(registry.register_identity(1, None, "Renamed".to_string()).unwrap());

        assert_eq!(storage.get_user(1).unwrap().unwrap().name, "Renamed");
    }

    #[test]
    fn test_failed_write_is_retried() {
        let db = sled::Config::new().temporary(true).open().unwrap();
        let storage = ArchiveStorage::new(&db).unwrap();
        let registry = UserRegistry::new(Arc::new(RecencyCache::new(10).unwrap()), storage.clone());

        // A record that cannot be decoded makes the upsert fail.
        let users = db.open_tree("users").unwrap();
        users.insert(7i64.to_be_bytes(), b"not json".to_vec()).unwrap();

        assert!(registry.register_identity(7, None, "Sara".to_string()).is_err());
        assert!(registry.register_identity(7, None, "Sara".to_string()).is_err());

        users.remove(7i64.to_be_bytes()).unwrap();
        assert!(registry.register_identity(7, None, "Sara".to_string()).unwrap());
        assert_eq!(storage.get_user(7).unwrap().unwrap().name, "Sara");
    }
}
