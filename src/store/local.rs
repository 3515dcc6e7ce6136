use redb::{
    CommitError, Database, DatabaseError, ReadableTable, StorageError, TableDefinition,
    TableError, TransactionError,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// One key-value table holds everything: a JSON-serialized array per entity
/// collection plus the session entries (`auth_token`, `user_data`) and the
/// full user list (`app_users`).
const KV: TableDefinition<&str, &str> = TableDefinition::new("kv");

pub const AUTH_TOKEN_KEY: &str = "auth_token";
pub const USER_DATA_KEY: &str = "user_data";
pub const USERS_KEY: &str = "app_users";

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Cache storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Cache transaction error: {0}")]
    Transaction(#[from] TransactionError),
    #[error("Cache table error: {0}")]
    Table(#[from] TableError),
    #[error("Cache commit error: {0}")]
    Commit(#[from] CommitError),
    #[error("Cache serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Durable on-device cache. Every write the application performs is mirrored
/// here, whether or not the remote backend accepted it.
pub struct LocalCache {
    db: Database,
}

impl LocalCache {
    /// Opens (or creates) the cache database file.
    pub fn open(path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;
        Ok(LocalCache { db })
    }

    pub fn get_raw(&self, key: &str) -> Result<Option<String>, CacheError> {
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(KV) {
            Ok(table) => table,
            // Nothing has ever been written; treat as an empty cache.
            Err(TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let result = table.get(key)?.map(|guard| guard.value().to_string());
        Ok(result)
    }

    pub fn put_raw(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(KV)?;
            table.insert(key, value)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<(), CacheError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(KV)?;
            table.remove(key)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Reads a whole collection. `Ok(None)` means the key was never written
    /// (first run), as opposed to an explicitly stored empty array.
    pub fn read_collection<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<Vec<T>>, CacheError> {
        match self.get_raw(key)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub fn write_collection<T: Serialize>(&self, key: &str, items: &[T]) -> Result<(), CacheError> {
        let json = serde_json::to_string(items)?;
        self.put_raw(key, &json)
    }

    pub fn read_value<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        match self.get_raw(key)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub fn write_value<T: Serialize>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        let json = serde_json::to_string(value)?;
        self.put_raw(key, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, User};
    use chrono::Utc;

    fn open_temp_cache() -> (tempfile::TempDir, LocalCache) {
        let dir = tempfile::tempdir().unwrap();
        let cache = LocalCache::open(&dir.path().join("cache.db")).unwrap();
        (dir, cache)
    }

    #[test]
    fn missing_key_reads_as_none() {
        let (_dir, cache) = open_temp_cache();
        assert!(cache.get_raw("cms_services").unwrap().is_none());
        assert!(cache
            .read_collection::<User>(USERS_KEY)
            .unwrap()
            .is_none());
    }

    #[test]
    fn collection_roundtrip() {
        let (_dir, cache) = open_temp_cache();
        let users = vec![User {
            id: "1".to_string(),
            email: "ari@aridevillefitness.com".to_string(),
            name: "Ari Deville".to_string(),
            role: Role::Admin,
            avatar: None,
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login_at: None,
            password_hash: None,
        }];
        cache.write_collection(USERS_KEY, &users).unwrap();
        let restored: Vec<User> = cache.read_collection(USERS_KEY).unwrap().unwrap();
        assert_eq!(restored.len(), 1);
        assert_eq!(restored[0].email, "ari@aridevillefitness.com");
    }

    #[test]
    fn session_token_store_and_clear() {
        let (_dir, cache) = open_temp_cache();
        cache.put_raw(AUTH_TOKEN_KEY, "token_1").unwrap();
        assert_eq!(
            cache.get_raw(AUTH_TOKEN_KEY).unwrap().as_deref(),
            Some("token_1")
        );
        cache.remove(AUTH_TOKEN_KEY).unwrap();
        assert!(cache.get_raw(AUTH_TOKEN_KEY).unwrap().is_none());
    }

    #[test]
    fn empty_array_is_distinct_from_missing() {
        let (_dir, cache) = open_temp_cache();
        cache.write_collection::<User>("cms_intake", &[]).unwrap();
        let stored: Option<Vec<User>> = cache.read_collection("cms_intake").unwrap();
        assert_eq!(stored.map(|v| v.len()), Some(0));
    }
}
