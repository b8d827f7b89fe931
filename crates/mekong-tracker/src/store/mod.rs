//! Key-value storage backends.
//!
//! The trackers persist one JSON document per key through the
//! [`KeyValueStore`] trait. Three backends are provided:
//! - [`MemoryStore`]: process-local map with an optional byte quota
//! - [`FileStore`]: one `<key>.json` file per key in a directory
//! - [`SqliteStore`]: a key/value table in a `SQLite` database

mod file;
pub mod migrations;
pub mod schema;
mod sqlite;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::config::{Backend, Config};
use crate::error::{Error, Result};

pub use file::FileStore;
pub use sqlite::SqliteStore;

/// A string-keyed store of string values.
///
/// A single `get` or `set` is indivisible; nothing else is guaranteed.
/// Read-modify-write sequences built on top of it can interleave.
pub trait KeyValueStore: Send + Sync + fmt::Debug {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Read the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the write (quota, I/O, database).
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete `key`. Deleting a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<()>;
}

/// Check that `key` is usable by every backend.
///
/// Keys must be non-empty, must not start with `.`, and may only contain
/// ASCII letters, digits, `_`, `-` and `.`.
///
/// # Errors
///
/// Returns [`Error::InvalidKey`] if the key is rejected.
pub fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidKey {
            key: key.to_string(),
        })
    }
}

/// Open the backend selected by `config`.
///
/// # Errors
///
/// Returns an error if the file or database backend cannot be opened.
pub fn open(config: &Config) -> Result<Arc<dyn KeyValueStore>> {
    let store: Arc<dyn KeyValueStore> = match config.storage.backend {
        Backend::Memory => match config.storage.quota_bytes {
            0 => Arc::new(MemoryStore::new()),
            quota => Arc::new(MemoryStore::with_quota(quota)),
        },
        Backend::File => Arc::new(FileStore::open(config.data_dir())?),
        Backend::Sqlite => Arc::new(SqliteStore::open(config.database_path())?),
    };
    debug!("Using {} storage backend", store.name());
    Ok(store)
}

/// In-memory store, the stand-in for a browser's local storage.
///
/// With a quota set, a write that would bring the total size of keys and
/// values above the quota fails with [`Error::QuotaExceeded`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStore {
    /// Create an unlimited in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an in-memory store limited to `quota` bytes.
    #[must_use]
    pub fn with_quota(quota: usize) -> Self {
        Self {
            entries: Mutex::default(),
            quota: Some(quota),
        }
    }

    /// Number of keys stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the store holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Bytes used by keys and values.
    #[must_use]
    pub fn used_bytes(&self) -> usize {
        self.lock().iter().map(|(k, v)| k.len() + v.len()).sum()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.lock();
        if let Some(quota) = self.quota {
            let others: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = others + key.len() + value.len();
            if needed > quota {
                return Err(Error::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    quota,
                });
            }
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_get_missing() {
        let store = MemoryStore::new();
        assert_eq!(store.get("nothing").unwrap(), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_memory_set_get_remove() {
        let store = MemoryStore::new();
        store.set("k", "v1").unwrap();
        store.set("k", "v2").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v2"));
        assert_eq!(store.len(), 1);

        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
        store.remove("k").unwrap();
    }

    #[test]
    fn test_memory_quota_rejects_oversized_write() {
        let store = MemoryStore::with_quota(10);
        store.set("ab", "12345678").unwrap();
        assert_eq!(store.used_bytes(), 10);

        let err = store.set("cd", "x").unwrap_err();
        assert!(err.is_quota_exceeded());
        assert_eq!(store.get("cd").unwrap(), None);
    }

    #[test]
    fn test_memory_quota_counts_replacement_not_addition() {
        let store = MemoryStore::with_quota(10);
        store.set("ab", "12345678").unwrap();
        // Overwriting the same key frees the old value first
        store.set("ab", "87654321").unwrap();
        assert_eq!(store.get("ab").unwrap().as_deref(), Some("87654321"));
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("mekong_pathfinder_downloads").is_ok());
        assert!(validate_key("a.b-c_d9").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key(".hidden").is_err());
        assert!(validate_key("../escape").is_err());
        assert!(validate_key("with space").is_err());
        assert!(validate_key("slash/key").is_err());
    }

    #[test]
    fn test_open_memory_backend() {
        let mut config = Config::default();
        config.storage.backend = Backend::Memory;
        config.storage.quota_bytes = 0;
        let store = open(&config).unwrap();
        assert_eq!(store.name(), "memory");
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_open_memory_backend_with_quota() {
        let mut config = Config::default();
        config.storage.backend = Backend::Memory;
        config.storage.quota_bytes = 4;
        let store = open(&config).unwrap();
        assert!(store.set("key", "value").unwrap_err().is_quota_exceeded());
    }
}
