//! Versioned JSON documents on top of a [`KeyValueStore`].
//!
//! Reads never fail: a missing key, a backend error, malformed JSON or a
//! document from a newer schema all come back as `None` so the caller can
//! fall back to its empty default. Everything except a missing key is logged.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::error::Result;
use crate::store::KeyValueStore;

/// Schema version written into every persisted root document.
pub const SCHEMA_VERSION: u32 = 1;

/// A persisted root document that records its schema version.
pub trait Versioned {
    /// Version the document was written with (0 if it predates versioning).
    fn schema_version(&self) -> u32;

    /// Bring an older document up to [`SCHEMA_VERSION`] in memory.
    ///
    /// `now` stands in for any timestamp the older document lacks.
    fn upgrade(&mut self, now: DateTime<Utc>);
}

/// Load and decode the document stored under `key`.
///
/// Legacy documents are upgraded as of `now`.
pub fn load<T>(store: &dyn KeyValueStore, key: &str, now: DateTime<Utc>) -> Option<T>
where
    T: DeserializeOwned + Versioned,
{
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            error!("Failed to read '{}' from {} store: {}", key, store.name(), e);
            return None;
        }
    };

    let mut doc: T = match serde_json::from_str(&raw) {
        Ok(doc) => doc,
        Err(e) => {
            warn!("Ignoring unreadable data under '{}': {}", key, e);
            return None;
        }
    };

    let version = doc.schema_version();
    if version > SCHEMA_VERSION {
        warn!(
            "Ignoring data under '{}': schema version {} is newer than {}",
            key, version, SCHEMA_VERSION
        );
        return None;
    }
    if version < SCHEMA_VERSION {
        debug!(
            "Upgrading '{}' from schema version {} to {}",
            key, version, SCHEMA_VERSION
        );
        doc.upgrade(now);
    }

    Some(doc)
}

/// Encode `doc` and store it under `key`.
///
/// # Errors
///
/// Returns an error if encoding fails or the store rejects the write.
pub fn save<T: Serialize>(store: &dyn KeyValueStore, key: &str, doc: &T) -> Result<()> {
    let raw = serde_json::to_string(doc)?;
    store.set(key, &raw)?;
    debug!("Saved {} bytes under '{}'", raw.len(), key);
    Ok(())
}

/// Pretty-printed JSON for user-facing export.
///
/// Falls back to `{}` if encoding fails.
pub fn to_pretty_json<T: Serialize>(doc: &T) -> String {
    serde_json::to_string_pretty(doc).unwrap_or_else(|e| {
        error!("Failed to encode export: {}", e);
        String::from("{}")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::TimeZone;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    struct Doc {
        #[serde(default)]
        schema_version: u32,
        count: u32,
    }

    impl Versioned for Doc {
        fn schema_version(&self) -> u32 {
            self.schema_version
        }

        fn upgrade(&mut self, _now: DateTime<Utc>) {
            self.schema_version = SCHEMA_VERSION;
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_load_missing_is_none() {
        let store = MemoryStore::new();
        assert!(load::<Doc>(&store, "doc", now()).is_none());
    }

    #[test]
    fn test_save_then_load() {
        let store = MemoryStore::new();
        let doc = Doc {
            schema_version: SCHEMA_VERSION,
            count: 3,
        };
        save(&store, "doc", &doc).unwrap();
        assert_eq!(load::<Doc>(&store, "doc", now()), Some(doc));
    }

    #[test]
    fn test_load_corrupt_is_none() {
        let store = MemoryStore::new();
        store.set("doc", "{not json").unwrap();
        assert!(load::<Doc>(&store, "doc", now()).is_none());

        store.set("doc", r#"{"count":"three"}"#).unwrap();
        assert!(load::<Doc>(&store, "doc", now()).is_none());
    }

    #[test]
    fn test_load_upgrades_legacy_document() {
        let store = MemoryStore::new();
        store.set("doc", r#"{"count":7}"#).unwrap();

        let doc = load::<Doc>(&store, "doc", now()).unwrap();
        assert_eq!(doc.schema_version, SCHEMA_VERSION);
        assert_eq!(doc.count, 7);
    }

    #[test]
    fn test_load_rejects_newer_schema() {
        let store = MemoryStore::new();
        store
            .set("doc", r#"{"schemaVersion":99,"count":1}"#)
            .unwrap();
        assert!(load::<Doc>(&store, "doc", now()).is_none());
    }

    #[test]
    fn test_save_propagates_quota_error() {
        let store = MemoryStore::with_quota(5);
        let doc = Doc {
            schema_version: SCHEMA_VERSION,
            count: 1,
        };
        assert!(save(&store, "doc", &doc).unwrap_err().is_quota_exceeded());
    }

    #[test]
    fn test_pretty_json_is_indented() {
        let doc = Doc {
            schema_version: SCHEMA_VERSION,
            count: 1,
        };
        let text = to_pretty_json(&doc);
        assert!(text.contains("\n  \"count\": 1"));
    }
}
