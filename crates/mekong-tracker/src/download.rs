//! Download request tracking.
//!
//! Every APK download form submission is appended to a single
//! [`DownloadCollection`] document together with a running total.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::clock::{next_id, Clock, SystemClock};
use crate::persist::{self, Versioned, SCHEMA_VERSION};
use crate::store::KeyValueStore;

/// Storage key for the download collection.
pub const DEFAULT_DOWNLOADS_KEY: &str = "mekong_pathfinder_downloads";

/// A single download request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRecord {
    /// Creation time in milliseconds since the epoch, unique per record.
    pub id: i64,
    /// Name entered on the form.
    pub name: String,
    /// Email entered on the form.
    pub email: String,
    /// When the request was recorded.
    pub download_time: DateTime<Utc>,
}

/// The persisted root document: every download plus the running total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadCollection {
    /// Records in insertion order.
    #[serde(default)]
    pub downloads: Vec<DownloadRecord>,
    /// Always `downloads.len()` after a write.
    #[serde(default)]
    pub total_downloads: usize,
    /// Time of the last write. Documents without one are stamped when upgraded.
    #[serde(default)]
    pub last_updated: DateTime<Utc>,
    /// Document schema version.
    #[serde(default)]
    pub schema_version: u32,
}

impl DownloadCollection {
    /// An empty collection stamped with `now`.
    #[must_use]
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            downloads: Vec::new(),
            total_downloads: 0,
            last_updated: now,
            schema_version: SCHEMA_VERSION,
        }
    }

    /// The record with the highest id.
    #[must_use]
    pub fn newest(&self) -> Option<&DownloadRecord> {
        self.downloads.iter().max_by_key(|d| d.id)
    }

    /// Whether no downloads have been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.downloads.is_empty()
    }
}

impl Versioned for DownloadCollection {
    fn schema_version(&self) -> u32 {
        self.schema_version
    }

    fn upgrade(&mut self, now: DateTime<Utc>) {
        self.total_downloads = self.downloads.len();
        if self.last_updated == DateTime::<Utc>::default() {
            self.last_updated = now;
        }
        self.schema_version = SCHEMA_VERSION;
    }
}

/// Result of [`DownloadTracker::record_download`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadOutcome {
    /// Whether the record was persisted.
    pub success: bool,
    /// Running total after the write, 0 on failure.
    pub total_downloads: usize,
}

/// Appends download requests to a key-value store.
#[derive(Debug, Clone)]
pub struct DownloadTracker {
    store: Arc<dyn KeyValueStore>,
    key: String,
    clock: Arc<dyn Clock>,
}

impl DownloadTracker {
    /// Track downloads in `store` under [`DEFAULT_DOWNLOADS_KEY`] using wall-clock time.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            key: DEFAULT_DOWNLOADS_KEY.to_string(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Use a different storage key.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Use a different time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Storage key in use.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Append a download request and persist the collection.
    ///
    /// Persistence failures are logged and reported as
    /// `success: false, total_downloads: 0`, as is a stored collection whose
    /// newest id leaves no room for another.
    pub fn record_download(&self, name: &str, email: &str) -> DownloadOutcome {
        let now = self.clock.now();
        let mut collection = self.stats();

        let Some(id) = next_id(now, collection.newest().map(|d| d.id)) else {
            warn!("No download id left after the newest stored record");
            return DownloadOutcome {
                success: false,
                total_downloads: 0,
            };
        };
        collection.downloads.push(DownloadRecord {
            id,
            name: name.to_string(),
            email: email.to_string(),
            download_time: now,
        });
        collection.total_downloads = collection.downloads.len();
        collection.last_updated = now;
        collection.schema_version = SCHEMA_VERSION;

        match persist::save(self.store.as_ref(), &self.key, &collection) {
            Ok(()) => {
                info!(
                    "Recorded download {} (total {})",
                    id, collection.total_downloads
                );
                DownloadOutcome {
                    success: true,
                    total_downloads: collection.total_downloads,
                }
            }
            Err(e) => {
                error!("Failed to save download record: {}", e);
                DownloadOutcome {
                    success: false,
                    total_downloads: 0,
                }
            }
        }
    }

    /// The stored collection, or an empty one if absent or unreadable.
    #[must_use]
    pub fn stats(&self) -> DownloadCollection {
        let now = self.clock.now();
        persist::load(self.store.as_ref(), &self.key, now)
            .unwrap_or_else(|| DownloadCollection::empty(now))
    }

    /// Up to `limit` records, most recent first.
    ///
    /// Records with equal `download_time` are ordered by id, newest first.
    #[must_use]
    pub fn get_recent(&self, limit: usize) -> Vec<DownloadRecord> {
        let mut downloads = self.stats().downloads;
        downloads.sort_by(|a, b| {
            b.download_time
                .cmp(&a.download_time)
                .then_with(|| b.id.cmp(&a.id))
        });
        downloads.truncate(limit);
        debug!("Returning {} recent downloads", downloads.len());
        downloads
    }

    /// The full collection as pretty-printed JSON.
    #[must_use]
    pub fn export_as_text(&self) -> String {
        persist::to_pretty_json(&self.stats())
    }
}
