//! `mekong-tracker` - download and feedback tracking for the Mekong Pathfinder site
//!
//! Two independent trackers persist JSON documents into an injected
//! [`KeyValueStore`]:
//! - [`DownloadTracker`] keeps every APK download request and a running total
//! - [`FeedbackTracker`] keeps reviews newest-first with a mean rating and
//!   per-category counts recomputed on every write
//!
//! Tracker operations never return errors. Storage and decoding failures are
//! logged and turned into empty defaults or a failure flag.
//!
//! ```
//! use std::sync::Arc;
//! use mekong_tracker::{DownloadTracker, MemoryStore};
//!
//! let tracker = DownloadTracker::new(Arc::new(MemoryStore::new()));
//! let outcome = tracker.record_download("Alice", "a@x.com");
//! assert!(outcome.success);
//! assert_eq!(tracker.stats().total_downloads, 1);
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod clock;
pub mod config;
pub mod download;
pub mod error;
pub mod feedback;
pub mod logging;
pub mod persist;
pub mod report;
pub mod store;
pub mod validate;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Backend, Config};
pub use download::{DownloadCollection, DownloadOutcome, DownloadRecord, DownloadTracker};
pub use error::{Error, Result};
pub use feedback::{
    FeedbackCategory, FeedbackRecord, FeedbackStats, FeedbackTracker, NewFeedback,
};
pub use logging::init_logging;
pub use report::AdminReport;
pub use store::{FileStore, KeyValueStore, MemoryStore, SqliteStore};
