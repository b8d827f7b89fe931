//! Feedback and review tracking.
//!
//! Submissions are kept newest-first inside a single [`FeedbackStats`]
//! document whose aggregates (count, mean rating, per-category counts) are
//! recomputed over the whole list on every submission.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, error, info, warn};

use crate::clock::{next_id, Clock, SystemClock};
use crate::error::Error;
use crate::persist::{self, Versioned, SCHEMA_VERSION};
use crate::store::KeyValueStore;
use crate::validate;

/// Storage key for the feedback document.
pub const DEFAULT_FEEDBACKS_KEY: &str = "mekong_pathfinder_feedbacks";

/// Highest rating a review can carry.
pub const MAX_RATING: f64 = 5.0;

/// Name shown in place of the submitter's for anonymous reviews.
pub const ANONYMOUS_NAME: &str = "Anonymous";

/// What a piece of feedback is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackCategory {
    /// A feature request.
    Feature,
    /// A suggestion to improve something existing.
    Improvement,
    /// A bug report.
    Bug,
    /// Anything else.
    Other,
}

impl FeedbackCategory {
    /// Every category, in display order.
    pub const ALL: [Self; 4] = [Self::Feature, Self::Improvement, Self::Bug, Self::Other];

    /// The serialized name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Feature => "feature",
            Self::Improvement => "improvement",
            Self::Bug => "bug",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for FeedbackCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedbackCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                Error::invalid_input(
                    "category",
                    format!("'{s}' is not one of feature, improvement, bug, other"),
                )
            })
    }
}

/// A feedback submission before the tracker assigns id, timestamp and likes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFeedback {
    /// Submitter name.
    pub name: String,
    /// Submitter email.
    pub email: String,
    /// Optional phone number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Feedback category.
    pub category: FeedbackCategory,
    /// Rating in `[0, 5]`.
    pub rating: f64,
    /// Short headline.
    pub title: String,
    /// Body text.
    pub content: String,
    /// Hide the submitter's name when displayed.
    #[serde(default)]
    pub is_anonymous: bool,
    /// Optional avatar image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// A stored feedback record. Only `likes` changes after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRecord {
    /// Creation time in milliseconds since the epoch, as a string.
    pub id: String,
    /// Submitter name.
    pub name: String,
    /// Submitter email.
    pub email: String,
    /// Optional phone number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Feedback category.
    pub category: FeedbackCategory,
    /// Rating in `[0, 5]`.
    pub rating: f64,
    /// Short headline.
    pub title: String,
    /// Body text.
    pub content: String,
    /// Hide the submitter's name when displayed.
    #[serde(default)]
    pub is_anonymous: bool,
    /// When the feedback was recorded.
    pub timestamp: DateTime<Utc>,
    /// Number of likes.
    #[serde(default)]
    pub likes: u64,
    /// Optional avatar image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl FeedbackRecord {
    /// Name to show publicly.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.is_anonymous {
            ANONYMOUS_NAME
        } else {
            &self.name
        }
    }

    /// The id as a number, if it is one.
    #[must_use]
    pub fn numeric_id(&self) -> Option<i64> {
        self.id.parse().ok()
    }
}

/// The persisted root document: every feedback plus derived aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackStats {
    /// Always `recent_feedbacks.len()` after a write.
    #[serde(default)]
    pub total_feedbacks: usize,
    /// Mean rating, 0 when there are no records.
    #[serde(default, deserialize_with = "finite_or_zero")]
    pub average_rating: f64,
    /// Record count per category present.
    #[serde(default)]
    pub category_stats: BTreeMap<FeedbackCategory, usize>,
    /// Records, newest first.
    #[serde(default)]
    pub recent_feedbacks: Vec<FeedbackRecord>,
    /// Time of the last write. Documents without one are stamped when upgraded.
    #[serde(default)]
    pub last_updated: DateTime<Utc>,
    /// Document schema version.
    #[serde(default)]
    pub schema_version: u32,
}

/// Older writers stored an empty average as `null`.
fn finite_or_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?;
    Ok(value.filter(|v| v.is_finite()).unwrap_or(0.0))
}

impl FeedbackStats {
    /// Zeroed stats stamped with `now`.
    #[must_use]
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            total_feedbacks: 0,
            average_rating: 0.0,
            category_stats: BTreeMap::new(),
            recent_feedbacks: Vec::new(),
            last_updated: now,
            schema_version: SCHEMA_VERSION,
        }
    }

    /// Recompute count, mean rating and category counts from the records.
    #[allow(clippy::cast_precision_loss)]
    pub fn recompute(&mut self) {
        self.total_feedbacks = self.recent_feedbacks.len();
        self.average_rating = if self.recent_feedbacks.is_empty() {
            0.0
        } else {
            let sum: f64 = self.recent_feedbacks.iter().map(|f| f.rating).sum();
            sum / self.recent_feedbacks.len() as f64
        };
        self.category_stats.clear();
        for feedback in &self.recent_feedbacks {
            *self.category_stats.entry(feedback.category).or_insert(0) += 1;
        }
    }

    /// Number of records in `category`.
    #[must_use]
    pub fn category_count(&self, category: FeedbackCategory) -> usize {
        self.category_stats.get(&category).copied().unwrap_or(0)
    }

    /// Share of records in `category` as a percentage, 0 when empty.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn category_percentage(&self, category: FeedbackCategory) -> f64 {
        if self.total_feedbacks == 0 {
            return 0.0;
        }
        self.category_count(category) as f64 * 100.0 / self.total_feedbacks as f64
    }

    /// Look up a record by id.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&FeedbackRecord> {
        self.recent_feedbacks.iter().find(|f| f.id == id)
    }

    /// Sum of likes over all records.
    #[must_use]
    pub fn total_likes(&self) -> u64 {
        self.recent_feedbacks.iter().map(|f| f.likes).sum()
    }

    fn newest_numeric_id(&self) -> Option<i64> {
        self.recent_feedbacks
            .iter()
            .filter_map(FeedbackRecord::numeric_id)
            .max()
    }
}

impl Versioned for FeedbackStats {
    fn schema_version(&self) -> u32 {
        self.schema_version
    }

    fn upgrade(&mut self, now: DateTime<Utc>) {
        self.recompute();
        if self.last_updated == DateTime::<Utc>::default() {
            self.last_updated = now;
        }
        self.schema_version = SCHEMA_VERSION;
    }
}

/// Records feedback into a key-value store and keeps its aggregates current.
#[derive(Debug, Clone)]
pub struct FeedbackTracker {
    store: Arc<dyn KeyValueStore>,
    key: String,
    clock: Arc<dyn Clock>,
}

impl FeedbackTracker {
    /// Track feedback in `store` under [`DEFAULT_FEEDBACKS_KEY`] using wall-clock time.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            key: DEFAULT_FEEDBACKS_KEY.to_string(),
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

    /// Prepend a new record and persist the recomputed stats.
    ///
    /// Returns `false` without writing if the rating is not a number in
    /// `[0, 5]` or no id is left after the newest stored one. Also returns
    /// `false` if the stats could not be saved. Every failure is logged.
    /// Callers re-read [`FeedbackTracker::stats`] to see the result.
    pub fn record_feedback(&self, feedback: NewFeedback) -> bool {
        if let Err(e) = validate::rating(feedback.rating) {
            warn!("Rejected feedback: {}", e);
            return false;
        }

        let now = self.clock.now();
        let mut stats = self.stats();

        let Some(id) = next_id(now, stats.newest_numeric_id()) else {
            warn!("No feedback id left after the newest stored record");
            return false;
        };
        let id = id.to_string();
        let record = FeedbackRecord {
            id: id.clone(),
            name: feedback.name,
            email: feedback.email,
            phone: feedback.phone,
            category: feedback.category,
            rating: feedback.rating,
            title: feedback.title,
            content: feedback.content,
            is_anonymous: feedback.is_anonymous,
            timestamp: now,
            likes: 0,
            avatar: feedback.avatar,
        };
        stats.recent_feedbacks.insert(0, record);
        stats.recompute();
        stats.last_updated = now;
        stats.schema_version = SCHEMA_VERSION;

        match persist::save(self.store.as_ref(), &self.key, &stats) {
            Ok(()) => {
                info!(
                    "Recorded feedback {} (total {}, average {:.2})",
                    id, stats.total_feedbacks, stats.average_rating
                );
                true
            }
            Err(e) => {
                error!("Failed to save feedback: {}", e);
                false
            }
        }
    }

    /// The stored stats, or zeroed stats if absent or unreadable.
    #[must_use]
    pub fn stats(&self) -> FeedbackStats {
        let now = self.clock.now();
        persist::load(self.store.as_ref(), &self.key, now)
            .unwrap_or_else(|| FeedbackStats::empty(now))
    }

    /// The first `limit` records, newest first.
    #[must_use]
    pub fn get_recent(&self, limit: usize) -> Vec<FeedbackRecord> {
        let mut feedbacks = self.stats().recent_feedbacks;
        feedbacks.truncate(limit);
        feedbacks
    }

    /// Add `increment` likes to the record with `id`.
    ///
    /// An unknown id changes nothing. Returns whether a record was updated
    /// and saved.
    pub fn like_feedback(&self, id: &str, increment: u64) -> bool {
        let mut stats = self.stats();
        let Some(record) = stats.recent_feedbacks.iter_mut().find(|f| f.id == id) else {
            debug!("No feedback with id {} to like", id);
            return false;
        };
        record.likes = record.likes.saturating_add(increment);
        let likes = record.likes;
        stats.last_updated = self.clock.now();

        match persist::save(self.store.as_ref(), &self.key, &stats) {
            Ok(()) => {
                debug!("Feedback {} now has {} likes", id, likes);
                true
            }
            Err(e) => {
                error!("Failed to save like for feedback {}: {}", id, e);
                false
            }
        }
    }

    /// The full stats document as pretty-printed JSON.
    #[must_use]
    pub fn export_as_text(&self) -> String {
        persist::to_pretty_json(&self.stats())
    }

    /// Delete all stored feedback. Returns `false` if the store refused.
    pub fn clear_all(&self) -> bool {
        match self.store.remove(&self.key) {
            Ok(()) => {
                info!("Cleared all feedback under '{}'", self.key);
                true
            }
            Err(e) => {
                error!("Failed to clear feedback: {}", e);
                false
            }
        }
    }
}
