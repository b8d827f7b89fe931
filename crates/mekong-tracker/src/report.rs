//! Admin statistics combining both trackers.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::download::DownloadCollection;
use crate::feedback::{FeedbackCategory, FeedbackStats};

/// Count and share of one feedback category.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryShare {
    /// The category.
    pub category: FeedbackCategory,
    /// Records in the category.
    pub count: usize,
    /// Percentage of all records.
    pub percent: f64,
}

/// Ratings bucketed to whole stars.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingDistribution {
    /// Ratings below half a star.
    pub unrated: usize,
    /// Counts for 1 through 5 stars, index 0 is one star.
    pub stars: [usize; 5],
}

impl RatingDistribution {
    /// Add one rating, rounded to the nearest star.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn add(&mut self, rating: f64) {
        let star = rating.round();
        if !star.is_finite() || star < 1.0 {
            self.unrated += 1;
        } else {
            let index = (star.min(5.0) as usize) - 1;
            self.stars[index] += 1;
        }
    }

    /// Count for `star` (1 to 5), 0 otherwise.
    #[must_use]
    pub fn count(&self, star: usize) -> usize {
        match star {
            1..=5 => self.stars[star - 1],
            _ => 0,
        }
    }
}

/// Summary shown on the admin statistics page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminReport {
    /// Recorded download requests.
    pub total_downloads: usize,
    /// Recorded feedback submissions.
    pub total_feedbacks: usize,
    /// Mean feedback rating.
    pub average_rating: f64,
    /// One entry per category, in [`FeedbackCategory::ALL`] order.
    pub categories: Vec<CategoryShare>,
    /// Whole-star rating histogram.
    pub ratings: RatingDistribution,
    /// Likes across all feedback.
    pub total_likes: u64,
    /// Latest download time, if any.
    pub last_download: Option<DateTime<Utc>>,
    /// Time of the newest feedback, if any.
    pub last_feedback: Option<DateTime<Utc>>,
}

impl AdminReport {
    /// Summarize the two stored documents.
    #[must_use]
    pub fn build(downloads: &DownloadCollection, feedback: &FeedbackStats) -> Self {
        let categories = FeedbackCategory::ALL
            .into_iter()
            .map(|category| CategoryShare {
                category,
                count: feedback.category_count(category),
                percent: feedback.category_percentage(category),
            })
            .collect();

        let mut ratings = RatingDistribution::default();
        for record in &feedback.recent_feedbacks {
            ratings.add(record.rating);
        }

        Self {
            total_downloads: downloads.total_downloads,
            total_feedbacks: feedback.total_feedbacks,
            average_rating: feedback.average_rating,
            categories,
            ratings,
            total_likes: feedback.total_likes(),
            last_download: downloads.downloads.iter().map(|d| d.download_time).max(),
            last_feedback: feedback.recent_feedbacks.iter().map(|f| f.timestamp).max(),
        }
    }
}
