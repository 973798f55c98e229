use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AccountBrief, ItemBrief};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum FeedbackStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Feedback {
    pub id: i64,
    pub rent_item_id: i64,
    pub acc_id: i64,
    pub rating: i64,
    pub comment: Option<String>,
    pub status: FeedbackStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedbackDetails {
    #[serde(flatten)]
    pub feedback: Feedback,
    pub author: Option<AccountBrief>,
    pub item: Option<ItemBrief>,
}

#[derive(Debug, Deserialize)]
pub struct CreateFeedbackRequest {
    pub rent_item_id: i64,
    pub rating: i64,
    pub comment: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateFeedbackRequest {
    pub rating: Option<i64>,
    pub comment: Option<String>,
    pub status: Option<FeedbackStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RatingSummary {
    pub average_rating: f64,
    pub total_reviews: i64,
}

impl RatingSummary {
    /// Average rounded to one decimal; zero when there are no reviews.
    pub fn new(average: Option<f64>, total_reviews: i64) -> Self {
        let average_rating = match average {
            Some(avg) if total_reviews > 0 => (avg * 10.0).round() / 10.0,
            _ => 0.0,
        };
        Self {
            average_rating,
            total_reviews,
        }
    }
}
