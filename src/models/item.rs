use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum ItemStatus {
    Available,
    Rented,
    Unavailable,
}

/// Moderation state of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        }
    }
}

/// Outcome of an admin review of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationDecision {
    Approve,
    Reject,
}

impl ModerationDecision {
    pub fn approval_status(self) -> ApprovalStatus {
        match self {
            ModerationDecision::Approve => ApprovalStatus::Approved,
            ModerationDecision::Reject => ApprovalStatus::Rejected,
        }
    }

    pub fn tracking_action(self) -> TrackingAction {
        match self {
            ModerationDecision::Approve => TrackingAction::Approved,
            ModerationDecision::Reject => TrackingAction::Rejected,
        }
    }
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Available => "Available",
            ItemStatus::Rented => "Rented",
            ItemStatus::Unavailable => "Unavailable",
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Item {
    pub id: i64,
    pub acc_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub image: Option<String>,
    pub status: ItemStatus,
    pub approval_status: ApprovalStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Item {
    pub fn is_rentable(&self) -> bool {
        self.status == ItemStatus::Available && self.approval_status == ApprovalStatus::Approved
    }
}

/// Item with the owner's address, for the detail view.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ItemWithOwner {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub item: Item,
    pub owner_address: String,
}

/// Compact item view embedded in rentals and feedback.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ItemBrief {
    pub id: i64,
    pub acc_id: i64,
    pub name: String,
    pub price: f64,
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub image: Option<String>,
    /// Admins may list on behalf of another account.
    pub acc_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateItemRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub image: Option<String>,
    pub status: Option<ItemStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ModerateItemRequest {
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ItemsQuery {
    pub status: Option<ItemStatus>,
    pub approval_status: Option<ApprovalStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum TrackingAction {
    Created,
    Updated,
    Approved,
    Rejected,
    Deleted,
}

/// History row for an item listing.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ItemTracking {
    pub id: i64,
    pub item_id: Option<i64>,
    pub original_item_id: Option<i64>,
    pub acc_id: i64,
    pub action: TrackingAction,
    pub previous_status: Option<String>,
    pub new_status: Option<String>,
    pub previous_approval_status: Option<String>,
    pub new_approval_status: Option<String>,
    pub previous_name: Option<String>,
    pub new_name: Option<String>,
    pub previous_description: Option<String>,
    pub new_description: Option<String>,
    pub notes: Option<String>,
    pub admin_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// A tracking row to be written, describing a before/after pair.
#[derive(Debug, Clone)]
pub struct NewTracking {
    pub action: TrackingAction,
    pub before: Option<Item>,
    pub after: Option<Item>,
    pub notes: Option<String>,
    pub admin_id: Option<i64>,
}
