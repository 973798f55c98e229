use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};

use super::{date_input, AccountContact};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum SubscriptionPlan {
    #[serde(rename = "1_month")]
    #[sqlx(rename = "1_month")]
    OneMonth,
    #[serde(rename = "3_months")]
    #[sqlx(rename = "3_months")]
    ThreeMonths,
    #[serde(rename = "6_months")]
    #[sqlx(rename = "6_months")]
    SixMonths,
}

impl SubscriptionPlan {
    pub fn months(&self) -> u32 {
        match self {
            SubscriptionPlan::OneMonth => 1,
            SubscriptionPlan::ThreeMonths => 3,
            SubscriptionPlan::SixMonths => 6,
        }
    }

    /// End of a subscription starting at `start`. Calendar months, clamped
    /// to the last day of shorter months.
    pub fn end_date(&self, start: DateTime<Utc>) -> Option<DateTime<Utc>> {
        start.checked_add_months(Months::new(self.months()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Subscription {
    pub id: i64,
    pub acc_id: i64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub subscription_plan: SubscriptionPlan,
    pub plan_duration: i64,
    pub subscription_receipt: String,
    pub status: SubscriptionStatus,
    pub admin_remarks: Option<String>,
    pub reviewed_by: Option<i64>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionDetails {
    #[serde(flatten)]
    pub subscription: Subscription,
    pub account: Option<AccountContact>,
}

/// Account holding an approved, unexpired subscription.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Subscriber {
    pub acc_id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub image: Option<String>,
    pub subscription_plan: SubscriptionPlan,
    pub subscription_end_date: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSubscriptionRequest {
    #[serde(deserialize_with = "date_input::deserialize")]
    pub start_date: DateTime<Utc>,
    pub subscription_plan: SubscriptionPlan,
    pub subscription_receipt: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateSubscriptionRequest {
    #[serde(default, deserialize_with = "date_input::deserialize_option")]
    pub start_date: Option<DateTime<Utc>>,
    pub subscription_plan: Option<SubscriptionPlan>,
    pub subscription_receipt: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewSubscriptionRequest {
    pub status: SubscriptionStatus,
    pub admin_remarks: Option<String>,
}
