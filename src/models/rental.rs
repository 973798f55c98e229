use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{date_input, AccountBrief, ItemBrief};

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum RentalStatus {
    Pending,
    Approved,
    Rejected,
    Active,
    Completed,
    Cancelled,
}

impl RentalStatus {
    /// Statuses that reserve the rental period.
    pub const BLOCKING: [RentalStatus; 3] = [
        RentalStatus::Pending,
        RentalStatus::Approved,
        RentalStatus::Active,
    ];

    pub fn is_blocking(&self) -> bool {
        Self::BLOCKING.contains(self)
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Rental {
    pub id: i64,
    pub item_id: i64,
    pub renter_acc_id: i64,
    pub rental_start_date: DateTime<Utc>,
    pub rental_end_date: DateTime<Utc>,
    pub total_rental_price: f64,
    pub rental_status: RentalStatus,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Rental with its item and renter.
#[derive(Debug, Clone, Serialize)]
pub struct RentalDetails {
    #[serde(flatten)]
    pub rental: Rental,
    pub item: Option<ItemBrief>,
    pub renter: Option<AccountBrief>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRentalRequest {
    pub item_id: i64,
    #[serde(deserialize_with = "date_input::deserialize")]
    pub rental_start_date: DateTime<Utc>,
    #[serde(deserialize_with = "date_input::deserialize")]
    pub rental_end_date: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateRentalRequest {
    #[serde(default, deserialize_with = "date_input::deserialize_option")]
    pub rental_start_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "date_input::deserialize_option")]
    pub rental_end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RejectRentalRequest {
    pub rejection_reason: Option<String>,
}

/// Number of billed days; partial days round up.
pub fn rental_days(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    let ms = (end - start).num_milliseconds();
    if ms <= 0 {
        return 0;
    }
    (ms + MS_PER_DAY - 1) / MS_PER_DAY
}

/// Daily price times billed days.
pub fn total_price(daily_price: f64, start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    daily_price * rental_days(start, end) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_rental_days_whole_days() {
        assert_eq!(rental_days(at(1, 0), at(2, 0)), 1);
        assert_eq!(rental_days(at(1, 0), at(8, 0)), 7);
    }

    #[test]
    fn test_rental_days_rounds_up() {
        assert_eq!(rental_days(at(1, 0), at(1, 1)), 1);
        assert_eq!(rental_days(at(1, 12), at(3, 0)), 2);
    }

    #[test]
    fn test_rental_days_empty_period() {
        assert_eq!(rental_days(at(2, 0), at(2, 0)), 0);
        assert_eq!(rental_days(at(3, 0), at(2, 0)), 0);
    }

    #[test]
    fn test_total_price() {
        assert_eq!(total_price(12.5, at(1, 0), at(5, 0)), 50.0);
    }

    #[test]
    fn test_blocking_statuses() {
        assert!(RentalStatus::Pending.is_blocking());
        assert!(RentalStatus::Approved.is_blocking());
        assert!(RentalStatus::Active.is_blocking());
        assert!(!RentalStatus::Rejected.is_blocking());
        assert!(!RentalStatus::Completed.is_blocking());
        assert!(!RentalStatus::Cancelled.is_blocking());
    }
}
