use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::{accounts, now};
use crate::models::{
    Subscriber, Subscription, SubscriptionDetails, SubscriptionPlan, SubscriptionStatus,
};

const SUBSCRIPTION_COLUMNS: &str = "id, acc_id, start_date, end_date, subscription_plan, \
     plan_duration, subscription_receipt, status, admin_remarks, reviewed_by, reviewed_at";

/// A subscription period as requested by its owner.
#[derive(Debug, Clone)]
pub struct SubscriptionTerms {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub plan: SubscriptionPlan,
    pub receipt: String,
}

pub async fn insert(
    pool: &SqlitePool,
    acc_id: i64,
    terms: &SubscriptionTerms,
) -> Result<Subscription, sqlx::Error> {
    sqlx::query_as::<_, Subscription>(&format!(
        r#"
        INSERT INTO subscriptions (acc_id, start_date, end_date, subscription_plan,
                                   plan_duration, subscription_receipt, status)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        RETURNING {SUBSCRIPTION_COLUMNS}
        "#
    ))
    .bind(acc_id)
    .bind(terms.start_date)
    .bind(terms.end_date)
    .bind(terms.plan)
    .bind(i64::from(terms.plan.months()))
    .bind(&terms.receipt)
    .bind(SubscriptionStatus::Pending)
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Subscription>, sqlx::Error> {
    sqlx::query_as::<_, Subscription>(&format!(
        "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Every subscription with its account contact, newest first.
pub async fn list_all(pool: &SqlitePool) -> Result<Vec<SubscriptionDetails>, sqlx::Error> {
    let subscriptions = sqlx::query_as::<_, Subscription>(&format!(
        "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions ORDER BY id DESC"
    ))
    .fetch_all(pool)
    .await?;

    let owners = accounts::contacts(pool, subscriptions.iter().map(|s| s.acc_id)).await?;
    Ok(subscriptions
        .into_iter()
        .map(|subscription| SubscriptionDetails {
            account: owners.get(&subscription.acc_id).cloned(),
            subscription,
        })
        .collect())
}

/// Accounts with an approved subscription still running at `at`. An account
/// with several qualifying subscriptions is listed once, with the latest end.
pub async fn active_subscribers(
    pool: &SqlitePool,
    at: DateTime<Utc>,
) -> Result<Vec<Subscriber>, sqlx::Error> {
    sqlx::query_as::<_, Subscriber>(
        r#"
        SELECT a.id AS acc_id, a.email, a.first_name, a.last_name, a.image,
               s.subscription_plan, s.end_date AS subscription_end_date
        FROM subscriptions s
        JOIN accounts a ON a.id = s.acc_id
        WHERE s.status = 'approved'
          AND s.end_date > ?
          AND s.end_date = (
              SELECT MAX(s2.end_date) FROM subscriptions s2
              WHERE s2.acc_id = s.acc_id AND s2.status = 'approved'
          )
        GROUP BY a.id
        ORDER BY s.end_date DESC
        "#,
    )
    .bind(at)
    .fetch_all(pool)
    .await
}

/// Replace the requested period. Review fields are left untouched.
pub async fn update_terms(
    pool: &SqlitePool,
    id: i64,
    terms: &SubscriptionTerms,
) -> Result<Option<Subscription>, sqlx::Error> {
    sqlx::query_as::<_, Subscription>(&format!(
        r#"
        UPDATE subscriptions SET
            start_date = ?,
            end_date = ?,
            subscription_plan = ?,
            plan_duration = ?,
            subscription_receipt = ?
        WHERE id = ?
        RETURNING {SUBSCRIPTION_COLUMNS}
        "#
    ))
    .bind(terms.start_date)
    .bind(terms.end_date)
    .bind(terms.plan)
    .bind(i64::from(terms.plan.months()))
    .bind(&terms.receipt)
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Record an admin decision on a pending subscription. Returns `None` when
/// the subscription is missing or was already reviewed.
pub async fn review(
    pool: &SqlitePool,
    id: i64,
    status: SubscriptionStatus,
    admin_remarks: Option<&str>,
    reviewer_id: i64,
) -> Result<Option<Subscription>, sqlx::Error> {
    sqlx::query_as::<_, Subscription>(&format!(
        r#"
        UPDATE subscriptions SET status = ?, admin_remarks = ?, reviewed_by = ?, reviewed_at = ?
        WHERE id = ? AND status = 'pending'
        RETURNING {SUBSCRIPTION_COLUMNS}
        "#
    ))
    .bind(status)
    .bind(admin_remarks)
    .bind(reviewer_id)
    .bind(now())
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM subscriptions WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
