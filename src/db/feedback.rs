use std::collections::HashMap;

use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use super::{accounts, items, now, push_id_list, unique_ids};
use crate::models::{
    Feedback, FeedbackDetails, FeedbackStatus, RatingSummary, UpdateFeedbackRequest,
};

const FEEDBACK_COLUMNS: &str =
    "f.id, f.rent_item_id, f.acc_id, f.rating, f.comment, f.status, f.created_at, f.updated_at";

pub async fn insert(
    pool: &SqlitePool,
    rent_item_id: i64,
    acc_id: i64,
    rating: i64,
    comment: Option<&str>,
) -> Result<Feedback, sqlx::Error> {
    sqlx::query_as::<_, Feedback>(
        r#"
        INSERT INTO feedback (rent_item_id, acc_id, rating, comment, status, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING id, rent_item_id, acc_id, rating, comment, status, created_at, updated_at
        "#,
    )
    .bind(rent_item_id)
    .bind(acc_id)
    .bind(rating)
    .bind(comment)
    .bind(FeedbackStatus::Active)
    .bind(now())
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Feedback>, sqlx::Error> {
    sqlx::query_as::<_, Feedback>(&format!(
        "SELECT {FEEDBACK_COLUMNS} FROM feedback f WHERE f.id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Any feedback for a rental, active or not.
pub async fn find_by_rental(
    pool: &SqlitePool,
    rent_item_id: i64,
) -> Result<Option<Feedback>, sqlx::Error> {
    sqlx::query_as::<_, Feedback>(&format!(
        "SELECT {FEEDBACK_COLUMNS} FROM feedback f WHERE f.rent_item_id = ?"
    ))
    .bind(rent_item_id)
    .fetch_optional(pool)
    .await
}

pub async fn find_active_by_rental(
    pool: &SqlitePool,
    rent_item_id: i64,
) -> Result<Option<Feedback>, sqlx::Error> {
    sqlx::query_as::<_, Feedback>(&format!(
        "SELECT {FEEDBACK_COLUMNS} FROM feedback f WHERE f.rent_item_id = ? AND f.status = 'Active'"
    ))
    .bind(rent_item_id)
    .fetch_optional(pool)
    .await
}

pub async fn list_all(pool: &SqlitePool) -> Result<Vec<Feedback>, sqlx::Error> {
    sqlx::query_as::<_, Feedback>(&format!(
        "SELECT {FEEDBACK_COLUMNS} FROM feedback f ORDER BY f.created_at DESC, f.id DESC"
    ))
    .fetch_all(pool)
    .await
}

pub async fn list_by_author(pool: &SqlitePool, acc_id: i64) -> Result<Vec<Feedback>, sqlx::Error> {
    sqlx::query_as::<_, Feedback>(&format!(
        "SELECT {FEEDBACK_COLUMNS} FROM feedback f WHERE f.acc_id = ? ORDER BY f.created_at DESC, f.id DESC"
    ))
    .bind(acc_id)
    .fetch_all(pool)
    .await
}

/// Active feedback left on any rental of an item, newest first.
pub async fn list_active_for_item(
    pool: &SqlitePool,
    item_id: i64,
) -> Result<Vec<Feedback>, sqlx::Error> {
    sqlx::query_as::<_, Feedback>(&format!(
        r#"
        SELECT {FEEDBACK_COLUMNS}
        FROM feedback f
        JOIN rentals r ON r.id = f.rent_item_id
        WHERE r.item_id = ? AND f.status = 'Active'
        ORDER BY f.created_at DESC, f.id DESC
        "#
    ))
    .bind(item_id)
    .fetch_all(pool)
    .await
}

pub async fn rating_summary(pool: &SqlitePool, item_id: i64) -> Result<RatingSummary, sqlx::Error> {
    let (average, total): (Option<f64>, i64) = sqlx::query_as(
        r#"
        SELECT AVG(CAST(f.rating AS REAL)), COUNT(f.id)
        FROM feedback f
        JOIN rentals r ON r.id = f.rent_item_id
        WHERE r.item_id = ? AND f.status = 'Active'
        "#,
    )
    .bind(item_id)
    .fetch_one(pool)
    .await?;
    Ok(RatingSummary::new(average, total))
}

pub async fn update(
    pool: &SqlitePool,
    id: i64,
    changes: &UpdateFeedbackRequest,
) -> Result<Option<Feedback>, sqlx::Error> {
    sqlx::query_as::<_, Feedback>(
        r#"
        UPDATE feedback SET
            rating = COALESCE(?, rating),
            comment = COALESCE(?, comment),
            status = COALESCE(?, status),
            updated_at = ?
        WHERE id = ?
        RETURNING id, rent_item_id, acc_id, rating, comment, status, created_at, updated_at
        "#,
    )
    .bind(changes.rating)
    .bind(&changes.comment)
    .bind(changes.status)
    .bind(now())
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Soft delete: the row stays but no longer counts.
pub async fn deactivate(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE feedback SET status = ?, updated_at = ? WHERE id = ?")
        .bind(FeedbackStatus::Inactive)
        .bind(now())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Attach author and item briefs.
pub async fn with_details(
    pool: &SqlitePool,
    entries: Vec<Feedback>,
) -> Result<Vec<FeedbackDetails>, sqlx::Error> {
    let authors = accounts::briefs(pool, entries.iter().map(|f| f.acc_id)).await?;

    let rental_ids = unique_ids(entries.iter().map(|f| f.rent_item_id));
    let item_of_rental: HashMap<i64, i64> = if rental_ids.is_empty() {
        HashMap::new()
    } else {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT id, item_id FROM rentals WHERE id");
        push_id_list(&mut qb, &rental_ids);
        qb.build_query_as::<(i64, i64)>()
            .fetch_all(pool)
            .await?
            .into_iter()
            .collect()
    };
    let items = items::briefs(pool, item_of_rental.values().copied()).await?;

    Ok(entries
        .into_iter()
        .map(|feedback| {
            let item = item_of_rental
                .get(&feedback.rent_item_id)
                .and_then(|id| items.get(id).cloned());
            FeedbackDetails {
                author: authors.get(&feedback.acc_id).cloned(),
                item,
                feedback,
            }
        })
        .collect())
}
