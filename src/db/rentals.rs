use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};

use super::{accounts, items, now};
use crate::models::{ItemStatus, Rental, RentalDetails, RentalStatus};

const RENTAL_COLUMNS: &str = "id, item_id, renter_acc_id, rental_start_date, rental_end_date, \
     total_rental_price, rental_status, rejection_reason, created_at, updated_at";

/// Matches a rental of item `?` that reserves part of the half-open period
/// [`?`, `?`). Binds: item id, period end, period start.
const CONFLICT_CLAUSE: &str = r#"
    SELECT 1 FROM rentals c
    WHERE c.item_id = ?
      AND c.rental_status IN ('Pending', 'Approved', 'Active')
      AND c.rental_start_date < ?
      AND c.rental_end_date > ?
"#;

pub async fn list_all(pool: &SqlitePool) -> Result<Vec<Rental>, sqlx::Error> {
    sqlx::query_as::<_, Rental>(&format!(
        "SELECT {RENTAL_COLUMNS} FROM rentals ORDER BY created_at DESC, id DESC"
    ))
    .fetch_all(pool)
    .await
}

pub async fn list_by_renter(pool: &SqlitePool, acc_id: i64) -> Result<Vec<Rental>, sqlx::Error> {
    sqlx::query_as::<_, Rental>(&format!(
        "SELECT {RENTAL_COLUMNS} FROM rentals WHERE renter_acc_id = ? ORDER BY created_at DESC, id DESC"
    ))
    .bind(acc_id)
    .fetch_all(pool)
    .await
}

pub async fn list_by_item(pool: &SqlitePool, item_id: i64) -> Result<Vec<Rental>, sqlx::Error> {
    sqlx::query_as::<_, Rental>(&format!(
        "SELECT {RENTAL_COLUMNS} FROM rentals WHERE item_id = ? ORDER BY rental_start_date ASC, id ASC"
    ))
    .bind(item_id)
    .fetch_all(pool)
    .await
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Rental>, sqlx::Error> {
    sqlx::query_as::<_, Rental>(&format!("SELECT {RENTAL_COLUMNS} FROM rentals WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Insert a pending rental unless the period conflicts.
///
/// The conflict check and the insert are one statement, so two overlapping
/// requests cannot both succeed. Returns `None` on conflict.
pub async fn create(
    pool: &SqlitePool,
    item_id: i64,
    renter_acc_id: i64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    total_rental_price: f64,
) -> Result<Option<Rental>, sqlx::Error> {
    sqlx::query_as::<_, Rental>(&format!(
        r#"
        INSERT INTO rentals (item_id, renter_acc_id, rental_start_date, rental_end_date,
                             total_rental_price, rental_status, created_at)
        SELECT ?, ?, ?, ?, ?, ?, ?
        WHERE NOT EXISTS ({CONFLICT_CLAUSE})
        RETURNING {RENTAL_COLUMNS}
        "#
    ))
    .bind(item_id)
    .bind(renter_acc_id)
    .bind(start)
    .bind(end)
    .bind(total_rental_price)
    .bind(RentalStatus::Pending)
    .bind(now())
    .bind(item_id)
    .bind(end)
    .bind(start)
    .fetch_optional(pool)
    .await
}

/// Move a pending rental to a new period, ignoring its own reservation
/// when checking for conflicts. Returns `None` on conflict or when the
/// rental is no longer pending.
pub async fn reschedule(
    pool: &SqlitePool,
    rental: &Rental,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    total_rental_price: f64,
) -> Result<Option<Rental>, sqlx::Error> {
    sqlx::query_as::<_, Rental>(&format!(
        r#"
        UPDATE rentals SET
            rental_start_date = ?,
            rental_end_date = ?,
            total_rental_price = ?,
            updated_at = ?
        WHERE id = ? AND rental_status = 'Pending'
          AND NOT EXISTS ({CONFLICT_CLAUSE} AND c.id <> ?)
        RETURNING {RENTAL_COLUMNS}
        "#
    ))
    .bind(start)
    .bind(end)
    .bind(total_rental_price)
    .bind(now())
    .bind(rental.id)
    .bind(rental.item_id)
    .bind(end)
    .bind(start)
    .bind(rental.id)
    .fetch_optional(pool)
    .await
}

/// Approve a pending rental and mark its item rented.
pub async fn approve(pool: &SqlitePool, id: i64) -> Result<Option<Rental>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let Some(rental) = transition(
        &mut tx,
        id,
        &[RentalStatus::Pending],
        RentalStatus::Approved,
        None,
    )
    .await?
    else {
        return Ok(None);
    };
    items::set_status(&mut tx, rental.item_id, ItemStatus::Rented).await?;

    tx.commit().await?;
    Ok(Some(rental))
}

pub async fn reject(
    pool: &SqlitePool,
    id: i64,
    reason: Option<&str>,
) -> Result<Option<Rental>, sqlx::Error> {
    let mut conn = pool.acquire().await?;
    transition(
        &mut conn,
        id,
        &[RentalStatus::Pending],
        RentalStatus::Rejected,
        reason,
    )
    .await
}

/// Complete an approved or active rental and release its item.
pub async fn complete(pool: &SqlitePool, id: i64) -> Result<Option<Rental>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let Some(rental) = transition(
        &mut tx,
        id,
        &[RentalStatus::Approved, RentalStatus::Active],
        RentalStatus::Completed,
        None,
    )
    .await?
    else {
        return Ok(None);
    };
    items::set_status(&mut tx, rental.item_id, ItemStatus::Available).await?;

    tx.commit().await?;
    Ok(Some(rental))
}

pub async fn cancel(pool: &SqlitePool, id: i64) -> Result<Option<Rental>, sqlx::Error> {
    let mut conn = pool.acquire().await?;
    transition(
        &mut conn,
        id,
        &[RentalStatus::Pending],
        RentalStatus::Cancelled,
        None,
    )
    .await
}

pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM rentals WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Attach item and renter briefs to each rental.
pub async fn with_details(
    pool: &SqlitePool,
    rentals: Vec<Rental>,
) -> Result<Vec<RentalDetails>, sqlx::Error> {
    let items = items::briefs(pool, rentals.iter().map(|r| r.item_id)).await?;
    let renters = accounts::briefs(pool, rentals.iter().map(|r| r.renter_acc_id)).await?;

    Ok(rentals
        .into_iter()
        .map(|rental| RentalDetails {
            item: items.get(&rental.item_id).cloned(),
            renter: renters.get(&rental.renter_acc_id).cloned(),
            rental,
        })
        .collect())
}

async fn transition(
    conn: &mut SqliteConnection,
    id: i64,
    from: &[RentalStatus],
    to: RentalStatus,
    rejection_reason: Option<&str>,
) -> Result<Option<Rental>, sqlx::Error> {
    let mut qb = sqlx::QueryBuilder::<sqlx::Sqlite>::new("UPDATE rentals SET rental_status = ");
    qb.push_bind(to)
        .push(", rejection_reason = COALESCE(")
        .push_bind(rejection_reason)
        .push(", rejection_reason), updated_at = ")
        .push_bind(now())
        .push(" WHERE id = ")
        .push_bind(id)
        .push(" AND rental_status IN (");
    let mut statuses = qb.separated(", ");
    for status in from {
        statuses.push_bind(*status);
    }
    statuses.push_unseparated(")");
    qb.push(format!(" RETURNING {RENTAL_COLUMNS}"));

    qb.build_query_as::<Rental>().fetch_optional(conn).await
}
