use std::collections::HashMap;

use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use super::{now, push_id_list, unique_ids};
use crate::models::{
    ApprovalStatus, Item, ItemBrief, ItemStatus, ItemTracking, ItemWithOwner, ItemsQuery,
    ModerationDecision, NewTracking, RentalStatus, TrackingAction, UpdateItemRequest,
};

const ITEM_COLUMNS: &str =
    "id, acc_id, name, description, price, image, status, approval_status, created_at, updated_at";

/// Outcome of a delete request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemDeletion {
    Deleted,
    NotFound,
    /// The item still has rentals reserving dates.
    Blocked,
}

pub async fn list(pool: &SqlitePool, filter: &ItemsQuery) -> Result<Vec<Item>, sqlx::Error> {
    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {ITEM_COLUMNS} FROM items WHERE 1 = 1"));
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(approval) = filter.approval_status {
        qb.push(" AND approval_status = ").push_bind(approval);
    }
    qb.push(" ORDER BY created_at DESC, id DESC");

    qb.build_query_as::<Item>().fetch_all(pool).await
}

/// Items awaiting moderation, oldest first.
pub async fn list_pending(pool: &SqlitePool) -> Result<Vec<Item>, sqlx::Error> {
    sqlx::query_as::<_, Item>(&format!(
        "SELECT {ITEM_COLUMNS} FROM items WHERE approval_status = ? ORDER BY created_at ASC, id ASC"
    ))
    .bind(ApprovalStatus::Pending)
    .fetch_all(pool)
    .await
}

pub async fn list_by_owner(pool: &SqlitePool, acc_id: i64) -> Result<Vec<Item>, sqlx::Error> {
    sqlx::query_as::<_, Item>(&format!(
        "SELECT {ITEM_COLUMNS} FROM items WHERE acc_id = ? ORDER BY created_at DESC, id DESC"
    ))
    .bind(acc_id)
    .fetch_all(pool)
    .await
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Item>, sqlx::Error> {
    sqlx::query_as::<_, Item>(&format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_with_owner(
    pool: &SqlitePool,
    id: i64,
) -> Result<Option<ItemWithOwner>, sqlx::Error> {
    sqlx::query_as::<_, ItemWithOwner>(
        r#"
        SELECT i.id, i.acc_id, i.name, i.description, i.price, i.image, i.status,
               i.approval_status, i.created_at, i.updated_at, a.address AS owner_address
        FROM items i
        JOIN accounts a ON a.id = i.acc_id
        WHERE i.id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Create a listing awaiting approval and record its `created` history row.
pub async fn create(
    pool: &SqlitePool,
    acc_id: i64,
    name: &str,
    description: Option<&str>,
    price: f64,
    image: Option<&str>,
) -> Result<Item, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let item = sqlx::query_as::<_, Item>(&format!(
        r#"
        INSERT INTO items (acc_id, name, description, price, image, status, approval_status, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING {ITEM_COLUMNS}
        "#
    ))
    .bind(acc_id)
    .bind(name)
    .bind(description)
    .bind(price)
    .bind(image)
    .bind(ItemStatus::Available)
    .bind(ApprovalStatus::Pending)
    .bind(now())
    .fetch_one(&mut *tx)
    .await?;

    record(
        &mut tx,
        &NewTracking {
            action: TrackingAction::Created,
            before: None,
            after: Some(item.clone()),
            notes: None,
            admin_id: None,
        },
    )
    .await?;

    tx.commit().await?;
    Ok(item)
}

/// Apply a partial update and record the before/after pair.
pub async fn update(
    pool: &SqlitePool,
    id: i64,
    changes: &UpdateItemRequest,
) -> Result<Option<Item>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let Some(before) = fetch(&mut tx, id).await? else {
        return Ok(None);
    };

    let after = sqlx::query_as::<_, Item>(&format!(
        r#"
        UPDATE items SET
            name = COALESCE(?, name),
            description = COALESCE(?, description),
            price = COALESCE(?, price),
            image = COALESCE(?, image),
            status = COALESCE(?, status),
            updated_at = ?
        WHERE id = ?
        RETURNING {ITEM_COLUMNS}
        "#
    ))
    .bind(&changes.name)
    .bind(&changes.description)
    .bind(changes.price)
    .bind(&changes.image)
    .bind(changes.status)
    .bind(now())
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    record(
        &mut tx,
        &NewTracking {
            action: TrackingAction::Updated,
            before: Some(before),
            after: Some(after.clone()),
            notes: None,
            admin_id: None,
        },
    )
    .await?;

    tx.commit().await?;
    Ok(Some(after))
}

/// Move an item to `target` approval state.
///
/// Returns `None` when the item is missing or already in `target`.
pub async fn moderate(
    pool: &SqlitePool,
    id: i64,
    decision: ModerationDecision,
    admin_id: i64,
    notes: Option<&str>,
) -> Result<Option<Item>, sqlx::Error> {
    let target = decision.approval_status();
    let mut tx = pool.begin().await?;

    let Some(before) = fetch(&mut tx, id).await? else {
        return Ok(None);
    };
    if before.approval_status == target {
        return Ok(None);
    }

    let after = sqlx::query_as::<_, Item>(&format!(
        "UPDATE items SET approval_status = ?, updated_at = ? WHERE id = ? RETURNING {ITEM_COLUMNS}"
    ))
    .bind(target)
    .bind(now())
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    record(
        &mut tx,
        &NewTracking {
            action: decision.tracking_action(),
            before: Some(before),
            after: Some(after.clone()),
            notes: notes.map(str::to_string),
            admin_id: Some(admin_id),
        },
    )
    .await?;

    tx.commit().await?;
    Ok(Some(after))
}

/// Delete an item unless rentals still reserve it. The history survives
/// through `original_item_id`.
pub async fn delete(
    pool: &SqlitePool,
    id: i64,
    admin_id: Option<i64>,
) -> Result<ItemDeletion, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let Some(before) = fetch(&mut tx, id).await? else {
        return Ok(ItemDeletion::NotFound);
    };

    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT COUNT(*) FROM rentals WHERE item_id = ");
    qb.push_bind(id).push(" AND rental_status IN (");
    let mut statuses = qb.separated(", ");
    for status in RentalStatus::BLOCKING {
        statuses.push_bind(status);
    }
    statuses.push_unseparated(")");
    let blocking: i64 = qb.build_query_scalar().fetch_one(&mut *tx).await?;
    if blocking > 0 {
        return Ok(ItemDeletion::Blocked);
    }

    record(
        &mut tx,
        &NewTracking {
            action: TrackingAction::Deleted,
            before: Some(before),
            after: None,
            notes: None,
            admin_id,
        },
    )
    .await?;

    sqlx::query("DELETE FROM items WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(ItemDeletion::Deleted)
}

/// History rows of an item, newest first. Works for deleted items too.
pub async fn history(pool: &SqlitePool, item_id: i64) -> Result<Vec<ItemTracking>, sqlx::Error> {
    sqlx::query_as::<_, ItemTracking>(
        r#"
        SELECT id, item_id, original_item_id, acc_id, action, previous_status, new_status,
               previous_approval_status, new_approval_status, previous_name, new_name,
               previous_description, new_description, notes, admin_id, created_at
        FROM items_tracking
        WHERE original_item_id = ?
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(item_id)
    .fetch_all(pool)
    .await
}

/// Set the availability status inside an open transaction.
pub(crate) async fn set_status(
    conn: &mut SqliteConnection,
    id: i64,
    status: ItemStatus,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE items SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status)
        .bind(now())
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Item briefs keyed by id.
pub async fn briefs(
    pool: &SqlitePool,
    ids: impl IntoIterator<Item = i64>,
) -> Result<HashMap<i64, ItemBrief>, sqlx::Error> {
    let ids = unique_ids(ids);
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT id, acc_id, name, price, image FROM items WHERE id");
    push_id_list(&mut qb, &ids);

    let rows = qb.build_query_as::<ItemBrief>().fetch_all(pool).await?;
    Ok(rows.into_iter().map(|i| (i.id, i)).collect())
}

async fn fetch(conn: &mut SqliteConnection, id: i64) -> Result<Option<Item>, sqlx::Error> {
    sqlx::query_as::<_, Item>(&format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?"))
        .bind(id)
        .fetch_optional(conn)
        .await
}

async fn record(conn: &mut SqliteConnection, entry: &NewTracking) -> Result<(), sqlx::Error> {
    let Some(subject) = entry.after.as_ref().or(entry.before.as_ref()) else {
        return Ok(());
    };
    let before = entry.before.as_ref();
    let after = entry.after.as_ref();

    sqlx::query(
        r#"
        INSERT INTO items_tracking (
            item_id, original_item_id, acc_id, action,
            previous_status, new_status, previous_approval_status, new_approval_status,
            previous_name, new_name, previous_description, new_description,
            notes, admin_id, created_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(subject.id)
    .bind(subject.id)
    .bind(subject.acc_id)
    .bind(entry.action)
    .bind(before.map(|i| i.status.as_str()))
    .bind(after.map(|i| i.status.as_str()))
    .bind(before.map(|i| i.approval_status.as_str()))
    .bind(after.map(|i| i.approval_status.as_str()))
    .bind(before.map(|i| i.name.as_str()))
    .bind(after.map(|i| i.name.as_str()))
    .bind(before.and_then(|i| i.description.as_deref()))
    .bind(after.and_then(|i| i.description.as_deref()))
    .bind(entry.notes.as_deref())
    .bind(entry.admin_id)
    .bind(now())
    .execute(conn)
    .await?;
    Ok(())
}
