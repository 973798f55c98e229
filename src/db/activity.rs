use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use super::now;
use crate::models::{ActivityLog, NewActivity, PageQuery};

/// Which log entries to list.
#[derive(Debug, Clone)]
pub enum ActivityFilter {
    All,
    User(i64),
    Action(String),
    Ip(String),
    Between(DateTime<Utc>, DateTime<Utc>),
}

pub async fn insert(pool: &SqlitePool, entry: &NewActivity) -> Result<ActivityLog, sqlx::Error> {
    sqlx::query_as::<_, ActivityLog>(
        r#"
        INSERT INTO activity_logs (user_id, username, action, ip_address, created_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id, user_id, username, action, ip_address, created_at
        "#,
    )
    .bind(entry.user_id)
    .bind(&entry.username)
    .bind(&entry.action)
    .bind(&entry.ip_address)
    .bind(now())
    .fetch_one(pool)
    .await
}

/// One page of matching entries, newest first, plus the total match count.
pub async fn page(
    pool: &SqlitePool,
    filter: &ActivityFilter,
    paging: PageQuery,
) -> Result<(Vec<ActivityLog>, i64), sqlx::Error> {
    let mut count: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT COUNT(*) FROM activity_logs");
    push_filter(&mut count, filter);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT id, user_id, username, action, ip_address, created_at FROM activity_logs",
    );
    push_filter(&mut qb, filter);
    qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
        .push_bind(paging.limit())
        .push(" OFFSET ")
        .push_bind(paging.offset());

    let logs = qb.build_query_as::<ActivityLog>().fetch_all(pool).await?;
    Ok((logs, total))
}

fn push_filter<'a>(qb: &mut QueryBuilder<'a, Sqlite>, filter: &'a ActivityFilter) {
    match filter {
        ActivityFilter::All => {}
        ActivityFilter::User(id) => {
            qb.push(" WHERE user_id = ").push_bind(*id);
        }
        ActivityFilter::Action(action) => {
            qb.push(" WHERE action = ").push_bind(action.as_str());
        }
        ActivityFilter::Ip(ip) => {
            qb.push(" WHERE ip_address = ").push_bind(ip.as_str());
        }
        ActivityFilter::Between(start, end) => {
            qb.push(" WHERE created_at >= ")
                .push_bind(*start)
                .push(" AND created_at <= ")
                .push_bind(*end);
        }
    }
}
