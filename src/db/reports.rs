use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use super::{accounts, now};
use crate::models::{
    CreateReportRequest, PageQuery, ReportDetails, ReportParty, ReportReason, ReportStatus,
    UserReport,
};

const REPORT_COLUMNS: &str = "id, reporter_id, reported_id, reason_type, description, evidence, \
     status, reviewer_id, reviewer_comments, action_taken, created_at, updated_at";

/// Listing filter. `None` fields match everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReportFilter {
    pub status: Option<ReportStatus>,
    pub reason_type: Option<ReportReason>,
    pub reporter_id: Option<i64>,
    pub reported_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    NewestFirst,
    OldestFirst,
}

pub async fn insert(
    pool: &SqlitePool,
    reporter_id: i64,
    req: &CreateReportRequest,
) -> Result<UserReport, sqlx::Error> {
    sqlx::query_as::<_, UserReport>(&format!(
        r#"
        INSERT INTO user_reports (reporter_id, reported_id, reason_type, description, evidence,
                                  status, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        RETURNING {REPORT_COLUMNS}
        "#
    ))
    .bind(reporter_id)
    .bind(req.reported_id)
    .bind(req.reason_type)
    .bind(&req.description)
    .bind(&req.evidence)
    .bind(ReportStatus::Pending)
    .bind(now())
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<UserReport>, sqlx::Error> {
    sqlx::query_as::<_, UserReport>(&format!(
        "SELECT {REPORT_COLUMNS} FROM user_reports WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// One page of reports matching `filter`, plus the total match count.
pub async fn page(
    pool: &SqlitePool,
    filter: ReportFilter,
    order: Order,
    paging: PageQuery,
) -> Result<(Vec<UserReport>, i64), sqlx::Error> {
    let mut count: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT COUNT(*) FROM user_reports");
    push_filter(&mut count, filter);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {REPORT_COLUMNS} FROM user_reports"));
    push_filter(&mut qb, filter);
    qb.push(match order {
        Order::NewestFirst => " ORDER BY created_at DESC, id DESC",
        Order::OldestFirst => " ORDER BY created_at ASC, id ASC",
    });
    qb.push(" LIMIT ")
        .push_bind(paging.limit())
        .push(" OFFSET ")
        .push_bind(paging.offset());

    let reports = qb.build_query_as::<UserReport>().fetch_all(pool).await?;
    Ok((reports, total))
}

pub async fn set_status(
    pool: &SqlitePool,
    id: i64,
    status: ReportStatus,
) -> Result<Option<UserReport>, sqlx::Error> {
    sqlx::query_as::<_, UserReport>(&format!(
        "UPDATE user_reports SET status = ?, updated_at = ? WHERE id = ? RETURNING {REPORT_COLUMNS}"
    ))
    .bind(status)
    .bind(now())
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn review(
    pool: &SqlitePool,
    id: i64,
    reviewer_id: i64,
    status: ReportStatus,
    reviewer_comments: Option<&str>,
    action_taken: Option<&str>,
) -> Result<Option<UserReport>, sqlx::Error> {
    sqlx::query_as::<_, UserReport>(&format!(
        r#"
        UPDATE user_reports SET
            status = ?,
            reviewer_id = ?,
            reviewer_comments = ?,
            action_taken = ?,
            updated_at = ?
        WHERE id = ?
        RETURNING {REPORT_COLUMNS}
        "#
    ))
    .bind(status)
    .bind(reviewer_id)
    .bind(reviewer_comments)
    .bind(action_taken)
    .bind(now())
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM user_reports WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Attach reporter, reported user and reviewer to each report.
pub async fn with_details(
    pool: &SqlitePool,
    reports: Vec<UserReport>,
) -> Result<Vec<ReportDetails>, sqlx::Error> {
    let ids = reports
        .iter()
        .flat_map(|r| [Some(r.reporter_id), Some(r.reported_id), r.reviewer_id])
        .flatten()
        .collect::<Vec<i64>>();
    let people = accounts::contacts(pool, ids).await?;
    let party = |id: i64| people.get(&id).map(ReportParty::from);

    Ok(reports
        .into_iter()
        .map(|r| {
            let reporter = party(r.reporter_id);
            let reported_user = party(r.reported_id);
            let reviewer = r.reviewer_id.and_then(party);
            ReportDetails::new(r, reporter, reported_user, reviewer)
        })
        .collect())
}

fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: ReportFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(reason) = filter.reason_type {
        qb.push(" AND reason_type = ").push_bind(reason);
    }
    if let Some(reporter) = filter.reporter_id {
        qb.push(" AND reporter_id = ").push_bind(reporter);
    }
    if let Some(reported) = filter.reported_id {
        qb.push(" AND reported_id = ").push_bind(reported);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{create_account, setup_test_db};
    use crate::models::Role;

    fn report(reported_id: i64, reason_type: ReportReason) -> CreateReportRequest {
        CreateReportRequest {
            reported_id,
            reason_type,
            description: Some("Rude messages".to_string()),
            evidence: None,
        }
    }

    #[tokio::test]
    async fn test_self_report_rejected_by_schema() {
        let pool = setup_test_db().await;
        let acc = create_account(&pool, "self@example.com", Role::User).await;

        let result = insert(&pool, acc.id, &report(acc.id, ReportReason::Spam)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_page_filters_and_counts() {
        let pool = setup_test_db().await;
        let reporter = create_account(&pool, "reporter@example.com", Role::User).await;
        let target = create_account(&pool, "target@example.com", Role::User).await;
        let other = create_account(&pool, "other@example.com", Role::User).await;

        for _ in 0..3 {
            insert(&pool, reporter.id, &report(target.id, ReportReason::Harassment))
                .await
                .unwrap();
        }
        insert(&pool, reporter.id, &report(other.id, ReportReason::Spam))
            .await
            .unwrap();

        let (rows, total) = page(
            &pool,
            ReportFilter {
                reason_type: Some(ReportReason::Harassment),
                ..Default::default()
            },
            Order::NewestFirst,
            PageQuery::new(Some(1), Some(2)),
        )
        .await
        .unwrap();
        assert_eq!(total, 3);
        assert_eq!(rows.len(), 2);

        let (rows, total) = page(
            &pool,
            ReportFilter {
                reported_id: Some(other.id),
                ..Default::default()
            },
            Order::OldestFirst,
            PageQuery::default(),
        )
        .await
        .unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].reason_type, ReportReason::Spam);
    }

    #[tokio::test]
    async fn test_review_and_details() {
        let pool = setup_test_db().await;
        let admin = create_account(&pool, "admin@example.com", Role::Admin).await;
        let reporter = create_account(&pool, "reporter@example.com", Role::User).await;
        let target = create_account(&pool, "target@example.com", Role::User).await;
        let r = insert(&pool, reporter.id, &report(target.id, ReportReason::Fraud))
            .await
            .unwrap();
        assert_eq!(r.status, ReportStatus::Pending);

        let reviewed = review(
            &pool,
            r.id,
            admin.id,
            ReportStatus::Resolved,
            Some("Confirmed"),
            Some("Account warned"),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(reviewed.status, ReportStatus::Resolved);

        let details = with_details(&pool, vec![reviewed]).await.unwrap();
        let d = &details[0];
        assert_eq!(d.reason_display, "Fraud or Scam");
        assert_eq!(d.reporter.as_ref().unwrap().email, "reporter@example.com");
        assert_eq!(d.reported_user.as_ref().unwrap().full_name, "Test target");
        assert_eq!(d.reviewer.as_ref().unwrap().id, admin.id);
    }
}
