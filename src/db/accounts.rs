use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use super::{now, push_id_list, unique_ids};
use crate::models::{
    Account, AccountBrief, AccountChanges, AccountContact, Role, VerificationStatus,
};

const ACCOUNT_COLUMNS: &str = "id, email, password_hash, first_name, last_name, image, address, \
     accept_terms, role, status, verification_status, verification_image, verification_token, \
     verified_at, reset_token, reset_token_expires_at, password_reset_at, created_at, updated_at";

/// Account to insert.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub image: Option<String>,
    pub address: String,
    pub accept_terms: bool,
    /// `None` makes the very first account an Admin and every later one a User.
    pub role: Option<Role>,
    pub verification_token: Option<String>,
    /// Pre-verified accounts skip the email confirmation step.
    pub verified: bool,
}

/// Insert an account. The role decision for `role: None` happens in the
/// same statement as the insert.
pub async fn insert(pool: &SqlitePool, new: &NewAccount) -> Result<Account, sqlx::Error> {
    let created_at = now();
    let verified_at = new.verified.then_some(created_at);

    let sql = format!(
        r#"
        INSERT INTO accounts (email, password_hash, first_name, last_name, image, address,
                              accept_terms, role, verification_token, verified_at, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?,
                COALESCE(?, CASE WHEN (SELECT COUNT(*) FROM accounts) = 0 THEN 'Admin' ELSE 'User' END),
                ?, ?, ?)
        RETURNING {ACCOUNT_COLUMNS}
        "#
    );

    sqlx::query_as::<_, Account>(&sql)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(&new.image)
        .bind(&new.address)
        .bind(new.accept_terms)
        .bind(new.role)
        .bind(&new.verification_token)
        .bind(verified_at)
        .bind(created_at)
        .fetch_one(pool)
        .await
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Account>, sqlx::Error> {
    sqlx::query_as::<_, Account>(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<Account>, sqlx::Error> {
    sqlx::query_as::<_, Account>(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = ?"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await
}

pub async fn find_by_verification_token(
    pool: &SqlitePool,
    token: &str,
) -> Result<Option<Account>, sqlx::Error> {
    sqlx::query_as::<_, Account>(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE verification_token = ?"
    ))
    .bind(token)
    .fetch_optional(pool)
    .await
}

/// Find the account holding `token` as an unexpired reset token.
pub async fn find_by_reset_token(
    pool: &SqlitePool,
    token: &str,
    at: DateTime<Utc>,
) -> Result<Option<Account>, sqlx::Error> {
    sqlx::query_as::<_, Account>(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE reset_token = ? AND reset_token_expires_at > ?"
    ))
    .bind(token)
    .bind(at)
    .fetch_optional(pool)
    .await
}

pub async fn list_all(pool: &SqlitePool) -> Result<Vec<Account>, sqlx::Error> {
    sqlx::query_as::<_, Account>(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY id ASC"
    ))
    .fetch_all(pool)
    .await
}

pub async fn exists(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let found: Option<i64> = sqlx::query_scalar("SELECT id FROM accounts WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(found.is_some())
}

pub async fn email_exists(pool: &SqlitePool, email: &str) -> Result<bool, sqlx::Error> {
    let found: Option<i64> = sqlx::query_scalar("SELECT id FROM accounts WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(found.is_some())
}

/// Apply a partial update. Unset fields keep their value.
pub async fn update(
    pool: &SqlitePool,
    id: i64,
    changes: &AccountChanges,
) -> Result<Option<Account>, sqlx::Error> {
    sqlx::query_as::<_, Account>(&format!(
        r#"
        UPDATE accounts SET
            first_name = COALESCE(?, first_name),
            last_name = COALESCE(?, last_name),
            email = COALESCE(?, email),
            address = COALESCE(?, address),
            image = COALESCE(?, image),
            password_hash = COALESCE(?, password_hash),
            role = COALESCE(?, role),
            status = COALESCE(?, status),
            updated_at = ?
        WHERE id = ?
        RETURNING {ACCOUNT_COLUMNS}
        "#
    ))
    .bind(&changes.first_name)
    .bind(&changes.last_name)
    .bind(&changes.email)
    .bind(&changes.address)
    .bind(&changes.image)
    .bind(&changes.password_hash)
    .bind(changes.role)
    .bind(changes.status)
    .bind(now())
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Confirm the email address and consume the verification token.
pub async fn mark_verified(pool: &SqlitePool, id: i64) -> Result<(), sqlx::Error> {
    let ts = now();
    sqlx::query(
        "UPDATE accounts SET verified_at = ?, verification_token = NULL, updated_at = ? WHERE id = ?",
    )
    .bind(ts)
    .bind(ts)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn set_reset_token(
    pool: &SqlitePool,
    id: i64,
    token: &str,
    expires_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE accounts SET reset_token = ?, reset_token_expires_at = ? WHERE id = ?")
        .bind(token)
        .bind(expires_at)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Store a new password hash and consume the reset token.
pub async fn reset_password(
    pool: &SqlitePool,
    id: i64,
    password_hash: &str,
) -> Result<(), sqlx::Error> {
    let ts = now();
    sqlx::query(
        r#"
        UPDATE accounts SET
            password_hash = ?,
            password_reset_at = ?,
            reset_token = NULL,
            reset_token_expires_at = NULL,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(password_hash)
    .bind(ts)
    .bind(ts)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn submit_verification(
    pool: &SqlitePool,
    id: i64,
    image: &str,
) -> Result<Option<Account>, sqlx::Error> {
    sqlx::query_as::<_, Account>(&format!(
        r#"
        UPDATE accounts SET verification_image = ?, verification_status = ?, updated_at = ?
        WHERE id = ?
        RETURNING {ACCOUNT_COLUMNS}
        "#
    ))
    .bind(image)
    .bind(VerificationStatus::Pending)
    .bind(now())
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn set_verification_status(
    pool: &SqlitePool,
    id: i64,
    status: VerificationStatus,
) -> Result<Option<Account>, sqlx::Error> {
    sqlx::query_as::<_, Account>(&format!(
        r#"
        UPDATE accounts SET verification_status = ?, updated_at = ?
        WHERE id = ?
        RETURNING {ACCOUNT_COLUMNS}
        "#
    ))
    .bind(status)
    .bind(now())
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Delete an account; owned rows go with it through foreign-key cascades.
pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM accounts WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Briefs for a set of accounts, keyed by id.
pub async fn briefs(
    pool: &SqlitePool,
    ids: impl IntoIterator<Item = i64>,
) -> Result<HashMap<i64, AccountBrief>, sqlx::Error> {
    let ids = unique_ids(ids);
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT id, first_name, last_name, image FROM accounts WHERE id");
    push_id_list(&mut qb, &ids);

    let rows = qb.build_query_as::<AccountBrief>().fetch_all(pool).await?;
    Ok(rows.into_iter().map(|a| (a.id, a)).collect())
}

/// Contacts (brief plus email) for a set of accounts, keyed by id.
pub async fn contacts(
    pool: &SqlitePool,
    ids: impl IntoIterator<Item = i64>,
) -> Result<HashMap<i64, AccountContact>, sqlx::Error> {
    let ids = unique_ids(ids);
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT id, first_name, last_name, email, image FROM accounts WHERE id",
    );
    push_id_list(&mut qb, &ids);

    let rows = qb.build_query_as::<AccountContact>().fetch_all(pool).await?;
    Ok(rows.into_iter().map(|a| (a.id, a)).collect())
}
