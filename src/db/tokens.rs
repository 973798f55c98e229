use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::now;
use crate::models::RefreshToken;

const TOKEN_COLUMNS: &str = "id, account_id, token, expires_at, created_at, created_by_ip, \
     revoked_at, revoked_by_ip, replaced_by_token";

pub async fn insert(
    pool: &SqlitePool,
    account_id: i64,
    token: &str,
    expires_at: DateTime<Utc>,
    created_by_ip: Option<&str>,
) -> Result<RefreshToken, sqlx::Error> {
    sqlx::query_as::<_, RefreshToken>(&format!(
        r#"
        INSERT INTO refresh_tokens (account_id, token, expires_at, created_at, created_by_ip)
        VALUES (?, ?, ?, ?, ?)
        RETURNING {TOKEN_COLUMNS}
        "#
    ))
    .bind(account_id)
    .bind(token)
    .bind(expires_at)
    .bind(now())
    .bind(created_by_ip)
    .fetch_one(pool)
    .await
}

pub async fn find(pool: &SqlitePool, token: &str) -> Result<Option<RefreshToken>, sqlx::Error> {
    sqlx::query_as::<_, RefreshToken>(&format!(
        "SELECT {TOKEN_COLUMNS} FROM refresh_tokens WHERE token = ?"
    ))
    .bind(token)
    .fetch_optional(pool)
    .await
}

/// Revoke a token. Already revoked tokens are left untouched.
pub async fn revoke(
    pool: &SqlitePool,
    token: &str,
    revoked_by_ip: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE refresh_tokens SET revoked_at = ?, revoked_by_ip = ?
        WHERE token = ? AND revoked_at IS NULL
        "#,
    )
    .bind(now())
    .bind(revoked_by_ip)
    .bind(token)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Replace `old` with a freshly issued token for the same account.
///
/// Returns `None` when `old` was already revoked, so a token can only be
/// rotated once even under concurrent refreshes.
pub async fn rotate(
    pool: &SqlitePool,
    old: &RefreshToken,
    new_token: &str,
    expires_at: DateTime<Utc>,
    ip: Option<&str>,
) -> Result<Option<RefreshToken>, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let ts = now();

    let revoked = sqlx::query(
        r#"
        UPDATE refresh_tokens SET revoked_at = ?, revoked_by_ip = ?, replaced_by_token = ?
        WHERE id = ? AND revoked_at IS NULL
        "#,
    )
    .bind(ts)
    .bind(ip)
    .bind(new_token)
    .bind(old.id)
    .execute(&mut *tx)
    .await?;

    if revoked.rows_affected() == 0 {
        return Ok(None);
    }

    let issued = sqlx::query_as::<_, RefreshToken>(&format!(
        r#"
        INSERT INTO refresh_tokens (account_id, token, expires_at, created_at, created_by_ip)
        VALUES (?, ?, ?, ?, ?)
        RETURNING {TOKEN_COLUMNS}
        "#
    ))
    .bind(old.account_id)
    .bind(new_token)
    .bind(expires_at)
    .bind(ts)
    .bind(ip)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(Some(issued))
}
