//! Bearer-token session store
//!
//! Tokens are opaque random strings mapped to a user with an expiry.
//! Expired and unknown tokens are rejected uniformly.

use minact_common::db::models::User;
use minact_common::{credentials, time, Error, Result};
use sqlx::SqlitePool;

/// Issue a new bearer token for the user
pub async fn create(pool: &SqlitePool, user_guid: &str, ttl_seconds: i64) -> Result<String> {
    let token = credentials::generate_token();
    let now = chrono::Utc::now();
    let expires_at = now + chrono::Duration::seconds(ttl_seconds);

    sqlx::query(
        r#"
        INSERT INTO sessions (token, user_guid, expires_at, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&token)
    .bind(user_guid)
    .bind(time::to_db(expires_at))
    .bind(time::to_db(now))
    .execute(pool)
    .await?;

    Ok(token)
}

/// Resolve a bearer token to its user
///
/// Unknown and expired tokens both map to the same `Unauthorized` error so
/// callers cannot distinguish the two cases.
pub async fn authenticate(pool: &SqlitePool, token: &str) -> Result<User> {
    let row: Option<(String, String)> = sqlx::query_as(
        "SELECT user_guid, expires_at FROM sessions WHERE token = ?",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    let (user_guid, expires_at) = match row {
        Some(row) => row,
        None => return Err(Error::Unauthorized("Invalid or expired token".to_string())),
    };

    if time::from_db(&expires_at)? <= chrono::Utc::now() {
        return Err(Error::Unauthorized("Invalid or expired token".to_string()));
    }

    super::users::fetch(pool, &user_guid)
        .await
        .map_err(|_| Error::Unauthorized("Invalid or expired token".to_string()))
}

/// Delete expired sessions (called from the background sweeper)
pub async fn purge_expired(pool: &SqlitePool) -> Result<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
        .bind(time::now_db())
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use minact_common::db::init_memory_database;

    #[tokio::test]
    async fn token_round_trip() {
        let pool = init_memory_database().await.unwrap();
        let user = super::super::users::insert(&pool, "priya", "pw", false).await.unwrap();

        let token = create(&pool, &user.guid, 3600).await.unwrap();
        let resolved = authenticate(&pool, &token).await.unwrap();
        assert_eq!(resolved.guid, user.guid);
    }

    #[tokio::test]
    async fn unknown_token_is_rejected() {
        let pool = init_memory_database().await.unwrap();
        let err = authenticate(&pool, "deadbeef").await.unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
    }

    #[tokio::test]
    async fn expired_token_is_rejected_and_purged() {
        let pool = init_memory_database().await.unwrap();
        let user = super::super::users::insert(&pool, "priya", "pw", false).await.unwrap();

        let token = create(&pool, &user.guid, -60).await.unwrap();
        let err = authenticate(&pool, &token).await.unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));

        let purged = purge_expired(&pool).await.unwrap();
        assert_eq!(purged, 1);
    }
}
