//! Settings database access
//!
//! Read runtime settings from the settings table (key-value store).
//! All settings are global/system-wide (not user-specific).

use minact_common::Result;
use sqlx::SqlitePool;
use std::str::FromStr;

/// Get a typed setting value, `None` when unset or unparsable
pub async fn get_setting<T: FromStr>(db: &SqlitePool, key: &str) -> Result<Option<T>> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await?;

    Ok(value.and_then(|v| v.parse::<T>().ok()))
}

/// Session lifetime in seconds (default: one week)
pub async fn session_timeout_seconds(db: &SqlitePool) -> Result<i64> {
    Ok(get_setting::<i64>(db, "session_timeout_seconds")
        .await?
        .unwrap_or(604_800))
}

/// Hours a submitted task may wait for verification before breaching SLA
pub async fn verification_sla_hours(db: &SqlitePool) -> Result<i64> {
    Ok(get_setting::<i64>(db, "verification_sla_hours")
        .await?
        .unwrap_or(24))
}

#[cfg(test)]
mod tests {
    use super::*;
    use minact_common::db::init_memory_database;

    #[tokio::test]
    async fn defaults_apply_when_setting_missing() {
        let pool = init_memory_database().await.unwrap();
        sqlx::query("DELETE FROM settings").execute(&pool).await.unwrap();

        assert_eq!(session_timeout_seconds(&pool).await.unwrap(), 604_800);
        assert_eq!(verification_sla_hours(&pool).await.unwrap(), 24);
    }

    #[tokio::test]
    async fn stored_value_wins() {
        let pool = init_memory_database().await.unwrap();
        sqlx::query("UPDATE settings SET value = '48' WHERE key = 'verification_sla_hours'")
            .execute(&pool)
            .await
            .unwrap();

        assert_eq!(verification_sla_hours(&pool).await.unwrap(), 48);
    }
}
