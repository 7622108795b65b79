//! Notification database operations
//!
//! Notifications are created as side effects of lifecycle transitions,
//! always inside the same transaction as the transition itself.

use minact_common::db::models::Notification;
use minact_common::{time, Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

fn from_row(row: &SqliteRow) -> Result<Notification> {
    let created_at: String = row.get("created_at");
    Ok(Notification {
        guid: row.get("guid"),
        user_guid: row.get("user_guid"),
        task_guid: row.get("task_guid"),
        body: row.get("body"),
        is_read: row.get("is_read"),
        created_at: time::from_db(&created_at)?,
    })
}

/// Create a notification addressed to one user
pub async fn insert(
    conn: &mut SqliteConnection,
    user_guid: &str,
    task_guid: Option<&str>,
    body: &str,
) -> Result<Notification> {
    let notification = Notification {
        guid: Uuid::new_v4().to_string(),
        user_guid: user_guid.to_string(),
        task_guid: task_guid.map(|g| g.to_string()),
        body: body.to_string(),
        is_read: false,
        created_at: chrono::Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO notifications (guid, user_guid, task_guid, body, is_read, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&notification.guid)
    .bind(&notification.user_guid)
    .bind(&notification.task_guid)
    .bind(&notification.body)
    .bind(notification.is_read)
    .bind(time::to_db(notification.created_at))
    .execute(conn)
    .await?;

    Ok(notification)
}

/// A user's notifications, newest first
pub async fn list_for_user(pool: &SqlitePool, user_guid: &str) -> Result<Vec<Notification>> {
    let rows = sqlx::query(
        "SELECT * FROM notifications WHERE user_guid = ? ORDER BY created_at DESC, guid DESC",
    )
    .bind(user_guid)
    .fetch_all(pool)
    .await?;

    rows.iter().map(from_row).collect()
}

/// Mark one of the user's notifications as read
pub async fn mark_read(pool: &SqlitePool, guid: &str, user_guid: &str) -> Result<()> {
    let result = sqlx::query(
        "UPDATE notifications SET is_read = 1 WHERE guid = ? AND user_guid = ?",
    )
    .bind(guid)
    .bind(user_guid)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Notification not found: {}", guid)));
    }

    Ok(())
}
