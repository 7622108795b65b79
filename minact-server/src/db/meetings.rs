//! Meeting database operations

use minact_common::db::models::Meeting;
use minact_common::{time, Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};

fn from_row(row: &SqliteRow) -> Result<Meeting> {
    let created_at: String = row.get("created_at");
    Ok(Meeting {
        guid: row.get("guid"),
        title: row.get("title"),
        date: row.get("date"),
        summary: row.get("summary"),
        processed_by: row.get("processed_by"),
        created_at: time::from_db(&created_at)?,
    })
}

/// Insert a meeting record
///
/// Takes a connection so meeting + extracted tasks can commit in one
/// transaction.
pub async fn insert(conn: &mut SqliteConnection, meeting: &Meeting) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO meetings (guid, title, date, summary, processed_by, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&meeting.guid)
    .bind(&meeting.title)
    .bind(&meeting.date)
    .bind(&meeting.summary)
    .bind(&meeting.processed_by)
    .bind(time::to_db(meeting.created_at))
    .execute(conn)
    .await?;

    Ok(())
}

pub async fn fetch(pool: &SqlitePool, guid: &str) -> Result<Meeting> {
    let row = sqlx::query("SELECT * FROM meetings WHERE guid = ?")
        .bind(guid)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => from_row(&row),
        None => Err(Error::NotFound(format!("Meeting not found: {}", guid))),
    }
}

/// All meetings, most recent first
pub async fn list_all(pool: &SqlitePool) -> Result<Vec<Meeting>> {
    let rows = sqlx::query("SELECT * FROM meetings ORDER BY date DESC")
        .fetch_all(pool)
        .await?;

    rows.iter().map(from_row).collect()
}

/// Guid of the admin who processed a meeting, if any.
/// Connection-based so lifecycle transitions can read it mid-transaction.
pub async fn processor_of(conn: &mut SqliteConnection, meeting_guid: &str) -> Result<Option<String>> {
    let row: Option<Option<String>> =
        sqlx::query_scalar("SELECT processed_by FROM meetings WHERE guid = ?")
            .bind(meeting_guid)
            .fetch_optional(conn)
            .await?;

    Ok(row.flatten())
}

/// Find the requester's quick-capture meeting, creating it on first use.
/// Capture tasks need a parent meeting like every other task.
pub async fn capture_inbox_for(conn: &mut SqliteConnection, user_guid: &str) -> Result<Meeting> {
    let row = sqlx::query(
        "SELECT * FROM meetings WHERE title = 'Capture Inbox' AND processed_by = ?",
    )
    .bind(user_guid)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(row) = row {
        return from_row(&row);
    }

    let now = chrono::Utc::now();
    let meeting = Meeting {
        guid: uuid::Uuid::new_v4().to_string(),
        title: "Capture Inbox".to_string(),
        date: time::to_db(now),
        summary: None,
        processed_by: Some(user_guid.to_string()),
        created_at: now,
    };
    insert(conn, &meeting).await?;

    Ok(meeting)
}
