//! Progress snapshot log
//!
//! Insert-only burndown measurements for work cycles; rows are never
//! mutated after creation.

use minact_common::db::models::ProgressSnapshot;
use minact_common::{time, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

fn from_row(row: &SqliteRow) -> Result<ProgressSnapshot> {
    let taken_at: String = row.get("taken_at");
    Ok(ProgressSnapshot {
        guid: row.get("guid"),
        workcycle_guid: row.get("workcycle_guid"),
        open_tasks: row.get("open_tasks"),
        remaining_points: row.get("remaining_points"),
        taken_at: time::from_db(&taken_at)?,
    })
}

pub async fn insert(
    pool: &SqlitePool,
    workcycle_guid: &str,
    open_tasks: i64,
    remaining_points: i64,
) -> Result<ProgressSnapshot> {
    let snapshot = ProgressSnapshot {
        guid: Uuid::new_v4().to_string(),
        workcycle_guid: workcycle_guid.to_string(),
        open_tasks,
        remaining_points,
        taken_at: chrono::Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO progress_snapshots (guid, workcycle_guid, open_tasks, remaining_points, taken_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&snapshot.guid)
    .bind(&snapshot.workcycle_guid)
    .bind(snapshot.open_tasks)
    .bind(snapshot.remaining_points)
    .bind(time::to_db(snapshot.taken_at))
    .execute(pool)
    .await?;

    Ok(snapshot)
}

/// Snapshots for a cycle in chronological order (burndown series)
pub async fn list_for_workcycle(
    pool: &SqlitePool,
    workcycle_guid: &str,
) -> Result<Vec<ProgressSnapshot>> {
    let rows = sqlx::query(
        "SELECT * FROM progress_snapshots WHERE workcycle_guid = ? ORDER BY taken_at ASC, guid ASC",
    )
    .bind(workcycle_guid)
    .fetch_all(pool)
    .await?;

    rows.iter().map(from_row).collect()
}
