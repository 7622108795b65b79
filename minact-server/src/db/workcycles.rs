//! Work cycle (sprint) database operations

use minact_common::db::models::WorkCycle;
use minact_common::{time, Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

fn from_row(row: &SqliteRow) -> Result<WorkCycle> {
    let starts_on: String = row.get("starts_on");
    let ends_on: String = row.get("ends_on");
    let created_at: String = row.get("created_at");
    Ok(WorkCycle {
        guid: row.get("guid"),
        name: row.get("name"),
        goal: row.get("goal"),
        starts_on: time::date_from_db(&starts_on)?,
        ends_on: time::date_from_db(&ends_on)?,
        created_by: row.get("created_by"),
        created_at: time::from_db(&created_at)?,
    })
}

pub async fn insert(
    pool: &SqlitePool,
    name: &str,
    goal: Option<String>,
    starts_on: chrono::NaiveDate,
    ends_on: chrono::NaiveDate,
    created_by: &str,
) -> Result<WorkCycle> {
    let cycle = WorkCycle {
        guid: Uuid::new_v4().to_string(),
        name: name.to_string(),
        goal,
        starts_on,
        ends_on,
        created_by: created_by.to_string(),
        created_at: chrono::Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO work_cycles (guid, name, goal, starts_on, ends_on, created_by, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&cycle.guid)
    .bind(&cycle.name)
    .bind(&cycle.goal)
    .bind(cycle.starts_on.to_string())
    .bind(cycle.ends_on.to_string())
    .bind(&cycle.created_by)
    .bind(time::to_db(cycle.created_at))
    .execute(pool)
    .await?;

    Ok(cycle)
}

pub async fn fetch(pool: &SqlitePool, guid: &str) -> Result<WorkCycle> {
    let row = sqlx::query("SELECT * FROM work_cycles WHERE guid = ?")
        .bind(guid)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => from_row(&row),
        None => Err(Error::NotFound(format!("Work cycle not found: {}", guid))),
    }
}

/// All work cycles, latest start first
pub async fn list_all(pool: &SqlitePool) -> Result<Vec<WorkCycle>> {
    let rows = sqlx::query("SELECT * FROM work_cycles ORDER BY starts_on DESC, guid DESC")
        .fetch_all(pool)
        .await?;

    rows.iter().map(from_row).collect()
}

/// Remaining-effort roll-up for a cycle: open task count plus the sum of
/// their story points (tasks without points contribute zero)
pub async fn remaining_effort(pool: &SqlitePool, workcycle_guid: &str) -> Result<(i64, i64)> {
    let row: (i64, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(*), COALESCE(SUM(COALESCE(story_points, 0)), 0)
        FROM tasks
        WHERE workcycle_guid = ? AND status != 'Done'
        "#,
    )
    .bind(workcycle_guid)
    .fetch_one(pool)
    .await?;

    Ok(row)
}
