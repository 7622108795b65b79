//! Task database operations
//!
//! All lifecycle mutations go through fetch → modify → persist inside a
//! transaction; this module only moves rows in and out of SQLite.

use chrono::{DateTime, NaiveDateTime, Utc};
use minact_common::db::models::Task;
use minact_common::{time, Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};

/// Storage format for the naive suggested-focus timestamp
const FOCUS_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

fn opt_dt(row: &SqliteRow, column: &str) -> Result<Option<DateTime<Utc>>> {
    row.get::<Option<String>, _>(column)
        .map(|s| time::from_db(&s))
        .transpose()
}

fn from_row(row: &SqliteRow) -> Result<Task> {
    let status: String = row.get("status");
    let effort_tag: Option<String> = row.get("effort_tag");
    let due_date: Option<String> = row.get("due_date");
    let focus: Option<String> = row.get("suggested_focus_time");
    let created_at: String = row.get("created_at");
    let last_updated: String = row.get("last_updated");

    Ok(Task {
        guid: row.get("guid"),
        description: row.get("description"),
        due_date: due_date.map(|s| time::date_from_db(&s)).transpose()?,
        status: status.parse()?,
        priority: row.get("priority"),
        effort_tag: effort_tag.map(|s| s.parse()).transpose()?,
        confidence: row.get("confidence"),
        needs_priority_review: row.get("needs_priority_review"),
        suggested_focus_time: focus
            .map(|s| {
                NaiveDateTime::parse_from_str(&s, FOCUS_TIME_FORMAT)
                    .map_err(|e| Error::Internal(format!("Bad focus time '{}': {}", s, e)))
            })
            .transpose()?,
        is_approved: row.get("is_approved"),
        progress: row.get("progress"),
        is_blocked: row.get("is_blocked"),
        blocker_reason: row.get("blocker_reason"),
        is_potential_risk: row.get("is_potential_risk"),
        risk_reason: row.get("risk_reason"),
        submitted_at: opt_dt(row, "submitted_at")?,
        submission_notes: row.get("submission_notes"),
        submission_url: row.get("submission_url"),
        verified_at: opt_dt(row, "verified_at")?,
        verified_by: row.get("verified_by"),
        verification_notes: row.get("verification_notes"),
        verification_deadline_at: opt_dt(row, "verification_deadline_at")?,
        sla_breached: row.get("sla_breached"),
        story_points: row.get("story_points"),
        meeting_guid: row.get("meeting_guid"),
        assignee_guid: row.get("assignee_guid"),
        workcycle_guid: row.get("workcycle_guid"),
        bundle_guid: row.get("bundle_guid"),
        created_at: time::from_db(&created_at)?,
        last_updated: time::from_db(&last_updated)?,
    })
}

fn focus_to_db(focus: Option<NaiveDateTime>) -> Option<String> {
    focus.map(|f| f.format(FOCUS_TIME_FORMAT).to_string())
}

/// Insert a fully built task record
pub async fn insert(conn: &mut SqliteConnection, task: &Task) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO tasks (
            guid, description, due_date, status, priority, effort_tag, confidence,
            needs_priority_review, suggested_focus_time, is_approved, progress,
            is_blocked, blocker_reason, is_potential_risk, risk_reason,
            submitted_at, submission_notes, submission_url,
            verified_at, verified_by, verification_notes, verification_deadline_at,
            sla_breached, story_points, meeting_guid, assignee_guid,
            workcycle_guid, bundle_guid, created_at, last_updated
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&task.guid)
    .bind(&task.description)
    .bind(task.due_date.map(|d| d.to_string()))
    .bind(task.status.as_str())
    .bind(task.priority)
    .bind(task.effort_tag.map(|e| e.as_str()))
    .bind(task.confidence)
    .bind(task.needs_priority_review)
    .bind(focus_to_db(task.suggested_focus_time))
    .bind(task.is_approved)
    .bind(task.progress)
    .bind(task.is_blocked)
    .bind(&task.blocker_reason)
    .bind(task.is_potential_risk)
    .bind(&task.risk_reason)
    .bind(task.submitted_at.map(time::to_db))
    .bind(&task.submission_notes)
    .bind(&task.submission_url)
    .bind(task.verified_at.map(time::to_db))
    .bind(&task.verified_by)
    .bind(&task.verification_notes)
    .bind(task.verification_deadline_at.map(time::to_db))
    .bind(task.sla_breached)
    .bind(task.story_points)
    .bind(&task.meeting_guid)
    .bind(&task.assignee_guid)
    .bind(&task.workcycle_guid)
    .bind(&task.bundle_guid)
    .bind(time::to_db(task.created_at))
    .bind(time::to_db(task.last_updated))
    .execute(conn)
    .await?;

    Ok(())
}

/// Write back every mutable field of the task
///
/// Meeting, assignee and created_at are immutable after insert.
pub async fn persist(conn: &mut SqliteConnection, task: &Task) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE tasks SET
            description = ?, due_date = ?, status = ?, priority = ?, effort_tag = ?,
            confidence = ?, needs_priority_review = ?, suggested_focus_time = ?,
            is_approved = ?, progress = ?, is_blocked = ?, blocker_reason = ?,
            is_potential_risk = ?, risk_reason = ?,
            submitted_at = ?, submission_notes = ?, submission_url = ?,
            verified_at = ?, verified_by = ?, verification_notes = ?,
            verification_deadline_at = ?, sla_breached = ?, story_points = ?,
            workcycle_guid = ?, bundle_guid = ?, last_updated = ?
        WHERE guid = ?
        "#,
    )
    .bind(&task.description)
    .bind(task.due_date.map(|d| d.to_string()))
    .bind(task.status.as_str())
    .bind(task.priority)
    .bind(task.effort_tag.map(|e| e.as_str()))
    .bind(task.confidence)
    .bind(task.needs_priority_review)
    .bind(focus_to_db(task.suggested_focus_time))
    .bind(task.is_approved)
    .bind(task.progress)
    .bind(task.is_blocked)
    .bind(&task.blocker_reason)
    .bind(task.is_potential_risk)
    .bind(&task.risk_reason)
    .bind(task.submitted_at.map(time::to_db))
    .bind(&task.submission_notes)
    .bind(&task.submission_url)
    .bind(task.verified_at.map(time::to_db))
    .bind(&task.verified_by)
    .bind(&task.verification_notes)
    .bind(task.verification_deadline_at.map(time::to_db))
    .bind(task.sla_breached)
    .bind(task.story_points)
    .bind(&task.workcycle_guid)
    .bind(&task.bundle_guid)
    .bind(time::to_db(task.last_updated))
    .bind(&task.guid)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Task not found: {}", task.guid)));
    }

    Ok(())
}

pub async fn fetch(conn: &mut SqliteConnection, guid: &str) -> Result<Task> {
    let row = sqlx::query("SELECT * FROM tasks WHERE guid = ?")
        .bind(guid)
        .fetch_optional(conn)
        .await?;

    match row {
        Some(row) => from_row(&row),
        None => Err(Error::NotFound(format!("Task not found: {}", guid))),
    }
}

/// All tasks, newest first (admin listing)
pub async fn list_all(pool: &SqlitePool) -> Result<Vec<Task>> {
    let rows = sqlx::query("SELECT * FROM tasks ORDER BY created_at DESC, guid DESC")
        .fetch_all(pool)
        .await?;

    rows.iter().map(from_row).collect()
}

/// Tasks assigned to one user, newest first
pub async fn list_for_assignee(pool: &SqlitePool, user_guid: &str) -> Result<Vec<Task>> {
    let rows = sqlx::query(
        "SELECT * FROM tasks WHERE assignee_guid = ? ORDER BY created_at DESC, guid DESC",
    )
    .bind(user_guid)
    .fetch_all(pool)
    .await?;

    rows.iter().map(from_row).collect()
}

pub async fn list_for_meeting(pool: &SqlitePool, meeting_guid: &str) -> Result<Vec<Task>> {
    let rows = sqlx::query(
        "SELECT * FROM tasks WHERE meeting_guid = ? ORDER BY created_at DESC, guid DESC",
    )
    .bind(meeting_guid)
    .fetch_all(pool)
    .await?;

    rows.iter().map(from_row).collect()
}

pub async fn list_for_workcycle(pool: &SqlitePool, workcycle_guid: &str) -> Result<Vec<Task>> {
    let rows = sqlx::query(
        "SELECT * FROM tasks WHERE workcycle_guid = ? ORDER BY created_at DESC, guid DESC",
    )
    .bind(workcycle_guid)
    .fetch_all(pool)
    .await?;

    rows.iter().map(from_row).collect()
}

/// Submitted tasks past their verification deadline and not yet flagged.
/// The sla_breached filter is what makes the sweep idempotent.
pub async fn sla_breach_candidates(pool: &SqlitePool, now: DateTime<Utc>) -> Result<Vec<Task>> {
    let rows = sqlx::query(
        r#"
        SELECT * FROM tasks
        WHERE status = 'Submitted'
          AND verification_deadline_at IS NOT NULL
          AND verification_deadline_at < ?
          AND verified_at IS NULL
          AND sla_breached = 0
        "#,
    )
    .bind(time::to_db(now))
    .fetch_all(pool)
    .await?;

    rows.iter().map(from_row).collect()
}

/// A user's unfinished active tasks, eligible for the plan-tomorrow sweep
pub async fn plan_tomorrow_candidates(pool: &SqlitePool, user_guid: &str) -> Result<Vec<Task>> {
    let rows = sqlx::query(
        r#"
        SELECT * FROM tasks
        WHERE assignee_guid = ?
          AND status IN ('To Do', 'Doing')
          AND progress < 100
        "#,
    )
    .bind(user_guid)
    .fetch_all(pool)
    .await?;

    rows.iter().map(from_row).collect()
}
