//! Aggregation/analytics reader
//!
//! Pure read-side computations over the current entity store, recomputed
//! on every call. Nothing here mutates state and nothing is cached.

use chrono::{Duration, Utc};
use minact_common::{time, Result};
use serde::Serialize;
use sqlx::{Row, SqlitePool};

/// Fixed keyword set for transcript blocker detection. Matching is
/// case-insensitive with no stemming or negation handling; a line saying
/// "no longer blocked" still matches.
pub const BLOCKER_KEYWORDS: [&str; 8] = [
    "blocked",
    "stuck",
    "waiting",
    "can't proceed",
    "dependency",
    "issue",
    "problem",
    "blocker",
];

/// How many example tasks each briefing section carries
const BRIEFING_SAMPLE_SIZE: usize = 3;

#[derive(Debug, Serialize)]
pub struct TaskWithReason {
    pub guid: String,
    pub description: String,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HighPriorityTask {
    pub guid: String,
    pub description: String,
    pub priority: i64,
    pub due_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OverdueTask {
    pub guid: String,
    pub description: String,
    pub due_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DailyBriefing {
    pub date: String,
    pub completed_today: i64,
    pub blocked_count: i64,
    pub blocked_tasks: Vec<TaskWithReason>,
    pub risk_count: i64,
    pub risk_tasks: Vec<TaskWithReason>,
    pub high_priority: Vec<HighPriorityTask>,
    pub overdue_count: i64,
    pub overdue_tasks: Vec<OverdueTask>,
    pub pending_approval: i64,
    pub sla_breached: i64,
}

#[derive(Debug, Serialize)]
pub struct ProductivityReport {
    pub period_days: i64,
    pub meetings_held: i64,
    pub total_tasks: i64,
    pub completed_tasks: i64,
    pub completion_rate: f64,
    pub avg_completion_hours: f64,
    pub blocked_tasks: i64,
    pub blocker_rate: f64,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Today's operational picture: what finished, what is stuck, what needs
/// attention next.
pub async fn daily_briefing(pool: &SqlitePool) -> Result<DailyBriefing> {
    let now = Utc::now();
    let today = now.date_naive().to_string();

    let completed_today: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM tasks WHERE status = 'Done' AND date(last_updated) = ?",
    )
    .bind(&today)
    .fetch_one(pool)
    .await?;

    let blocked = sqlx::query(
        "SELECT guid, description, blocker_reason FROM tasks WHERE is_blocked = 1 AND status != 'Done'",
    )
    .fetch_all(pool)
    .await?;
    let blocked_count = blocked.len() as i64;
    let blocked_tasks = blocked
        .iter()
        .take(BRIEFING_SAMPLE_SIZE)
        .map(|row| TaskWithReason {
            guid: row.get("guid"),
            description: row.get("description"),
            reason: row.get("blocker_reason"),
        })
        .collect();

    let risks = sqlx::query(
        "SELECT guid, description, risk_reason FROM tasks WHERE is_potential_risk = 1 AND status != 'Done'",
    )
    .fetch_all(pool)
    .await?;
    let risk_count = risks.len() as i64;
    let risk_tasks = risks
        .iter()
        .take(BRIEFING_SAMPLE_SIZE)
        .map(|row| TaskWithReason {
            guid: row.get("guid"),
            description: row.get("description"),
            reason: row.get("risk_reason"),
        })
        .collect();

    let high_priority = sqlx::query(
        r#"
        SELECT guid, description, priority, due_date FROM tasks
        WHERE priority >= 8 AND status != 'Done' AND is_approved = 1
        ORDER BY priority DESC
        LIMIT 5
        "#,
    )
    .fetch_all(pool)
    .await?
    .iter()
    .map(|row| HighPriorityTask {
        guid: row.get("guid"),
        description: row.get("description"),
        priority: row.get("priority"),
        due_date: row.get("due_date"),
    })
    .collect();

    let overdue = sqlx::query(
        "SELECT guid, description, due_date FROM tasks WHERE due_date IS NOT NULL AND due_date < ? AND status != 'Done'",
    )
    .bind(&today)
    .fetch_all(pool)
    .await?;
    let overdue_count = overdue.len() as i64;
    let overdue_tasks = overdue
        .iter()
        .take(BRIEFING_SAMPLE_SIZE)
        .map(|row| OverdueTask {
            guid: row.get("guid"),
            description: row.get("description"),
            due_date: row.get("due_date"),
        })
        .collect();

    let pending_approval: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM tasks WHERE status = 'Manager Approval Pending'",
    )
    .fetch_one(pool)
    .await?;

    let sla_breached: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM tasks
        WHERE status = 'Submitted'
          AND verification_deadline_at IS NOT NULL
          AND verification_deadline_at < ?
          AND verified_at IS NULL
        "#,
    )
    .bind(time::to_db(now))
    .fetch_one(pool)
    .await?;

    Ok(DailyBriefing {
        date: today,
        completed_today,
        blocked_count,
        blocked_tasks,
        risk_count,
        risk_tasks,
        high_priority,
        overdue_count,
        overdue_tasks,
        pending_approval,
        sla_breached,
    })
}

/// Throughput over a trailing window of `days`
pub async fn productivity(pool: &SqlitePool, days: i64) -> Result<ProductivityReport> {
    let window_start = time::to_db(Utc::now() - Duration::days(days));

    let meetings_held: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM meetings WHERE created_at >= ?")
            .bind(&window_start)
            .fetch_one(pool)
            .await?;

    let total_tasks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE created_at >= ?")
        .bind(&window_start)
        .fetch_one(pool)
        .await?;

    let completed_tasks: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM tasks WHERE created_at >= ? AND status = 'Done'",
    )
    .bind(&window_start)
    .fetch_one(pool)
    .await?;

    // Mean hours from creation to last update across completed tasks
    let completed: Vec<(String, String)> = sqlx::query_as(
        "SELECT created_at, last_updated FROM tasks WHERE created_at >= ? AND status = 'Done'",
    )
    .bind(&window_start)
    .fetch_all(pool)
    .await?;

    let mut avg_completion_hours = 0.0;
    if !completed.is_empty() {
        let mut total_hours = 0.0;
        for (created_at, last_updated) in &completed {
            let created = time::from_db(created_at)?;
            let updated = time::from_db(last_updated)?;
            total_hours += (updated - created).num_seconds() as f64 / 3600.0;
        }
        avg_completion_hours = total_hours / completed.len() as f64;
    }

    let blocked_tasks: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM tasks WHERE is_blocked = 1 AND created_at >= ?",
    )
    .bind(&window_start)
    .fetch_one(pool)
    .await?;

    let completion_rate = if total_tasks > 0 {
        completed_tasks as f64 / total_tasks as f64 * 100.0
    } else {
        0.0
    };
    let blocker_rate = if total_tasks > 0 {
        blocked_tasks as f64 / total_tasks as f64 * 100.0
    } else {
        0.0
    };

    Ok(ProductivityReport {
        period_days: days,
        meetings_held,
        total_tasks,
        completed_tasks,
        completion_rate: round1(completion_rate),
        avg_completion_hours: round1(avg_completion_hours),
        blocked_tasks,
        blocker_rate: round1(blocker_rate),
    })
}

/// Scan transcript text line-by-line for blocker talk. Returns each
/// matching line once (trimmed, original casing) no matter how many
/// keywords hit it.
pub fn scan_for_blockers(transcript: &str) -> Vec<String> {
    transcript
        .lines()
        .filter_map(|line| {
            let lowered = line.to_lowercase();
            if BLOCKER_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
                Some(line.trim().to_string())
            } else {
                None
            }
        })
        .collect()
}
