//! Database models

use crate::types::{EffortTag, TaskStatus};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub guid: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub password_salt: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meeting {
    pub guid: String,
    pub title: String,
    pub date: String,
    pub summary: Option<String>,
    pub processed_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The central mutable record: one meeting, one assignee, a closed status
/// driven through the lifecycle engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub guid: String,
    pub description: String,
    pub due_date: Option<NaiveDate>,
    pub status: TaskStatus,
    pub priority: i64,
    pub effort_tag: Option<EffortTag>,
    pub confidence: Option<f64>,
    pub needs_priority_review: bool,
    pub suggested_focus_time: Option<NaiveDateTime>,
    pub is_approved: bool,
    pub progress: i64,
    pub is_blocked: bool,
    pub blocker_reason: Option<String>,
    pub is_potential_risk: bool,
    pub risk_reason: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub submission_notes: Option<String>,
    pub submission_url: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
    pub verified_by: Option<String>,
    pub verification_notes: Option<String>,
    pub verification_deadline_at: Option<DateTime<Utc>>,
    pub sla_breached: bool,
    pub story_points: Option<i64>,
    pub meeting_guid: String,
    pub assignee_guid: String,
    pub workcycle_guid: Option<String>,
    pub bundle_guid: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

/// Time-boxed grouping of tasks (sprint)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkCycle {
    pub guid: String,
    pub name: String,
    pub goal: Option<String>,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Named grouping of tasks, independent of time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bundle {
    pub guid: String,
    pub name: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub guid: String,
    pub user_guid: String,
    pub task_guid: Option<String>,
    pub body: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Point-in-time remaining-effort measurement for a work cycle.
/// Insert-only; rows are never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub guid: String,
    pub workcycle_guid: String,
    pub open_tasks: i64,
    pub remaining_points: i64,
    pub taken_at: DateTime<Utc>,
}
