//! Task lifecycle engine
//!
//! Creation-time enrichment and every legal state transition live here.
//! Each transition is a single synchronous read-modify-write transaction:
//! all field updates commit atomically or not at all, and notifications
//! ride in the same transaction as the transition that caused them.
//! Cross-transition races resolve last-write-wins; there is no version
//! counter and nothing is retried.

use chrono::{Days, Duration, NaiveDate, NaiveDateTime, Utc};
use minact_common::db::models::{Meeting, Task, User};
use minact_common::types::{EffortTag, TaskStatus};
use minact_common::{Error, Result};
use serde::Deserialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;
use uuid::Uuid;

use crate::db::{meetings, notifications, settings, tasks, users};
use crate::extractor::TaskDraft;

/// Drafts below this confidence are forced into priority review
pub const CONFIDENCE_REVIEW_THRESHOLD: f64 = 0.7;

/// Priority assigned to low-confidence drafts, regardless of extraction
pub const LOW_CONFIDENCE_PRIORITY: i64 = 4;

/// Priority when the draft carries none
pub const DEFAULT_PRIORITY: i64 = 5;

/// Story points above this gate creation behind manager approval
pub const APPROVAL_STORY_POINT_LIMIT: i64 = 8;

/// Progress a task is reset to when verification rejects it
pub const REWORK_PROGRESS: i64 = 50;

/// Focus-window start: midnight of the due date minus the effort hours.
/// Undefined unless both inputs are present.
pub fn suggested_focus_time(
    due_date: Option<NaiveDate>,
    effort: Option<EffortTag>,
) -> Option<NaiveDateTime> {
    let midnight = due_date?.and_hms_opt(0, 0, 0)?;
    Some(midnight - Duration::hours(effort?.hours()))
}

/// Creation-time attributes derived from an extraction draft
#[derive(Debug, PartialEq)]
pub struct DraftAttributes {
    pub status: TaskStatus,
    pub priority: i64,
    pub needs_priority_review: bool,
    pub due_date: Option<NaiveDate>,
    pub effort_tag: Option<EffortTag>,
    pub suggested_focus_time: Option<NaiveDateTime>,
}

/// Apply the creation rules to one draft.
///
/// Extraction output is untrusted: unparsable due dates and effort tags
/// degrade to absent rather than failing the whole meeting. A missing
/// confidence counts as low confidence.
pub fn enrich_draft(draft: &TaskDraft) -> DraftAttributes {
    let effort_tag = draft
        .effort_tag
        .as_deref()
        .and_then(|s| s.parse::<EffortTag>().ok());
    let due_date = draft
        .due_date
        .as_deref()
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok());

    let confident = draft
        .confidence
        .map(|c| c >= CONFIDENCE_REVIEW_THRESHOLD)
        .unwrap_or(false);
    let (priority, needs_priority_review) = if confident {
        (draft.priority.unwrap_or(DEFAULT_PRIORITY).clamp(0, 10), false)
    } else {
        (LOW_CONFIDENCE_PRIORITY, true)
    };

    // Approval gate: big tasks start life waiting for a manager
    let gated = draft
        .story_points
        .map(|p| p > APPROVAL_STORY_POINT_LIMIT)
        .unwrap_or(false)
        || effort_tag == Some(EffortTag::Large);
    let status = if gated {
        TaskStatus::ManagerApprovalPending
    } else {
        TaskStatus::ToDo
    };

    DraftAttributes {
        status,
        priority,
        needs_priority_review,
        due_date,
        effort_tag,
        suggested_focus_time: suggested_focus_time(due_date, effort_tag),
    }
}

fn blank_task(description: String, meeting_guid: String, assignee_guid: String) -> Task {
    let now = Utc::now();
    Task {
        guid: Uuid::new_v4().to_string(),
        description,
        due_date: None,
        status: TaskStatus::ToDo,
        priority: DEFAULT_PRIORITY,
        effort_tag: None,
        confidence: None,
        needs_priority_review: false,
        suggested_focus_time: None,
        is_approved: false,
        progress: 0,
        is_blocked: false,
        blocker_reason: None,
        is_potential_risk: false,
        risk_reason: None,
        submitted_at: None,
        submission_notes: None,
        submission_url: None,
        verified_at: None,
        verified_by: None,
        verification_notes: None,
        verification_deadline_at: None,
        sla_breached: false,
        story_points: None,
        meeting_guid,
        assignee_guid,
        workcycle_guid: None,
        bundle_guid: None,
        created_at: now,
        last_updated: now,
    }
}

/// Create one task from an extraction draft inside the meeting-creation
/// transaction. Drafts without a description are skipped (returns None).
pub async fn create_from_draft(
    conn: &mut SqliteConnection,
    meeting: &Meeting,
    draft: &TaskDraft,
) -> Result<Option<Task>> {
    let description = match draft.description.as_deref().map(str::trim) {
        Some(d) if !d.is_empty() => d.to_string(),
        _ => return Ok(None),
    };

    let assignee =
        users::lookup_or_create(conn, draft.assignee.as_deref().unwrap_or("unassigned")).await?;

    let attrs = enrich_draft(draft);
    let mut task = blank_task(description, meeting.guid.clone(), assignee.guid);
    task.due_date = attrs.due_date;
    task.status = attrs.status;
    task.priority = attrs.priority;
    task.effort_tag = attrs.effort_tag;
    task.confidence = draft.confidence;
    task.needs_priority_review = attrs.needs_priority_review;
    task.suggested_focus_time = attrs.suggested_focus_time;
    task.is_potential_risk = draft.is_potential_risk.unwrap_or(false);
    task.risk_reason = draft.risk_reason.clone();
    task.story_points = draft.story_points;

    tasks::insert(conn, &task).await?;
    Ok(Some(task))
}

/// Input for manual task creation (admin)
#[derive(Debug, Deserialize)]
pub struct ManualTaskInput {
    pub description: String,
    pub meeting_guid: String,
    pub assignee_username: String,
    pub due_date: Option<String>,
    pub priority: Option<i64>,
    pub effort_tag: Option<String>,
    pub story_points: Option<i64>,
}

/// Manually create a task. Bypasses the approval gate entirely: the task
/// always starts in To Do, whatever its size.
pub async fn create_manual(pool: &SqlitePool, input: ManualTaskInput) -> Result<Task> {
    let description = input.description.trim().to_string();
    if description.is_empty() {
        return Err(Error::InvalidInput("description is required".to_string()));
    }
    let due_date = input
        .due_date
        .as_deref()
        .map(minact_common::time::date_from_db)
        .transpose()?;
    let effort_tag = input
        .effort_tag
        .as_deref()
        .map(|s| s.parse::<EffortTag>())
        .transpose()?;
    let priority = match input.priority {
        Some(p) if !(0..=10).contains(&p) => {
            return Err(Error::InvalidInput(format!("priority out of range: {}", p)))
        }
        Some(p) => p,
        None => DEFAULT_PRIORITY,
    };

    let meeting = meetings::fetch(pool, &input.meeting_guid).await?;

    let mut tx = pool.begin().await?;
    let assignee = users::lookup_or_create(&mut tx, &input.assignee_username).await?;

    let mut task = blank_task(description, meeting.guid, assignee.guid);
    task.due_date = due_date;
    task.priority = priority;
    task.effort_tag = effort_tag;
    task.story_points = input.story_points;
    task.suggested_focus_time = suggested_focus_time(due_date, effort_tag);

    tasks::insert(&mut tx, &task).await?;
    tx.commit().await?;

    Ok(task)
}

/// Quick free-text capture: always lands in the Capture Inbox, assigned to
/// the named user when the name resolves, otherwise to the requester.
pub async fn capture(
    pool: &SqlitePool,
    requester: &User,
    text: &str,
    assignee_name: Option<&str>,
) -> Result<Task> {
    let description = text.trim().to_string();
    if description.is_empty() {
        return Err(Error::InvalidInput("text is required".to_string()));
    }

    let assignee_guid = match assignee_name {
        Some(name) => match users::find_by_username(pool, name.trim()).await? {
            Some(user) => user.guid,
            None => requester.guid.clone(),
        },
        None => requester.guid.clone(),
    };

    let mut tx = pool.begin().await?;
    let inbox = meetings::capture_inbox_for(&mut tx, &requester.guid).await?;

    let mut task = blank_task(description, inbox.guid, assignee_guid);
    task.status = TaskStatus::CaptureInbox;

    tasks::insert(&mut tx, &task).await?;
    tx.commit().await?;

    Ok(task)
}

/// Manager approval: legal only from Manager Approval Pending
pub async fn approve(pool: &SqlitePool, task_guid: &str) -> Result<Task> {
    let mut tx = pool.begin().await?;
    let mut task = tasks::fetch(&mut tx, task_guid).await?;

    if task.status != TaskStatus::ManagerApprovalPending {
        return Err(Error::FailedPrecondition(format!(
            "Cannot approve a task in status '{}'",
            task.status
        )));
    }

    task.status = TaskStatus::ToDo;
    task.is_approved = true;
    task.last_updated = Utc::now();
    tasks::persist(&mut tx, &task).await?;

    notifications::insert(
        &mut tx,
        &task.assignee_guid,
        Some(&task.guid),
        &format!("Task approved for work: {}", task.description),
    )
    .await?;

    tx.commit().await?;
    Ok(task)
}

/// Submission payload (both fields optional)
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SubmitInput {
    pub notes: Option<String>,
    pub url: Option<String>,
}

/// Submit finished work for verification. Only the assignee may submit.
pub async fn submit(
    pool: &SqlitePool,
    task_guid: &str,
    caller: &User,
    input: SubmitInput,
) -> Result<Task> {
    let sla_hours = settings::verification_sla_hours(pool).await?;

    let mut tx = pool.begin().await?;
    let mut task = tasks::fetch(&mut tx, task_guid).await?;

    if task.assignee_guid != caller.guid {
        return Err(Error::Forbidden(
            "Only the assignee may submit this task".to_string(),
        ));
    }

    let now = Utc::now();
    task.submitted_at = Some(now);
    task.submission_notes = input.notes;
    task.submission_url = input.url;
    task.progress = 100;
    task.status = TaskStatus::Submitted;
    task.verification_deadline_at = Some(now + Duration::hours(sla_hours));
    task.last_updated = now;
    tasks::persist(&mut tx, &task).await?;

    // The admin who processed the meeting is the natural verifier
    let processor = meetings::processor_of(&mut tx, &task.meeting_guid).await?;
    if let Some(processor) = processor.as_deref() {
        if processor != caller.guid {
            notifications::insert(
                &mut tx,
                processor,
                Some(&task.guid),
                &format!(
                    "{} submitted \"{}\" for verification",
                    caller.username, task.description
                ),
            )
            .await?;
        }
    }

    tx.commit().await?;
    Ok(task)
}

/// Verification decision payload
#[derive(Debug, Deserialize)]
pub struct VerifyInput {
    pub approved: bool,
    #[serde(default)]
    pub feedback: Option<String>,
}

/// Verify a submitted task (admin only, enforced by the handler).
/// Requires a submission on record; approval closes the task, rejection
/// sends it back to Doing at rework progress.
pub async fn verify(
    pool: &SqlitePool,
    task_guid: &str,
    verifier: &User,
    input: VerifyInput,
) -> Result<Task> {
    let mut tx = pool.begin().await?;
    let mut task = tasks::fetch(&mut tx, task_guid).await?;

    if task.submitted_at.is_none() {
        return Err(Error::FailedPrecondition(
            "Cannot verify a task that has not been submitted".to_string(),
        ));
    }

    let now = Utc::now();
    task.verification_notes = input.feedback.clone();
    task.last_updated = now;

    let body = if input.approved {
        task.status = TaskStatus::Done;
        task.verified_at = Some(now);
        task.verified_by = Some(verifier.guid.clone());
        format!("Task verified and closed: {}", task.description)
    } else {
        task.status = TaskStatus::Doing;
        task.submitted_at = None;
        task.progress = REWORK_PROGRESS;
        match input.feedback.as_deref() {
            Some(feedback) => format!(
                "Task returned for rework: {} (feedback: {})",
                task.description, feedback
            ),
            None => format!("Task returned for rework: {}", task.description),
        }
    };

    tasks::persist(&mut tx, &task).await?;
    notifications::insert(&mut tx, &task.assignee_guid, Some(&task.guid), &body).await?;

    tx.commit().await?;
    Ok(task)
}

/// General single-record update (admin or assignee)
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TaskChanges {
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub status: Option<String>,
    pub priority: Option<i64>,
    pub progress: Option<i64>,
    pub effort_tag: Option<String>,
    pub story_points: Option<i64>,
    pub is_blocked: Option<bool>,
    pub blocker_reason: Option<String>,
    pub is_potential_risk: Option<bool>,
    pub risk_reason: Option<String>,
    pub submission_notes: Option<String>,
    pub submission_url: Option<String>,
    pub workcycle_guid: Option<String>,
    pub bundle_guid: Option<String>,
}

/// Apply a general update. All inputs are validated before any mutation;
/// setting progress to 100 forces the task to Done as a side effect.
pub async fn update(
    pool: &SqlitePool,
    task_guid: &str,
    caller: &User,
    changes: TaskChanges,
) -> Result<Task> {
    // Parse and validate everything up front
    let status = changes
        .status
        .as_deref()
        .map(|s| s.parse::<TaskStatus>())
        .transpose()?;
    let effort_tag = changes
        .effort_tag
        .as_deref()
        .map(|s| s.parse::<EffortTag>())
        .transpose()?;
    let due_date = changes
        .due_date
        .as_deref()
        .map(minact_common::time::date_from_db)
        .transpose()?;
    if let Some(p) = changes.priority {
        if !(0..=10).contains(&p) {
            return Err(Error::InvalidInput(format!("priority out of range: {}", p)));
        }
    }
    if let Some(p) = changes.progress {
        if !(0..=100).contains(&p) {
            return Err(Error::InvalidInput(format!("progress out of range: {}", p)));
        }
    }
    if let Some(guid) = changes.workcycle_guid.as_deref() {
        crate::db::workcycles::fetch(pool, guid).await?;
    }
    if let Some(guid) = changes.bundle_guid.as_deref() {
        crate::db::bundles::fetch(pool, guid).await?;
    }

    let mut tx = pool.begin().await?;
    let mut task = tasks::fetch(&mut tx, task_guid).await?;

    if task.assignee_guid != caller.guid && !caller.is_admin {
        return Err(Error::Forbidden(
            "Not allowed to update this task".to_string(),
        ));
    }

    if let Some(description) = changes.description {
        let trimmed = description.trim().to_string();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput("description cannot be empty".to_string()));
        }
        task.description = trimmed;
    }
    if due_date.is_some() {
        task.due_date = due_date;
    }
    if let Some(status) = status {
        task.status = status;
    }
    if let Some(priority) = changes.priority {
        task.priority = priority;
    }
    if effort_tag.is_some() {
        task.effort_tag = effort_tag;
    }
    if changes.story_points.is_some() {
        task.story_points = changes.story_points;
    }
    if let Some(is_blocked) = changes.is_blocked {
        task.is_blocked = is_blocked;
    }
    if changes.blocker_reason.is_some() {
        task.blocker_reason = changes.blocker_reason;
    }
    if let Some(is_risk) = changes.is_potential_risk {
        task.is_potential_risk = is_risk;
    }
    if changes.risk_reason.is_some() {
        task.risk_reason = changes.risk_reason;
    }
    if changes.submission_notes.is_some() {
        task.submission_notes = changes.submission_notes;
    }
    if changes.submission_url.is_some() {
        task.submission_url = changes.submission_url;
    }
    if changes.workcycle_guid.is_some() {
        task.workcycle_guid = changes.workcycle_guid;
    }
    if changes.bundle_guid.is_some() {
        task.bundle_guid = changes.bundle_guid;
    }
    if let Some(progress) = changes.progress {
        task.progress = progress;
        // Full progress closes the task, whatever else the update said
        if progress == 100 {
            task.status = TaskStatus::Done;
        }
    }

    task.last_updated = Utc::now();
    tasks::persist(&mut tx, &task).await?;
    tx.commit().await?;

    Ok(task)
}

/// Flag every submitted task whose verification deadline has passed.
/// Idempotent per task: the sla_breached flag keeps a breach from
/// notifying twice.
pub async fn sla_sweep(pool: &SqlitePool) -> Result<u64> {
    let now = Utc::now();
    let candidates = tasks::sla_breach_candidates(pool, now).await?;
    if candidates.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    let mut flagged = 0u64;
    for mut task in candidates {
        task.sla_breached = true;
        task.last_updated = now;
        tasks::persist(&mut tx, &task).await?;
        notifications::insert(
            &mut tx,
            &task.assignee_guid,
            Some(&task.guid),
            &format!("Verification overdue for submitted task: {}", task.description),
        )
        .await?;
        flagged += 1;
    }
    tx.commit().await?;

    info!(flagged, "SLA sweep complete");
    Ok(flagged)
}

/// Roll a user's unfinished active tasks over to tomorrow. Due dates only
/// ever move forward: a later due date is never pulled back.
pub async fn plan_tomorrow(pool: &SqlitePool, user: &User) -> Result<u64> {
    let tomorrow = Utc::now()
        .date_naive()
        .checked_add_days(Days::new(1))
        .ok_or_else(|| Error::Internal("Date overflow computing tomorrow".to_string()))?;

    let candidates = tasks::plan_tomorrow_candidates(pool, &user.guid).await?;
    if candidates.is_empty() {
        return Ok(0);
    }

    let now = Utc::now();
    let mut tx = pool.begin().await?;
    let mut moved = 0u64;
    for mut task in candidates {
        task.status = TaskStatus::PlannedForTomorrow;
        task.due_date = match task.due_date {
            Some(due) if due >= tomorrow => Some(due),
            _ => Some(tomorrow),
        };
        task.last_updated = now;
        tasks::persist(&mut tx, &task).await?;
        moved += 1;
    }
    tx.commit().await?;

    info!(moved, user = %user.username, "Plan-for-tomorrow sweep complete");
    Ok(moved)
}
