//! Task endpoints: listings, creation and lifecycle transitions
//!
//! Handlers stay thin: authorization that only needs the caller's role
//! happens here, everything stateful is delegated to the lifecycle engine.

use axum::extract::{Path, State};
use axum::{Extension, Json};
use minact_common::db::models::Task;
use serde::{Deserialize, Serialize};

use crate::api::auth::{require_admin, CurrentUser};
use crate::api::ApiResult;
use crate::db::tasks;
use crate::lifecycle;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct SweepResponse {
    pub affected: u64,
}

/// GET /tasks - all tasks, newest first (admin)
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<Task>>> {
    require_admin(&caller)?;
    Ok(Json(tasks::list_all(&state.db).await?))
}

/// GET /tasks/my - the caller's assigned tasks
pub async fn my_tasks(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<Task>>> {
    Ok(Json(tasks::list_for_assignee(&state.db, &caller.guid).await?))
}

/// GET /tasks/:guid - one task (admin or assignee)
pub async fn get_task(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Path(guid): Path<String>,
) -> ApiResult<Json<Task>> {
    let mut conn = state.db.acquire().await.map_err(minact_common::Error::Database)?;
    let task = tasks::fetch(&mut conn, &guid).await?;
    if task.assignee_guid != caller.guid && !caller.is_admin {
        return Err(minact_common::Error::Forbidden(
            "Not allowed to view this task".to_string(),
        )
        .into());
    }
    Ok(Json(task))
}

/// POST /tasks - manual creation (admin); always lands in To Do
pub async fn create_task(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Json(input): Json<lifecycle::ManualTaskInput>,
) -> ApiResult<Json<Task>> {
    require_admin(&caller)?;
    Ok(Json(lifecycle::create_manual(&state.db, input).await?))
}

#[derive(Debug, Deserialize)]
pub struct CaptureRequest {
    pub text: String,
    pub assignee: Option<String>,
}

/// POST /tasks/capture - quick free-text capture into the Capture Inbox
pub async fn capture_task(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Json(req): Json<CaptureRequest>,
) -> ApiResult<Json<Task>> {
    let task =
        lifecycle::capture(&state.db, &caller, &req.text, req.assignee.as_deref()).await?;
    Ok(Json(task))
}

/// PATCH /tasks/:guid - general update (admin or assignee)
pub async fn update_task(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Path(guid): Path<String>,
    Json(changes): Json<lifecycle::TaskChanges>,
) -> ApiResult<Json<Task>> {
    Ok(Json(lifecycle::update(&state.db, &guid, &caller, changes).await?))
}

/// POST /tasks/:guid/submit - assignee submits finished work
pub async fn submit_task(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Path(guid): Path<String>,
    Json(input): Json<lifecycle::SubmitInput>,
) -> ApiResult<Json<Task>> {
    Ok(Json(lifecycle::submit(&state.db, &guid, &caller, input).await?))
}

/// POST /tasks/:guid/verify - admin verdict on a submission
pub async fn verify_task(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Path(guid): Path<String>,
    Json(input): Json<lifecycle::VerifyInput>,
) -> ApiResult<Json<Task>> {
    require_admin(&caller)?;
    Ok(Json(lifecycle::verify(&state.db, &guid, &caller, input).await?))
}

/// POST /tasks/:guid/approve - manager releases a gated task
pub async fn approve_task(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Path(guid): Path<String>,
) -> ApiResult<Json<Task>> {
    require_admin(&caller)?;
    Ok(Json(lifecycle::approve(&state.db, &guid).await?))
}

/// POST /tasks/sweep/sla - on-demand SLA sweep (admin)
pub async fn sla_sweep(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
) -> ApiResult<Json<SweepResponse>> {
    require_admin(&caller)?;
    let affected = lifecycle::sla_sweep(&state.db).await?;
    Ok(Json(SweepResponse { affected }))
}

/// POST /tasks/plan-tomorrow - roll the caller's unfinished tasks forward
pub async fn plan_tomorrow(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
) -> ApiResult<Json<SweepResponse>> {
    let affected = lifecycle::plan_tomorrow(&state.db, &caller).await?;
    Ok(Json(SweepResponse { affected }))
}
