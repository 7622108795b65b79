//! Work cycle (sprint) endpoints

use axum::extract::{Path, State};
use axum::{Extension, Json};
use minact_common::db::models::{ProgressSnapshot, Task, WorkCycle};
use minact_common::{time, Error};
use serde::{Deserialize, Serialize};

use crate::api::auth::{require_admin, CurrentUser};
use crate::api::ApiResult;
use crate::db::{snapshots, tasks, workcycles};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateWorkCycleRequest {
    pub name: String,
    pub goal: Option<String>,
    pub starts_on: String,
    pub ends_on: String,
}

#[derive(Debug, Serialize)]
pub struct WorkCycleDetail {
    #[serde(flatten)]
    pub cycle: WorkCycle,
    pub tasks: Vec<Task>,
}

/// POST /workcycles (admin)
pub async fn create_workcycle(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Json(req): Json<CreateWorkCycleRequest>,
) -> ApiResult<Json<WorkCycle>> {
    require_admin(&caller)?;

    let name = req.name.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput("name is required".to_string()).into());
    }
    let starts_on = time::date_from_db(&req.starts_on)?;
    let ends_on = time::date_from_db(&req.ends_on)?;
    if ends_on < starts_on {
        return Err(Error::InvalidInput("ends_on is before starts_on".to_string()).into());
    }

    let cycle =
        workcycles::insert(&state.db, name, req.goal, starts_on, ends_on, &caller.guid).await?;
    Ok(Json(cycle))
}

/// GET /workcycles
pub async fn list_workcycles(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<WorkCycle>>> {
    Ok(Json(workcycles::list_all(&state.db).await?))
}

/// GET /workcycles/:guid - cycle plus its member tasks
pub async fn get_workcycle(
    State(state): State<AppState>,
    Path(guid): Path<String>,
) -> ApiResult<Json<WorkCycleDetail>> {
    let cycle = workcycles::fetch(&state.db, &guid).await?;
    let tasks = tasks::list_for_workcycle(&state.db, &guid).await?;
    Ok(Json(WorkCycleDetail { cycle, tasks }))
}

/// POST /workcycles/:guid/snapshot (admin)
///
/// Records the current remaining effort as an immutable burndown point.
pub async fn take_snapshot(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Path(guid): Path<String>,
) -> ApiResult<Json<ProgressSnapshot>> {
    require_admin(&caller)?;

    workcycles::fetch(&state.db, &guid).await?;
    let (open_tasks, remaining_points) = workcycles::remaining_effort(&state.db, &guid).await?;
    let snapshot = snapshots::insert(&state.db, &guid, open_tasks, remaining_points).await?;
    Ok(Json(snapshot))
}

/// GET /workcycles/:guid/snapshots - burndown series, oldest first
pub async fn list_snapshots(
    State(state): State<AppState>,
    Path(guid): Path<String>,
) -> ApiResult<Json<Vec<ProgressSnapshot>>> {
    workcycles::fetch(&state.db, &guid).await?;
    Ok(Json(snapshots::list_for_workcycle(&state.db, &guid).await?))
}
