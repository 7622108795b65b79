//! Notification endpoints

use axum::extract::{Path, State};
use axum::{Extension, Json};
use minact_common::db::models::Notification;

use crate::api::auth::CurrentUser;
use crate::api::ApiResult;
use crate::db::notifications;
use crate::AppState;

/// GET /notifications - the caller's notifications, newest first
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<Notification>>> {
    Ok(Json(notifications::list_for_user(&state.db, &caller.guid).await?))
}

/// POST /notifications/:guid/read - mark one of the caller's
/// notifications as read
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Path(guid): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    notifications::mark_read(&state.db, &guid, &caller.guid).await?;
    Ok(Json(serde_json::json!({ "status": "read" })))
}
