//! Bundle group endpoints

use axum::extract::{Path, State};
use axum::{Extension, Json};
use minact_common::db::models::Bundle;
use minact_common::Error;
use serde::Deserialize;

use crate::api::auth::{require_admin, CurrentUser};
use crate::api::ApiResult;
use crate::db::bundles;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateBundleRequest {
    pub name: String,
}

/// POST /bundles (admin)
pub async fn create_bundle(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Json(req): Json<CreateBundleRequest>,
) -> ApiResult<Json<Bundle>> {
    require_admin(&caller)?;

    let name = req.name.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput("name is required".to_string()).into());
    }

    Ok(Json(bundles::insert(&state.db, name, &caller.guid).await?))
}

/// GET /bundles
pub async fn list_bundles(State(state): State<AppState>) -> ApiResult<Json<Vec<Bundle>>> {
    Ok(Json(bundles::list_all(&state.db).await?))
}

/// DELETE /bundles/:guid (admin)
///
/// Member tasks keep existing; they just lose the bundle reference.
pub async fn delete_bundle(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Path(guid): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    require_admin(&caller)?;
    bundles::delete(&state.db, &guid).await?;
    Ok(Json(serde_json::json!({ "status": "deleted" })))
}
