//! User endpoints

use axum::extract::State;
use axum::{Extension, Json};
use minact_common::db::models::User;

use crate::api::auth::{require_admin, CurrentUser};
use crate::api::ApiResult;
use crate::db::users;
use crate::AppState;

/// GET /users - all users ordered by username (admin)
pub async fn list_users(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<User>>> {
    require_admin(&caller)?;
    Ok(Json(users::list_all(&state.db).await?))
}

/// GET /users/me - the authenticated caller
pub async fn me(
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
) -> ApiResult<Json<User>> {
    Ok(Json(caller))
}
