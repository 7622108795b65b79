//! Authentication: registration, login and the bearer-token middleware
//!
//! Tokens are opaque strings mapped to a user with an expiry in the
//! sessions table. Expired and unknown tokens are rejected uniformly with
//! 401. Everything behind the middleware sees the caller as a
//! `CurrentUser` request extension.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use axum::Json;
use minact_common::db::models::User;
use minact_common::{credentials, Error};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::{ApiError, ApiResult};
use crate::db::{sessions, settings, users};
use crate::AppState;

/// Authenticated caller, inserted into request extensions by the middleware
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Reject unless the caller is an admin
pub fn require_admin(user: &User) -> Result<(), ApiError> {
    if user.is_admin {
        Ok(())
    } else {
        Err(Error::Forbidden("Admin privileges required".to_string()).into())
    }
}

/// Bearer-token authentication middleware
///
/// Applied to all protected routes; health and the auth endpoints stay
/// public.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| Error::Unauthorized("Missing bearer token".to_string()))?;

    let user = sessions::authenticate(&state.db, token).await?;
    request.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(request).await)
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub is_admin: bool,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Json<User>> {
    let username = req.username.trim();
    if username.is_empty() {
        return Err(Error::InvalidInput("username is required".to_string()).into());
    }
    if req.password.is_empty() {
        return Err(Error::InvalidInput("password is required".to_string()).into());
    }
    if users::find_by_username(&state.db, username).await?.is_some() {
        return Err(Error::InvalidInput("Username already exists".to_string()).into());
    }

    let user = users::insert(&state.db, username, &req.password, req.is_admin).await?;
    info!(username = %user.username, admin = user.is_admin, "Registered user");

    Ok(Json(user))
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    if req.username.trim().is_empty() || req.password.is_empty() {
        return Err(Error::InvalidInput("username and password required".to_string()).into());
    }

    let user = users::find_by_username(&state.db, req.username.trim())
        .await?
        .ok_or_else(|| Error::Unauthorized("Invalid credentials".to_string()))?;

    if !credentials::verify_password(&req.password, &user.password_salt, &user.password_hash) {
        return Err(Error::Unauthorized("Invalid credentials".to_string()).into());
    }

    let ttl = settings::session_timeout_seconds(&state.db).await?;
    let token = sessions::create(&state.db, &user.guid, ttl).await?;

    Ok(Json(TokenResponse {
        access_token: token,
        token_type: "bearer".to_string(),
    }))
}
