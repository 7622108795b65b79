//! minact-server library - meeting minutes to tracked action items
//!
//! An admin feeds in a meeting transcript (or audio), the transcript
//! analyzer extracts a summary plus task drafts, and the lifecycle engine
//! turns those drafts into trackable task records. Users authenticate with
//! bearer tokens, work their own tasks through submit/verify, and read
//! aggregate analytics.

use axum::Router;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod analytics;
pub mod api;
pub mod db;
pub mod extractor;
pub mod lifecycle;
pub mod sweeper;

use extractor::TranscriptAnalyzer;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Transcript analysis service (trait object so tests can stub it)
    pub analyzer: Arc<dyn TranscriptAnalyzer>,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool, analyzer: Arc<dyn TranscriptAnalyzer>) -> Self {
        Self { db, analyzer }
    }
}

/// Build application router
///
/// Everything except health and the two auth endpoints sits behind the
/// bearer-token middleware.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{delete, get, post};

    // Protected routes (require a valid bearer token)
    let protected = Router::new()
        .route("/users", get(api::users::list_users))
        .route("/users/me", get(api::users::me))
        .route("/meetings/process", post(api::meetings::process_meeting))
        .route("/meetings", get(api::meetings::list_meetings))
        .route("/meetings/:guid/tasks", get(api::meetings::meeting_tasks))
        .route("/tasks", get(api::tasks::list_tasks).post(api::tasks::create_task))
        .route("/tasks/my", get(api::tasks::my_tasks))
        .route("/tasks/capture", post(api::tasks::capture_task))
        .route("/tasks/plan-tomorrow", post(api::tasks::plan_tomorrow))
        .route("/tasks/sweep/sla", post(api::tasks::sla_sweep))
        .route("/tasks/:guid", get(api::tasks::get_task).patch(api::tasks::update_task))
        .route("/tasks/:guid/submit", post(api::tasks::submit_task))
        .route("/tasks/:guid/verify", post(api::tasks::verify_task))
        .route("/tasks/:guid/approve", post(api::tasks::approve_task))
        .route("/workcycles", get(api::workcycles::list_workcycles).post(api::workcycles::create_workcycle))
        .route("/workcycles/:guid", get(api::workcycles::get_workcycle))
        .route("/workcycles/:guid/snapshot", post(api::workcycles::take_snapshot))
        .route("/workcycles/:guid/snapshots", get(api::workcycles::list_snapshots))
        .route("/bundles", get(api::bundles::list_bundles).post(api::bundles::create_bundle))
        .route("/bundles/:guid", delete(api::bundles::delete_bundle))
        .route("/notifications", get(api::notifications::list_notifications))
        .route("/notifications/:guid/read", post(api::notifications::mark_read))
        .route("/analytics/briefing", get(api::analytics::daily_briefing))
        .route("/analytics/productivity", get(api::analytics::productivity))
        .route("/analytics/blockers", post(api::analytics::scan_blockers))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth::auth_middleware,
        ));

    // Public routes (no authentication)
    let public = Router::new()
        .route("/health", get(api::health::health))
        .route("/auth/register", post(api::auth::register))
        .route("/auth/login", post(api::auth::login));

    // Combine routers
    Router::new()
        .merge(protected)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
