//! Integration tests for the minact-server API
//!
//! Drives the full router through tower's oneshot with an in-memory
//! database and a stubbed transcript analyzer.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use minact_common::Result;
use minact_server::extractor::{Extraction, TaskDraft, TranscriptAnalyzer};
use minact_server::{build_router, AppState};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower::util::ServiceExt; // for `oneshot` method

/// Analyzer stub returning a canned extraction
struct StubAnalyzer {
    extraction: Extraction,
}

impl Default for StubAnalyzer {
    fn default() -> Self {
        Self {
            extraction: Extraction {
                summary: Some("Team agreed on the release plan.".to_string()),
                tasks: vec![
                    TaskDraft {
                        description: Some("Finalize the release notes".to_string()),
                        assignee: Some("priya".to_string()),
                        due_date: Some("2030-06-10".to_string()),
                        priority: Some(9),
                        effort_tag: Some("medium".to_string()),
                        confidence: Some(0.9),
                        ..Default::default()
                    },
                    TaskDraft {
                        description: Some("Maybe update the wiki".to_string()),
                        assignee: Some("arjun".to_string()),
                        priority: Some(9),
                        confidence: Some(0.3),
                        ..Default::default()
                    },
                    TaskDraft {
                        description: Some("Rebuild the data pipeline".to_string()),
                        assignee: Some("priya".to_string()),
                        effort_tag: Some("large".to_string()),
                        confidence: Some(0.95),
                        ..Default::default()
                    },
                    // No description: skipped entirely
                    TaskDraft {
                        assignee: Some("priya".to_string()),
                        confidence: Some(0.9),
                        ..Default::default()
                    },
                ],
            },
        }
    }
}

#[async_trait]
impl TranscriptAnalyzer for StubAnalyzer {
    async fn analyze(&self, _title: &str, _transcript: &str) -> Result<Extraction> {
        Ok(self.extraction.clone())
    }

    async fn transcribe(&self, _audio_base64: &str) -> Result<String> {
        Ok("transcribed audio text".to_string())
    }
}

/// Analyzer stub that always fails, for the all-or-nothing test
struct FailingAnalyzer;

#[async_trait]
impl TranscriptAnalyzer for FailingAnalyzer {
    async fn analyze(&self, _title: &str, _transcript: &str) -> Result<Extraction> {
        Err(minact_common::Error::Extractor("model output was garbage".to_string()))
    }

    async fn transcribe(&self, _audio_base64: &str) -> Result<String> {
        Err(minact_common::Error::Extractor("transcription failed".to_string()))
    }
}

async fn setup_app_with(analyzer: Arc<dyn TranscriptAnalyzer>) -> (Router, SqlitePool) {
    let pool = minact_common::db::init_memory_database()
        .await
        .expect("Should create in-memory database");
    let state = AppState::new(pool.clone(), analyzer);
    (build_router(state), pool)
}

async fn setup_app() -> (Router, SqlitePool) {
    setup_app_with(Arc::new(StubAnalyzer::default())).await
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let body = extract_json(response.into_body()).await;
    (status, body)
}

/// Register a user and return a bearer token for them
async fn register_and_login(app: &Router, username: &str, is_admin: bool) -> String {
    let (status, _) = send(
        app,
        request(
            "POST",
            "/auth/register",
            None,
            Some(json!({ "username": username, "password": "pw123", "is_admin": is_admin })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        app,
        request(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "username": username, "password": "pw123" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["access_token"].as_str().unwrap().to_string()
}

/// Process a meeting through the stub analyzer, returning the response body
async fn process_meeting(app: &Router, token: &str) -> Value {
    let (status, body) = send(
        app,
        request(
            "POST",
            "/meetings/process",
            Some(token),
            Some(json!({
                "title": "Release planning",
                "transcript": "Priya will finalize the release notes by Friday."
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body
}

// =============================================================================
// Health and authentication
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_no_auth_required() {
    let (app, _pool) = setup_app().await;

    let (status, body) = send(&app, request("GET", "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "minact-server");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_protected_routes_reject_missing_and_bogus_tokens() {
    let (app, _pool) = setup_app().await;

    let (status, _) = send(&app, request("GET", "/tasks/my", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, request("GET", "/tasks/my", Some("deadbeef"), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_login_me_round_trip() {
    let (app, _pool) = setup_app().await;
    let token = register_and_login(&app, "priya", false).await;

    let (status, body) = send(&app, request("GET", "/users/me", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "priya");
    assert_eq!(body["is_admin"], false);
    // Credential material never leaves the server
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn test_duplicate_registration_rejected() {
    let (app, _pool) = setup_app().await;
    register_and_login(&app, "priya", false).await;

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/auth/register",
            None,
            Some(json!({ "username": "priya", "password": "other" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("already exists"));
}

#[tokio::test]
async fn test_wrong_password_rejected() {
    let (app, _pool) = setup_app().await;
    register_and_login(&app, "priya", false).await;

    let (status, _) = send(
        &app,
        request(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "username": "priya", "password": "nope" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_only_listing_rejects_regular_users() {
    let (app, _pool) = setup_app().await;
    let token = register_and_login(&app, "priya", false).await;

    for uri in ["/tasks", "/meetings", "/users"] {
        let (status, _) = send(&app, request("GET", uri, Some(&token), None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "expected 403 for {}", uri);
    }
}

// =============================================================================
// Meeting processing and extraction enrichment
// =============================================================================

#[tokio::test]
async fn test_process_meeting_creates_enriched_tasks() {
    let (app, _pool) = setup_app().await;
    let admin = register_and_login(&app, "admin", true).await;

    let body = process_meeting(&app, &admin).await;
    assert_eq!(body["meeting"]["summary"], "Team agreed on the release plan.");

    // The descriptionless draft is dropped
    let tasks = body["tasks"].as_array().unwrap();
    assert_eq!(tasks.len(), 3);

    // Confident draft keeps its extracted priority and gets a focus window
    let confident = &tasks[0];
    assert_eq!(confident["status"], "To Do");
    assert_eq!(confident["priority"], 9);
    assert_eq!(confident["needs_priority_review"], false);
    assert_eq!(confident["suggested_focus_time"], "2030-06-09T21:00:00");

    // Low-confidence draft is forced to priority 4 with the review flag
    let shaky = &tasks[1];
    assert_eq!(shaky["priority"], 4);
    assert_eq!(shaky["needs_priority_review"], true);

    // Large effort gates creation behind manager approval
    let big = &tasks[2];
    assert_eq!(big["status"], "Manager Approval Pending");
    assert_eq!(big["is_approved"], false);
}

#[tokio::test]
async fn test_process_meeting_lazily_creates_assignees() {
    let (app, _pool) = setup_app().await;
    let admin = register_and_login(&app, "admin", true).await;

    process_meeting(&app, &admin).await;

    let (status, body) = send(&app, request("GET", "/users", Some(&admin), None)).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["username"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"priya"));
    assert!(names.contains(&"arjun"));
    assert!(names.contains(&"unassigned"));
}

#[tokio::test]
async fn test_process_meeting_requires_transcript_or_audio() {
    let (app, _pool) = setup_app().await;
    let admin = register_and_login(&app, "admin", true).await;

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/meetings/process",
            Some(&admin),
            Some(json!({ "title": "Empty" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("transcript"));
}

#[tokio::test]
async fn test_process_meeting_accepts_audio_via_transcription() {
    let (app, _pool) = setup_app().await;
    let admin = register_and_login(&app, "admin", true).await;

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/meetings/process",
            Some(&admin),
            Some(json!({ "title": "Audio sync", "audio_base64": "aGVsbG8gd29ybGQ=" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["meeting"]["summary"].is_string());

    // Invalid base64 is rejected before the analyzer is consulted
    let (status, _) = send(
        &app,
        request(
            "POST",
            "/meetings/process",
            Some(&admin),
            Some(json!({ "title": "Audio sync", "audio_base64": "!!not-base64!!" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_extraction_failure_creates_nothing() {
    let (app, _pool) = setup_app_with(Arc::new(FailingAnalyzer)).await;
    let admin = register_and_login(&app, "admin", true).await;

    let (status, _) = send(
        &app,
        request(
            "POST",
            "/meetings/process",
            Some(&admin),
            Some(json!({ "title": "Doomed", "transcript": "anything" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    let (_, meetings) = send(&app, request("GET", "/meetings", Some(&admin), None)).await;
    assert!(meetings.as_array().unwrap().is_empty());
}

// =============================================================================
// Task lifecycle through the API
// =============================================================================

/// Create a meeting via the stub and manually add one task for `assignee`
async fn manual_task(app: &Router, admin: &str, assignee: &str) -> String {
    let meeting = process_meeting(app, admin).await;
    let meeting_guid = meeting["meeting"]["guid"].as_str().unwrap();

    let (status, task) = send(
        app,
        request(
            "POST",
            "/tasks",
            Some(admin),
            Some(json!({
                "description": "Fix the quarterly report",
                "meeting_guid": meeting_guid,
                "assignee_username": assignee
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(task["status"], "To Do");
    task["guid"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_submit_verify_reject_then_complete() {
    let (app, _pool) = setup_app().await;
    let admin = register_and_login(&app, "admin", true).await;
    let worker = register_and_login(&app, "priya", false).await;
    let task_guid = manual_task(&app, &admin, "priya").await;

    // Admin is not the assignee and may not submit
    let (status, _) = send(
        &app,
        request("POST", &format!("/tasks/{}/submit", task_guid), Some(&admin), Some(json!({}))),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Assignee submits
    let (status, task) = send(
        &app,
        request(
            "POST",
            &format!("/tasks/{}/submit", task_guid),
            Some(&worker),
            Some(json!({ "notes": "done, see link", "url": "https://example.com/pr/7" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(task["status"], "Submitted");
    assert_eq!(task["progress"], 100);
    assert!(task["submitted_at"].is_string());
    assert!(task["verification_deadline_at"].is_string());

    // Rejection sends it back to Doing at progress 50
    let (status, task) = send(
        &app,
        request(
            "POST",
            &format!("/tasks/{}/verify", task_guid),
            Some(&admin),
            Some(json!({ "approved": false, "feedback": "Numbers are off" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(task["status"], "Doing");
    assert_eq!(task["progress"], 50);
    assert!(task["submitted_at"].is_null());

    // The rejection feedback lands in the worker's notifications
    let (_, notes) = send(&app, request("GET", "/notifications", Some(&worker), None)).await;
    assert!(notes
        .as_array()
        .unwrap()
        .iter()
        .any(|n| n["body"].as_str().unwrap().contains("Numbers are off")));

    // A plain progress=100 update forces Done
    let (status, task) = send(
        &app,
        request(
            "PATCH",
            &format!("/tasks/{}", task_guid),
            Some(&worker),
            Some(json!({ "progress": 100 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(task["status"], "Done");
}

#[tokio::test]
async fn test_verify_before_submit_is_a_precondition_failure() {
    let (app, _pool) = setup_app().await;
    let admin = register_and_login(&app, "admin", true).await;
    register_and_login(&app, "priya", false).await;
    let task_guid = manual_task(&app, &admin, "priya").await;

    let (status, _) = send(
        &app,
        request(
            "POST",
            &format!("/tasks/{}/verify", task_guid),
            Some(&admin),
            Some(json!({ "approved": true })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_approve_only_from_pending_status() {
    let (app, _pool) = setup_app().await;
    let admin = register_and_login(&app, "admin", true).await;
    register_and_login(&app, "priya", false).await;

    let meeting = process_meeting(&app, &admin).await;
    let tasks = meeting["tasks"].as_array().unwrap();
    let pending = tasks
        .iter()
        .find(|t| t["status"] == "Manager Approval Pending")
        .unwrap();
    let plain = tasks.iter().find(|t| t["status"] == "To Do").unwrap();

    // Approving the gated task releases it
    let (status, task) = send(
        &app,
        request(
            "POST",
            &format!("/tasks/{}/approve", pending["guid"].as_str().unwrap()),
            Some(&admin),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(task["status"], "To Do");
    assert_eq!(task["is_approved"], true);

    // Approving a task that never needed it is a precondition failure
    let (status, _) = send(
        &app,
        request(
            "POST",
            &format!("/tasks/{}/approve", plain["guid"].as_str().unwrap()),
            Some(&admin),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_update_rejects_unknown_status_strings() {
    let (app, _pool) = setup_app().await;
    let admin = register_and_login(&app, "admin", true).await;
    register_and_login(&app, "priya", false).await;
    let task_guid = manual_task(&app, &admin, "priya").await;

    let (status, body) = send(
        &app,
        request(
            "PATCH",
            &format!("/tasks/{}", task_guid),
            Some(&admin),
            Some(json!({ "status": "Totally Made Up" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Unknown task status"));
}

#[tokio::test]
async fn test_capture_lands_in_inbox_and_falls_back_to_requester() {
    let (app, _pool) = setup_app().await;
    let worker = register_and_login(&app, "priya", false).await;

    let (status, task) = send(
        &app,
        request(
            "POST",
            "/tasks/capture",
            Some(&worker),
            Some(json!({ "text": "Chase the vendor about licences", "assignee": "nobody-known" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(task["status"], "Capture Inbox");
    assert_eq!(task["is_approved"], false);

    // Unknown assignee resolved to the requester
    let (_, mine) = send(&app, request("GET", "/tasks/my", Some(&worker), None)).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_sla_sweep_endpoint_is_idempotent() {
    let (app, pool) = setup_app().await;
    let admin = register_and_login(&app, "admin", true).await;
    let worker = register_and_login(&app, "priya", false).await;
    let task_guid = manual_task(&app, &admin, "priya").await;

    let (status, _) = send(
        &app,
        request("POST", &format!("/tasks/{}/submit", task_guid), Some(&worker), Some(json!({}))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Backdate the verification deadline
    sqlx::query("UPDATE tasks SET verification_deadline_at = '2020-01-01T00:00:00Z' WHERE guid = ?")
        .bind(&task_guid)
        .execute(&pool)
        .await
        .unwrap();

    let (status, body) = send(&app, request("POST", "/tasks/sweep/sla", Some(&admin), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["affected"], 1);

    let (_, body) = send(&app, request("POST", "/tasks/sweep/sla", Some(&admin), None)).await;
    assert_eq!(body["affected"], 0);

    // Exactly one breach notification for the worker
    let (_, notes) = send(&app, request("GET", "/notifications", Some(&worker), None)).await;
    let breaches = notes
        .as_array()
        .unwrap()
        .iter()
        .filter(|n| n["body"].as_str().unwrap().contains("Verification overdue"))
        .count();
    assert_eq!(breaches, 1);
}

#[tokio::test]
async fn test_plan_tomorrow_endpoint() {
    let (app, _pool) = setup_app().await;
    let admin = register_and_login(&app, "admin", true).await;
    let worker = register_and_login(&app, "priya", false).await;
    let task_guid = manual_task(&app, &admin, "priya").await;

    let (status, body) = send(
        &app,
        request("POST", "/tasks/plan-tomorrow", Some(&worker), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["affected"], 1);

    let (_, task) = send(
        &app,
        request("GET", &format!("/tasks/{}", task_guid), Some(&worker), None),
    )
    .await;
    assert_eq!(task["status"], "Planned for Tomorrow");
    assert!(task["due_date"].is_string());
}

// =============================================================================
// Work cycles, bundles, notifications
// =============================================================================

#[tokio::test]
async fn test_workcycle_snapshot_burndown() {
    let (app, _pool) = setup_app().await;
    let admin = register_and_login(&app, "admin", true).await;
    register_and_login(&app, "priya", false).await;
    let task_guid = manual_task(&app, &admin, "priya").await;

    let (status, cycle) = send(
        &app,
        request(
            "POST",
            "/workcycles",
            Some(&admin),
            Some(json!({
                "name": "Cycle 12",
                "goal": "Ship the reporting revamp",
                "starts_on": "2030-06-01",
                "ends_on": "2030-06-14"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let cycle_guid = cycle["guid"].as_str().unwrap().to_string();

    // Put the task (5 points) into the cycle
    let (status, _) = send(
        &app,
        request(
            "PATCH",
            &format!("/tasks/{}", task_guid),
            Some(&admin),
            Some(json!({ "workcycle_guid": cycle_guid, "story_points": 5 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, snap) = send(
        &app,
        request("POST", &format!("/workcycles/{}/snapshot", cycle_guid), Some(&admin), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snap["open_tasks"], 1);
    assert_eq!(snap["remaining_points"], 5);

    // Completing the task empties the next snapshot
    let (_, _) = send(
        &app,
        request(
            "PATCH",
            &format!("/tasks/{}", task_guid),
            Some(&admin),
            Some(json!({ "progress": 100 })),
        ),
    )
    .await;
    let (_, snap) = send(
        &app,
        request("POST", &format!("/workcycles/{}/snapshot", cycle_guid), Some(&admin), None),
    )
    .await;
    assert_eq!(snap["open_tasks"], 0);
    assert_eq!(snap["remaining_points"], 0);

    let (_, series) = send(
        &app,
        request("GET", &format!("/workcycles/{}/snapshots", cycle_guid), Some(&admin), None),
    )
    .await;
    assert_eq!(series.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_bundle_crud_and_member_detachment() {
    let (app, _pool) = setup_app().await;
    let admin = register_and_login(&app, "admin", true).await;
    register_and_login(&app, "priya", false).await;
    let task_guid = manual_task(&app, &admin, "priya").await;

    let (status, bundle) = send(
        &app,
        request("POST", "/bundles", Some(&admin), Some(json!({ "name": "Q3 reporting" }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let bundle_guid = bundle["guid"].as_str().unwrap().to_string();

    let (status, task) = send(
        &app,
        request(
            "PATCH",
            &format!("/tasks/{}", task_guid),
            Some(&admin),
            Some(json!({ "bundle_guid": bundle_guid })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(task["bundle_guid"], bundle_guid.as_str());

    let (status, _) = send(
        &app,
        request("DELETE", &format!("/bundles/{}", bundle_guid), Some(&admin), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // The task survives with its bundle reference cleared
    let (_, task) = send(
        &app,
        request("GET", &format!("/tasks/{}", task_guid), Some(&admin), None),
    )
    .await;
    assert!(task["bundle_guid"].is_null());
}

#[tokio::test]
async fn test_notifications_mark_read() {
    let (app, _pool) = setup_app().await;
    let admin = register_and_login(&app, "admin", true).await;
    let worker = register_and_login(&app, "priya", false).await;
    let task_guid = manual_task(&app, &admin, "priya").await;

    // Submission notifies the processing admin
    send(
        &app,
        request("POST", &format!("/tasks/{}/submit", task_guid), Some(&worker), Some(json!({}))),
    )
    .await;

    let (_, notes) = send(&app, request("GET", "/notifications", Some(&admin), None)).await;
    let note = &notes.as_array().unwrap()[0];
    assert_eq!(note["is_read"], false);
    let note_guid = note["guid"].as_str().unwrap();

    let (status, _) = send(
        &app,
        request("POST", &format!("/notifications/{}/read", note_guid), Some(&admin), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Another user cannot touch it
    let (status, _) = send(
        &app,
        request("POST", &format!("/notifications/{}/read", note_guid), Some(&worker), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
