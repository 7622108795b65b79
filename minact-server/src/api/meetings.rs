//! Meeting endpoints: transcript/audio processing and listings
//!
//! Processing is all-or-nothing: the meeting record and every extracted
//! task commit in a single transaction, and any analyzer failure surfaces
//! as one error with nothing created.

use axum::extract::{Path, State};
use axum::{Extension, Json};
use base64::Engine;
use minact_common::db::models::{Meeting, Task};
use minact_common::{time, Error};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::api::auth::{require_admin, CurrentUser};
use crate::api::ApiResult;
use crate::db::{meetings, tasks};
use crate::lifecycle;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ProcessMeetingRequest {
    pub title: String,
    /// Meeting date (free-form ISO string); defaults to now
    pub date: Option<String>,
    /// Raw transcript text
    pub transcript: Option<String>,
    /// Base64-encoded audio, transcribed through the analyzer first
    pub audio_base64: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProcessMeetingResponse {
    pub meeting: Meeting,
    pub tasks: Vec<Task>,
}

/// POST /meetings/process (admin)
///
/// Accepts a transcript, an audio file, or both (transcript wins).
pub async fn process_meeting(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Json(req): Json<ProcessMeetingRequest>,
) -> ApiResult<Json<ProcessMeetingResponse>> {
    require_admin(&caller)?;

    let title = req.title.trim().to_string();
    if title.is_empty() {
        return Err(Error::InvalidInput("title is required".to_string()).into());
    }
    if req.transcript.is_none() && req.audio_base64.is_none() {
        return Err(Error::InvalidInput(
            "Provide transcript text or an audio file".to_string(),
        )
        .into());
    }

    let mut effective_text = req.transcript;
    if effective_text.is_none() {
        // Audio path: validate the payload, then transcribe through the
        // same external service
        let audio = req.audio_base64.unwrap_or_default();
        base64::engine::general_purpose::STANDARD
            .decode(audio.as_bytes())
            .map_err(|e| Error::InvalidInput(format!("audio_base64 is not valid base64: {}", e)))?;

        let transcript = state.analyzer.transcribe(&audio).await?;
        effective_text = Some(transcript);
    }

    let effective_text = match effective_text.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => {
            return Err(Error::InvalidInput(
                "No transcript text available after processing".to_string(),
            )
            .into())
        }
    };

    let extraction = state.analyzer.analyze(&title, &effective_text).await?;

    let now = chrono::Utc::now();
    let meeting = Meeting {
        guid: Uuid::new_v4().to_string(),
        title,
        date: req.date.unwrap_or_else(|| time::to_db(now)),
        summary: extraction.summary.clone(),
        processed_by: Some(caller.guid.clone()),
        created_at: now,
    };

    // Meeting plus all extracted tasks commit atomically
    let mut tx = state.db.begin().await.map_err(Error::Database)?;
    meetings::insert(&mut tx, &meeting).await?;

    let mut created = Vec::new();
    for draft in &extraction.tasks {
        if let Some(task) = lifecycle::create_from_draft(&mut tx, &meeting, draft).await? {
            created.push(task);
        }
    }
    tx.commit().await.map_err(Error::Database)?;

    info!(
        meeting = %meeting.guid,
        tasks = created.len(),
        "Processed meeting transcript"
    );

    Ok(Json(ProcessMeetingResponse {
        meeting,
        tasks: created,
    }))
}

/// GET /meetings - all meetings, most recent first (admin)
pub async fn list_meetings(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<Meeting>>> {
    require_admin(&caller)?;
    Ok(Json(meetings::list_all(&state.db).await?))
}

/// GET /meetings/:guid/tasks (admin)
pub async fn meeting_tasks(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Path(guid): Path<String>,
) -> ApiResult<Json<Vec<Task>>> {
    require_admin(&caller)?;
    meetings::fetch(&state.db, &guid).await?;
    Ok(Json(tasks::list_for_meeting(&state.db, &guid).await?))
}
