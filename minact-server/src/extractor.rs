//! Transcript analysis service client
//!
//! Turns free-form meeting text into a summary plus task drafts by calling
//! the Gemini generateContent endpoint. The service is reached through the
//! `TranscriptAnalyzer` trait so handlers and tests never depend on the
//! concrete client.
//!
//! Model output is tolerated aggressively: markdown code fences are
//! stripped and the first balanced `{...}` substring is parsed. A total
//! parse failure surfaces as a single extractor error to the caller; there
//! are no retries and no partial results.

use async_trait::async_trait;
use minact_common::{Error, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Gemini API base URL
const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default timeout for generation requests
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default model when MINACT_GEMINI_MODEL is unset
const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// One extracted action item, exactly as the model reported it.
/// Everything except the description is optional and loosely typed; the
/// lifecycle engine normalizes values during task creation.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TaskDraft {
    pub description: Option<String>,
    pub assignee: Option<String>,
    pub due_date: Option<String>,
    pub priority: Option<i64>,
    pub effort_tag: Option<String>,
    pub confidence: Option<f64>,
    pub story_points: Option<i64>,
    pub is_potential_risk: Option<bool>,
    pub risk_reason: Option<String>,
}

/// Result of analyzing one transcript
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Extraction {
    pub summary: Option<String>,
    pub tasks: Vec<TaskDraft>,
}

/// Seam between the workflow and the generative service
#[async_trait]
pub trait TranscriptAnalyzer: Send + Sync {
    /// Extract a summary and task drafts from meeting text
    async fn analyze(&self, title: &str, transcript: &str) -> Result<Extraction>;

    /// Transcribe base64-encoded audio to plain text
    async fn transcribe(&self, audio_base64: &str) -> Result<String>;
}

/// Production analyzer backed by the Gemini REST API
pub struct GeminiAnalyzer {
    http_client: Client,
    api_key: String,
    model: String,
}

impl GeminiAnalyzer {
    /// Build from environment: GEMINI_API_KEY (required) and
    /// MINACT_GEMINI_MODEL (optional)
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| Error::Config("GEMINI_API_KEY is not set".to_string()))?;
        let model =
            std::env::var("MINACT_GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Ok(Self::new(api_key, model))
    }

    pub fn new(api_key: String, model: String) -> Self {
        Self {
            http_client: Client::builder()
                .timeout(DEFAULT_TIMEOUT)
                .build()
                .expect("Failed to create HTTP client"),
            api_key,
            model,
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }

    /// Run one generation request and return the model's text output
    async fn generate(&self, prompt: String) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            GEMINI_API_URL, self.model, self.api_key
        );

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Extractor(format!("Generation request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Extractor(format!(
                "Generation request returned {}: {}",
                status,
                body.chars().take(300).collect::<String>()
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::Extractor(format!("Invalid generation response: {}", e)))?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(Error::Extractor("Empty generation response".to_string()));
        }

        debug!(chars = text.len(), "Received generation output");
        Ok(text)
    }
}

#[async_trait]
impl TranscriptAnalyzer for GeminiAnalyzer {
    async fn analyze(&self, title: &str, transcript: &str) -> Result<Extraction> {
        let prompt = analysis_prompt(title, transcript);
        let output = self.generate(prompt).await?;
        parse_extraction(&output)
    }

    async fn transcribe(&self, audio_base64: &str) -> Result<String> {
        let prompt = format!(
            "You are an assistant that transcribes audio. The audio file is base64-encoded below.\n\n\
             Decode and transcribe the audio to plain text. Only output the transcript text (no metadata).\n\n\
             AUDIO_BASE64:\n{}",
            audio_base64
        );
        let output = self.generate(prompt).await?;
        Ok(output.trim().to_string())
    }
}

/// Prompt asking for a single JSON object with summary and task drafts
fn analysis_prompt(title: &str, transcript: &str) -> String {
    format!(
        "You are an assistant that extracts meeting minutes and action items.\n\n\
         Meeting Title: {title}\n\n\
         Meeting Transcript/Text:\n{transcript}\n\n\
         Produce a JSON object ONLY (no surrounding text) with two keys: \"summary\" and \"tasks\".\n\
         - \"summary\" should be a concise minutes-of-meeting paragraph (3-6 sentences).\n\
         - \"tasks\" should be an array of objects. For each task identify:\n\
           \"description\" (string), \"assignee\" (username or name or 'unassigned'),\n\
           \"due_date\" (ISO date YYYY-MM-DD, optional), \"priority\" (1-10 based on urgency),\n\
           \"effort_tag\" (\"small\", \"medium\" or \"large\"),\n\
           \"confidence\" (0.0-1.0 how confident you are this is a real task),\n\
           \"story_points\" (integer, optional), \"is_potential_risk\" (boolean, optional)\n\
           and \"risk_reason\" (string, optional).\n\
         Ensure the output is valid JSON. If there are no tasks, return an empty array for \"tasks\".\n\
         Example output:\n\
         {{\"summary\":\"...\",\"tasks\":[{{\"description\":\"...\",\"assignee\":\"alice\",\"due_date\":\"2025-10-15\",\"priority\":5,\"effort_tag\":\"medium\",\"confidence\":0.9}}]}}\n\n\
         Now analyze and output the JSON."
    )
}

/// Parse model output into an `Extraction`, tolerating markdown fences and
/// prose around the JSON object
pub fn parse_extraction(text: &str) -> Result<Extraction> {
    let stripped = strip_code_fences(text);
    let candidate = first_json_object(stripped).ok_or_else(|| {
        Error::Extractor(format!(
            "No JSON object in model output: {}",
            stripped.chars().take(200).collect::<String>()
        ))
    })?;

    serde_json::from_str(candidate).map_err(|e| {
        Error::Extractor(format!(
            "Failed to parse JSON from model output: {} (snippet: {})",
            e,
            candidate.chars().take(200).collect::<String>()
        ))
    })
}

/// Strip a leading/trailing markdown code fence, including a `json` tag
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

/// Find the first balanced `{...}` substring, skipping braces inside
/// string literals
fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

// Gemini generateContent wire format

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}
