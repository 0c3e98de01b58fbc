// Server related imports
use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Json, Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
};
use tokio_util::io::ReaderStream;

// General imports
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

// From lib
use super::json_error::JsonError;
use super::state::AppState;
use crate::jobs::JobInfo;
use crate::qa::answer_question;
use crate::store::ArtifactKind;

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub question: String,
    #[serde(rename = "currentSlide", deserialize_with = "slide_number")]
    pub current_slide: u32,
}

/// The viewer posts the page number either as a number or as a string
fn slide_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let parsed = match &value {
        serde_json::Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed
        .filter(|n| *n > 0)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid currentSlide: {}", value)))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AskResponse {
    pub success: bool,
    pub response: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProcessResponse {
    pub success: bool,
    pub job_id: Uuid,
}

pub async fn index(State(state): State<AppState>) -> Result<Html<String>, JsonError> {
    let path = state.static_dir.join("index.html");
    tokio::fs::read_to_string(&path)
        .await
        .map(Html)
        .map_err(|e| {
            tracing::warn!("Viewer page {:?} unavailable: {}", path, e);
            JsonError::not_found("viewer page not found")
        })
}

/// Streams the configured deck whatever name the viewer asks for
pub async fn serve_pdf(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, JsonError> {
    tracing::debug!("PDF requested as {:?}", name);
    let file = tokio::fs::File::open(state.document.path())
        .await
        .map_err(|e| {
            tracing::warn!("Cannot open {}: {}", state.document, e);
            JsonError::not_found(format!("document {} not found", state.document.display_name()))
        })?;

    let body = Body::from_stream(ReaderStream::new(file));
    Ok((
        [(header::CONTENT_TYPE, state.document.mime_type())],
        body,
    )
        .into_response())
}

/// Current slide table as stored on disk
pub async fn slide_texts(State(state): State<AppState>) -> Response {
    let raw = state
        .store()
        .get(&state.document, ArtifactKind::SlideTable)
        .await
        .filter(|raw| serde_json::from_str::<serde_json::Value>(raw).is_ok())
        .unwrap_or_else(|| "{}".to_string());

    ([(header::CONTENT_TYPE, "application/json")], raw).into_response()
}

pub async fn ask_gemini(
    State(state): State<AppState>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, JsonError> {
    let Json(request) = payload?;
    if request.question.trim().is_empty() {
        return Err(JsonError::bad_request("question must not be empty"));
    }

    let response = answer_question(
        &state.gateway,
        state.store(),
        &state.document,
        request.question.trim(),
        request.current_slide,
    )
    .await
    .map_err(|e| {
        tracing::error!("Question about slide {} failed: {}", request.current_slide, e);
        JsonError::internal(e)
    })?;

    Ok(Json(AskResponse {
        success: true,
        response,
    }))
}

/// Starts a background run; poll `/jobs/{id}` for its status
pub async fn process_pdf(State(state): State<AppState>) -> Json<ProcessResponse> {
    let job_id = state
        .jobs
        .start(state.orchestrator.clone(), state.document.clone())
        .await;
    Json(ProcessResponse {
        success: true,
        job_id,
    })
}

pub async fn list_jobs(State(state): State<AppState>) -> Json<Vec<JobInfo>> {
    Json(state.jobs.list().await)
}

pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobInfo>, JsonError> {
    let id = Uuid::parse_str(&id).map_err(|_| JsonError::bad_request("invalid job id"))?;
    state
        .jobs
        .get(id)
        .await
        .map(Json)
        .ok_or_else(|| JsonError::not_found(format!("job {} not found", id)))
}

pub async fn healthz() -> StatusCode {
    StatusCode::OK
}
