//! Gemini REST gateway (Files API + generateContent)

use super::{FileHandle, GatewayError, ModelGateway, Part};
use crate::config::{AppConfig, ModelConfig};
use crate::document::Document;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

/// Upload status polls before giving up on a file stuck in PROCESSING
const MAX_STATE_POLLS: usize = 30;
const STATE_POLL_INTERVAL: Duration = Duration::from_secs(2);

pub struct GeminiGateway {
    config: ModelConfig,
    client: Client,
    api_key: String,
}

impl GeminiGateway {
    pub fn new(config: ModelConfig, api_key: String, timeout: Duration) -> Result<Self, GatewayError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            config,
            client,
            api_key,
        })
    }

    /// Build the gateway from application config; a missing API key is fatal
    pub fn from_config(config: &AppConfig) -> Result<Self, GatewayError> {
        let api_key = config.model.require_api_key()?;
        Self::new(config.model.clone(), api_key, config.request_timeout())
    }

    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    async fn wait_until_active(&self, mut file: GeminiFile) -> Result<GeminiFile, GatewayError> {
        for _ in 0..MAX_STATE_POLLS {
            let state = file.state.clone();
            match state.as_deref() {
                None | Some("ACTIVE") | Some("STATE_UNSPECIFIED") => return Ok(file),
                Some("FAILED") => {
                    return Err(GatewayError::Model(format!(
                        "Upload of {} failed during processing",
                        file.name
                    )))
                }
                Some(_) => {
                    tracing::debug!("File {} still processing", file.name);
                    tokio::time::sleep(STATE_POLL_INTERVAL).await;
                    let url = format!("{}/v1beta/{}", self.base_url(), file.name);
                    let response = self
                        .client
                        .get(&url)
                        .header("x-goog-api-key", &self.api_key)
                        .send()
                        .await
                        .map_err(map_send_error)?;
                    file = check_status(response).await?.json().await?;
                }
            }
        }
        Err(GatewayError::Timeout)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiFile {
    name: String,
    uri: String,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: GeminiFile,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<serde_json::Value>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

fn part_to_json(part: &Part) -> serde_json::Value {
    match part {
        Part::File(handle) => json!({
            "file_data": {
                "mime_type": handle.mime_type,
                "file_uri": handle.uri,
            }
        }),
        Part::Text(text) => json!({ "text": text }),
    }
}

fn map_send_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout
    } else {
        GatewayError::Connection(e.to_string())
    }
}

async fn check_status(response: Response) -> Result<Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            GatewayError::Auth(format!("HTTP {}: {}", status, body))
        }
        StatusCode::TOO_MANY_REQUESTS => GatewayError::Quota(body),
        _ => GatewayError::Model(format!("HTTP {}: {}", status, body)),
    })
}

fn collect_text(response: GenerateResponse) -> Result<String, GatewayError> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| GatewayError::InvalidResponse("no candidates returned".to_string()))?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(GatewayError::InvalidResponse(format!(
            "candidate has no text (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        )));
    }
    Ok(text)
}

#[async_trait]
impl ModelGateway for GeminiGateway {
    async fn upload(&self, document: &Document) -> Result<FileHandle, GatewayError> {
        let bytes = tokio::fs::read(document.path())
            .await
            .map_err(|source| GatewayError::Io {
                path: document.to_string(),
                source,
            })?;
        let mime_type = document.mime_type();

        tracing::info!("Uploading {} ({} bytes)", document.display_name(), bytes.len());

        // Resumable upload: the start request hands back the URL for the bytes
        let start_url = format!("{}/upload/v1beta/files", self.base_url());
        let start = self
            .client
            .post(&start_url)
            .header("x-goog-api-key", &self.api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&json!({ "file": { "display_name": document.display_name() } }))
            .send()
            .await
            .map_err(map_send_error)?;
        let start = check_status(start).await?;

        let upload_url = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                GatewayError::InvalidResponse("missing x-goog-upload-url header".to_string())
            })?;

        let finish = self
            .client
            .post(&upload_url)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(bytes)
            .send()
            .await
            .map_err(map_send_error)?;
        let uploaded: UploadResponse = check_status(finish).await?.json().await?;
        let file = self.wait_until_active(uploaded.file).await?;

        tracing::debug!("Uploaded {} as {}", document.display_name(), file.name);
        Ok(FileHandle {
            mime_type: file.mime_type.unwrap_or_else(|| mime_type.to_string()),
            name: file.name,
            uri: file.uri,
        })
    }

    async fn generate(&self, parts: &[Part]) -> Result<String, GatewayError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url(),
            self.config.model
        );

        let request = GenerateRequest {
            contents: vec![json!({
                "role": "user",
                "parts": parts.iter().map(part_to_json).collect::<Vec<_>>(),
            })],
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
                top_p: self.config.top_p,
                max_output_tokens: self.config.max_tokens,
            },
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(map_send_error)?;

        let body: GenerateResponse = check_status(response).await?.json().await?;
        collect_text(body)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
