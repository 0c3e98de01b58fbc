//! Shared helpers for integration tests: an in-process model gateway

#![allow(dead_code)]

use async_trait::async_trait;
use slidesum::document::Document;
use slidesum::gateway::{FileHandle, GatewayError, ModelGateway, Part};
use slidesum::pipeline::prompts::SUMMARY_PROMPT;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

pub const CHUNK_MARKER: &str = "Group the slides";

/// Scripted gateway that records every call
pub struct MockGateway {
    pub summary: String,
    pub chunk_response: String,
    pub failing_slides: HashSet<u32>,
    pub fail_summary: bool,
    pub fail_questions: bool,
    pub slide_delay: Duration,
    uploads: Mutex<usize>,
    prompts: Mutex<Vec<String>>,
}

impl MockGateway {
    pub fn new(chunk_response: impl Into<String>) -> Self {
        Self {
            summary: "Page 1: intro\nPage 2: disks".to_string(),
            chunk_response: chunk_response.into(),
            failing_slides: HashSet::new(),
            fail_summary: false,
            fail_questions: false,
            slide_delay: Duration::ZERO,
            uploads: Mutex::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(mut self, slides: &[u32]) -> Self {
        self.failing_slides = slides.iter().copied().collect();
        self
    }

    pub fn uploads(&self) -> usize {
        *self.uploads.lock().unwrap()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn summary_calls(&self) -> usize {
        self.prompts().iter().filter(|p| p.contains(SUMMARY_PROMPT)).count()
    }

    pub fn chunk_calls(&self) -> usize {
        self.prompts().iter().filter(|p| p.contains(CHUNK_MARKER)).count()
    }

    /// Slide numbers the explainer asked about, in call order
    pub fn explained_slides(&self) -> Vec<u32> {
        self.prompts()
            .iter()
            .filter_map(|p| slide_in_prompt(p))
            .collect()
    }
}

fn slide_in_prompt(prompt: &str) -> Option<u32> {
    prompt
        .rsplit_once("Now explain slide ")
        .and_then(|(_, rest)| rest.trim_end_matches('.').trim().parse().ok())
}

#[async_trait]
impl ModelGateway for MockGateway {
    async fn upload(&self, document: &Document) -> Result<FileHandle, GatewayError> {
        let mut uploads = self.uploads.lock().unwrap();
        *uploads += 1;
        Ok(FileHandle {
            name: format!("files/{}-{}", document.stem(), *uploads),
            uri: format!("mock://files/{}", *uploads),
            mime_type: document.mime_type().to_string(),
        })
    }

    async fn generate(&self, parts: &[Part]) -> Result<String, GatewayError> {
        let prompt: String = parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                Part::File(_) => None,
            })
            .collect::<Vec<_>>()
            .join("\n");
        self.prompts.lock().unwrap().push(prompt.clone());

        if prompt.contains(SUMMARY_PROMPT) {
            if self.fail_summary {
                return Err(GatewayError::Quota("summary quota".to_string()));
            }
            return Ok(self.summary.clone());
        }
        if prompt.contains(CHUNK_MARKER) {
            return Ok(self.chunk_response.clone());
        }
        if let Some(n) = slide_in_prompt(&prompt) {
            if !self.slide_delay.is_zero() {
                tokio::time::sleep(self.slide_delay).await;
            }
            if self.failing_slides.contains(&n) {
                return Err(GatewayError::Model(format!("HTTP 500: slide {} exploded", n)));
            }
            return Ok(format!("# Title {}\n\nExplanation of slide {}.", n, n));
        }
        if self.fail_questions {
            return Err(GatewayError::Auth("API key not valid".to_string()));
        }
        Ok("Answer about the slide.".to_string())
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

/// Chunk JSON covering the given groups of slide numbers
pub fn chunk_json(groups: &[&[u32]]) -> String {
    let chunks: Vec<serde_json::Value> = groups
        .iter()
        .enumerate()
        .map(|(i, numbers)| {
            serde_json::json!({
                "topic": format!("Topic {}", i + 1),
                "pedagogical_goal": "Understand it",
                "slides": numbers.iter().map(|n| format!("content of slide {}", n)).collect::<Vec<_>>(),
                "slide_numbers": numbers,
                "is_logistics": false
            })
        })
        .collect();
    serde_json::json!({ "academic_context": "Database systems", "chunks": chunks }).to_string()
}

/// Write a fake deck into `dir` and return it
pub fn write_deck(dir: &Path) -> Document {
    let path = dir.join("lectures").join("03-storage1.pdf");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, b"%PDF-1.4 fake deck").unwrap();
    Document::new(path)
}
