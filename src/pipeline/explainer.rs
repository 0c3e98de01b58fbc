//! Per-slide explanations

use super::prompts::slide_prompt;
use super::types::{ChunkSet, SlideRecord};
use crate::gateway::{GatewayError, ModelGateway, Part};
use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;

lazy_static! {
    static ref HEADER_LINE: Regex = Regex::new(r"(?m)^[ \t]*#{1,6}[ \t]+(.+?)[ \t#]*$").expect("static regex");
}

/// Result of explaining one slide
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideExplanation {
    pub slide_number: u32,
    pub title: String,
    pub explanation: String,
}

impl SlideExplanation {
    pub fn into_record(self) -> SlideRecord {
        SlideRecord {
            title: self.title,
            summary: self.explanation,
        }
    }
}

/// First markdown header of the response, or `Slide <n>`
pub fn extract_title(slide_number: u32, response: &str) -> String {
    HEADER_LINE
        .captures(response)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| format!("Slide {}", slide_number))
}

#[derive(Clone)]
pub struct SlideExplainer {
    gateway: Arc<dyn ModelGateway>,
}

impl SlideExplainer {
    pub fn new(gateway: Arc<dyn ModelGateway>) -> Self {
        Self { gateway }
    }

    /// One model call; gateway failures are returned to the caller untouched
    pub async fn explain(
        &self,
        slide_number: u32,
        overall_summary: &str,
        chunk_set: &ChunkSet,
    ) -> Result<SlideExplanation, GatewayError> {
        let chunk = chunk_set.chunk_for(slide_number);
        if chunk.is_none() {
            tracing::debug!("Slide {} has no chunk context", slide_number);
        }

        let prompt = slide_prompt(
            slide_number,
            &chunk_set.academic_context,
            overall_summary,
            chunk,
        );
        let explanation = self.gateway.generate(&[Part::Text(prompt)]).await?;

        Ok(SlideExplanation {
            slide_number,
            title: extract_title(slide_number, &explanation),
            explanation,
        })
    }
}
