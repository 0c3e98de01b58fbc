//! Free-form questions about a slide, answered with neighboring slides as context

use crate::document::Document;
use crate::gateway::{ModelGateway, Part};
use crate::pipeline::prompts::question_prompt;
use crate::pipeline::{PipelineError, SlideRecord, SlideTable};
use crate::store::ContentStore;
use std::sync::Arc;

/// Slides on each side of the current one included as context
pub const CONTEXT_RADIUS: usize = 2;

/// Titles listed in the lecture context
const CONTEXT_TITLES: usize = 10;

/// Summary characters kept when it stands in for the title list
const CONTEXT_SUMMARY_CHARS: usize = 4000;

/// Up to `radius` slides before and after `current_slide`, clamped at the ends.
///
/// Slides missing from the table get a window around the position they would
/// occupy, so only neighbors are returned.
pub fn get_slide_context(
    current_slide: u32,
    table: &SlideTable,
    radius: usize,
) -> Vec<(u32, SlideRecord)> {
    let numbers = table.slide_numbers();
    if numbers.is_empty() {
        return Vec::new();
    }

    let (start, end) = match numbers.binary_search(&current_slide) {
        Ok(idx) => (idx.saturating_sub(radius), (idx + radius + 1).min(numbers.len())),
        Err(insert_at) => (insert_at.saturating_sub(radius), (insert_at + radius).min(numbers.len())),
    };

    numbers[start..end]
        .iter()
        .filter_map(|&n| table.get(n).map(|r| (n, r.clone())))
        .collect()
}

/// Short description of the whole lecture
pub fn lecture_context(summary: Option<&str>, table: &SlideTable) -> String {
    if let Some(summary) = summary.filter(|s| !s.trim().is_empty()) {
        let excerpt: String = summary.chars().take(CONTEXT_SUMMARY_CHARS).collect();
        return format!("This is a lecture. Summary of its pages:\n{}", excerpt);
    }

    let titles: Vec<&str> = table
        .iter()
        .map(|(_, r)| r.title.as_str())
        .filter(|t| !t.is_empty())
        .take(CONTEXT_TITLES)
        .collect();

    if titles.is_empty() {
        return "This is a lecture; no slide summaries are available yet.".to_string();
    }
    format!(
        "This is a lecture. The lecture covers: {}... and more.",
        titles.join(", ")
    )
}

/// Upload the deck and ask the model a question about one slide
pub async fn answer_question(
    gateway: &Arc<dyn ModelGateway>,
    store: &ContentStore,
    document: &Document,
    question: &str,
    current_slide: u32,
) -> Result<String, PipelineError> {
    let table = store.load_slide_table(document).await;
    let neighbors = get_slide_context(current_slide, &table, CONTEXT_RADIUS);
    let summary = store.load_summary(document).await;
    let context = lecture_context(summary.as_deref(), &table);

    tracing::info!(
        "Question about slide {} with {} context slides",
        current_slide,
        neighbors.len()
    );

    let handle = gateway.upload(document).await?;
    let prompt = question_prompt(question, current_slide, &neighbors, &context);
    let answer = gateway.generate(&[Part::File(handle), Part::Text(prompt)]).await?;
    Ok(answer)
}
