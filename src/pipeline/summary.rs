//! Overall summary: cache-or-fetch

use super::prompts::SUMMARY_PROMPT;
use super::PipelineError;
use crate::document::Document;
use crate::gateway::{ModelGateway, Part};
use crate::store::ContentStore;
use std::sync::Arc;

/// Cached overall summary, or a fresh one from the model (then cached)
pub async fn resolve_summary(
    gateway: &Arc<dyn ModelGateway>,
    store: &ContentStore,
    document: &Document,
) -> Result<String, PipelineError> {
    if let Some(cached) = store.load_summary(document).await {
        tracing::info!("Using cached summary for {}", document.display_name());
        return Ok(cached);
    }

    tracing::info!("No cached summary, uploading {} for summarization", document.display_name());
    let handle = gateway.upload(document).await?;
    let summary = gateway
        .generate(&[Part::File(handle), Part::text(SUMMARY_PROMPT)])
        .await?;
    tracing::debug!("Summary received ({} chars)", summary.len());

    store.save_summary(document, &summary).await?;
    Ok(summary)
}
