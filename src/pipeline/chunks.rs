//! Chunk extraction: one model call turns the deck into topic chunks

use super::prompts::chunk_prompt;
use super::salvage::{try_parse_chunk_set, ParseMethod};
use super::types::ChunkSet;
use super::PipelineError;
use crate::document::Document;
use crate::gateway::{ModelGateway, Part};
use crate::store::ContentStore;
use std::sync::Arc;

pub struct ChunkExtractor {
    gateway: Arc<dyn ModelGateway>,
    store: ContentStore,
}

impl ChunkExtractor {
    pub fn new(gateway: Arc<dyn ModelGateway>, store: ContentStore) -> Self {
        Self { gateway, store }
    }

    /// Cached chunk set, or a fresh one from the model.
    ///
    /// Unparseable model output degrades to [`ChunkSet::empty`], which is not
    /// cached. Gateway and cache-write failures propagate.
    pub async fn extract(
        &self,
        document: &Document,
        overall_summary: Option<&str>,
    ) -> Result<ChunkSet, PipelineError> {
        if let Some(cached) = self.store.load_chunk_set(document).await {
            tracing::info!("Using cached chunks for {}", document.display_name());
            return Ok(cached);
        }

        tracing::info!("Requesting chunk structure for {}", document.display_name());
        let handle = self.gateway.upload(document).await?;
        let text = self
            .gateway
            .generate(&[Part::File(handle), Part::Text(chunk_prompt(overall_summary))])
            .await?;

        let Some((set, method)) = try_parse_chunk_set(&text) else {
            let preview: String = text.chars().take(200).collect();
            tracing::warn!(
                "Could not parse chunk JSON for {}, returning empty structure. Response started with: {:?}",
                document.display_name(),
                preview
            );
            return Ok(ChunkSet::empty());
        };

        if method == ParseMethod::Salvaged {
            tracing::info!("Chunk JSON recovered by salvage for {}", document.display_name());
        }
        tracing::info!(
            "Parsed {} chunks covering {} slides",
            set.chunks.len(),
            set.slide_numbers().len()
        );

        self.store.save_chunk_set(document, &set).await?;
        Ok(set)
    }
}
