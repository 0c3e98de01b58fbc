//! Pipeline orchestrator
//!
//! Run stages: `Init → Summarizing → Chunking → Explaining → Done`, with
//! `Failed` reachable from any stage. The overall summary and the chunk set
//! are resolved concurrently. Slides are then explained in fixed-size
//! batches: every slide of a batch runs as its own task, failures stay local
//! to their slide, and the whole slide table is persisted once the batch has
//! settled and before the next one starts.

use super::chunks::ChunkExtractor;
use super::explainer::{SlideExplainer, SlideExplanation};
use super::summary::resolve_summary;
use super::types::ChunkSet;
use super::{PipelineError, PipelineProgress, PipelineStage};
use crate::config::AppConfig;
use crate::document::Document;
use crate::gateway::{GatewayError, ModelGateway};
use crate::store::ContentStore;
use crate::{log_error, log_info, log_warn};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::Sender;

#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    /// Slides explained concurrently per batch (at least 1)
    pub batch_size: usize,
    /// Upper bound for one slide explanation
    pub slide_timeout: Duration,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            batch_size: 5,
            slide_timeout: Duration::from_secs(120),
        }
    }
}

impl PipelineOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            slide_timeout: config.slide_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlideFailure {
    pub slide_number: u32,
    pub error: String,
}

/// Outcome of a completed run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub document: String,
    pub chunk_count: usize,
    pub slides_total: usize,
    pub batches: usize,
    pub succeeded: Vec<u32>,
    pub failed: Vec<SlideFailure>,
    pub elapsed_ms: u64,
}

pub struct PipelineOrchestrator {
    gateway: Arc<dyn ModelGateway>,
    store: ContentStore,
    extractor: ChunkExtractor,
    explainer: SlideExplainer,
    options: PipelineOptions,
}

async fn send_progress(progress_tx: &Option<Sender<PipelineProgress>>, update: PipelineProgress) {
    if let Some(tx) = progress_tx {
        let _ = tx.send(update).await;
    }
}

impl PipelineOrchestrator {
    pub fn new(gateway: Arc<dyn ModelGateway>, store: ContentStore, options: PipelineOptions) -> Self {
        Self {
            extractor: ChunkExtractor::new(Arc::clone(&gateway), store.clone()),
            explainer: SlideExplainer::new(Arc::clone(&gateway)),
            gateway,
            store,
            options: PipelineOptions {
                batch_size: options.batch_size.max(1),
                ..options
            },
        }
    }

    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    pub fn options(&self) -> PipelineOptions {
        self.options
    }

    /// Process a whole document. Per-slide failures are reported, not raised.
    pub async fn run(
        &self,
        document: &Document,
        progress_tx: Option<Sender<PipelineProgress>>,
    ) -> Result<RunReport, PipelineError> {
        let started = Instant::now();
        log_info!("Pipeline started for {}", document);
        send_progress(
            &progress_tx,
            PipelineProgress::new(PipelineStage::Init, format!("Processing {}", document.display_name())),
        )
        .await;

        match self.run_stages(document, &progress_tx).await {
            Ok(mut report) => {
                report.elapsed_ms = started.elapsed().as_millis() as u64;
                log_info!(
                    "Pipeline finished for {}: {} ok, {} failed in {} ms",
                    document,
                    report.succeeded.len(),
                    report.failed.len(),
                    report.elapsed_ms
                );
                send_progress(
                    &progress_tx,
                    PipelineProgress::new(PipelineStage::Done, "Processing complete")
                        .with_counts(report.succeeded.len() + report.failed.len(), report.slides_total),
                )
                .await;
                Ok(report)
            }
            Err(e) => {
                tracing::error!("Pipeline failed for {}: {}", document, e);
                log_error!("Pipeline failed for {}: {}", document, e);
                send_progress(&progress_tx, PipelineProgress::new(PipelineStage::Failed, e.to_string())).await;
                Err(e)
            }
        }
    }

    async fn run_stages(
        &self,
        document: &Document,
        progress_tx: &Option<Sender<PipelineProgress>>,
    ) -> Result<RunReport, PipelineError> {
        send_progress(
            progress_tx,
            PipelineProgress::new(PipelineStage::Summarizing, "Resolving overall summary and chunk structure"),
        )
        .await;

        // Chunking only depends on the document; a summary already on disk is
        // passed along as extra context, a missing one is not waited for.
        let cached_summary = self.store.load_summary(document).await;
        let (summary, chunk_set) = tokio::join!(
            resolve_summary(&self.gateway, &self.store, document),
            self.extractor.extract(document, cached_summary.as_deref())
        );
        let summary = summary?;
        let chunk_set = chunk_set?;

        let mut report = RunReport {
            document: document.to_string(),
            chunk_count: chunk_set.chunks.len(),
            ..Default::default()
        };

        send_progress(
            progress_tx,
            PipelineProgress::new(
                PipelineStage::Chunking,
                format!("{} chunks resolved", chunk_set.chunks.len()),
            ),
        )
        .await;

        if chunk_set.is_empty() {
            tracing::warn!("No valid chunks found for {}, nothing to explain", document);
            log_warn!("No valid chunks found for {}", document);
            return Ok(report);
        }

        self.explain_all(document, summary, chunk_set, &mut report, progress_tx)
            .await?;
        Ok(report)
    }

    async fn explain_all(
        &self,
        document: &Document,
        summary: String,
        chunk_set: ChunkSet,
        report: &mut RunReport,
        progress_tx: &Option<Sender<PipelineProgress>>,
    ) -> Result<(), PipelineError> {
        let slide_numbers = chunk_set.slide_numbers();
        let batches: Vec<&[u32]> = slide_numbers.chunks(self.options.batch_size).collect();
        report.slides_total = slide_numbers.len();
        report.batches = batches.len();

        let mut table = self.store.load_slide_table(document).await;
        table.ensure_slides(&slide_numbers);

        let summary: Arc<str> = Arc::from(summary);
        let chunk_set = Arc::new(chunk_set);
        let total = slide_numbers.len();

        for (index, batch) in batches.iter().enumerate() {
            tracing::info!("Batch {}/{}: slides {:?}", index + 1, batches.len(), batch);
            send_progress(
                progress_tx,
                PipelineProgress::new(
                    PipelineStage::Explaining,
                    format!("Batch {}/{}", index + 1, batches.len()),
                )
                .with_counts(report.succeeded.len() + report.failed.len(), total),
            )
            .await;

            let outcomes = self.explain_batch(batch, &summary, &chunk_set).await;

            for (slide_number, outcome) in outcomes {
                match outcome {
                    Ok(explanation) => {
                        report.succeeded.push(slide_number);
                        table.insert(slide_number, explanation.into_record());
                    }
                    Err(error) => {
                        tracing::warn!("Slide {} failed: {}", slide_number, error);
                        log_warn!("Slide {} of {} failed: {}", slide_number, document, error);
                        report.failed.push(SlideFailure { slide_number, error });
                    }
                }
            }

            self.store.save_slide_table(document, &table).await?;
            tracing::debug!("Slide table persisted after batch {}", index + 1);
        }

        Ok(())
    }

    /// All slides of one batch concurrently; resolves once every task settled
    async fn explain_batch(
        &self,
        batch: &[u32],
        summary: &Arc<str>,
        chunk_set: &Arc<ChunkSet>,
    ) -> Vec<(u32, Result<SlideExplanation, String>)> {
        let handles: Vec<_> = batch
            .iter()
            .map(|&slide_number| {
                let explainer = self.explainer.clone();
                let summary = Arc::clone(summary);
                let chunk_set = Arc::clone(chunk_set);
                let timeout = self.options.slide_timeout;

                tokio::spawn(async move {
                    match tokio::time::timeout(
                        timeout,
                        explainer.explain(slide_number, &summary, &chunk_set),
                    )
                    .await
                    {
                        Ok(result) => result,
                        Err(_) => Err(GatewayError::Timeout),
                    }
                })
            })
            .collect();

        let results = join_all(handles).await;

        batch
            .iter()
            .copied()
            .zip(results)
            .map(|(slide_number, joined)| {
                let outcome = match joined {
                    Ok(Ok(explanation)) => Ok(explanation),
                    Ok(Err(e)) => Err(e.to_string()),
                    Err(e) => Err(format!("Task failed: {}", e)),
                };
                (slide_number, outcome)
            })
            .collect()
    }
}
