//! Slide-processing pipeline
//!
//! upload → summarize → chunk → per-slide explain → cache/merge
//!
//! # Components
//!
//! - [`summary`] - Overall summary (cache-or-fetch)
//! - [`chunks::ChunkExtractor`] - Topic chunks from one model call
//! - [`salvage`] - Two-tier parser for model JSON
//! - [`explainer::SlideExplainer`] - Context-aware per-slide explanations
//! - [`orchestrator::PipelineOrchestrator`] - Sequences the above in batches

pub mod chunks;
pub mod explainer;
pub mod orchestrator;
pub mod prompts;
pub mod salvage;
pub mod summary;
pub mod types;

pub use chunks::ChunkExtractor;
pub use explainer::{SlideExplainer, SlideExplanation};
pub use orchestrator::{PipelineOptions, PipelineOrchestrator, RunReport, SlideFailure};
pub use types::{Chunk, ChunkSet, SlideContent, SlideRecord, SlideTable};

use crate::gateway::GatewayError;
use crate::store::StoreError;
use serde::Serialize;
use thiserror::Error;

/// Unrecoverable pipeline errors (summary/chunk resolution or persistence)
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Stage of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Init,
    Summarizing,
    Chunking,
    Explaining,
    Done,
    Failed,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Summarizing => "summarizing",
            Self::Chunking => "chunking",
            Self::Explaining => "explaining",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Progress update emitted while a run advances
#[derive(Debug, Clone)]
pub struct PipelineProgress {
    pub stage: PipelineStage,
    pub detail: String,
    pub completed_slides: usize,
    pub total_slides: usize,
}

impl PipelineProgress {
    pub fn new(stage: PipelineStage, detail: impl Into<String>) -> Self {
        Self {
            stage,
            detail: detail.into(),
            completed_slides: 0,
            total_slides: 0,
        }
    }

    pub fn with_counts(mut self, completed: usize, total: usize) -> Self {
        self.completed_slides = completed;
        self.total_slides = total;
        self
    }
}
