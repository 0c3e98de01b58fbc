//! Slidesum - lecture slide-deck summarizer
//!
//! Summarizes an academic slide deck with a generative model: an overall
//! summary, a grouping of the slides into topic chunks, and a detailed
//! explanation per slide, all cached on disk and served to a small viewer.
//!
//! # Modules
//!
//! - [`store`] - On-disk cache of per-document artifacts
//! - [`gateway`] - Model gateway trait and the Gemini implementation
//! - [`pipeline`] - Summary, chunking and batched per-slide explanation
//! - [`jobs`] - Pollable background pipeline runs
//! - [`qa`] - Questions about a slide with neighboring context
//! - [`server`] - axum web backend
//!
//! # Example
//!
//! ```rust,no_run
//! use slidesum::config::AppConfig;
//! use slidesum::document::Document;
//! use slidesum::gateway::GeminiGateway;
//! use slidesum::pipeline::{PipelineOptions, PipelineOrchestrator};
//! use slidesum::store::ContentStore;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = AppConfig::load(None)?;
//! let gateway = Arc::new(GeminiGateway::from_config(&config)?);
//! let orchestrator = PipelineOrchestrator::new(
//!     gateway,
//!     ContentStore::new(config.slide_table_path.clone()),
//!     PipelineOptions::from_config(&config),
//! );
//! let report = orchestrator.run(&Document::new("lecture.pdf"), None).await?;
//! println!("{} slides explained", report.succeeded.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod document;
pub mod gateway;
pub mod jobs;
pub mod logging;
pub mod pipeline;
pub mod qa;
pub mod server;
pub mod store;

pub use document::Document;
pub use gateway::{GeminiGateway, ModelGateway};
pub use pipeline::PipelineOrchestrator;
pub use store::ContentStore;
