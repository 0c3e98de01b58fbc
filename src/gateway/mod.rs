//! Model gateway abstraction
//!
//! The rest of the crate talks to the generative model only through
//! [`ModelGateway`]: upload a document once, then submit a sequence of
//! file handles and text and receive unstructured text back. Structure is
//! imposed by callers (prompt + post-parse).
//!
//! A gateway is constructed once at startup and shared as
//! `Arc<dyn ModelGateway>` by every component that needs it.
//!
//! # Examples
//!
//! ```no_run
//! use slidesum::config::AppConfig;
//! use slidesum::document::Document;
//! use slidesum::gateway::{GeminiGateway, ModelGateway, Part};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::load(None)?;
//! let gateway = GeminiGateway::from_config(&config)?;
//! let handle = gateway.upload(&Document::new("lecture.pdf")).await?;
//! let text = gateway
//!     .generate(&[Part::File(handle), Part::text("Summarize slide 3.")])
//!     .await?;
//! println!("{}", text);
//! # Ok(())
//! # }
//! ```

pub mod gemini;

pub use gemini::GeminiGateway;

use crate::config::ConfigError;
use crate::document::Document;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Gateway errors. None of these are retried.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Quota exceeded: {0}")]
    Quota(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Failed to read document {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Opaque reference to a document uploaded to the model backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHandle {
    /// Backend resource name (e.g. `files/abc123`)
    pub name: String,
    /// URI the model uses to reference the file
    pub uri: String,
    pub mime_type: String,
}

/// One input of a `generate` call
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    File(FileHandle),
    Text(String),
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }
}

/// Remote generative-AI text/document service
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Upload a document and return a handle usable in [`generate`](Self::generate)
    async fn upload(&self, document: &Document) -> Result<FileHandle, GatewayError>;

    /// Submit content + instructions, receive unstructured text
    async fn generate(&self, parts: &[Part]) -> Result<String, GatewayError>;

    /// Get the model name
    fn model_name(&self) -> &str;
}
