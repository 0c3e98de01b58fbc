//! On-disk content store for per-document artifacts.
//!
//! Layout, for a document at `<dir>/<stem>.pdf`:
//! - `<dir>/.cache/<stem>_summary.txt`: overall summary (raw text)
//! - `<dir>/.cache/<stem>_chunks.json`: chunk set
//! - the slide table lives at one fixed path shared by every document
//!
//! Reads never fail: a missing or undecodable entry is a cache miss and the
//! caller regenerates it. Writes propagate their errors and replace the file
//! atomically (temp sibling + rename). There is no locking here; callers
//! serialize pipeline runs (see [`JobRegistry`](crate::jobs::JobRegistry)).

use crate::document::Document;
use crate::pipeline::types::{ChunkSet, SlideTable};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the hidden cache directory created next to each document
pub const CACHE_DIR_NAME: &str = ".cache";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize artifact: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Kind of cached artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    OverallSummary,
    ChunkSet,
    SlideTable,
}

impl ArtifactKind {
    /// Suffix appended to the document stem
    fn suffix(self) -> &'static str {
        match self {
            Self::OverallSummary => "_summary.txt",
            Self::ChunkSet => "_chunks.json",
            Self::SlideTable => "_slides.json",
        }
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[derive(Debug, Clone)]
pub struct ContentStore {
    slide_table_path: PathBuf,
}

impl ContentStore {
    pub fn new(slide_table_path: impl Into<PathBuf>) -> Self {
        Self {
            slide_table_path: slide_table_path.into(),
        }
    }

    /// Deterministic location of an artifact
    pub fn path_for(&self, document: &Document, kind: ArtifactKind) -> PathBuf {
        match kind {
            ArtifactKind::SlideTable => self.slide_table_path.clone(),
            _ => {
                let parent = document
                    .path()
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .unwrap_or_else(|| Path::new("."));
                parent
                    .join(CACHE_DIR_NAME)
                    .join(format!("{}{}", document.stem(), kind.suffix()))
            }
        }
    }

    pub fn slide_table_path(&self) -> &Path {
        &self.slide_table_path
    }

    /// Read an artifact; `None` on any failure
    pub async fn get(&self, document: &Document, kind: ArtifactKind) -> Option<String> {
        let path = self.path_for(document, kind);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                tracing::debug!("Cache hit for {:?} at {:?}", kind, path);
                Some(content)
            }
            Err(e) => {
                tracing::debug!("Cache miss for {:?} at {:?}: {}", kind, path, e);
                None
            }
        }
    }

    /// Write an artifact, creating parent directories as needed
    pub async fn put(
        &self,
        document: &Document,
        kind: ArtifactKind,
        content: &str,
    ) -> Result<(), StoreError> {
        let path = self.path_for(document, kind);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StoreError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        // Temp sibling + rename: readers only ever see a complete file
        let tmp = temp_path(&path);
        tokio::fs::write(&tmp, content)
            .await
            .map_err(|source| StoreError::Io {
                path: tmp.clone(),
                source,
            })?;
        if let Err(source) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(StoreError::Io { path, source });
        }
        tracing::debug!("Cache written to {:?}", path);
        Ok(())
    }

    /// Cached summary; an empty file counts as absent
    pub async fn load_summary(&self, document: &Document) -> Option<String> {
        self.get(document, ArtifactKind::OverallSummary)
            .await
            .filter(|s| !s.trim().is_empty())
    }

    pub async fn save_summary(&self, document: &Document, summary: &str) -> Result<(), StoreError> {
        self.put(document, ArtifactKind::OverallSummary, summary).await
    }

    pub async fn load_chunk_set(&self, document: &Document) -> Option<ChunkSet> {
        let raw = self.get(document, ArtifactKind::ChunkSet).await?;
        match serde_json::from_str(&raw) {
            Ok(set) => Some(set),
            Err(e) => {
                tracing::warn!("Ignoring corrupt chunk cache for {}: {}", document, e);
                None
            }
        }
    }

    pub async fn save_chunk_set(&self, document: &Document, set: &ChunkSet) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(set)?;
        self.put(document, ArtifactKind::ChunkSet, &content).await
    }

    /// Current slide table; empty when missing or corrupt
    pub async fn load_slide_table(&self, document: &Document) -> SlideTable {
        let Some(raw) = self.get(document, ArtifactKind::SlideTable).await else {
            return SlideTable::new();
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!("Ignoring corrupt slide table {:?}: {}", self.slide_table_path, e);
            SlideTable::new()
        })
    }

    pub async fn save_slide_table(
        &self,
        document: &Document,
        table: &SlideTable,
    ) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(table)?;
        self.put(document, ArtifactKind::SlideTable, &content).await
    }
}
