//! Source slide deck handled by the pipeline.

use std::path::{Path, PathBuf};

/// A slide deck on disk. Identity is its path; the file is never modified.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Document {
    path: PathBuf,
}

impl Document {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name without extension, used to name cache entries
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string())
    }

    /// File name shown to the model and in logs
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// MIME type guessed from the extension
    pub fn mime_type(&self) -> &'static str {
        match self
            .path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("pdf") => "application/pdf",
            Some("txt") | Some("md") => "text/plain",
            _ => "application/octet-stream",
        }
    }
}

impl From<&Path> for Document {
    fn from(path: &Path) -> Self {
        Self::new(path)
    }
}

impl std::fmt::Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path.display())
    }
}
