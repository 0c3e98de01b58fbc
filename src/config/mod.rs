//! Configuration system for Slidesum
//!
//! Supports loading configuration from:
//! 1. CLI --config argument
//! 2. ~/.config/slidesum/config.{SLIDESUM_ENV}.json
//! 3. Default values
//!
//! Where SLIDESUM_ENV can be: production (default), development, test
//!
//! # Examples
//!
//! ```no_run
//! use slidesum::config::AppConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::load(None)?;
//! println!("Model: {} (batch size {})", config.model.model, config.batch_size);
//! # Ok(())
//! # }
//! ```
//!
//! ## Environment Variables
//!
//! Environment variables override config file values:
//! - SLIDESUM_API_URL
//! - SLIDESUM_MODEL
//! - SLIDESUM_BIND
//! - SLIDESUM_BATCH_SIZE
//! - SLIDESUM_DOCUMENT
//! - GEMINI_API_KEY (resolved on demand, see [`ModelConfig::resolve_api_key`])

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config JSON: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error("API key not found. Set {0} in the environment or in a .env file")]
    MissingApiKey(String),
}

/// Generative model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Base URL of the Gemini REST API
    #[serde(default = "default_api_url")]
    pub url: String,

    /// Model name
    #[serde(default = "default_model")]
    pub model: String,

    /// API key (can be environment variable name like "GEMINI_API_KEY")
    #[serde(default = "default_api_key")]
    pub api_key: String,

    /// Temperature (0.0 - 2.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Top P sampling (0.0 - 1.0)
    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,
}

fn default_api_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_api_key() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_temperature() -> f32 {
    0.4
}

fn default_top_p() -> f32 {
    0.95
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            url: default_api_url(),
            model: default_model(),
            api_key: default_api_key(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            max_tokens: None,
        }
    }
}

impl ModelConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(format!(
                "Temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            )));
        }

        if !(0.0..=1.0).contains(&self.top_p) {
            return Err(ConfigError::ValidationError(format!(
                "Top P must be between 0.0 and 1.0, got {}",
                self.top_p
            )));
        }

        if self.url.is_empty() {
            return Err(ConfigError::ValidationError("URL cannot be empty".to_string()));
        }

        if self.model.is_empty() {
            return Err(ConfigError::ValidationError(
                "Model name cannot be empty".to_string(),
            ));
        }

        if self.api_key.is_empty() {
            return Err(ConfigError::ValidationError(
                "api_key must name an environment variable or hold a key".to_string(),
            ));
        }

        Ok(())
    }

    /// Resolve API key from environment variable if needed
    pub fn resolve_api_key(&self) -> Option<String> {
        let key = self.api_key.trim();
        if is_env_var_name(key) {
            std::env::var(key).ok().filter(|v| !v.trim().is_empty())
        } else {
            Some(key.to_string())
        }
    }

    /// Like [`resolve_api_key`](Self::resolve_api_key) but absence is an error.
    pub fn require_api_key(&self) -> Result<String, ConfigError> {
        self.resolve_api_key()
            .ok_or_else(|| ConfigError::MissingApiKey(self.api_key.clone()))
    }
}

fn is_env_var_name(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Generative model configuration
    #[serde(default)]
    pub model: ModelConfig,

    /// HTTP timeout for a single gateway request, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Number of slides explained concurrently before the table is persisted
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Upper bound for a single slide explanation, in seconds
    #[serde(default = "default_slide_timeout")]
    pub slide_timeout_secs: u64,

    /// Slide deck served and processed by default
    #[serde(default = "default_document")]
    pub document: PathBuf,

    /// Shared slide table (not derived from the document name)
    #[serde(default = "default_slide_table_path")]
    pub slide_table_path: PathBuf,

    /// Directory holding index.html and the viewer assets
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,

    /// Address the web backend binds to
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Enable debug logging
    #[serde(default)]
    pub debug: bool,
}

fn default_request_timeout() -> u64 {
    300
}

fn default_batch_size() -> usize {
    5
}

fn default_slide_timeout() -> u64 {
    120
}

fn default_document() -> PathBuf {
    PathBuf::from("03-storage1.pdf")
}

fn default_slide_table_path() -> PathBuf {
    PathBuf::from("static/data/slide_texts.json")
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

fn default_bind() -> String {
    "127.0.0.1:5000".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            request_timeout_secs: default_request_timeout(),
            batch_size: default_batch_size(),
            slide_timeout_secs: default_slide_timeout(),
            document: default_document(),
            slide_table_path: default_slide_table_path(),
            static_dir: default_static_dir(),
            bind: default_bind(),
            debug: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: AppConfig = serde_json::from_str(&content)?;

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration with standard priority:
    /// 1. Explicit path
    /// 2. ~/.config/slidesum/config.{SLIDESUM_ENV}.json
    /// 3. Defaults
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit_path {
            if path.exists() {
                tracing::info!("Loading config from: {:?}", path);
                return Self::from_file(path);
            } else {
                return Err(ConfigError::ValidationError(format!(
                    "Config file not found: {:?}",
                    path
                )));
            }
        }

        let env = std::env::var("SLIDESUM_ENV").unwrap_or_else(|_| "production".to_string());

        if let Some(config_dir) = Self::config_dir() {
            let config_path = config_dir.join(format!("config.{}.json", env));

            if config_path.exists() {
                tracing::info!("Loading config from: {:?}", config_path);
                return Self::from_file(&config_path);
            }
        }

        tracing::info!("Using default configuration with environment overrides");
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("SLIDESUM_API_URL") {
            self.model.url = url;
        }

        if let Ok(model) = std::env::var("SLIDESUM_MODEL") {
            self.model.model = model;
        }

        if let Ok(bind) = std::env::var("SLIDESUM_BIND") {
            self.bind = bind;
        }

        if let Ok(document) = std::env::var("SLIDESUM_DOCUMENT") {
            self.document = PathBuf::from(document);
        }

        if let Ok(size) = std::env::var("SLIDESUM_BATCH_SIZE") {
            match size.parse::<usize>() {
                Ok(size) => self.batch_size = size,
                Err(_) => tracing::warn!("Ignoring SLIDESUM_BATCH_SIZE={:?}: not a number", size),
            }
        }

        // API keys are resolved on-demand via resolve_api_key()
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.model.validate()?;

        if self.batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "batch_size must be greater than 0".to_string(),
            ));
        }

        if self.request_timeout_secs == 0 || self.slide_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "timeouts must be greater than 0".to_string(),
            ));
        }

        if self.bind.is_empty() {
            return Err(ConfigError::ValidationError("bind cannot be empty".to_string()));
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn slide_timeout(&self) -> Duration {
        Duration::from_secs(self.slide_timeout_secs)
    }

    /// Get the config directory path
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("slidesum"))
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.batch_size, 5);
        assert_eq!(config.model.model, "gemini-2.0-flash");
        assert_eq!(config.slide_table_path, PathBuf::from("static/data/slide_texts.json"));
    }

    #[test]
    fn test_model_config_validation() {
        let mut config = ModelConfig::default();
        assert!(config.validate().is_ok());

        config.temperature = 3.0;
        assert!(config.validate().is_err());

        config.temperature = 0.7;
        config.top_p = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let config = AppConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_literal_api_key_is_used_verbatim() {
        let config = ModelConfig {
            api_key: "abc-123-literal".to_string(),
            ..Default::default()
        };
        assert_eq!(config.resolve_api_key().as_deref(), Some("abc-123-literal"));
    }

    #[test]
    fn test_missing_env_api_key_is_an_error() {
        let config = ModelConfig {
            api_key: "SLIDESUM_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.require_api_key(),
            Err(ConfigError::MissingApiKey(_))
        ));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: AppConfig =
            serde_json::from_str(r#"{"batch_size": 3, "model": {"model": "gemini-1.5-pro"}}"#)
                .unwrap();
        assert_eq!(parsed.batch_size, 3);
        assert_eq!(parsed.model.model, "gemini-1.5-pro");
        assert_eq!(parsed.model.api_key, "GEMINI_API_KEY");
        assert_eq!(parsed.slide_timeout_secs, 120);
    }

    #[test]
    fn test_serialize_config() {
        let config = AppConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config.model.model, parsed.model.model);
        assert_eq!(config.bind, parsed.bind);
    }
}
