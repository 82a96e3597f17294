//! Text generation, the one external capability every task calls.
//!
//! Tasks depend only on the [`TextGenerator`] trait. [`gemini::GeminiClient`]
//! is the production implementation; tests substitute scripted fakes.

pub mod gemini;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use gemini::GeminiClient;

/// Default hosted model.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Default API root; must end with `/`.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";

/// Default bound on one completion call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from the text generation service.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("GOOGLE_API_KEY is not configured")]
    NotConfigured,

    #[error("Config error: {0}")]
    Config(String),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Provider returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl LlmError {
    /// Whether this failure means the configured model cannot be reached at all.
    pub fn is_model_unavailable(&self) -> bool {
        match self {
            LlmError::ModelUnavailable(_) => true,
            LlmError::Api { message, .. } | LlmError::Http(message) => {
                has_model_not_found_signature(message)
            }
            _ => false,
        }
    }
}

/// Provider error text for a model id that does not exist, e.g.
/// `models/gemini-x is not found for API version v1beta`.
pub fn has_model_not_found_signature(message: &str) -> bool {
    message.contains("models/") && message.contains("is not found")
}

/// Fixed per-task sampling parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
}

impl GenerationParams {
    pub const fn with_temperature(temperature: f32) -> Self {
        Self { temperature }
    }
}

/// Opaque text completion: rendered prompt in, completion text out.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Complete `prompt` once.
    async fn complete(&self, prompt: &str, params: &GenerationParams) -> Result<String, LlmError>;

    /// Model identifier, for logs and readiness output.
    fn model(&self) -> &str;

    /// Whether the generator has what it needs to make calls.
    fn is_configured(&self) -> bool {
        true
    }
}

/// Connection settings for the hosted model.
#[derive(Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl LlmConfig {
    /// Reads model settings from the environment.
    ///
    /// | Variable           | Default                  |
    /// |--------------------|--------------------------|
    /// | `GOOGLE_API_KEY`   | unset                    |
    /// | `LLM_MODEL`        | `gemini-2.0-flash`       |
    /// | `LLM_BASE_URL`     | Gemini v1beta endpoint   |
    /// | `LLM_TIMEOUT_SECS` | `30`                     |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: std::env::var("GOOGLE_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            model: std::env::var("LLM_MODEL").unwrap_or(defaults.model),
            base_url: std::env::var("LLM_BASE_URL").unwrap_or(defaults.base_url),
            timeout: std::env::var("LLM_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }
}
