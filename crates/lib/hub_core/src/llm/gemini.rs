//! Google Gemini text generation client.
//!
//! Calls `POST {base}models/{model}:generateContent` once per completion and
//! concatenates the text parts of the first candidate. No retries: a failed
//! call is reported to the task, which maps it to a response.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use super::{GenerationParams, LlmConfig, LlmError, TextGenerator, has_model_not_found_signature};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Gemini `generateContent` client.
#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    endpoint: Url,
    api_key: Option<String>,
    model: String,
    timeout: std::time::Duration,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("model", &self.model)
            .field("configured", &self.api_key.is_some())
            .finish()
    }
}

impl GeminiClient {
    /// Build a client from config. A missing API key is allowed here; calls
    /// then fail with [`LlmError::NotConfigured`].
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let base = Url::parse(&config.base_url)
            .map_err(|e| LlmError::Config(format!("invalid LLM base URL: {e}")))?;
        let endpoint = base
            .join(&format!("models/{}:generateContent", config.model))
            .map_err(|e| LlmError::Config(format!("invalid model endpoint: {e}")))?;
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Config(format!("http client: {e}")))?;
        Ok(Self {
            http,
            endpoint,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            timeout: config.timeout,
        })
    }

    /// Resolved `generateContent` URL.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn complete(&self, prompt: &str, params: &GenerationParams) -> Result<String, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::NotConfigured)?;

        let body = GenerateRequest {
            contents: [Content {
                role: "user",
                parts: [Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: params.temperature,
            },
        };

        debug!(model = %self.model, temperature = params.temperature, "calling Gemini");
        let resp = self
            .http
            .post(self.endpoint.clone())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout(self.timeout)
                } else {
                    LlmError::Http(e.to_string())
                }
            })?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| LlmError::Http(format!("reading response body: {e}")))?;

        if !status.is_success() {
            return Err(error_from_status(status.as_u16(), &text));
        }
        extract_text(&text)
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Map a non-2xx reply to an error, recognizing an unknown model.
fn error_from_status(status: u16, body: &str) -> LlmError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string());
    if has_model_not_found_signature(&message) {
        return LlmError::ModelUnavailable(message);
    }
    LlmError::Api { status, message }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(body: &str) -> Result<String, LlmError> {
    let parsed: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| LlmError::MalformedResponse(format!("Gemini response parse error: {e}")))?;
    let parts = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts)
        .ok_or_else(|| LlmError::MalformedResponse("no candidates returned".into()))?;
    let text: String = parts.into_iter().filter_map(|p| p.text).collect();
    if text.is_empty() {
        return Err(LlmError::MalformedResponse("candidate has no text".into()));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_includes_model_and_method() {
        let client = GeminiClient::new(&LlmConfig::default()).unwrap();
        assert_eq!(
            client.endpoint().as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
        assert!(!client.is_configured());
    }

    #[test]
    fn invalid_base_url_is_a_config_error() {
        let config = LlmConfig {
            base_url: "not a url".into(),
            ..LlmConfig::default()
        };
        assert!(matches!(GeminiClient::new(&config), Err(LlmError::Config(_))));
    }

    #[tokio::test]
    async fn missing_api_key_fails_without_network() {
        let client = GeminiClient::new(&LlmConfig::default()).unwrap();
        let err = client
            .complete("hi", &GenerationParams::with_temperature(0.0))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::NotConfigured));
    }

    #[test]
    fn text_parts_are_concatenated() {
        let body = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hello, "},{"text":"world"}]}}]}"#;
        assert_eq!(extract_text(body).unwrap(), "Hello, world");
    }

    #[test]
    fn empty_candidates_are_malformed() {
        assert!(matches!(
            extract_text(r#"{"candidates":[]}"#),
            Err(LlmError::MalformedResponse(_))
        ));
        assert!(matches!(
            extract_text("<html>"),
            Err(LlmError::MalformedResponse(_))
        ));
    }

    #[test]
    fn unknown_model_reply_maps_to_model_unavailable() {
        let body = r#"{"error":{"code":404,"message":"models/gemini-9 is not found for API version v1beta","status":"NOT_FOUND"}}"#;
        assert!(matches!(
            error_from_status(404, body),
            LlmError::ModelUnavailable(_)
        ));
    }

    #[test]
    fn other_errors_keep_status() {
        let body = r#"{"error":{"code":429,"message":"Resource has been exhausted"}}"#;
        match error_from_status(429, body) {
            LlmError::Api { status, message } => {
                assert_eq!(status, 429);
                assert_eq!(message, "Resource has been exhausted");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
