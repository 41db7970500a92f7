/// Ollama HTTP client implementation.
///
/// This module provides `OllamaClient` for making synchronous HTTP requests to
/// the Ollama generate and embed endpoints, along with error types and the
/// builder used to configure it.
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

/// Model used for summaries and image transcription when none is configured.
pub const DEFAULT_MODEL: &str = "gemma3:4b";

/// Model used for embeddings when none is configured.
pub const DEFAULT_EMBED_MODEL: &str = "nomic-embed-text";

/// Errors that can occur when talking to the AI backend.
#[derive(Debug, Error)]
pub enum AiError {
    /// Network-related errors (connection failures, DNS resolution, etc.)
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// Request or response timeout errors
    #[error("Request timed out")]
    Timeout(#[source] reqwest::Error),

    /// HTTP errors with status code
    #[error("HTTP error: status {status}")]
    Http { status: u16 },

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[source] serde_json::Error),

    /// Backend-specific errors (missing fields, empty results)
    #[error("AI API error: {message}")]
    Api { message: String },

    /// Invalid URL configuration error
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl AiError {
    fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            AiError::Timeout(error)
        } else {
            AiError::Network(error)
        }
    }
}

/// Builder for constructing `OllamaClient` instances.
///
/// # Examples
///
/// ```
/// use umbra::ollama::OllamaClientBuilder;
///
/// let client = OllamaClientBuilder::new()
///     .base_url("http://localhost:11434")
///     .model("gemma3:4b")
///     .embed_model("nomic-embed-text")
///     .build()
///     .expect("Failed to create client");
/// assert_eq!(client.embed_model(), "nomic-embed-text");
/// ```
#[derive(Debug, Default)]
pub struct OllamaClientBuilder {
    base_url: Option<String>,
    model: Option<String>,
    embed_model: Option<String>,
    timeout: Option<Duration>,
}

impl OllamaClientBuilder {
    /// Creates a new `OllamaClientBuilder` with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL for the Ollama API (e.g. "http://localhost:11434").
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the generation model (e.g. "gemma3:4b").
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the embedding model (e.g. "nomic-embed-text").
    pub fn embed_model(mut self, model: impl Into<String>) -> Self {
        self.embed_model = Some(model.into());
        self
    }

    /// Sets the per-request timeout. Defaults to 60 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the `OllamaClient` with the configured settings.
    ///
    /// # Environment Variables
    ///
    /// Values not set on the builder are read from `OLLAMA_HOST` (default
    /// `http://localhost:11434`), `OLLAMA_MODEL` (default [`DEFAULT_MODEL`])
    /// and `OLLAMA_EMBED_MODEL` (default [`DEFAULT_EMBED_MODEL`]).
    pub fn build(self) -> Result<OllamaClient, AiError> {
        let base_url = self.base_url.unwrap_or_else(|| {
            std::env::var("OLLAMA_HOST").unwrap_or_else(|_| "http://localhost:11434".to_string())
        });
        let model = self.model.unwrap_or_else(|| {
            std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string())
        });
        let embed_model = self.embed_model.unwrap_or_else(|| {
            std::env::var("OLLAMA_EMBED_MODEL").unwrap_or_else(|_| DEFAULT_EMBED_MODEL.to_string())
        });

        reqwest::Url::parse(&base_url)
            .map_err(|e| AiError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout.unwrap_or(Duration::from_secs(60)))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(AiError::Network)?;

        Ok(OllamaClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            embed_model,
        })
    }
}

/// Synchronous HTTP client for the Ollama API.
///
/// It should be constructed using `OllamaClientBuilder`.
pub struct OllamaClient {
    client: reqwest::blocking::Client,
    base_url: String,
    model: String,
    embed_model: String,
}

/// Operations the enrichment pipeline needs from an AI backend.
///
/// Implemented by [`OllamaClient`]; tests substitute mocks.
pub trait AiClient: Send + Sync {
    /// Generates text for `prompt`, optionally with base64-encoded images.
    fn generate(&self, model: &str, prompt: &str, images: &[String]) -> Result<String, AiError>;

    /// Returns the embedding vector for `text`.
    fn embed(&self, model: &str, text: &str) -> Result<Vec<f64>, AiError>;
}

impl OllamaClient {
    /// Returns the base URL configured for this client.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the generation model configured for this client.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns the embedding model configured for this client.
    pub fn embed_model(&self) -> &str {
        &self.embed_model
    }

    /// POSTs `body` to `endpoint` with retries and returns the parsed JSON reply.
    fn post_json(
        &self,
        endpoint: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, AiError> {
        let url = format!("{}{}", self.base_url, endpoint);

        retry_with_backoff(|| {
            let response = self
                .client
                .post(&url)
                .json(body)
                .send()
                .map_err(AiError::from_reqwest)?;

            let status = response.status();
            if !status.is_success() {
                // 4xx fails immediately, 5xx is retried by the caller
                return Err(AiError::Http {
                    status: status.as_u16(),
                });
            }

            let text = response.text().map_err(AiError::from_reqwest)?;
            serde_json::from_str(&text).map_err(AiError::Serialization)
        })
    }
}

impl AiClient for OllamaClient {
    fn generate(&self, model: &str, prompt: &str, images: &[String]) -> Result<String, AiError> {
        let mut body = serde_json::json!({
            "model": model,
            "prompt": prompt,
            "stream": false
        });
        if !images.is_empty() {
            body["images"] = serde_json::json!(images);
        }

        debug!(model, images = images.len(), "requesting generation");
        let json = self.post_json("/api/generate", &body)?;
        parse_generate_response(&json)
    }

    fn embed(&self, model: &str, text: &str) -> Result<Vec<f64>, AiError> {
        let body = serde_json::json!({
            "model": model,
            "input": text
        });

        debug!(model, chars = text.len(), "requesting embedding");
        let json = self.post_json("/api/embed", &body)?;
        parse_embed_response(&json)
    }
}

/// Extracts the generated text from an `/api/generate` reply.
fn parse_generate_response(json: &serde_json::Value) -> Result<String, AiError> {
    json.get("response")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| AiError::Api {
            message: "Missing 'response' field in API response".to_string(),
        })
}

/// Extracts the first vector from an `/api/embed` reply.
fn parse_embed_response(json: &serde_json::Value) -> Result<Vec<f64>, AiError> {
    let first = json
        .get("embeddings")
        .and_then(|v| v.as_array())
        .and_then(|list| list.first())
        .ok_or_else(|| AiError::Api {
            message: "Missing 'embeddings' field in API response".to_string(),
        })?;

    let vector: Vec<f64> =
        serde_json::from_value(first.clone()).map_err(AiError::Serialization)?;
    if vector.is_empty() {
        return Err(AiError::Api {
            message: "Embedding is empty".to_string(),
        });
    }
    Ok(vector)
}

/// Retries an operation with exponential backoff.
///
/// This function will retry the operation up to 3 times with delays of 1s, 2s, and 4s.
/// It only retries on transient errors (HTTP 5xx and network errors), not on client errors (HTTP 4xx).
pub fn retry_with_backoff<F, T>(mut f: F) -> Result<T, AiError>
where
    F: FnMut() -> Result<T, AiError>,
{
    const MAX_RETRIES: usize = 3;
    const DELAYS: [u64; MAX_RETRIES] = [1, 2, 4]; // seconds

    let mut last_error = match f() {
        Ok(result) => return Ok(result),
        Err(e) if !should_retry(&e) => return Err(e),
        Err(e) => e,
    };

    for &delay_secs in &DELAYS {
        warn!(error = %last_error, delay_secs, "transient AI error, retrying");
        thread::sleep(Duration::from_secs(delay_secs));

        match f() {
            Ok(result) => return Ok(result),
            Err(e) if !should_retry(&e) => return Err(e),
            Err(e) => last_error = e,
        }
    }

    Err(last_error)
}

/// Returns `true` for transient errors (HTTP 5xx, network errors, timeouts).
fn should_retry(error: &AiError) -> bool {
    match error {
        AiError::Network(_) | AiError::Timeout(_) => true,
        AiError::Http { status } => (500..600).contains(status),
        AiError::Serialization(_) | AiError::Api { .. } | AiError::InvalidUrl(_) => false,
    }
}
