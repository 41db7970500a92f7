/// Ollama HTTP client module.
///
/// Provides the [`AiClient`] seam used for note enrichment and its Ollama
/// implementation, with retry logic and timeout configuration.
mod client;

pub use client::{
    AiClient, AiError, DEFAULT_EMBED_MODEL, DEFAULT_MODEL, OllamaClient, OllamaClientBuilder,
    retry_with_backoff,
};
