//! LLM provider trait and types.

use std::time::Duration;

use crate::error::{MetascribeError, Result};

/// Configuration for LLM providers.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmConfig {
    /// Model to use (e.g., "gpt-3.5-turbo").
    pub model: String,

    /// Maximum tokens in response.
    pub max_tokens: u32,

    /// Temperature for generation.
    pub temperature: f64,

    /// Upper bound on a single call.
    pub timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            max_tokens: 300,
            temperature: 0.7,
            timeout: Duration::from_secs(30),
        }
    }
}

impl LlmConfig {
    /// Per-call parameters derived from this configuration.
    pub fn generation_params(&self) -> GenerationParams {
        GenerationParams {
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            timeout: self.timeout,
        }
    }
}

/// Parameters for one generation call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f64,
    pub timeout: Duration,
}

impl Default for GenerationParams {
    fn default() -> Self {
        LlmConfig::default().generation_params()
    }
}

/// Trait for LLM providers.
///
/// Implementations must be thread-safe (Send + Sync) so one provider can
/// serve several sessions.
pub trait LlmProvider: Send + Sync {
    /// Send one prompt and return the raw reply text.
    ///
    /// Timeouts and connection failures surface as
    /// [`MetascribeError::LlmTimeout`] and [`MetascribeError::LlmConnection`].
    fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String>;

    /// Get the configuration for this provider.
    fn config(&self) -> &LlmConfig;

    /// Get the name of this provider (for logging/debugging).
    fn name(&self) -> &str;

    /// Check that the endpoint answers at all.
    fn test_connection(&self) -> Result<()> {
        let params = GenerationParams {
            max_tokens: 5,
            ..self.config().generation_params()
        };
        self.generate("Reply with the single word: ok", &params)
            .map(|_| ())
    }
}

/// Translate a transport error into the crate's LLM error variants.
pub(crate) fn request_error(err: reqwest::Error, timeout: Duration) -> MetascribeError {
    if err.is_timeout() {
        MetascribeError::LlmTimeout {
            seconds: timeout.as_secs(),
        }
    } else if err.is_connect() || err.is_request() {
        MetascribeError::LlmConnection(err.to_string())
    } else {
        MetascribeError::LlmResponse(err.to_string())
    }
}

/// Build a blocking HTTP client with the configured timeout.
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| MetascribeError::Config(format!("Failed to create HTTP client: {}", e)))
}
