//! Chat-completions provider for OpenAI and compatible endpoints.

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{MetascribeError, Result};

use super::prompts;
use super::provider::{GenerationParams, LlmConfig, LlmProvider, http_client, request_error};

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Sends each prompt as one user turn after the shared system prompt.
pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    endpoint: String,
    config: LlmConfig,
}

impl OpenAIProvider {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(api_key, LlmConfig::default())
    }

    pub fn with_config(api_key: impl Into<String>, config: LlmConfig) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(MetascribeError::Config("OpenAI API key is empty".to_string()));
        }

        Ok(Self {
            client: http_client(config.timeout)?,
            api_key,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            config,
        })
    }

    /// Key from `OPENAI_API_KEY`, default settings.
    pub fn from_env() -> Result<Self> {
        match std::env::var("OPENAI_API_KEY") {
            Ok(key) => Self::new(key),
            Err(_) => Err(MetascribeError::Config("OPENAI_API_KEY is not set".to_string())),
        }
    }

    /// Point at an OpenAI-compatible endpoint instead of api.openai.com.
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.endpoint = url.into();
        self
    }

    fn request<'a>(&'a self, prompt: &'a str, params: &GenerationParams) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.config.model,
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            messages: [
                ChatMessage {
                    role: "system",
                    content: prompts::system_prompt(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        }
    }
}

impl LlmProvider for OpenAIProvider {
    fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String> {
        debug!(model = %self.config.model, endpoint = %self.endpoint, "chat completion request");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .timeout(params.timeout)
            .json(&self.request(prompt, params))
            .send()
            .map_err(|e| request_error(e, params.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(MetascribeError::LlmResponse(format!(
                "chat completion failed with {}: {}",
                status,
                api_error_message(&body)
            )));
        }

        let completion: ChatCompletion = response
            .json()
            .map_err(|e| MetascribeError::LlmResponse(format!("unreadable chat completion: {}", e)))?;
        completion.first_text().ok_or_else(|| {
            MetascribeError::LlmResponse("chat completion had no choices".to_string())
        })
    }

    fn config(&self) -> &LlmConfig {
        &self.config
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f64,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

impl ChatCompletion {
    /// Trimmed text of the first choice; `None` only when there is no choice.
    ///
    /// Empty or null content is an empty answer, left to the response parser.
    fn first_text(self) -> Option<String> {
        let choice = self.choices.into_iter().next()?;
        Some(choice.message.content.unwrap_or_default().trim().to_string())
    }
}

/// `error.message` from an API error body, else the body itself.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}
