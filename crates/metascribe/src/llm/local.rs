//! Provider for self-hosted text generation servers.
//!
//! The server receives `{"prompt", "max_tokens", "temperature"}` as JSON and
//! answers with the generated text under one of a few common keys.

use indexmap::IndexMap;
use reqwest::blocking::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde_json::{Value, json};
use tracing::debug;

use crate::error::{MetascribeError, Result};

use super::provider::{GenerationParams, LlmConfig, LlmProvider, http_client, request_error};

/// Keys checked, in order, for the generated text.
const RESPONSE_KEYS: &[&str] = &["response", "generated_text", "text", "output"];

/// Generic HTTP text-generation provider.
pub struct LocalProvider {
    client: Client,
    api_url: String,
    headers: HeaderMap,
    config: LlmConfig,
}

impl LocalProvider {
    /// Create a provider posting to `api_url`.
    pub fn new(api_url: impl Into<String>, config: LlmConfig) -> Result<Self> {
        let api_url = api_url.into();
        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            return Err(MetascribeError::Config(format!(
                "Local LLM URL must start with http:// or https://, got '{}'",
                api_url
            )));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(Self {
            client: http_client(config.timeout)?,
            api_url,
            headers,
            config,
        })
    }

    /// Add extra request headers (e.g. tunnel bypass headers).
    pub fn with_headers(mut self, extra: &IndexMap<String, String>) -> Result<Self> {
        for (name, value) in extra {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| MetascribeError::Config(format!("Invalid header name '{}': {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| MetascribeError::Config(format!("Invalid header value: {}", e)))?;
            self.headers.insert(name, value);
        }
        Ok(self)
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

impl LlmProvider for LocalProvider {
    fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String> {
        let body = json!({
            "prompt": prompt,
            "max_tokens": params.max_tokens,
            "temperature": params.temperature,
        });

        debug!(url = %self.api_url, "sending generation request");

        let response = self
            .client
            .post(&self.api_url)
            .headers(self.headers.clone())
            .timeout(params.timeout)
            .json(&body)
            .send()
            .map_err(|e| request_error(e, params.timeout))?;

        if !response.status().is_success() {
            return Err(MetascribeError::LlmResponse(format!(
                "HTTP error {}",
                response.status()
            )));
        }

        let data: Value = response
            .json()
            .map_err(|e| MetascribeError::LlmResponse(format!("Reply is not JSON: {}", e)))?;

        extract_reply(&data)
    }

    fn config(&self) -> &LlmConfig {
        &self.config
    }

    fn name(&self) -> &str {
        "local"
    }
}

/// Pull the generated text out of a server reply.
fn extract_reply(data: &Value) -> Result<String> {
    let text = match data {
        Value::Object(map) => RESPONSE_KEYS
            .iter()
            .find_map(|key| map.get(*key))
            .map(value_text),
        Value::Array(items) => items.first().and_then(|first| match first {
            Value::Object(map) => map.get("generated_text").map(value_text),
            Value::String(s) => Some(s.clone()),
            _ => None,
        }),
        _ => None,
    };

    // Empty text is a valid answer; the response parser substitutes for it.
    match text {
        Some(t) => Ok(t.trim().to_string()),
        None => Err(MetascribeError::LlmResponse(
            "Could not find generated text in reply".to_string(),
        )),
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
