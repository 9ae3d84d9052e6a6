//! Mock LLM provider for testing.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::{MetascribeError, Result};

use super::prompts::{COLUMN_NAME_LABEL, PROBABLE_TYPE_LABEL, TASK_CLASSIFY_MARKER};
use super::provider::{GenerationParams, LlmConfig, LlmProvider};

/// One scripted outcome of a `generate` call.
#[derive(Debug, Clone, PartialEq)]
pub enum MockReply {
    Text(String),
    Timeout,
    ConnectionFailure,
}

/// Mock LLM provider that returns predictable responses for testing.
///
/// Scripted replies are consumed first, in order. Once they run out the
/// provider answers from the prompt itself: classification prompts get the
/// probable type back with confidence 0.85, description prompts get a short
/// sentence naming the column.
pub struct MockProvider {
    config: LlmConfig,
    script: Mutex<VecDeque<MockReply>>,
    prompts: Mutex<Vec<String>>,
}

impl MockProvider {
    /// Create a new mock provider.
    pub fn new() -> Self {
        Self::with_config(LlmConfig::default())
    }

    /// Create with custom configuration.
    pub fn with_config(config: LlmConfig) -> Self {
        Self {
            config,
            script: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Queue a reply.
    pub fn with_reply(self, reply: MockReply) -> Self {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(reply);
        self
    }

    /// Queue a text reply.
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_reply(MockReply::Text(text.into()))
    }

    /// Queue `count` timeouts; later calls get default replies.
    pub fn with_timeouts(self, count: usize) -> Self {
        (0..count).fold(self, |p, _| p.with_reply(MockReply::Timeout))
    }

    /// Prompts received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn default_reply(prompt: &str) -> String {
        let column = labelled_value(prompt, COLUMN_NAME_LABEL).unwrap_or("this");
        if prompt.contains(TASK_CLASSIFY_MARKER) {
            let probable = labelled_value(prompt, PROBABLE_TYPE_LABEL).unwrap_or("categorical");
            format!(
                "{{\"type\": \"{}\", \"confidence\": {{\"{}\": 0.85}}}}",
                probable, probable
            )
        } else {
            format!("This column records the {} of each record.", column.replace('_', " "))
        }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Value on the first line starting with `label`.
fn labelled_value<'a>(prompt: &'a str, label: &str) -> Option<&'a str> {
    prompt
        .lines()
        .find_map(|line| line.strip_prefix(label))
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

impl LlmProvider for MockProvider {
    fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt.to_string());

        let next = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();

        match next {
            Some(MockReply::Text(text)) => Ok(text),
            Some(MockReply::Timeout) => Err(MetascribeError::LlmTimeout {
                seconds: params.timeout.as_secs(),
            }),
            Some(MockReply::ConnectionFailure) => Err(MetascribeError::LlmConnection(
                "mock connection refused".to_string(),
            )),
            None => Ok(Self::default_reply(prompt)),
        }
    }

    fn config(&self) -> &LlmConfig {
        &self.config
    }

    fn name(&self) -> &str {
        "mock"
    }
}
