//! Configuration file support.
//!
//! Configuration is read from a TOML file with every section optional:
//!
//! ```toml
//! [llm]
//! provider = "local"
//! api_url = "http://localhost:8000/generate"
//! max_tokens = 300
//! temperature = 0.7
//! timeout_secs = 30
//!
//! [heuristics]
//! categorical_max_unique = 15
//!
//! [export]
//! incomplete = "flag"
//! ```
//!
//! The loaded value is passed explicitly into the components that need it.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{MetascribeError, Result};
use crate::export::ExportConfig;
use crate::inference::HeuristicConfig;
use crate::llm::{
    LlmConfig, LlmProvider, LocalProvider, MockProvider, OpenAIProvider, PromptConfig,
};

/// File looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "metascribe.toml";

/// Which LLM backend to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Heuristics and placeholder descriptions only.
    None,
    /// OpenAI chat-completions API.
    #[default]
    OpenAi,
    /// Self-hosted text generation server.
    Local,
    /// Scripted provider for tests and demos.
    Mock,
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "off" => Ok(ProviderKind::None),
            "openai" | "gpt" => Ok(ProviderKind::OpenAi),
            "local" | "server" => Ok(ProviderKind::Local),
            "mock" | "test" => Ok(ProviderKind::Mock),
            _ => Err(format!(
                "Unknown provider: {}. Use: none, openai, local, or mock.",
                s
            )),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::None => write!(f, "none"),
            ProviderKind::OpenAi => write!(f, "openai"),
            ProviderKind::Local => write!(f, "local"),
            ProviderKind::Mock => write!(f, "mock"),
        }
    }
}

/// `[llm]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub provider: ProviderKind,
    pub model: String,
    /// Endpoint for the local provider, or an override for OpenAI.
    pub api_url: Option<String>,
    /// Never written back out; usually supplied through `OPENAI_API_KEY`.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub max_tokens: u32,
    pub temperature: f64,
    pub timeout_secs: u64,
    /// Extra HTTP headers for the local provider.
    pub headers: IndexMap<String, String>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenAi,
            model: "gpt-3.5-turbo".to_string(),
            api_url: None,
            api_key: None,
            max_tokens: 300,
            temperature: 0.7,
            timeout_secs: 30,
            headers: IndexMap::new(),
        }
    }
}

impl LlmSettings {
    /// Provider-facing configuration.
    pub fn llm_config(&self) -> LlmConfig {
        LlmConfig {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }

    /// Construct the configured provider. `None` means heuristics only.
    pub fn build_provider(&self) -> Result<Option<Arc<dyn LlmProvider>>> {
        let config = self.llm_config();
        let provider: Arc<dyn LlmProvider> = match self.provider {
            ProviderKind::None => return Ok(None),
            ProviderKind::OpenAi => {
                let key = self.api_key.clone().ok_or_else(|| {
                    MetascribeError::Config(
                        "OPENAI_API_KEY is not set; use --llm none to run without a model"
                            .to_string(),
                    )
                })?;
                let provider = OpenAIProvider::with_config(key, config)?;
                match &self.api_url {
                    Some(url) => Arc::new(provider.with_api_url(url)),
                    None => Arc::new(provider),
                }
            }
            ProviderKind::Local => {
                let url = self.api_url.as_deref().ok_or_else(|| {
                    MetascribeError::Config(
                        "llm.api_url (or METASCRIBE_LLM_URL) is required for the local provider"
                            .to_string(),
                    )
                })?;
                Arc::new(LocalProvider::new(url, config)?.with_headers(&self.headers)?)
            }
            ProviderKind::Mock => Arc::new(MockProvider::with_config(config)),
        };
        Ok(Some(provider))
    }
}

/// `[input]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Reject data files larger than this.
    pub max_file_size_mb: u64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 30,
        }
    }
}

/// `[session]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Age after which in-memory sessions are expired.
    pub cleanup_hours: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { cleanup_hours: 1 }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    /// Log every prompt sent to the model at debug level.
    pub show_prompts: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            show_prompts: false,
        }
    }
}

/// Complete configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetascribeConfig {
    pub llm: LlmSettings,
    pub input: InputConfig,
    pub heuristics: HeuristicConfig,
    pub prompts: PromptConfig,
    pub export: ExportConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

impl MetascribeConfig {
    /// Parse configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| MetascribeError::Config(format!("Invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| MetascribeError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml_str(&text)
            .map_err(|e| MetascribeError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load the explicit file, else `metascribe.toml` if present, else defaults.
    ///
    /// Environment overrides are applied in every case.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        let config = match explicit {
            Some(path) => Self::load(path)?,
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load(default_path)?
                } else {
                    Self::default()
                }
            }
        };
        Ok(config.with_env_overrides())
    }

    /// Apply `OPENAI_API_KEY`, `METASCRIBE_LLM_URL` and `METASCRIBE_LLM_MODEL`.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(key) = lookup("OPENAI_API_KEY").filter(|k| !k.is_empty()) {
            self.llm.api_key = Some(key);
        }
        if let Some(url) = lookup("METASCRIBE_LLM_URL").filter(|u| !u.is_empty()) {
            self.llm.api_url = Some(url);
        }
        if let Some(model) = lookup("METASCRIBE_LLM_MODEL").filter(|m| !m.is_empty()) {
            self.llm.model = model;
        }
        self
    }

    /// Reject values no component can work with.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(MetascribeError::Config(format!(
                "llm.temperature must be between 0 and 2, got {}",
                self.llm.temperature
            )));
        }
        if self.llm.max_tokens == 0 {
            return Err(MetascribeError::Config(
                "llm.max_tokens must be positive".to_string(),
            ));
        }
        if self.llm.timeout_secs == 0 {
            return Err(MetascribeError::Config(
                "llm.timeout_secs must be positive".to_string(),
            ));
        }
        self.heuristics.validate()?;
        Ok(())
    }
}
