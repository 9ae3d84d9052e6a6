//! LLM integration for column descriptions and type refinement.
//!
//! The LLM is optional: without a provider every column keeps its heuristic
//! type and a placeholder description, ready for human review.
//!
//! # Supported Providers
//!
//! - **OpenAI** - chat-completions API (requires `OPENAI_API_KEY`)
//! - **Local** - any HTTP server taking `{"prompt", "max_tokens", "temperature"}`
//! - **Mock** - scripted replies for tests
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use metascribe::Annotator;
//! use metascribe::llm::OpenAIProvider;
//!
//! let annotator = Annotator::new()
//!     .with_llm(Arc::new(OpenAIProvider::from_env().unwrap()));
//! ```

mod local;
mod mock;
mod openai;
mod prompts;
mod provider;
mod response;

pub use local::LocalProvider;
pub use mock::{MockProvider, MockReply};
pub use openai::OpenAIProvider;
pub use prompts::{
    COLUMN_NAME_LABEL, ColumnProfile, DatasetSample, PROBABLE_TYPE_LABEL, PreviousColumn,
    PromptBuilder, PromptConfig, PromptContext, TASK_CLASSIFY_MARKER, TASK_DESCRIBE_MARKER,
    system_prompt,
};
pub use provider::{GenerationParams, LlmConfig, LlmProvider};
pub use response::{
    Description, FALLBACK_SCORE, FallbackReason, NEUTRAL_CONFIDENCE, TypeClassification,
    parse_classification, parse_description, placeholder_description,
};
