//! Metascribe: LLM-assisted metadata annotation for tabular datasets.
//!
//! Metascribe profiles every column of a CSV file, guesses a semantic type
//! from the statistics, asks a language model for a description and a
//! refined type, and exports the reviewed result as JSON and as W3C DQV
//! Turtle.
//!
//! # Core Principles
//!
//! - **Heuristics first**: Every column gets a type from its statistics alone
//! - **Human review**: Suggestions are proposals until a reviewer confirms them
//! - **Graceful degradation**: An unreachable model never aborts a dataset
//!
//! # Example
//!
//! ```no_run
//! use metascribe::Annotator;
//!
//! let annotator = Annotator::new();
//! let session = annotator.annotate_file("survey.csv", None, None).unwrap();
//!
//! for column in &session.columns {
//!     println!("{}: {:?}", column.name, column.proposed_type());
//! }
//! ```

pub mod annotation;
pub mod config;
pub mod error;
pub mod export;
pub mod inference;
pub mod input;
pub mod llm;
pub mod schema;

mod annotator;

pub use crate::annotator::Annotator;
pub use annotation::{AnnotationSession, AnnotationStatus, ColumnAnnotation};
pub use config::MetascribeConfig;
pub use error::{MetascribeError, Result};
pub use export::{MetadataAssembler, MetadataRecord};
pub use input::{DataTable, SourceMetadata};
pub use schema::{ColumnStatistics, ElementaryKind, SemanticType};
