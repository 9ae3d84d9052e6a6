//! Annotation sessions and the human review workflow.
//!
//! A session is a JSON document holding every column's statistics, heuristic
//! guess, LLM suggestion and review state. It sits alongside the original
//! data without modifying it.
//!
//! # Overview
//!
//! ```text
//! data/
//! ├── survey.csv                     # Original data (never modified)
//! └── survey.annotation.json         # Annotation session
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use metascribe::Annotator;
//! use metascribe::llm::MockProvider;
//! use metascribe::annotation::{AnnotationSession, annotation_path};
//!
//! let annotator = Annotator::new().with_llm(Arc::new(MockProvider::new()));
//! let mut session = annotator.annotate_file("survey.csv", None, None).unwrap();
//!
//! session.edit_description("age", "Age of the respondent in years.").unwrap();
//! session.confirm("age", None).unwrap();
//! session.save(annotation_path("survey.csv")).unwrap();
//!
//! // Later, load and continue
//! let session = AnnotationSession::load("survey.annotation.json").unwrap();
//! println!("Unconfirmed: {}", session.unconfirmed().len());
//! ```

mod column;
mod persistence;
mod session;
mod store;

pub use column::{AI_UNAVAILABLE, AnnotationStatus, ColumnAnnotation, DescriptionOrigin};
pub use persistence::annotation_path;
pub use session::{
    AnnotationSession, DatasetInfo, SESSION_FORMAT_VERSION, SampleRows, StatusCounts,
};
pub use store::{InMemorySessionStore, SessionStore};
