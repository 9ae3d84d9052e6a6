//! Annotation session - the working state for one dataset.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{MetascribeError, Result};
use crate::input::{ContextDocument, SourceMetadata};
use crate::llm::{PreviousColumn, PromptContext, placeholder_description};
use crate::schema::SemanticType;

use super::column::{AnnotationStatus, ColumnAnnotation, DescriptionOrigin};

/// Current version of the session file format.
pub const SESSION_FORMAT_VERSION: &str = "1.0.0";

/// Dataset-level fields shown to the model and exported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub row_count: usize,
    pub column_count: usize,
    pub created_at: DateTime<Utc>,
}

impl DatasetInfo {
    pub fn new(name: impl Into<String>, row_count: usize, column_count: usize) -> Self {
        Self {
            name: name.into(),
            description: None,
            row_count,
            column_count,
            created_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description.filter(|d| !d.trim().is_empty());
        self
    }
}

/// First rows of the dataset, kept so prompts can be rebuilt from a saved session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleRows {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Counts of columns by review status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub suggested: usize,
    pub edited: usize,
    pub confirmed: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.pending + self.suggested + self.edited + self.confirmed
    }
}

/// All annotation state for a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationSession {
    /// Version of the session file format.
    pub format_version: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    pub dataset: DatasetInfo,

    /// Metadata about the source file.
    pub source: SourceMetadata,

    #[serde(default)]
    pub sample: SampleRows,

    /// Supplementary documents included in every prompt.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<ContextDocument>,

    /// Columns in source order.
    pub columns: Vec<ColumnAnnotation>,
}

impl AnnotationSession {
    pub fn new(dataset: DatasetInfo, source: SourceMetadata, columns: Vec<ColumnAnnotation>) -> Self {
        let now = Utc::now();
        Self {
            format_version: SESSION_FORMAT_VERSION.to_string(),
            created_at: now,
            updated_at: now,
            dataset,
            source,
            sample: SampleRows::default(),
            context: Vec::new(),
            columns,
        }
    }

    pub fn with_sample(mut self, sample: SampleRows) -> Self {
        self.sample = sample;
        self
    }

    pub fn with_context(mut self, context: Vec<ContextDocument>) -> Self {
        self.context = context;
        self
    }

    pub fn column(&self, name: &str) -> Option<&ColumnAnnotation> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_mut(&mut self, name: &str) -> Result<&mut ColumnAnnotation> {
        self.columns
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| MetascribeError::ColumnNotFound(name.to_string()))
    }

    /// Replace a column's description with reviewer text.
    pub fn edit_description(&mut self, column: &str, text: &str) -> Result<()> {
        self.column_mut(column)?.edit_description(text)?;
        self.touch();
        Ok(())
    }

    /// Override a column's semantic type.
    pub fn set_type(&mut self, column: &str, semantic_type: SemanticType) -> Result<()> {
        self.column_mut(column)?.set_type(semantic_type);
        self.touch();
        Ok(())
    }

    /// Confirm one column.
    pub fn confirm(&mut self, column: &str, by: Option<&str>) -> Result<()> {
        self.column_mut(column)?.confirm(by)?;
        self.touch();
        Ok(())
    }

    /// Confirm every unconfirmed column, filling a placeholder where a
    /// description is still missing. Returns how many were confirmed.
    pub fn confirm_all(&mut self, by: Option<&str>) -> Result<usize> {
        let mut confirmed = 0;
        for col in self.columns.iter_mut().filter(|c| !c.status.is_decided()) {
            if col.description.is_none() {
                col.description = Some(placeholder_description(&col.name));
                col.description_origin = Some(DescriptionOrigin::Placeholder);
            }
            col.confirm(by)?;
            confirmed += 1;
        }
        if confirmed > 0 {
            self.touch();
        }
        Ok(confirmed)
    }

    /// Columns not yet confirmed, in source order.
    pub fn unconfirmed(&self) -> Vec<&ColumnAnnotation> {
        self.columns
            .iter()
            .filter(|c| !c.status.is_decided())
            .collect()
    }

    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for col in &self.columns {
            match col.status {
                AnnotationStatus::Pending => counts.pending += 1,
                AnnotationStatus::Suggested => counts.suggested += 1,
                AnnotationStatus::Edited => counts.edited += 1,
                AnnotationStatus::Confirmed => counts.confirmed += 1,
            }
        }
        counts
    }

    /// Check if every column is confirmed.
    pub fn is_complete(&self) -> bool {
        self.columns.iter().all(|c| c.status.is_decided())
    }

    /// Get progress as a fraction (0.0 to 1.0).
    pub fn progress(&self) -> f64 {
        if self.columns.is_empty() {
            return 1.0;
        }
        self.counts().confirmed as f64 / self.columns.len() as f64
    }

    /// Annotated columns before `column`, for prompt context.
    pub fn previous_columns(&self, column: &str) -> Vec<PreviousColumn<'_>> {
        self.columns
            .iter()
            .take_while(|c| c.name != column)
            .filter_map(|c| {
                Some(PreviousColumn {
                    name: &c.name,
                    semantic_type: c.semantic_type?,
                    description: c.description.as_deref()?,
                })
            })
            .collect()
    }

    /// Prompt context for `column`.
    pub fn prompt_context(&self, column: &str) -> PromptContext<'_> {
        PromptContext::new(&self.dataset.name)
            .with_description(self.dataset.description.as_deref())
            .with_sample(&self.sample.headers, &self.sample.rows)
            .with_previous_columns(self.previous_columns(column))
            .with_documents(&self.context)
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use crate::inference::{HeuristicDetector, StatisticsEngine};
    use crate::schema::ColumnValues;

    fn session() -> AnnotationSession {
        let engine = StatisticsEngine::new();
        let detector = HeuristicDetector::new();
        let columns = [
            ("age", vec!["18", "25", "30"]),
            ("sex", vec!["M", "F", "M"]),
            ("id", vec!["A1", "A2", "A3"]),
        ]
        .into_iter()
        .enumerate()
        .map(|(i, (name, raw))| {
            let values = ColumnValues::from_raw(raw);
            let stats = engine.compute(&values);
            let guess = detector.detect(values.kind(), &stats);
            ColumnAnnotation::new(name, i, stats, guess)
        })
        .collect();

        let source = SourceMetadata::new(
            PathBuf::from("patients.csv"),
            "abc".into(),
            10,
            "csv".into(),
            3,
            3,
        );
        AnnotationSession::new(DatasetInfo::new("patients", 3, 3), source, columns)
    }

    #[test]
    fn test_unknown_column() {
        let mut s = session();
        assert!(matches!(
            s.confirm("nope", None),
            Err(MetascribeError::ColumnNotFound(_))
        ));
    }

    #[test]
    fn test_counts_and_progress() {
        let mut s = session();
        s.edit_description("age", "Age in years.").unwrap();
        s.confirm("age", None).unwrap();
        s.set_type("sex", SemanticType::Categorical).unwrap();

        let counts = s.counts();
        assert_eq!(counts.confirmed, 1);
        assert_eq!(counts.edited, 1);
        assert_eq!(counts.pending, 1);
        assert_eq!(counts.total(), 3);
        assert!((s.progress() - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(s.unconfirmed().len(), 2);
    }

    #[test]
    fn test_confirm_all_fills_placeholders() {
        let mut s = session();
        s.edit_description("age", "Age in years.").unwrap();
        s.confirm("age", None).unwrap();

        assert_eq!(s.confirm_all(Some("reviewer")).unwrap(), 2);
        assert!(s.is_complete());
        let id = s.column("id").unwrap();
        assert_eq!(
            id.description.as_deref(),
            Some("This column represents id data in the dataset.")
        );
        assert_eq!(id.semantic_type, Some(SemanticType::Identifier));
        assert_eq!(id.confirmed_by.as_deref(), Some("reviewer"));
    }

    #[test]
    fn test_previous_columns_only_before_and_complete() {
        let mut s = session();
        s.edit_description("age", "Age in years.").unwrap();
        s.set_type("age", SemanticType::Continuous).unwrap();
        s.edit_description("id", "Row key.").unwrap();
        s.set_type("id", SemanticType::Identifier).unwrap();

        let prev = s.previous_columns("id");
        assert_eq!(prev.len(), 1);
        assert_eq!(prev[0].name, "age");
        assert!(s.previous_columns("age").is_empty());
    }
}
