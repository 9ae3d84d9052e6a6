//! Per-column annotation state and review lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{MetascribeError, Result};
use crate::inference::HeuristicGuess;
use crate::llm::{Description, TypeClassification};
use crate::schema::{ColumnStatistics, ElementaryKind, SemanticType};

/// Warning attached to columns whose LLM output could not be used.
pub const AI_UNAVAILABLE: &str = "AI suggestion unavailable";

/// Review status of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationStatus {
    /// Statistics and heuristic guess only.
    Pending,
    /// An LLM or fallback suggestion is stored.
    Suggested,
    /// A reviewer changed the type or description.
    Edited,
    /// Finalized by a reviewer.
    Confirmed,
}

impl AnnotationStatus {
    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            AnnotationStatus::Pending => "Pending",
            AnnotationStatus::Suggested => "Suggested",
            AnnotationStatus::Edited => "Edited",
            AnnotationStatus::Confirmed => "Confirmed",
        }
    }

    /// Check if a reviewer has finalized the column.
    pub fn is_decided(&self) -> bool {
        matches!(self, AnnotationStatus::Confirmed)
    }
}

/// Where the current description came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptionOrigin {
    Llm,
    Placeholder,
    Human,
}

/// Working annotation for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnAnnotation {
    /// Column header, unique within the dataset.
    pub name: String,

    /// Zero-based position in the source file.
    pub position: usize,

    pub kind: ElementaryKind,

    pub statistics: ColumnStatistics,

    pub heuristic: HeuristicGuess,

    /// Latest LLM classification, or its fallback.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<TypeClassification>,

    /// Current semantic type. Set by a suggestion or a reviewer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_type: Option<SemanticType>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description_origin: Option<DescriptionOrigin>,

    pub status: AnnotationStatus,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmed_at: Option<DateTime<Utc>>,

    /// Who confirmed the column (e.g., "user:email@example.com").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmed_by: Option<String>,
}

impl ColumnAnnotation {
    /// Create a pending annotation from profiling output.
    pub fn new(
        name: impl Into<String>,
        position: usize,
        statistics: ColumnStatistics,
        heuristic: HeuristicGuess,
    ) -> Self {
        Self {
            name: name.into(),
            position,
            kind: statistics.kind(),
            statistics,
            heuristic,
            suggestion: None,
            semantic_type: None,
            description: None,
            description_origin: None,
            status: AnnotationStatus::Pending,
            warnings: Vec::new(),
            confirmed_at: None,
            confirmed_by: None,
        }
    }

    /// Type a confirmation would finalize: the current type, else the heuristic guess.
    pub fn proposed_type(&self) -> SemanticType {
        self.semantic_type.unwrap_or(self.heuristic.semantic_type)
    }

    /// Has both a type and a description.
    pub fn is_complete(&self) -> bool {
        self.semantic_type.is_some() && self.description.is_some()
    }

    /// Names of the fields still missing, for error messages.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.semantic_type.is_none() {
            missing.push("type");
        }
        if self.description.is_none() {
            missing.push("description");
        }
        missing
    }

    /// LLM confidence for the current type, if the LLM reported one.
    pub fn confidence_score(&self) -> Option<f64> {
        let current = self.semantic_type?;
        match &self.suggestion {
            Some(TypeClassification::Parsed { scores, .. }) => scores.get(&current).copied(),
            _ => None,
        }
    }

    pub fn ai_unavailable(&self) -> bool {
        self.warnings.iter().any(|w| w == AI_UNAVAILABLE)
    }

    /// Store an LLM (or fallback) suggestion.
    ///
    /// A reviewer's edits win: an edited description or type is kept.
    pub fn apply_suggestion(&mut self, classification: TypeClassification, description: Option<Description>) {
        let unusable = classification.is_fallback()
            || description.as_ref().is_some_and(|d| d.is_placeholder);

        let reviewed = matches!(self.status, AnnotationStatus::Edited | AnnotationStatus::Confirmed);
        if !reviewed || self.semantic_type.is_none() {
            self.semantic_type = Some(classification.semantic_type());
        }
        if let Some(description) = description {
            if self.description_origin != Some(DescriptionOrigin::Human) {
                self.description_origin = Some(if description.is_placeholder {
                    DescriptionOrigin::Placeholder
                } else {
                    DescriptionOrigin::Llm
                });
                self.description = Some(description.text);
            }
        }
        self.suggestion = Some(classification);

        self.warnings.retain(|w| w != AI_UNAVAILABLE);
        if unusable {
            self.warnings.push(AI_UNAVAILABLE.to_string());
        }
        if self.status == AnnotationStatus::Pending {
            self.status = AnnotationStatus::Suggested;
        }
    }

    /// Store a classification requested after a description edit.
    ///
    /// Unlike [`apply_suggestion`](Self::apply_suggestion) the new type
    /// replaces the current one.
    pub fn apply_reclassification(&mut self, classification: TypeClassification) {
        self.semantic_type = Some(classification.semantic_type());
        self.warnings.retain(|w| w != AI_UNAVAILABLE);
        if classification.is_fallback() {
            self.warnings.push(AI_UNAVAILABLE.to_string());
        }
        self.suggestion = Some(classification);
        self.mark_edited();
    }

    /// Replace the description with reviewer text. Reopens a confirmed column.
    pub fn edit_description(&mut self, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Err(self.transition_error("description cannot be empty"));
        }
        self.description = Some(text.to_string());
        self.description_origin = Some(DescriptionOrigin::Human);
        self.mark_edited();
        Ok(())
    }

    /// Override the semantic type. Reopens a confirmed column.
    pub fn set_type(&mut self, semantic_type: SemanticType) {
        self.semantic_type = Some(semantic_type);
        self.mark_edited();
    }

    /// Finalize the column with its proposed type and current description.
    pub fn confirm(&mut self, by: Option<&str>) -> Result<()> {
        if self.description.is_none() {
            return Err(self.transition_error("cannot confirm without a description"));
        }
        self.semantic_type = Some(self.proposed_type());
        self.status = AnnotationStatus::Confirmed;
        self.confirmed_at = Some(Utc::now());
        self.confirmed_by = by.map(str::to_string);
        Ok(())
    }

    fn mark_edited(&mut self) {
        self.status = AnnotationStatus::Edited;
        self.confirmed_at = None;
        self.confirmed_by = None;
    }

    fn transition_error(&self, message: &str) -> MetascribeError {
        MetascribeError::InvalidTransition {
            column: self.name.clone(),
            message: message.to_string(),
        }
    }
}
