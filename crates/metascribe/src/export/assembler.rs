//! Assembly of the final metadata record.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::annotation::{AnnotationSession, AnnotationStatus, ColumnAnnotation};
use crate::error::{MetascribeError, Result};
use crate::schema::{ColumnStatistics, SemanticType};

use super::coerce::{coerce_optional, coerce_stat};
use super::{ExportConfig, IncompletePolicy};

/// Dataset-level inputs to the assembler.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetFields {
    pub name: String,
    pub description: Option<String>,
    pub row_count: usize,
    pub column_count: usize,
}

/// A column as handed to the assembler.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalizedColumn {
    pub name: String,
    pub semantic_type: Option<SemanticType>,
    pub description: Option<String>,
    pub statistics: ColumnStatistics,
    pub confidence: Option<f64>,
    /// A reviewer signed off on the type and description.
    pub confirmed: bool,
}

impl From<&ColumnAnnotation> for FinalizedColumn {
    fn from(col: &ColumnAnnotation) -> Self {
        Self {
            name: col.name.clone(),
            semantic_type: col.semantic_type,
            description: col.description.clone(),
            statistics: col.statistics.clone(),
            confidence: col.confidence_score(),
            confirmed: col.status == AnnotationStatus::Confirmed,
        }
    }
}

/// Kind-specific statistics in the exported column.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ColumnStatsRecord {
    Numeric {
        mean: Value,
        std: Value,
        min: Value,
        max: Value,
    },
    Categorical {
        top_value: Value,
        top_freq: usize,
        sample_values: Vec<Value>,
    },
}

/// One exported column, serialized in field order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub semantic_type: Option<SemanticType>,
    pub description: Option<String>,
    pub missing_values: usize,
    pub unique_values: usize,
    #[serde(flatten)]
    pub stats: ColumnStatsRecord,
    pub confidence_score: Option<f64>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub incomplete: bool,
}

/// The exported metadata document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataRecord {
    pub dataset_name: String,
    pub dataset_description: Option<String>,
    pub generated_timestamp: String,
    pub tool_version: String,
    pub row_count: usize,
    pub column_count: usize,
    pub columns: Vec<ColumnRecord>,
}

/// Builds [`MetadataRecord`]s.
#[derive(Debug, Clone, Default)]
pub struct MetadataAssembler {
    config: ExportConfig,
}

impl MetadataAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ExportConfig) -> Self {
        Self { config }
    }

    pub fn with_policy(mut self, policy: IncompletePolicy) -> Self {
        self.config.incomplete = policy;
        self
    }

    /// Merge dataset fields and columns into a record.
    ///
    /// Output depends only on the arguments, so equal inputs give
    /// byte-identical JSON.
    pub fn assemble(
        &self,
        dataset: &DatasetFields,
        columns: &[FinalizedColumn],
        generated_at: DateTime<Utc>,
    ) -> Result<MetadataRecord> {
        let mut records = Vec::with_capacity(columns.len());

        for col in columns {
            let complete = missing_fields(col).is_empty();
            if !complete {
                match self.config.incomplete {
                    IncompletePolicy::Exclude => {
                        warn!(column = %col.name, "excluding incomplete column from export");
                        continue;
                    }
                    IncompletePolicy::Reject => {
                        return Err(MetascribeError::IncompleteColumn {
                            column: col.name.clone(),
                            missing: missing_fields(col).join(" and "),
                        });
                    }
                    IncompletePolicy::Flag => {}
                }
            }
            records.push(self.column_record(col, !complete)?);
        }

        debug!(
            dataset = %dataset.name,
            exported = records.len(),
            total = columns.len(),
            "assembled metadata record"
        );

        Ok(MetadataRecord {
            dataset_name: dataset.name.clone(),
            dataset_description: dataset.description.clone(),
            generated_timestamp: generated_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            tool_version: self.config.tool_version.clone(),
            row_count: dataset.row_count,
            column_count: dataset.column_count,
            columns: records,
        })
    }

    /// Assemble straight from a session.
    pub fn from_session(
        &self,
        session: &AnnotationSession,
        generated_at: DateTime<Utc>,
    ) -> Result<MetadataRecord> {
        let dataset = DatasetFields {
            name: session.dataset.name.clone(),
            description: session.dataset.description.clone(),
            row_count: session.dataset.row_count,
            column_count: session.dataset.column_count,
        };
        let columns: Vec<FinalizedColumn> = session.columns.iter().map(FinalizedColumn::from).collect();
        self.assemble(&dataset, &columns, generated_at)
    }

    fn column_record(&self, col: &FinalizedColumn, incomplete: bool) -> Result<ColumnRecord> {
        let stats = match &col.statistics {
            ColumnStatistics::Numeric(s) => ColumnStatsRecord::Numeric {
                mean: coerce_optional(s.mean),
                std: coerce_optional(s.std),
                min: coerce_optional(s.min),
                max: coerce_optional(s.max),
            },
            ColumnStatistics::Categorical(s) => ColumnStatsRecord::Categorical {
                top_value: match &s.most_frequent_value {
                    Some(v) => coerce_stat(&col.name, "top_value", v)?,
                    None => Value::Null,
                },
                top_freq: s.most_frequent_frequency,
                sample_values: s
                    .sample_values
                    .iter()
                    .map(|v| coerce_stat(&col.name, "sample_values", v))
                    .collect::<Result<_>>()?,
            },
        };

        Ok(ColumnRecord {
            name: col.name.clone(),
            semantic_type: if incomplete { None } else { col.semantic_type },
            description: if incomplete { None } else { col.description.clone() },
            missing_values: col.statistics.missing_count(),
            unique_values: col.statistics.unique_count(),
            stats,
            confidence_score: col.confidence.filter(|c| c.is_finite()),
            incomplete,
        })
    }
}

fn missing_fields(col: &FinalizedColumn) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if col.semantic_type.is_none() {
        missing.push("type");
    }
    if col.description.is_none() {
        missing.push("description");
    }
    if !col.confirmed {
        missing.push("confirmation");
    }
    missing
}
