//! Prompt templates for column description and type classification.
//!
//! Prompts are plain strings assembled from the dataset context and one
//! column's profile. Context documents are always included in full.

use serde::{Deserialize, Serialize};

use crate::inference::HeuristicGuess;
use crate::input::ContextDocument;
use crate::schema::{ColumnStatistics, ElementaryKind, SemanticType};

/// Label introducing the column being annotated. Appears once per prompt.
pub const COLUMN_NAME_LABEL: &str = "Column to annotate:";

/// Label introducing the heuristic hint. Appears once per classification prompt.
pub const PROBABLE_TYPE_LABEL: &str = "Probable type (heuristic):";

/// First line of every classification prompt.
pub const TASK_CLASSIFY_MARKER: &str = "Task: classify the semantic type of a dataset column.";

/// First line of every description prompt.
pub const TASK_DESCRIBE_MARKER: &str = "Task: write a metadata description for a dataset column.";

/// Prompt assembly settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Distinct sample values listed per column.
    pub max_sample_values: usize,
    /// Dataset rows shown as a sample.
    pub sample_rows: usize,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            max_sample_values: 10,
            sample_rows: 5,
        }
    }
}

/// First rows of the dataset.
#[derive(Debug, Clone, Copy)]
pub struct DatasetSample<'a> {
    pub headers: &'a [String],
    pub rows: &'a [Vec<String>],
}

/// A column already annotated in this session.
#[derive(Debug, Clone, Copy)]
pub struct PreviousColumn<'a> {
    pub name: &'a str,
    pub semantic_type: SemanticType,
    pub description: &'a str,
}

/// Dataset-level material shared by every prompt in a session.
#[derive(Debug, Clone)]
pub struct PromptContext<'a> {
    pub dataset_name: &'a str,
    pub dataset_description: Option<&'a str>,
    pub sample: Option<DatasetSample<'a>>,
    pub previous_columns: Vec<PreviousColumn<'a>>,
    pub documents: &'a [ContextDocument],
}

impl<'a> PromptContext<'a> {
    pub fn new(dataset_name: &'a str) -> Self {
        Self {
            dataset_name,
            dataset_description: None,
            sample: None,
            previous_columns: Vec::new(),
            documents: &[],
        }
    }

    pub fn with_description(mut self, description: Option<&'a str>) -> Self {
        self.dataset_description = description;
        self
    }

    pub fn with_sample(mut self, headers: &'a [String], rows: &'a [Vec<String>]) -> Self {
        self.sample = Some(DatasetSample { headers, rows });
        self
    }

    pub fn with_previous_columns(mut self, columns: Vec<PreviousColumn<'a>>) -> Self {
        self.previous_columns = columns;
        self
    }

    pub fn with_documents(mut self, documents: &'a [ContextDocument]) -> Self {
        self.documents = documents;
        self
    }
}

/// What the prompt needs to know about one column.
#[derive(Debug, Clone, Copy)]
pub struct ColumnProfile<'a> {
    pub name: &'a str,
    pub kind: ElementaryKind,
    pub statistics: &'a ColumnStatistics,
    pub heuristic: &'a HeuristicGuess,
}

/// System message for chat-style providers.
pub fn system_prompt() -> &'static str {
    "You are a data documentation assistant. You write precise, factual metadata \
     for tabular datasets and follow the requested output format exactly."
}

// =============================================================================
// WORKED EXAMPLES
// =============================================================================

struct DescriptionExample {
    dataset: &'static str,
    dataset_description: &'static str,
    column: &'static str,
    kind: &'static str,
    stats: &'static str,
    output: &'static str,
}

const DESCRIPTION_EXAMPLES: [DescriptionExample; 2] = [
    DescriptionExample {
        dataset: "Clinic Appointments",
        dataset_description: "Scheduled outpatient visits across three regional clinics.",
        column: "referral_source",
        kind: "categorical",
        stats: "missing=8, unique=5, most_frequent=GP (412 times)",
        output: "The channel through which the patient was directed to the clinic, such as a \
                 general practitioner, a hospital department or self-referral.",
    },
    DescriptionExample {
        dataset: "Warehouse Shipments",
        dataset_description: "Outbound parcels dispatched from a distribution centre.",
        column: "gross_weight_kg",
        kind: "numeric",
        stats: "missing=0, unique=2210, mean=4.81, std=3.02, min=0.10, max=31.50",
        output: "The total weight of each parcel in kilograms, including its packaging, as \
                 measured at dispatch.",
    },
];

struct ClassificationExample {
    semantic_type: SemanticType,
    column: &'static str,
    description: &'static str,
    stats: &'static str,
    output: &'static str,
}

const CLASSIFICATION_EXAMPLES: [ClassificationExample; 6] = [
    ClassificationExample {
        semantic_type: SemanticType::Binary,
        column: "is_member",
        description: "Whether the customer holds a loyalty membership.",
        stats: "kind=categorical, missing=0, unique=2, samples=[yes, no]",
        output: r#"{"type": "binary", "confidence": {"binary": 0.95, "categorical": 0.05, "ordinal": 0.0, "continuous": 0.0, "identifier": 0.0, "free_text": 0.0}}"#,
    },
    ClassificationExample {
        semantic_type: SemanticType::Categorical,
        column: "shipping_carrier",
        description: "The courier company that delivered the order.",
        stats: "kind=categorical, missing=3, unique=6, samples=[DHL, UPS, FedEx, Royal Mail]",
        output: r#"{"type": "categorical", "confidence": {"binary": 0.0, "categorical": 0.9, "ordinal": 0.05, "continuous": 0.0, "identifier": 0.0, "free_text": 0.05}}"#,
    },
    ClassificationExample {
        semantic_type: SemanticType::Ordinal,
        column: "pain_level",
        description: "Patient-reported pain on a graded scale.",
        stats: "kind=categorical, missing=1, unique=4, samples=[none, mild, moderate, severe]",
        output: r#"{"type": "ordinal", "confidence": {"binary": 0.0, "categorical": 0.15, "ordinal": 0.85, "continuous": 0.0, "identifier": 0.0, "free_text": 0.0}}"#,
    },
    ClassificationExample {
        semantic_type: SemanticType::Continuous,
        column: "systolic_bp",
        description: "Systolic blood pressure in mmHg at admission.",
        stats: "kind=numeric, missing=12, unique=88, mean=128.40, std=17.90, min=86, max=201",
        output: r#"{"type": "continuous", "confidence": {"binary": 0.0, "categorical": 0.0, "ordinal": 0.05, "continuous": 0.95, "identifier": 0.0, "free_text": 0.0}}"#,
    },
    ClassificationExample {
        semantic_type: SemanticType::Identifier,
        column: "invoice_no",
        description: "The unique number assigned to each invoice.",
        stats: "kind=categorical, missing=0, unique=5000, samples=[INV-00017, INV-00018, INV-00019]",
        output: r#"{"type": "identifier", "confidence": {"binary": 0.0, "categorical": 0.0, "ordinal": 0.0, "continuous": 0.0, "identifier": 0.97, "free_text": 0.03}}"#,
    },
    ClassificationExample {
        semantic_type: SemanticType::FreeText,
        column: "review_body",
        description: "The written review a customer left for the product.",
        stats: "kind=categorical, missing=40, unique=4810, samples=[Fits well but the zip broke after a week., Arrived early and works great.]",
        output: r#"{"type": "free_text", "confidence": {"binary": 0.0, "categorical": 0.0, "ordinal": 0.0, "continuous": 0.0, "identifier": 0.02, "free_text": 0.98}}"#,
    },
];

// =============================================================================
// BUILDER
// =============================================================================

/// Builds description and classification prompts.
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    config: PromptConfig,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PromptConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PromptConfig {
        &self.config
    }

    /// Prompt asking for a natural-language description only.
    pub fn description_prompt(&self, ctx: &PromptContext<'_>, column: &ColumnProfile<'_>) -> String {
        let mut examples = String::new();
        for (i, ex) in DESCRIPTION_EXAMPLES.iter().enumerate() {
            examples.push_str(&format!(
                "Example {}:\nDataset: {}\nDataset description: {}\nColumn name: {}\nKind: {}\nStatistics: {}\nOutput:\n{}\n\n",
                i + 1,
                ex.dataset,
                ex.dataset_description,
                ex.column,
                ex.kind,
                ex.stats,
                ex.output
            ));
        }

        let mut prompt = format!(
            r#"{marker}

Write one clear sentence or a short paragraph describing what this column means in real-world terms.

Rules:
- Output only the description.
- Do not repeat the column name, data type, statistics or sample values.
- Do not add formatting, labels or commentary.
- Do not speculate about how the column is used for modelling or decisions.

{examples}"#,
            marker = TASK_DESCRIBE_MARKER,
            examples = examples
        );

        prompt.push_str(&self.dataset_section(ctx));
        prompt.push_str(&previous_columns_section(&ctx.previous_columns));
        prompt.push_str(&documents_section(ctx.documents));
        prompt.push_str(&self.column_section(column));
        prompt.push_str(
            "\nNow write the real-world description of this column only. \
             Do not include statistics or sample values.\n",
        );
        prompt
    }

    /// Prompt asking for a type and confidence per type as JSON.
    ///
    /// `description` is the current description, possibly edited by a reviewer.
    pub fn classification_prompt(
        &self,
        ctx: &PromptContext<'_>,
        column: &ColumnProfile<'_>,
        description: Option<&str>,
    ) -> String {
        let types: String = SemanticType::ALL
            .iter()
            .map(|t| format!("- {}: {}\n", t.as_str(), t.definition()))
            .collect();

        let mut examples = String::new();
        for (i, ex) in CLASSIFICATION_EXAMPLES.iter().enumerate() {
            examples.push_str(&format!(
                "Example {} ({}):\nColumn name: {}\nDescription: {}\nStatistics: {}\nOutput:\n{}\n\n",
                i + 1,
                ex.semantic_type.label(),
                ex.column,
                ex.description,
                ex.stats,
                ex.output
            ));
        }

        let mut prompt = format!(
            r#"{marker}

Possible types:
{types}
Respond with a single JSON object of the form
{{"type": "<chosen type>", "confidence": {{"binary": 0.0, "categorical": 0.0, "ordinal": 0.0, "continuous": 0.0, "identifier": 0.0, "free_text": 0.0}}}}
Every confidence is a number between 0 and 1. Include all six types. Do not add any explanation.

{examples}"#,
            marker = TASK_CLASSIFY_MARKER,
            types = types,
            examples = examples
        );

        prompt.push_str(&self.dataset_section(ctx));
        prompt.push_str(&documents_section(ctx.documents));
        prompt.push_str(&self.column_section(column));
        prompt.push_str(&format!(
            "Description: {}\n",
            description
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .unwrap_or("(not yet written)")
        ));

        let hint = column.heuristic;
        prompt.push_str(&format!("{} {}\n", PROBABLE_TYPE_LABEL, hint.semantic_type));
        if hint.needs_refinement {
            prompt.push_str(
                "Note: the value distribution alone cannot separate ordinal from categorical here.\n",
            );
        }
        prompt.push_str("\nOutput:\n");
        prompt
    }

    fn dataset_section(&self, ctx: &PromptContext<'_>) -> String {
        let mut section = format!(
            "Dataset: {}\nDataset description: {}\n",
            ctx.dataset_name,
            ctx.dataset_description
                .filter(|d| !d.trim().is_empty())
                .unwrap_or("No description provided")
        );

        if let Some(sample) = ctx.sample {
            let rows = &sample.rows[..sample.rows.len().min(self.config.sample_rows)];
            if !rows.is_empty() {
                section.push_str(&format!("Dataset sample (first {} rows):\n", rows.len()));
                section.push_str(&sample.headers.join(" | "));
                section.push('\n');
                for row in rows {
                    section.push_str(&row.join(" | "));
                    section.push('\n');
                }
            }
        }
        section.push('\n');
        section
    }

    fn column_section(&self, column: &ColumnProfile<'_>) -> String {
        let stats = column.statistics;
        let mut section = format!(
            "{} {}\nKind: {}\nRows: {}\nStatistics: {}\n",
            COLUMN_NAME_LABEL,
            column.name,
            column.kind,
            stats.row_count(),
            stats.summary()
        );

        let samples: Vec<String> = stats
            .sample_values()
            .iter()
            .take(self.config.max_sample_values)
            .map(|v| v.to_string())
            .collect();
        if !samples.is_empty() {
            section.push_str(&format!("Sample values: {}\n", samples.join(", ")));
        }
        section
    }
}

fn previous_columns_section(columns: &[PreviousColumn<'_>]) -> String {
    if columns.is_empty() {
        return String::new();
    }
    let mut section = String::from("Previously annotated columns (name, type, description):\n");
    for col in columns {
        section.push_str(&format!(
            "- {} ({}): {}\n",
            col.name, col.semantic_type, col.description
        ));
    }
    section.push('\n');
    section
}

fn documents_section(documents: &[ContextDocument]) -> String {
    if documents.is_empty() {
        return String::new();
    }
    let mut section = String::from("Additional information about the dataset:\n");
    for doc in documents {
        section.push_str(&format!("--- {} ({}) ---\n{}\n", doc.name, doc.format, doc.text));
    }
    section.push('\n');
    section
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::{HeuristicDetector, StatisticsEngine};
    use crate::input::ContextFormat;
    use crate::schema::ColumnValues;

    fn profile_parts(raw: &[&str]) -> (ColumnStatistics, HeuristicGuess, ElementaryKind) {
        let values = ColumnValues::from_raw(raw.iter().copied());
        let stats = StatisticsEngine::new().compute(&values);
        let guess = HeuristicDetector::new().detect(values.kind(), &stats);
        (stats, guess, values.kind())
    }

    #[test]
    fn test_description_prompt_contents() {
        let (stats, guess, kind) = profile_parts(&["M", "F", "M"]);
        let column = ColumnProfile {
            name: "sex",
            kind,
            statistics: &stats,
            heuristic: &guess,
        };
        let headers = vec!["sex".to_string()];
        let rows = vec![vec!["M".to_string()]];
        let ctx = PromptContext::new("Patients")
            .with_description(Some("Hospital admissions"))
            .with_sample(&headers, &rows);

        let prompt = PromptBuilder::new().description_prompt(&ctx, &column);

        assert!(prompt.starts_with(TASK_DESCRIBE_MARKER));
        assert!(prompt.contains("Dataset: Patients"));
        assert!(prompt.contains("Hospital admissions"));
        assert!(prompt.contains("Column to annotate: sex"));
        assert!(prompt.contains("Sample values: M, F"));
        assert!(prompt.contains("Example 2:"));
        assert!(!prompt.contains("Additional information about the dataset"));
        assert!(!prompt.contains("Previously annotated columns"));
    }

    #[test]
    fn test_context_documents_included_in_full() {
        let (stats, guess, kind) = profile_parts(&["1", "2", "3"]);
        let column = ColumnProfile {
            name: "score",
            kind,
            statistics: &stats,
            heuristic: &guess,
        };
        let long_text = "codebook entry. ".repeat(5_000);
        let docs = vec![ContextDocument::new("codebook.txt", ContextFormat::Text, long_text.clone())];
        let ctx = PromptContext::new("Survey").with_documents(&docs);

        let builder = PromptBuilder::new();
        let description = builder.description_prompt(&ctx, &column);
        let classification = builder.classification_prompt(&ctx, &column, None);

        assert!(description.contains(&long_text));
        assert!(classification.contains(&long_text));
        assert!(description.contains("--- codebook.txt (txt) ---"));
    }

    #[test]
    fn test_classification_prompt_has_one_example_per_type() {
        let (stats, guess, kind) = profile_parts(&["A001", "A002", "A003"]);
        let column = ColumnProfile {
            name: "patient_id",
            kind,
            statistics: &stats,
            heuristic: &guess,
        };
        let ctx = PromptContext::new("Patients");
        let prompt =
            PromptBuilder::new().classification_prompt(&ctx, &column, Some("Unique patient code."));

        assert!(prompt.starts_with(TASK_CLASSIFY_MARKER));
        for t in SemanticType::ALL {
            assert!(prompt.contains(&format!("({})", t.label())), "missing example for {}", t);
        }
        assert!(prompt.contains("Probable type (heuristic): identifier"));
        assert!(prompt.contains("Description: Unique patient code."));
        assert!(prompt.trim_end().ends_with("Output:"));
        assert_eq!(prompt.matches(COLUMN_NAME_LABEL).count(), 1);
        assert_eq!(prompt.matches(PROBABLE_TYPE_LABEL).count(), 1);
    }

    #[test]
    fn test_previous_columns_listed() {
        let (stats, guess, kind) = profile_parts(&["x", "y", "x"]);
        let column = ColumnProfile {
            name: "c",
            kind,
            statistics: &stats,
            heuristic: &guess,
        };
        let ctx = PromptContext::new("D").with_previous_columns(vec![PreviousColumn {
            name: "age",
            semantic_type: SemanticType::Continuous,
            description: "Age in years.",
        }]);
        let prompt = PromptBuilder::new().description_prompt(&ctx, &column);
        assert!(prompt.contains("- age (continuous): Age in years."));
    }

    #[test]
    fn test_sample_rows_bounded() {
        let (stats, guess, kind) = profile_parts(&["1", "2"]);
        let column = ColumnProfile {
            name: "n",
            kind,
            statistics: &stats,
            heuristic: &guess,
        };
        let headers = vec!["n".to_string()];
        let rows: Vec<Vec<String>> = (0..20).map(|i| vec![format!("row{}", i)]).collect();
        let ctx = PromptContext::new("D").with_sample(&headers, &rows);
        let builder = PromptBuilder::with_config(PromptConfig {
            sample_rows: 3,
            ..Default::default()
        });
        let prompt = builder.description_prompt(&ctx, &column);
        assert!(prompt.contains("row2\n"));
        assert!(!prompt.contains("row3\n"));
    }
}
