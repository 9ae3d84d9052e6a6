//! Core type definitions for column classification.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Coarse storage-level classification of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementaryKind {
    /// Every observed value parses as a number.
    Numeric,
    /// Strings, booleans, timestamps or a mix.
    Categorical,
}

impl ElementaryKind {
    /// Returns true for numeric columns.
    pub fn is_numeric(&self) -> bool {
        matches!(self, ElementaryKind::Numeric)
    }

    /// Label used in prompts and terminal output.
    pub fn label(&self) -> &'static str {
        match self {
            ElementaryKind::Numeric => "numeric",
            ElementaryKind::Categorical => "categorical",
        }
    }
}

impl fmt::Display for ElementaryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Meaning or role of a column, as opposed to its storage kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticType {
    /// Exactly two distinct values.
    Binary,
    /// Unordered discrete categories.
    Categorical,
    /// Ordered discrete categories.
    Ordinal,
    /// Measurements on a continuous scale.
    Continuous,
    /// Unique key per row.
    Identifier,
    /// Unstructured natural-language text.
    FreeText,
}

impl SemanticType {
    /// All types in canonical order. Ties between scores resolve to the earlier entry.
    pub const ALL: [SemanticType; 6] = [
        SemanticType::Binary,
        SemanticType::Categorical,
        SemanticType::Ordinal,
        SemanticType::Continuous,
        SemanticType::Identifier,
        SemanticType::FreeText,
    ];

    /// Wire name (snake_case).
    pub fn as_str(&self) -> &'static str {
        match self {
            SemanticType::Binary => "binary",
            SemanticType::Categorical => "categorical",
            SemanticType::Ordinal => "ordinal",
            SemanticType::Continuous => "continuous",
            SemanticType::Identifier => "identifier",
            SemanticType::FreeText => "free_text",
        }
    }

    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            SemanticType::Binary => "Binary",
            SemanticType::Categorical => "Categorical",
            SemanticType::Ordinal => "Ordinal",
            SemanticType::Continuous => "Continuous",
            SemanticType::Identifier => "Identifier",
            SemanticType::FreeText => "Free text",
        }
    }

    /// Short definition used in classification prompts.
    pub fn definition(&self) -> &'static str {
        match self {
            SemanticType::Binary => "only two possible values (yes/no, true/false, 0/1, M/F)",
            SemanticType::Categorical => "a limited set of unordered categories",
            SemanticType::Ordinal => "categories with a natural order (low < medium < high, ratings)",
            SemanticType::Continuous => "numeric measurements that can take any value in a range",
            SemanticType::Identifier => "a unique code or key that identifies each record",
            SemanticType::FreeText => "unstructured natural-language text",
        }
    }

    /// Lenient parse of a type name as written by people or models.
    ///
    /// Accepts case, spacing and hyphen variations plus a few common synonyms.
    pub fn parse_lenient(raw: &str) -> Option<Self> {
        let normalized: String = raw
            .trim()
            .trim_matches(|c: char| c == '"' || c == '\'' || c == '`' || c == '.')
            .to_lowercase()
            .chars()
            .map(|c| if c == ' ' || c == '-' { '_' } else { c })
            .collect();

        match normalized.as_str() {
            "binary" | "boolean" | "bool" | "dichotomous" => Some(SemanticType::Binary),
            "categorical" | "category" | "nominal" => Some(SemanticType::Categorical),
            "ordinal" | "ordered" | "ordered_categorical" => Some(SemanticType::Ordinal),
            "continuous" | "numeric" | "numerical" => Some(SemanticType::Continuous),
            "identifier" | "id" | "key" | "unique_identifier" => Some(SemanticType::Identifier),
            "free_text" | "freetext" | "text" => Some(SemanticType::FreeText),
            _ => None,
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SemanticType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SemanticType::parse_lenient(s).ok_or_else(|| {
            format!(
                "Unknown semantic type: {}. Use binary, categorical, ordinal, continuous, identifier, or free_text.",
                s
            )
        })
    }
}

/// Confidence per candidate type, each in [0, 1], in the order reported.
pub type ConfidenceScores = IndexMap<SemanticType, f64>;
