//! Rule-based semantic type guess made before any LLM call.
//!
//! The guess is advisory. It seeds the classification prompt as a hint and
//! becomes the fallback when the model's reply is unusable.

use serde::{Deserialize, Serialize};

use crate::error::{MetascribeError, Result};
use crate::schema::{ColumnStatistics, ElementaryKind, SemanticType, StatValue};

/// Tunable thresholds for the detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicConfig {
    /// Text columns with at most this many distinct values are categorical.
    pub categorical_max_unique: usize,
    /// Distinct-to-observed ratio at which values count as all distinct.
    pub identifier_min_ratio: f64,
    /// Mean words per value that marks free text.
    pub free_text_min_words: f64,
    /// Mean characters per value that marks free text.
    pub free_text_min_length: f64,
    /// Numeric columns with at most this many distinct values are discrete.
    pub numeric_discrete_max_unique: usize,
    /// ...provided distinct values are at most this share of observations.
    pub numeric_discrete_max_ratio: f64,
    /// Column names that mark an identifier, compared case-insensitively.
    pub identifier_names: Vec<String>,
    /// Name endings that mark an identifier.
    pub identifier_suffixes: Vec<String>,
    /// Words of known ranked scales. A text column using only these is ordinal.
    pub ordinal_words: Vec<String>,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            categorical_max_unique: 15,
            identifier_min_ratio: 0.95,
            free_text_min_words: 5.0,
            free_text_min_length: 40.0,
            numeric_discrete_max_unique: 10,
            numeric_discrete_max_ratio: 0.5,
            identifier_names: strings(&["id", "identifier"]),
            identifier_suffixes: strings(&["_id"]),
            ordinal_words: strings(&[
                "low", "medium", "high", "bad", "average", "good", "excellent", "small", "large",
            ]),
        }
    }
}

fn strings(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

impl HeuristicConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, ratio) in [
            ("identifier_min_ratio", self.identifier_min_ratio),
            ("numeric_discrete_max_ratio", self.numeric_discrete_max_ratio),
        ] {
            if !(ratio > 0.0 && ratio <= 1.0) {
                return Err(MetascribeError::Config(format!(
                    "heuristics.{} must be in (0, 1], got {}",
                    name, ratio
                )));
            }
        }
        Ok(())
    }

    fn is_identifier_name(&self, name: &str) -> bool {
        let name = name.trim().to_lowercase();
        self.identifier_names.iter().any(|n| n.to_lowercase() == name)
            || self
                .identifier_suffixes
                .iter()
                .any(|suffix| !suffix.is_empty() && name.ends_with(&suffix.to_lowercase()))
    }

    fn is_ordinal_word(&self, value: &str) -> bool {
        let value = value.trim();
        self.ordinal_words.iter().any(|w| w.eq_ignore_ascii_case(value))
    }
}

/// Which rule produced a guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeuristicRule {
    TwoDistinctValues,
    IdentifierName,
    OrdinalWords,
    LowCardinalityText,
    AllDistinctTokens,
    LongText,
    DiscreteNumeric,
    ContinuousNumeric,
    Fallback,
}

impl HeuristicRule {
    pub fn describe(&self) -> &'static str {
        match self {
            HeuristicRule::TwoDistinctValues => "exactly two distinct values",
            HeuristicRule::IdentifierName => "column name marks an identifier",
            HeuristicRule::OrdinalWords => "values come from a ranked word scale",
            HeuristicRule::LowCardinalityText => "few distinct text values",
            HeuristicRule::AllDistinctTokens => "nearly every value is a distinct single token",
            HeuristicRule::LongText => "many distinct long values",
            HeuristicRule::DiscreteNumeric => "few distinct numbers",
            HeuristicRule::ContinuousNumeric => "many distinct numbers",
            HeuristicRule::Fallback => "no rule matched",
        }
    }
}

/// Heuristic type proposal. Carries no confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeuristicGuess {
    pub semantic_type: SemanticType,
    pub rule: HeuristicRule,
    /// Set when the rules cannot separate ordinal from categorical.
    pub needs_refinement: bool,
}

impl HeuristicGuess {
    fn new(semantic_type: SemanticType, rule: HeuristicRule) -> Self {
        Self {
            semantic_type,
            rule,
            needs_refinement: false,
        }
    }
}

/// Deterministic first-match-wins classifier over column statistics.
#[derive(Debug, Clone, Default)]
pub struct HeuristicDetector {
    config: HeuristicConfig,
}

impl HeuristicDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: HeuristicConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HeuristicConfig {
        &self.config
    }

    /// Propose a semantic type from the statistics alone.
    pub fn detect(&self, kind: ElementaryKind, stats: &ColumnStatistics) -> HeuristicGuess {
        self.guess(None, kind, stats)
    }

    /// Like [`detect`](Self::detect), but a name such as `id` or `order_id`
    /// marks an identifier whatever the values look like. Two distinct
    /// values still make a binary column.
    pub fn detect_named(&self, name: &str, kind: ElementaryKind, stats: &ColumnStatistics) -> HeuristicGuess {
        self.guess(Some(name), kind, stats)
    }

    fn guess(&self, name: Option<&str>, kind: ElementaryKind, stats: &ColumnStatistics) -> HeuristicGuess {
        let cfg = &self.config;
        let unique = stats.unique_count();

        if unique == 2 {
            return HeuristicGuess::new(SemanticType::Binary, HeuristicRule::TwoDistinctValues);
        }
        if name.is_some_and(|n| cfg.is_identifier_name(n)) {
            return HeuristicGuess::new(SemanticType::Identifier, HeuristicRule::IdentifierName);
        }

        let Some(ratio) = stats.distinct_ratio() else {
            return HeuristicGuess {
                semantic_type: SemanticType::Categorical,
                rule: HeuristicRule::Fallback,
                needs_refinement: true,
            };
        };

        match kind {
            ElementaryKind::Categorical => {
                let (mean_words, mean_length) = stats
                    .as_categorical()
                    .map(|c| {
                        (
                            c.mean_word_count.unwrap_or(0.0),
                            c.mean_length.unwrap_or(0.0),
                        )
                    })
                    .unwrap_or((0.0, 0.0));
                let all_distinct = ratio >= cfg.identifier_min_ratio;

                if self.uses_ordinal_words(stats) {
                    return HeuristicGuess::new(SemanticType::Ordinal, HeuristicRule::OrdinalWords);
                }
                if unique <= cfg.categorical_max_unique && !all_distinct {
                    return HeuristicGuess::new(
                        SemanticType::Categorical,
                        HeuristicRule::LowCardinalityText,
                    );
                }
                if all_distinct && mean_words <= 1.0 {
                    return HeuristicGuess::new(
                        SemanticType::Identifier,
                        HeuristicRule::AllDistinctTokens,
                    );
                }
                let high_cardinality = unique > cfg.categorical_max_unique || all_distinct;
                let long_values = mean_words >= cfg.free_text_min_words
                    || mean_length >= cfg.free_text_min_length;
                if high_cardinality && long_values {
                    return HeuristicGuess::new(SemanticType::FreeText, HeuristicRule::LongText);
                }
            }
            ElementaryKind::Numeric => {
                if unique <= cfg.numeric_discrete_max_unique
                    && ratio <= cfg.numeric_discrete_max_ratio
                {
                    let compact = stats
                        .as_numeric()
                        .and_then(|n| Some(n.max? - n.min?))
                        .is_some_and(|range| range <= 2.0 * unique as f64);
                    let semantic_type = if compact {
                        SemanticType::Ordinal
                    } else {
                        SemanticType::Categorical
                    };
                    return HeuristicGuess {
                        semantic_type,
                        rule: HeuristicRule::DiscreteNumeric,
                        needs_refinement: true,
                    };
                }
                return HeuristicGuess::new(
                    SemanticType::Continuous,
                    HeuristicRule::ContinuousNumeric,
                );
            }
        }

        HeuristicGuess::new(SemanticType::Categorical, HeuristicRule::Fallback)
    }

    /// Every distinct value is a known scale word. Only decidable when the
    /// sample holds all distinct values.
    fn uses_ordinal_words(&self, stats: &ColumnStatistics) -> bool {
        let Some(c) = stats.as_categorical() else {
            return false;
        };
        c.unique_count > 0
            && c.sample_values.len() == c.unique_count
            && c.sample_values.iter().all(|v| match v {
                StatValue::Text(text) => self.config.is_ordinal_word(text),
                _ => false,
            })
    }
}
