//! Per-column descriptive statistics.

use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::column::CellValue;
use super::types::ElementaryKind;

/// A scalar carried by statistics into prompts and exports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum StatValue {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Text(String),
    Timestamp(DateTime<FixedOffset>),
    /// Arbitrary-precision number kept as its textual form.
    Decimal(String),
}

impl StatValue {
    /// Represent a float as an integer when it is integral and exactly representable.
    pub fn from_f64(value: f64) -> Self {
        const EXACT: f64 = 9_007_199_254_740_992.0; // 2^53
        if value.is_finite() && value.fract() == 0.0 && value.abs() <= EXACT {
            StatValue::Integer(value as i64)
        } else {
            StatValue::Float(value)
        }
    }

    /// Name of the variant, used in coercion errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            StatValue::Integer(_) => "integer",
            StatValue::Float(_) => "float",
            StatValue::Boolean(_) => "boolean",
            StatValue::Text(_) => "text",
            StatValue::Timestamp(_) => "timestamp",
            StatValue::Decimal(_) => "decimal",
        }
    }
}

impl From<&CellValue> for StatValue {
    fn from(cell: &CellValue) -> Self {
        match cell {
            CellValue::Text(s) => StatValue::Text(s.clone()),
            CellValue::Boolean(b) => StatValue::Boolean(*b),
            CellValue::Timestamp(ts) => StatValue::Timestamp(*ts),
        }
    }
}

impl fmt::Display for StatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatValue::Integer(i) => write!(f, "{}", i),
            StatValue::Float(x) => write!(f, "{}", x),
            StatValue::Boolean(b) => write!(f, "{}", b),
            StatValue::Text(s) => f.write_str(s),
            StatValue::Timestamp(ts) => f.write_str(&ts.to_rfc3339()),
            StatValue::Decimal(s) => f.write_str(s),
        }
    }
}

/// Statistics for numeric columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericStatistics {
    /// Total rows, missing included.
    pub row_count: usize,
    pub missing_count: usize,
    pub unique_count: usize,
    pub mean: Option<f64>,
    /// Sample standard deviation; `None` below two observations.
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// First-seen distinct values, bounded.
    #[serde(default)]
    pub sample_values: Vec<StatValue>,
}

/// Statistics for categorical-like columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalStatistics {
    /// Total rows, missing included.
    pub row_count: usize,
    pub missing_count: usize,
    pub unique_count: usize,
    /// Highest count; ties go to the value seen first.
    pub most_frequent_value: Option<StatValue>,
    pub most_frequent_frequency: usize,
    /// First-seen distinct values, bounded.
    #[serde(default)]
    pub sample_values: Vec<StatValue>,
    /// Mean character length of non-missing values.
    pub mean_length: Option<f64>,
    /// Mean whitespace-separated word count of non-missing values.
    pub mean_word_count: Option<f64>,
}

/// Statistics computed for a column, by elementary kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnStatistics {
    Numeric(NumericStatistics),
    Categorical(CategoricalStatistics),
}

impl ColumnStatistics {
    pub fn kind(&self) -> ElementaryKind {
        match self {
            ColumnStatistics::Numeric(_) => ElementaryKind::Numeric,
            ColumnStatistics::Categorical(_) => ElementaryKind::Categorical,
        }
    }

    pub fn row_count(&self) -> usize {
        match self {
            ColumnStatistics::Numeric(s) => s.row_count,
            ColumnStatistics::Categorical(s) => s.row_count,
        }
    }

    pub fn missing_count(&self) -> usize {
        match self {
            ColumnStatistics::Numeric(s) => s.missing_count,
            ColumnStatistics::Categorical(s) => s.missing_count,
        }
    }

    pub fn unique_count(&self) -> usize {
        match self {
            ColumnStatistics::Numeric(s) => s.unique_count,
            ColumnStatistics::Categorical(s) => s.unique_count,
        }
    }

    /// Rows with an observed value.
    pub fn non_missing_count(&self) -> usize {
        self.row_count().saturating_sub(self.missing_count())
    }

    /// Distinct values over observed values; `None` when nothing was observed.
    pub fn distinct_ratio(&self) -> Option<f64> {
        match self.non_missing_count() {
            0 => None,
            n => Some(self.unique_count() as f64 / n as f64),
        }
    }

    pub fn sample_values(&self) -> &[StatValue] {
        match self {
            ColumnStatistics::Numeric(s) => &s.sample_values,
            ColumnStatistics::Categorical(s) => &s.sample_values,
        }
    }

    pub fn as_numeric(&self) -> Option<&NumericStatistics> {
        match self {
            ColumnStatistics::Numeric(s) => Some(s),
            ColumnStatistics::Categorical(_) => None,
        }
    }

    pub fn as_categorical(&self) -> Option<&CategoricalStatistics> {
        match self {
            ColumnStatistics::Numeric(_) => None,
            ColumnStatistics::Categorical(s) => Some(s),
        }
    }

    /// One-line summary for prompts and terminal output.
    pub fn summary(&self) -> String {
        match self {
            ColumnStatistics::Numeric(s) => {
                let fmt_opt = |v: Option<f64>| match v {
                    Some(x) => format!("{:.2}", x),
                    None => "n/a".to_string(),
                };
                format!(
                    "missing={}, unique={}, mean={}, std={}, min={}, max={}",
                    s.missing_count,
                    s.unique_count,
                    fmt_opt(s.mean),
                    fmt_opt(s.std),
                    fmt_opt(s.min),
                    fmt_opt(s.max)
                )
            }
            ColumnStatistics::Categorical(s) => {
                let top = s
                    .most_frequent_value
                    .as_ref()
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "n/a".to_string());
                format!(
                    "missing={}, unique={}, most_frequent={} ({} times)",
                    s.missing_count, s.unique_count, top, s.most_frequent_frequency
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_f64_integral() {
        assert_eq!(StatValue::from_f64(18.0), StatValue::Integer(18));
        assert_eq!(StatValue::from_f64(-3.0), StatValue::Integer(-3));
        assert_eq!(StatValue::from_f64(2.5), StatValue::Float(2.5));
        assert!(matches!(StatValue::from_f64(f64::INFINITY), StatValue::Float(_)));
    }

    #[test]
    fn test_statistics_serde_round_trip_keeps_variant() {
        let stats = ColumnStatistics::Categorical(CategoricalStatistics {
            row_count: 5,
            missing_count: 0,
            unique_count: 2,
            most_frequent_value: Some(StatValue::Text("M".into())),
            most_frequent_frequency: 3,
            sample_values: vec![StatValue::Text("M".into()), StatValue::Text("F".into())],
            mean_length: Some(1.0),
            mean_word_count: Some(1.0),
        });
        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("\"kind\":\"categorical\""));
        let back: ColumnStatistics = serde_json::from_str(&json).unwrap();
        assert_eq!(back, stats);
    }

    #[test]
    fn test_distinct_ratio() {
        let stats = ColumnStatistics::Numeric(NumericStatistics {
            row_count: 4,
            missing_count: 2,
            unique_count: 1,
            mean: Some(1.0),
            std: Some(0.0),
            min: Some(1.0),
            max: Some(1.0),
            sample_values: vec![],
        });
        assert_eq!(stats.non_missing_count(), 2);
        assert_eq!(stats.distinct_ratio(), Some(0.5));
    }
}
