//! Typed column values, coerced once from raw cell text.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::input::DataTable;

use super::types::ElementaryKind;

/// A single non-numeric cell after boundary coercion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CellValue {
    Text(String),
    Boolean(bool),
    Timestamp(DateTime<FixedOffset>),
}

impl CellValue {
    /// Classify a trimmed, non-missing cell.
    pub fn from_text(text: &str) -> Self {
        if text.eq_ignore_ascii_case("true") {
            return CellValue::Boolean(true);
        }
        if text.eq_ignore_ascii_case("false") {
            return CellValue::Boolean(false);
        }
        if let Some(ts) = parse_timestamp(text) {
            return CellValue::Timestamp(ts);
        }
        CellValue::Text(text.to_string())
    }

    /// Text as it would appear in a prompt.
    pub fn display_text(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Boolean(b) => b.to_string(),
            CellValue::Timestamp(ts) => ts.to_rfc3339(),
        }
    }
}

/// The values of one column, split by elementary kind.
///
/// `None` marks a missing cell.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Numeric(Vec<Option<f64>>),
    Categorical(Vec<Option<CellValue>>),
}

impl ColumnValues {
    /// Coerce raw cell strings into typed values.
    ///
    /// A column is numeric when every non-missing cell parses as a number.
    /// Columns with no observed values are numeric as well.
    pub fn from_raw<'a>(raw: impl IntoIterator<Item = &'a str>) -> Self {
        let cells: Vec<Option<&str>> = raw
            .into_iter()
            .map(|v| {
                let trimmed = v.trim();
                if DataTable::is_null_value(trimmed) {
                    None
                } else {
                    Some(trimmed)
                }
            })
            .collect();

        let parsed: Option<Vec<Option<f64>>> = cells
            .iter()
            .map(|cell| match cell {
                None => Some(None),
                Some(text) => parse_number(text).map(Some),
            })
            .collect();

        match parsed {
            Some(numbers) => ColumnValues::Numeric(numbers),
            None => ColumnValues::Categorical(
                cells
                    .into_iter()
                    .map(|cell| cell.map(CellValue::from_text))
                    .collect(),
            ),
        }
    }

    /// Elementary kind of these values.
    pub fn kind(&self) -> ElementaryKind {
        match self {
            ColumnValues::Numeric(_) => ElementaryKind::Numeric,
            ColumnValues::Categorical(_) => ElementaryKind::Categorical,
        }
    }

    /// Number of rows, missing included.
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Numeric(v) => v.len(),
            ColumnValues::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Parse a numeric cell. Thousands separators are not accepted.
///
/// Only finite values count: `inf`, `infinity` and overflowing literals
/// such as `1e400` leave the cell textual.
fn parse_number(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Parse ISO-8601 style timestamps and plain dates.
fn parse_timestamp(text: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts);
    }
    let utc = FixedOffset::east_opt(0)?;
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return utc.from_local_datetime(&naive).single();
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        let naive = date.and_hms_opt(0, 0, 0)?;
        return utc.from_local_datetime(&naive).single();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_detection() {
        let values = ColumnValues::from_raw(["18", "25", "", "NA", "3.5"]);
        assert_eq!(values.kind(), ElementaryKind::Numeric);
        match values {
            ColumnValues::Numeric(v) => {
                assert_eq!(v, vec![Some(18.0), Some(25.0), None, None, Some(3.5)]);
            }
            _ => panic!("expected numeric"),
        }
    }

    #[test]
    fn test_mixed_column_is_categorical() {
        let values = ColumnValues::from_raw(["1", "two", "3"]);
        assert_eq!(values.kind(), ElementaryKind::Categorical);
    }

    #[test]
    fn test_all_missing_is_numeric() {
        let values = ColumnValues::from_raw(["", "NA", "null"]);
        assert_eq!(values, ColumnValues::Numeric(vec![None, None, None]));
    }

    #[test]
    fn test_nan_cell_counts_as_missing() {
        let values = ColumnValues::from_raw(["1", "NaN"]);
        assert_eq!(values, ColumnValues::Numeric(vec![Some(1.0), None]));
    }

    #[test]
    fn test_infinity_is_not_numeric() {
        let values = ColumnValues::from_raw(["1", "inf", "3"]);
        assert_eq!(values.kind(), ElementaryKind::Categorical);
        assert_eq!(ColumnValues::from_raw(["2", "-Infinity"]).kind(), ElementaryKind::Categorical);
        assert_eq!(ColumnValues::from_raw(["1e400"]).kind(), ElementaryKind::Categorical);
        assert_eq!(ColumnValues::from_raw(["1e300", "-2.5"]).kind(), ElementaryKind::Numeric);
    }

    #[test]
    fn test_cell_typing() {
        assert_eq!(CellValue::from_text("TRUE"), CellValue::Boolean(true));
        assert!(matches!(
            CellValue::from_text("2024-03-01"),
            CellValue::Timestamp(_)
        ));
        assert!(matches!(
            CellValue::from_text("2024-03-01T10:00:00+02:00"),
            CellValue::Timestamp(_)
        ));
        assert_eq!(
            CellValue::from_text("hello"),
            CellValue::Text("hello".to_string())
        );
    }

    #[test]
    fn test_hex_is_not_numeric() {
        let values = ColumnValues::from_raw(["0x1F", "0x20"]);
        assert_eq!(values.kind(), ElementaryKind::Categorical);
    }
}
