//! Schema types for column values, statistics and semantic types.

mod column;
mod statistics;
mod types;

pub use column::{CellValue, ColumnValues};
pub use statistics::{CategoricalStatistics, ColumnStatistics, NumericStatistics, StatValue};
pub use types::{ConfidenceScores, ElementaryKind, SemanticType};
