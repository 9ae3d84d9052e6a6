//! Statistics engine: descriptive summaries per column in a single pass.

use indexmap::{IndexMap, IndexSet};

use crate::schema::{
    CategoricalStatistics, CellValue, ColumnStatistics, ColumnValues, NumericStatistics,
    StatValue,
};

/// Default number of distinct sample values kept per column.
pub const DEFAULT_SAMPLE_SIZE: usize = 10;

// =============================================================================
// STREAMING STATISTICS
// =============================================================================
// Welford's online algorithm for computing mean and variance in a single pass.

/// Streaming accumulator for mean, variance and range.
#[derive(Debug, Clone)]
struct StreamingStats {
    count: usize,
    mean: f64,
    m2: f64, // Sum of squared differences from mean
    min: f64,
    max: f64,
}

impl StreamingStats {
    fn new() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            m2: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    fn add(&mut self, value: f64) {
        self.count += 1;

        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;

        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
    }

    fn mean(&self) -> Option<f64> {
        (self.count > 0).then_some(self.mean)
    }

    /// Sample standard deviation (n - 1 denominator).
    fn sample_std(&self) -> Option<f64> {
        (self.count > 1).then(|| (self.m2 / (self.count - 1) as f64).sqrt())
    }

    fn min(&self) -> Option<f64> {
        (self.count > 0).then_some(self.min)
    }

    fn max(&self) -> Option<f64> {
        (self.count > 0).then_some(self.max)
    }
}

/// Bit pattern used for distinct counting; `-0.0` and `0.0` collapse.
fn distinct_key(value: f64) -> u64 {
    if value == 0.0 { 0.0f64.to_bits() } else { value.to_bits() }
}

// =============================================================================
// ENGINE
// =============================================================================

/// Computes [`ColumnStatistics`] from typed column values.
///
/// Pure and deterministic: samples are the first distinct values in row order.
#[derive(Debug, Clone)]
pub struct StatisticsEngine {
    sample_size: usize,
}

impl StatisticsEngine {
    pub fn new() -> Self {
        Self {
            sample_size: DEFAULT_SAMPLE_SIZE,
        }
    }

    /// Bound the number of distinct sample values.
    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size;
        self
    }

    pub fn compute(&self, values: &ColumnValues) -> ColumnStatistics {
        match values {
            ColumnValues::Numeric(v) => ColumnStatistics::Numeric(self.numeric(v)),
            ColumnValues::Categorical(v) => ColumnStatistics::Categorical(self.categorical(v)),
        }
    }

    fn numeric(&self, values: &[Option<f64>]) -> NumericStatistics {
        let mut stats = StreamingStats::new();
        let mut distinct: IndexSet<u64> = IndexSet::new();
        let mut sample_values = Vec::new();

        // Non-finite values are counted as missing.
        for value in values.iter().flatten().filter(|v| v.is_finite()) {
            stats.add(*value);
            if distinct.insert(distinct_key(*value)) && sample_values.len() < self.sample_size {
                sample_values.push(StatValue::from_f64(*value));
            }
        }

        NumericStatistics {
            row_count: values.len(),
            missing_count: values.len() - stats.count,
            unique_count: distinct.len(),
            mean: stats.mean(),
            std: stats.sample_std(),
            min: stats.min(),
            max: stats.max(),
            sample_values,
        }
    }

    fn categorical(&self, values: &[Option<CellValue>]) -> CategoricalStatistics {
        let mut counts: IndexMap<&CellValue, usize> = IndexMap::new();
        let mut observed = 0usize;
        let mut total_length = 0usize;
        let mut total_words = 0usize;

        for value in values.iter().flatten() {
            observed += 1;
            *counts.entry(value).or_insert(0) += 1;

            let text = value.display_text();
            total_length += text.chars().count();
            total_words += text.split_whitespace().count();
        }

        // Strict comparison keeps the first-encountered value on ties.
        let mut most_frequent: Option<(&CellValue, usize)> = None;
        for (value, &count) in &counts {
            if most_frequent.is_none_or(|(_, best)| count > best) {
                most_frequent = Some((value, count));
            }
        }

        let sample_values = counts
            .keys()
            .take(self.sample_size)
            .map(|v| StatValue::from(*v))
            .collect();

        let mean_of = |total: usize| (observed > 0).then(|| total as f64 / observed as f64);

        CategoricalStatistics {
            row_count: values.len(),
            missing_count: values.len() - observed,
            unique_count: counts.len(),
            most_frequent_value: most_frequent.map(|(v, _)| StatValue::from(v)),
            most_frequent_frequency: most_frequent.map(|(_, c)| c).unwrap_or(0),
            sample_values,
            mean_length: mean_of(total_length),
            mean_word_count: mean_of(total_words),
        }
    }
}

impl Default for StatisticsEngine {
    fn default() -> Self {
        Self::new()
    }
}
