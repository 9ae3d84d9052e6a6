//! Fuzz target for column statistics.
//!
//! Arbitrary cell text must coerce and profile without panicking, and
//! the counts must stay consistent.

#![no_main]

use libfuzzer_sys::fuzz_target;
use metascribe::inference::StatisticsEngine;
use metascribe::schema::ColumnValues;

fuzz_target!(|cells: Vec<String>| {
    if cells.len() > 10_000 {
        return;
    }

    let values = ColumnValues::from_raw(cells.iter().map(String::as_str));
    let stats = StatisticsEngine::new().compute(&values);

    assert_eq!(stats.row_count(), cells.len());
    assert!(stats.missing_count() <= stats.row_count());
    assert!(stats.unique_count() <= stats.non_missing_count());
    if let Some(n) = stats.as_numeric() {
        if let (Some(min), Some(max)) = (n.min, n.max) {
            assert!(min <= max);
        }
    }
});
