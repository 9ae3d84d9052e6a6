//! Fuzz target for the data parser.
//!
//! The CSV/TSV parser must never panic on malformed input, whatever
//! delimiter it detects, and every parsed table must profile cleanly.

#![no_main]

use libfuzzer_sys::fuzz_target;
use metascribe::inference::{HeuristicDetector, StatisticsEngine};
use metascribe::input::Parser;

fuzz_target!(|data: &[u8]| {
    // Only process reasonable-sized inputs to avoid OOM
    if data.len() > 100_000 {
        return;
    }

    let Ok((table, _delimiter)) = Parser::new().parse_bytes(data) else {
        return;
    };

    let engine = StatisticsEngine::new();
    let detector = HeuristicDetector::new();
    for header in &table.headers {
        if let Ok(values) = table.typed_column(header) {
            let stats = engine.compute(&values);
            let _ = detector.detect(values.kind(), &stats);
        }
    }
});
