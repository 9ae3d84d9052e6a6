//! Fuzz target for LLM reply parsing.
//!
//! Classification replies must always yield one of the six types with
//! scores in [0, 1]; description cleanup must never panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use metascribe::inference::{HeuristicGuess, HeuristicRule};
use metascribe::llm::{parse_classification, parse_description};
use metascribe::schema::SemanticType;

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };

    let guess = HeuristicGuess {
        semantic_type: SemanticType::Categorical,
        rule: HeuristicRule::Fallback,
        needs_refinement: true,
    };

    let classification = parse_classification(raw, &guess);
    assert!(SemanticType::ALL.contains(&classification.semantic_type()));
    for score in classification.scores().values() {
        assert!((0.0..=1.0).contains(score));
    }

    let description = parse_description(raw, "column");
    assert!(!description.text.trim().is_empty());
});
