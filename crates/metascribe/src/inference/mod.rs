//! Column profiling: statistics and heuristic type detection.

mod heuristic;
mod statistics;

pub use heuristic::{HeuristicConfig, HeuristicDetector, HeuristicGuess, HeuristicRule};
pub use statistics::{DEFAULT_SAMPLE_SIZE, StatisticsEngine};
