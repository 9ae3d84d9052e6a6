//! Parsing of raw LLM replies.
//!
//! Models wrap their answers in prose, markdown fences and labels. The
//! parser digs the structured part out and never fails: a reply that cannot
//! be used becomes a [`TypeClassification::Fallback`] carrying the heuristic
//! guess and the reason.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::MetascribeError;
use crate::inference::HeuristicGuess;
use crate::schema::{ConfidenceScores, SemanticType};

/// Confidence assigned when a reply names a type but gives no usable score.
pub const NEUTRAL_CONFIDENCE: f64 = 0.5;

/// Score given to the heuristic type in a fallback score map.
pub const FALLBACK_SCORE: f64 = 0.9;

/// Why a classification fell back to the heuristic guess.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum FallbackReason {
    /// No JSON object or type token in the reply.
    NoStructuredReply,
    /// The reply named a type outside the canonical six.
    UnknownType(String),
    /// The provider call itself failed.
    ProviderError(String),
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FallbackReason::NoStructuredReply => write!(f, "no structured reply"),
            FallbackReason::UnknownType(t) => write!(f, "unknown type '{}'", t),
            FallbackReason::ProviderError(e) => write!(f, "provider error: {}", e),
        }
    }
}

/// Outcome of parsing a classification reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TypeClassification {
    Parsed {
        semantic_type: SemanticType,
        confidence: f64,
        scores: ConfidenceScores,
    },
    Fallback {
        semantic_type: SemanticType,
        reason: FallbackReason,
    },
}

impl TypeClassification {
    /// Fallback to the heuristic guess, with a warning.
    pub fn fallback(guess: &HeuristicGuess, reason: FallbackReason) -> Self {
        warn!(
            heuristic = %guess.semantic_type,
            %reason,
            "LLM classification unusable, keeping heuristic type"
        );
        TypeClassification::Fallback {
            semantic_type: guess.semantic_type,
            reason,
        }
    }

    /// Fallback for a failed provider call.
    pub fn from_provider_error(guess: &HeuristicGuess, err: &MetascribeError) -> Self {
        Self::fallback(guess, FallbackReason::ProviderError(err.to_string()))
    }

    pub fn semantic_type(&self) -> SemanticType {
        match self {
            TypeClassification::Parsed { semantic_type, .. } => *semantic_type,
            TypeClassification::Fallback { semantic_type, .. } => *semantic_type,
        }
    }

    /// Confidence of the chosen type; `None` means unparsed.
    pub fn confidence(&self) -> Option<f64> {
        match self {
            TypeClassification::Parsed { confidence, .. } => Some(*confidence),
            TypeClassification::Fallback { .. } => None,
        }
    }

    /// Score per type. A fallback scores its heuristic type at [`FALLBACK_SCORE`].
    pub fn scores(&self) -> ConfidenceScores {
        match self {
            TypeClassification::Parsed { scores, .. } => scores.clone(),
            TypeClassification::Fallback { semantic_type, .. } => {
                let mut scores = ConfidenceScores::new();
                scores.insert(*semantic_type, FALLBACK_SCORE);
                scores
            }
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, TypeClassification::Fallback { .. })
    }
}

// =============================================================================
// CLASSIFICATION
// =============================================================================

/// Extract a semantic type and confidences from a classification reply.
///
/// Accepted shapes, searched in every JSON object found in the text:
/// `{"type": t, "confidence": {t: s, ..}}`, `{"type": t, "confidence": s}`
/// and a bare score map `{t: s, ..}`.
pub fn parse_classification(raw: &str, guess: &HeuristicGuess) -> TypeClassification {
    let mut unknown: Option<String> = None;

    for candidate in json_objects(raw) {
        let Ok(Value::Object(map)) = serde_json::from_str::<Value>(candidate) else {
            continue;
        };
        match interpret_object(&map) {
            Interpretation::Classified(result) => return result,
            Interpretation::Unknown(name) => {
                unknown.get_or_insert(name);
            }
            Interpretation::NotAReply => {}
        }
    }

    // A bare type word is a usable answer too.
    let bare = raw.trim().trim_matches(|c: char| c == '"' || c == '\'' || c == '.' || c == '`');
    if unknown.is_none() && !bare.is_empty() && !bare.contains('{') {
        if let Some(semantic_type) = SemanticType::parse_lenient(bare) {
            let mut scores = ConfidenceScores::new();
            scores.insert(semantic_type, NEUTRAL_CONFIDENCE);
            return TypeClassification::Parsed {
                semantic_type,
                confidence: NEUTRAL_CONFIDENCE,
                scores,
            };
        }
    }

    let reason = match unknown {
        Some(name) => FallbackReason::UnknownType(name),
        None => FallbackReason::NoStructuredReply,
    };
    TypeClassification::fallback(guess, reason)
}

enum Interpretation {
    Classified(TypeClassification),
    Unknown(String),
    NotAReply,
}

fn interpret_object(map: &Map<String, Value>) -> Interpretation {
    if let Some(type_value) = map.get("type").or_else(|| map.get("semantic_type")) {
        let name = match type_value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let Some(semantic_type) = SemanticType::parse_lenient(&name) else {
            return Interpretation::Unknown(name);
        };

        let mut scores = match map.get("confidence").or_else(|| map.get("scores")) {
            Some(Value::Object(inner)) => score_map(inner),
            Some(single) => {
                let mut scores = ConfidenceScores::new();
                if let Some((x, percent)) = raw_score(single) {
                    scores.insert(semantic_type, unit_score(x, percent || x >= PERCENT_FLOOR));
                }
                scores
            }
            None => ConfidenceScores::new(),
        };

        let confidence = match scores.get(&semantic_type) {
            Some(s) => *s,
            None => {
                scores.insert(semantic_type, NEUTRAL_CONFIDENCE);
                NEUTRAL_CONFIDENCE
            }
        };
        scores.sort_keys();

        return Interpretation::Classified(TypeClassification::Parsed {
            semantic_type,
            confidence,
            scores,
        });
    }

    let scores = score_map(map);
    if scores.is_empty() {
        return Interpretation::NotAReply;
    }

    // Argmax; earlier canonical types win ties.
    let mut best: Option<(SemanticType, f64)> = None;
    for (t, s) in &scores {
        if best.is_none_or(|(_, b)| *s > b) {
            best = Some((*t, *s));
        }
    }
    match best {
        Some((semantic_type, confidence)) => Interpretation::Classified(TypeClassification::Parsed {
            semantic_type,
            confidence,
            scores,
        }),
        None => Interpretation::NotAReply,
    }
}

/// Scores keyed by recognized type names, in canonical type order.
///
/// The map is read on a 0-100 scale when any score carries `%` or reaches
/// [`PERCENT_FLOOR`]; otherwise scores are fractions and are clamped.
fn score_map(map: &Map<String, Value>) -> ConfidenceScores {
    let raw: Vec<(SemanticType, f64, bool)> = map
        .iter()
        .filter_map(|(key, value)| {
            let t = SemanticType::parse_lenient(key)?;
            let (x, percent) = raw_score(value)?;
            Some((t, x, percent))
        })
        .collect();
    let percent_scale = raw.iter().any(|&(_, x, percent)| percent || x >= PERCENT_FLOOR);

    let mut scores = ConfidenceScores::new();
    for (t, x, _) in raw {
        scores.entry(t).or_insert(unit_score(x, percent_scale));
    }
    scores.sort_keys();
    scores
}

/// Smallest score that can only be a percentage.
const PERCENT_FLOOR: f64 = 2.0;

/// A score as written, and whether it had a `%` sign.
fn raw_score(value: &Value) -> Option<(f64, bool)> {
    let (x, percent) = match value {
        Value::Number(n) => (n.as_f64()?, false),
        Value::String(s) => {
            let s = s.trim();
            match s.strip_suffix('%') {
                Some(digits) => (digits.trim().parse::<f64>().ok()?, true),
                None => (s.parse::<f64>().ok()?, false),
            }
        }
        _ => return None,
    };
    (!x.is_nan()).then_some((x, percent))
}

fn unit_score(x: f64, percent_scale: bool) -> f64 {
    let x = if percent_scale { x / 100.0 } else { x };
    x.clamp(0.0, 1.0)
}

/// Balanced `{...}` spans in `text`, in order of their opening brace.
///
/// Braces inside JSON strings are ignored. Nested objects are returned too,
/// after their parent, so a broken outer object can still yield an inner one.
fn json_objects(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();

    for (start, _) in text.match_indices('{') {
        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;

        for (offset, &b) in bytes[start..].iter().enumerate() {
            if in_string {
                match b {
                    _ if escaped => escaped = false,
                    b'\\' => escaped = true,
                    b'"' => in_string = false,
                    _ => {}
                }
                continue;
            }
            match b {
                b'"' => in_string = true,
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        spans.push(&text[start..start + offset + 1]);
                        break;
                    }
                }
                _ => {}
            }
        }
    }
    spans
}

// =============================================================================
// DESCRIPTION
// =============================================================================

/// A cleaned description reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Description {
    pub text: String,
    /// The reply was empty and a generic sentence was substituted.
    pub is_placeholder: bool,
}

/// Generic description used when no usable text is available.
pub fn placeholder_description(column: &str) -> String {
    format!("This column represents {} data in the dataset.", column)
}

static FENCE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*```[\w-]*\s*$").unwrap());
static HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s{0,3}#{1,6}\s+").unwrap());
static LEADING_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*[*_]{0,2}(?:column\s+)?(?:description|output|answer)[*_]{0,2}\s*:\s*[*_]{0,2}")
        .unwrap()
});
static EMPHASIS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\*\*|__)(.+?)(\*\*|__)").unwrap());

/// Clean up a description reply.
pub fn parse_description(raw: &str, column_name: &str) -> Description {
    let mut text = FENCE_LINE.replace_all(raw, "").into_owned();
    text = HEADING.replace_all(&text, "").into_owned();
    text = text.trim().to_string();

    loop {
        let stripped = LEADING_LABEL.replace(&text, "").trim().to_string();
        let unquoted = strip_wrapping_quotes(&stripped).to_string();
        if unquoted == text {
            break;
        }
        text = unquoted;
    }
    text = EMPHASIS.replace_all(&text, "$2").trim().to_string();

    if text.is_empty() {
        return Description {
            text: placeholder_description(column_name),
            is_placeholder: true,
        };
    }
    Description {
        text,
        is_placeholder: false,
    }
}

fn strip_wrapping_quotes(text: &str) -> &str {
    const PAIRS: [(char, char); 4] = [('"', '"'), ('\'', '\''), ('\u{201c}', '\u{201d}'), ('`', '`')];
    for (open, close) in PAIRS {
        if let Some(inner) = text.strip_prefix(open).and_then(|t| t.strip_suffix(close)) {
            return inner.trim();
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::HeuristicRule;

    fn guess(t: SemanticType) -> HeuristicGuess {
        HeuristicGuess {
            semantic_type: t,
            rule: HeuristicRule::Fallback,
            needs_refinement: false,
        }
    }

    #[test]
    fn test_prose_before_json() {
        let raw = r#"Sure! {"type": "categorical", "confidence": {"categorical": 0.8, "ordinal": 0.2}}"#;
        let result = parse_classification(raw, &guess(SemanticType::Binary));

        assert_eq!(result.semantic_type(), SemanticType::Categorical);
        assert!((result.confidence().unwrap() - 0.8).abs() < 1e-9);
        assert_eq!(result.scores().get(&SemanticType::Ordinal), Some(&0.2));
    }

    #[test]
    fn test_scalar_confidence() {
        let raw = r#"{"type": "binary", "confidence": 0.9}"#;
        let result = parse_classification(raw, &guess(SemanticType::Categorical));
        assert_eq!(result.semantic_type(), SemanticType::Binary);
        assert!((result.confidence().unwrap() - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_bare_score_map_argmax() {
        let raw = "```json\n{\"binary\": 0.1, \"ordinal\": 0.7, \"categorical\": 0.7, \"free text\": 0.0}\n```";
        let result = parse_classification(raw, &guess(SemanticType::Identifier));
        // categorical precedes ordinal canonically
        assert_eq!(result.semantic_type(), SemanticType::Categorical);
        assert_eq!(result.confidence(), Some(0.7));
        let keys: Vec<_> = result.scores().keys().copied().collect();
        assert_eq!(
            keys,
            vec![
                SemanticType::Binary,
                SemanticType::Categorical,
                SemanticType::Ordinal,
                SemanticType::FreeText
            ]
        );
    }

    #[test]
    fn test_percentages_and_clamping() {
        let raw = r#"{"type": "continuous", "confidence": {"continuous": 85, "ordinal": "15%", "binary": -2, "identifier": 400}}"#;
        let result = parse_classification(raw, &guess(SemanticType::Categorical));
        let scores = result.scores();
        assert!((scores[&SemanticType::Continuous] - 0.85).abs() < 1e-9);
        assert!((scores[&SemanticType::Ordinal] - 0.15).abs() < 1e-9);
        assert_eq!(scores[&SemanticType::Binary], 0.0);
        assert_eq!(scores[&SemanticType::Identifier], 1.0);
    }

    #[test]
    fn test_slightly_high_fraction_is_clamped() {
        let raw = r#"{"type": "binary", "confidence": {"binary": 1.2, "categorical": 0.3}}"#;
        let result = parse_classification(raw, &guess(SemanticType::Categorical));
        assert_eq!(result.confidence(), Some(1.0));
        assert!((result.scores()[&SemanticType::Categorical] - 0.3).abs() < 1e-9);

        let raw = r#"{"type": "binary", "confidence": 1.5}"#;
        let result = parse_classification(raw, &guess(SemanticType::Categorical));
        assert_eq!(result.confidence(), Some(1.0));
    }

    #[test]
    fn test_percent_scale_applies_to_whole_map() {
        let raw = r#"{"type": "binary", "confidence": {"binary": 60, "categorical": 1}}"#;
        let result = parse_classification(raw, &guess(SemanticType::Categorical));
        assert!((result.confidence().unwrap() - 0.6).abs() < 1e-9);
        assert!((result.scores()[&SemanticType::Categorical] - 0.01).abs() < 1e-9);

        let raw = r#"{"type": "ordinal", "confidence": 85}"#;
        let result = parse_classification(raw, &guess(SemanticType::Categorical));
        assert!((result.confidence().unwrap() - 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_alias_type_names() {
        let raw = r#"{"type": "Free-Text", "confidence": 0.6}"#;
        let result = parse_classification(raw, &guess(SemanticType::Categorical));
        assert_eq!(result.semantic_type(), SemanticType::FreeText);
    }

    #[test]
    fn test_unknown_type_falls_back() {
        let raw = r#"{"type": "date", "confidence": 0.99}"#;
        let result = parse_classification(raw, &guess(SemanticType::Continuous));
        assert_eq!(
            result,
            TypeClassification::Fallback {
                semantic_type: SemanticType::Continuous,
                reason: FallbackReason::UnknownType("date".into()),
            }
        );
        assert_eq!(result.confidence(), None);
        assert_eq!(result.scores().get(&SemanticType::Continuous), Some(&FALLBACK_SCORE));
    }

    #[test]
    fn test_no_json_falls_back() {
        let result = parse_classification("I am not sure about this one.", &guess(SemanticType::Ordinal));
        assert!(result.is_fallback());
        assert_eq!(result.semantic_type(), SemanticType::Ordinal);
    }

    #[test]
    fn test_bare_type_word() {
        let result = parse_classification("identifier.", &guess(SemanticType::Categorical));
        assert_eq!(result.semantic_type(), SemanticType::Identifier);
        assert_eq!(result.confidence(), Some(NEUTRAL_CONFIDENCE));
    }

    #[test]
    fn test_braces_inside_strings() {
        let raw = r#"Note {"why": "looks like {a set}", "type": "ordinal", "confidence": 0.7} done"#;
        let result = parse_classification(raw, &guess(SemanticType::Binary));
        assert_eq!(result.semantic_type(), SemanticType::Ordinal);
    }

    #[test]
    fn test_broken_outer_object_uses_inner_map() {
        let raw = r#"{"type": "binary" "confidence": {"binary": 0.95, "categorical": 0.05}}"#;
        let result = parse_classification(raw, &guess(SemanticType::Continuous));
        assert_eq!(result.semantic_type(), SemanticType::Binary);
        assert_eq!(result.confidence(), Some(0.95));
    }

    #[test]
    fn test_missing_type_score_is_neutral() {
        let raw = r#"{"type": "binary", "confidence": {"categorical": 0.3}}"#;
        let result = parse_classification(raw, &guess(SemanticType::Continuous));
        assert_eq!(result.confidence(), Some(NEUTRAL_CONFIDENCE));
    }

    #[test]
    fn test_description_cleanup() {
        let d = parse_description("**Description:** \"The age of the patient in years.\"", "age");
        assert_eq!(d.text, "The age of the patient in years.");
        assert!(!d.is_placeholder);

        let d = parse_description("```\nOutput: The **total** order value.\n```", "total");
        assert_eq!(d.text, "The total order value.");

        let d = parse_description("## The customer's home region", "region");
        assert_eq!(d.text, "The customer's home region");
    }

    #[test]
    fn test_empty_description_placeholder() {
        let d = parse_description("  \"\"  ", "score");
        assert!(d.is_placeholder);
        assert_eq!(d.text, "This column represents score data in the dataset.");
    }

    #[test]
    fn test_json_objects_scanner() {
        let spans = json_objects(r#"a {"x": {"y": 1}} b {"z": "}"} {unclosed"#);
        assert_eq!(spans, vec![r#"{"x": {"y": 1}}"#, r#"{"y": 1}"#, r#"{"z": "}"}"#]);
    }
}
