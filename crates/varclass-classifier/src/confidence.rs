//! Overall confidence label for a classification.

use varclass_common::confidence::{aggregate_confidence, contradiction_penalty};
use varclass_common::{ConfidenceLabel, EvidenceCode, InputCoverage};

const EVIDENCE_WEIGHT: f64 = 0.4;
const STRONG_WEIGHT: f64 = 0.3;
const COMPLETENESS_WEIGHT: f64 = 0.3;

/// Mean coverage ratio across the evaluators' inputs; zero when none reported.
pub fn completeness(coverage: &[InputCoverage]) -> f64 {
    if coverage.is_empty() {
        return 0.0;
    }
    coverage.iter().map(InputCoverage::ratio).sum::<f64>() / coverage.len() as f64
}

/// Confidence in [0, 1] from the scored evidence, the share of strong codes,
/// and how complete the underlying facts were. Conflicts needing review
/// take the contradiction penalty.
pub fn confidence_score(scored: &[EvidenceCode], coverage: &[InputCoverage], needs_review: bool) -> f64 {
    if scored.is_empty() {
        return 0.0;
    }
    let probabilities: Vec<f64> = scored.iter().map(|c| c.confidence().as_probability()).collect();
    let strong = scored.iter().filter(|c| c.strength().is_strong_or_above()).count();
    let strong_ratio = strong as f64 / scored.len() as f64;

    let score = EVIDENCE_WEIGHT * aggregate_confidence(&probabilities)
        + STRONG_WEIGHT * strong_ratio
        + COMPLETENESS_WEIGHT * completeness(coverage);
    if needs_review {
        contradiction_penalty(score)
    } else {
        score.clamp(0.0, 1.0)
    }
}

pub fn confidence_label(scored: &[EvidenceCode], coverage: &[InputCoverage], needs_review: bool) -> ConfidenceLabel {
    if scored.is_empty() {
        return ConfidenceLabel::VeryLow;
    }
    ConfidenceLabel::from_score(confidence_score(scored, coverage, needs_review))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use varclass_common::{Criterion, FactCategory};
    use varclass_test_utils::default_code;

    fn full() -> Vec<InputCoverage> {
        FactCategory::ALL.iter().map(|&c| InputCoverage::new(c, 2, 2, vec![])).collect()
    }

    fn empty() -> Vec<InputCoverage> {
        FactCategory::ALL.iter().map(|&c| InputCoverage::none(c, 2)).collect()
    }

    #[test]
    fn test_no_evidence_is_very_low() {
        assert_eq!(confidence_label(&[], &full(), false), ConfidenceLabel::VeryLow);
    }

    #[test]
    fn test_missing_data_lowers_confidence_independent_of_score() {
        let codes = vec![default_code(Criterion::PVS1), default_code(Criterion::PS3)];
        let complete = confidence_score(&codes, &full(), false);
        let sparse = confidence_score(&codes, &empty(), false);
        assert!(complete > sparse);
        assert_eq!(confidence_label(&codes, &full(), false), ConfidenceLabel::High);
    }

    #[test]
    fn test_review_flag_applies_penalty() {
        let codes = vec![default_code(Criterion::PS3), default_code(Criterion::BS3)];
        let plain = confidence_score(&codes, &full(), false);
        let flagged = confidence_score(&codes, &full(), true);
        assert!((flagged - plain * 0.7).abs() < 1e-9);
    }
}
