//! Computational composite evaluator (PP3 / BP4).
//!
//! Each available predictor is normalised onto a 0–1 damaging scale and
//! combined with the weight table, renormalised over the predictors that
//! are actually present. Fewer predictors lower the confidence label;
//! they never raise the strength above supporting.
//!
//! The predictors score amino acid substitutions, so only missense variants
//! (or variants whose consequence is unknown) are scored.

use varclass_common::confidence::{coverage_ratio, weighted_mean};
use varclass_common::facts::FactBundle;
use varclass_common::{
    ConfidenceLabel, Consequence, Criterion, EvidenceCode, InputCoverage, Predictor, PredictorFacts, Strength, Variant,
};

use crate::normalise::normalise_predictor;
use crate::outcome::EvaluatorOutcome;
use crate::profile::EvaluationProfile;
use crate::weights::PredictorWeights;

/// Weighted mean of the normalised scores of the predictors present.
/// None when no predictor with a positive weight is available.
pub fn composite_score(facts: &PredictorFacts, weights: &PredictorWeights) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = Predictor::ALL
        .iter()
        .filter_map(|&p| facts.get(p).map(|v| (normalise_predictor(p, v), weights.get(p))))
        .collect();
    weighted_mean(&pairs)
}

fn confidence_for(present: usize, profile: &EvaluationProfile) -> ConfidenceLabel {
    let t = &profile.thresholds.composite;
    if present >= t.high_confidence_predictors {
        ConfidenceLabel::High
    } else if present >= t.min_predictors {
        ConfidenceLabel::Medium
    } else {
        ConfidenceLabel::Low
    }
}

pub fn evaluate(variant: &Variant, facts: &PredictorFacts, profile: &EvaluationProfile) -> EvaluatorOutcome {
    let expected = Predictor::ALL.len();
    let present = facts.scores.len();
    let coverage = InputCoverage::new(
        PredictorFacts::CATEGORY,
        present,
        expected,
        facts.sources().into_iter().collect(),
    );

    if let Some(other) = variant.effective_consequence().filter(|c| *c != Consequence::Missense) {
        return EvaluatorOutcome::silent(
            coverage,
            format!("missense predictors do not apply to {} variants", other.as_str()),
        );
    }

    let Some(score) = composite_score(facts, &profile.weights) else {
        return EvaluatorOutcome::silent(coverage, "no predictor scores available");
    };

    let t = &profile.thresholds.composite;
    let criterion = if score >= t.damaging {
        Criterion::PP3
    } else if score <= t.benign {
        Criterion::BP4
    } else {
        return EvaluatorOutcome::silent(
            coverage,
            format!("composite {:.3} between {} and {}", score, t.benign, t.damaging),
        );
    };

    let used: Vec<&str> = facts.scores.keys().map(|p| p.as_str()).collect();
    let rationale = format!(
        "composite in-silico score {:.3} from {}/{} predictors ({}), confidence factor {:.2}",
        score,
        present,
        expected,
        used.join(", "),
        coverage_ratio(present, expected),
    );
    let source = coverage.sources.join("+");

    match EvidenceCode::new(criterion, Strength::Supporting, confidence_for(present, profile), rationale, source) {
        Ok(code) => EvaluatorOutcome::emitted(code, coverage),
        Err(e) => EvaluatorOutcome::silent(coverage, e.to_string()),
    }
}
