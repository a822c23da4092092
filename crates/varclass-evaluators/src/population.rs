//! Population-frequency evaluator (BA1 / BS1 / PM2).
//!
//! The ladder is checked high-frequency-first, so exactly one of
//! stand-alone benign, strong benign, rarity or nothing is emitted.

use tracing::debug;
use varclass_common::facts::FactBundle;
use varclass_common::thresholds::FrequencyThresholds;
use varclass_common::{
    ConfidenceLabel, Criterion, EvidenceCode, GuidelineVersion, InputCoverage, PopulationFacts, Strength, Variant,
};

use crate::outcome::EvaluatorOutcome;
use crate::profile::EvaluationProfile;

/// Fields the evaluator reads; coverage is reported against these.
const KEY_FIELDS: usize = 3;

/// Allele numbers at or above these count as well-powered.
const WELL_POWERED_AN: u64 = 20_000;
const ADEQUATE_AN: u64 = 2_000;

/// Which rung of the ladder a frequency lands on.
pub fn ladder_step(frequency: f64, thresholds: &FrequencyThresholds, version: GuidelineVersion) -> Option<(Criterion, Strength)> {
    if frequency >= thresholds.ba1 {
        Some((Criterion::BA1, Strength::StandAlone))
    } else if frequency >= thresholds.bs1 {
        Some((Criterion::BS1, Strength::Strong))
    } else if frequency <= thresholds.pm2 {
        Some((Criterion::PM2, version.pm2_strength()))
    } else {
        None
    }
}

/// Confidence from the allele number behind the frequency, lowered one
/// step when the call carries quality filters.
fn frequency_confidence(facts: &PopulationFacts) -> ConfidenceLabel {
    let base = match facts.allele_number.as_ref().map(|s| s.value) {
        // Absent from the dataset: a rarity call, not a measurement
        Some(0) | None => ConfidenceLabel::Medium,
        Some(an) if an >= WELL_POWERED_AN => ConfidenceLabel::High,
        Some(an) if an >= ADEQUATE_AN => ConfidenceLabel::Medium,
        Some(_) => ConfidenceLabel::Low,
    };
    let filtered = facts.filters.as_ref().map(|f| !f.value.is_empty()).unwrap_or(false);
    if filtered {
        match base {
            ConfidenceLabel::High => ConfidenceLabel::Medium,
            ConfidenceLabel::Medium => ConfidenceLabel::Low,
            _ => ConfidenceLabel::VeryLow,
        }
    } else {
        base
    }
}

fn coverage(facts: &PopulationFacts) -> InputCoverage {
    let present = [
        facts.allele_frequency.is_some(),
        facts.allele_number.is_some(),
        facts.popmax_frequency.is_some(),
    ]
    .iter()
    .filter(|p| **p)
    .count();
    InputCoverage::new(
        PopulationFacts::CATEGORY,
        present,
        KEY_FIELDS,
        facts.sources().into_iter().collect(),
    )
}

pub fn evaluate(variant: &Variant, facts: &PopulationFacts, profile: &EvaluationProfile) -> EvaluatorOutcome {
    let coverage = coverage(facts);
    let Some(frequency) = facts.effective_frequency() else {
        return EvaluatorOutcome::silent(coverage, "no allele frequency available");
    };

    let gene = variant.gene.as_deref();
    let thresholds = profile.thresholds.population.for_gene(gene);
    let Some((criterion, strength)) = ladder_step(frequency, &thresholds, profile.version) else {
        debug!(variant = %variant.key(), frequency, "frequency between rarity and benign cutoffs");
        return EvaluatorOutcome::silent(
            coverage,
            format!("frequency {:.6} between PM2 ({}) and BS1 ({})", frequency, thresholds.pm2, thresholds.bs1),
        );
    };

    let cutoff = match criterion {
        Criterion::BA1 => format!(">= {}", thresholds.ba1),
        Criterion::BS1 => format!(">= {}", thresholds.bs1),
        _ => format!("<= {}", thresholds.pm2),
    };
    let scope = gene
        .filter(|g| profile.thresholds.population.genes.contains_key(*g))
        .map(|g| format!("{} threshold", g))
        .unwrap_or_else(|| "default threshold".to_string());
    let source = facts
        .allele_frequency
        .as_ref()
        .or(facts.popmax_frequency.as_ref())
        .map(|s| s.source.clone())
        .unwrap_or_default();
    let rationale = format!("population frequency {:.6} {} ({})", frequency, cutoff, scope);

    match EvidenceCode::new(criterion, strength, frequency_confidence(facts), rationale, source) {
        Ok(code) => EvaluatorOutcome::emitted(code, coverage),
        Err(e) => EvaluatorOutcome::silent(coverage, e.to_string()),
    }
}
