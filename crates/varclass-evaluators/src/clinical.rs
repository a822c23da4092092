//! Clinical evaluator (PVS1 / PS1 / PM5).
//!
//! Null variants in a loss-of-function intolerant gene give PVS1. Missense
//! variants are compared with pathogenic assertions at the same residue:
//! the same amino acid change gives PS1, a different one PM5.

use varclass_common::facts::{ClinicalAssertion, FactBundle};
use varclass_common::hgvs::{parse_substitution, ProteinSubstitution};
use varclass_common::{
    ClinicalFacts, ConfidenceLabel, Consequence, Criterion, EvidenceCode, InputCoverage, Strength, Variant,
};

use crate::outcome::EvaluatorOutcome;
use crate::profile::EvaluationProfile;

fn emit(
    criterion: Criterion,
    strength: Strength,
    confidence: ConfidenceLabel,
    rationale: String,
    source: String,
    coverage: InputCoverage,
) -> EvaluatorOutcome {
    match EvidenceCode::new(criterion, strength, confidence, rationale, source) {
        Ok(code) => EvaluatorOutcome::emitted(code, coverage),
        Err(e) => EvaluatorOutcome::silent(coverage, e.to_string()),
    }
}

fn null_variant(variant: &Variant, facts: &ClinicalFacts, profile: &EvaluationProfile, coverage: InputCoverage) -> EvaluatorOutcome {
    let Some(constraint) = facts.constraint.as_ref() else {
        return EvaluatorOutcome::silent(coverage, "no gene constraint data");
    };
    let t = &profile.thresholds.clinical;
    let c = constraint.value;
    let by_pli = c.pli.map(|v| v >= t.pvs1_min_pli);
    let by_loeuf = c.loeuf.map(|v| v <= t.pvs1_max_loeuf);

    let confidence = match (by_pli, by_loeuf) {
        (Some(true), Some(true)) => ConfidenceLabel::High,
        (Some(true), _) | (_, Some(true)) => ConfidenceLabel::Medium,
        _ => {
            return EvaluatorOutcome::silent(
                coverage,
                format!("gene tolerates loss of function (pLI {:?}, LOEUF {:?})", c.pli, c.loeuf),
            );
        }
    };

    let consequence = variant.effective_consequence().map(|c| c.as_str()).unwrap_or("null");
    let metric = |v: Option<f64>| v.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "n/a".to_string());
    let rationale = format!(
        "{} variant in a loss-of-function intolerant gene (pLI {}, LOEUF {})",
        consequence,
        metric(c.pli),
        metric(c.loeuf),
    );
    emit(Criterion::PVS1, Strength::VeryStrong, confidence, rationale, constraint.source.clone(), coverage)
}

fn confidence_for(stars: u8) -> ConfidenceLabel {
    match stars {
        s if s >= 3 => ConfidenceLabel::High,
        2 => ConfidenceLabel::Medium,
        _ => ConfidenceLabel::Low,
    }
}

/// Pathogenic assertions at the variant's residue, split into same and
/// different amino acid changes.
fn residue_matches<'a>(
    sub: &ProteinSubstitution,
    assertions: &'a [ClinicalAssertion],
    min_stars: u8,
) -> (Vec<&'a ClinicalAssertion>, Vec<&'a ClinicalAssertion>) {
    let mut same = Vec::new();
    let mut other = Vec::new();
    for a in assertions {
        if !a.significance.is_pathogenic() || a.review_stars < min_stars {
            continue;
        }
        let Some(asserted) = parse_substitution(&a.protein_change) else { continue };
        if asserted.position != sub.position || asserted.ref_aa != sub.ref_aa || asserted.alt_aa.is_none() {
            continue;
        }
        if asserted.alt_aa == sub.alt_aa {
            same.push(a);
        } else {
            other.push(a);
        }
    }
    (same, other)
}

fn residue(variant: &Variant, facts: &ClinicalFacts, profile: &EvaluationProfile, coverage: InputCoverage) -> EvaluatorOutcome {
    let Some(sub) = variant.hgvs_p.as_deref().and_then(parse_substitution).filter(|s| s.alt_aa.is_some()) else {
        return EvaluatorOutcome::silent(coverage, "no protein substitution to compare");
    };
    let Some(assertions) = facts.residue_assertions.as_ref() else {
        return EvaluatorOutcome::silent(coverage, "no clinical assertions at the residue");
    };

    let (same, other) = residue_matches(&sub, &assertions.value, profile.thresholds.clinical.min_review_stars);
    let (criterion, strength, matched) = if !same.is_empty() {
        (Criterion::PS1, Strength::Strong, same)
    } else if !other.is_empty() {
        (Criterion::PM5, Strength::Moderate, other)
    } else {
        return EvaluatorOutcome::silent(
            coverage,
            format!("no pathogenic assertion at {}{}", sub.ref_aa, sub.position),
        );
    };

    let stars = matched.iter().map(|a| a.review_stars).max().unwrap_or(0);
    let cited: Vec<String> = matched
        .iter()
        .map(|a| format!("{} {}", a.accession, a.protein_change))
        .collect();
    let rationale = match criterion {
        Criterion::PS1 => format!("same amino acid change reported pathogenic: {}", cited.join(", ")),
        _ => format!("different change at {}{} reported pathogenic: {}", sub.ref_aa, sub.position, cited.join(", ")),
    };
    emit(criterion, strength, confidence_for(stars), rationale, assertions.source.clone(), coverage)
}

pub fn evaluate(variant: &Variant, facts: &ClinicalFacts, profile: &EvaluationProfile) -> EvaluatorOutcome {
    let coverage = InputCoverage::new(
        ClinicalFacts::CATEGORY,
        facts.populated_fields().len(),
        ClinicalFacts::field_names().len(),
        facts.sources().into_iter().collect(),
    );

    if variant.is_null_variant() {
        return null_variant(variant, facts, profile, coverage);
    }
    match variant.effective_consequence() {
        Some(Consequence::Missense) | None => residue(variant, facts, profile, coverage),
        Some(other) => EvaluatorOutcome::silent(
            coverage,
            format!("no clinical criterion for {} variants", other.as_str()),
        ),
    }
}
