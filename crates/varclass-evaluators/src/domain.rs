//! Domain / hotspot evaluator (PM1 / PM4 / BP3).
//!
//! Missense residues in a hotspot or functional region give PM1. In-frame
//! indels change protein length (PM4) unless they sit in a repeat with no
//! known function, which gives BP3 instead. Other consequences are silent.

use varclass_common::facts::{FactBundle, ProteinRegion, RegionKind};
use varclass_common::{
    ConfidenceLabel, Consequence, Criterion, DomainFacts, EvidenceCode, InputCoverage, Strength, Variant,
};

use crate::outcome::EvaluatorOutcome;
use crate::profile::EvaluationProfile;

/// Regions containing the residue, hotspots first.
fn regions_at(gene: &str, position: u32, facts: &DomainFacts) -> Vec<ProteinRegion> {
    let hotspots = facts
        .hotspots
        .iter()
        .flat_map(|h| h.value.iter())
        .filter(|h| h.position == position)
        .map(|h| h.as_region(gene));
    let regions = facts
        .regions
        .iter()
        .flat_map(|r| r.value.iter())
        .filter(|r| r.contains(position))
        .cloned();
    hotspots.chain(regions).collect()
}

fn strongest(regions: &[ProteinRegion]) -> Option<&ProteinRegion> {
    regions
        .iter()
        .filter(|r| !r.kind.is_non_critical())
        .max_by(|a, b| a.tier.total_cmp(&b.tier))
}

fn source_of(facts: &DomainFacts, region: &ProteinRegion) -> String {
    let from = match region.kind {
        RegionKind::Hotspot => facts.hotspots.as_ref().map(|h| h.source.clone()),
        _ => facts.regions.as_ref().map(|r| r.source.clone()),
    };
    from.unwrap_or_default()
}

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

/// PM4 for a length-changing in-frame indel, BP3 when it falls in a
/// non-critical repeat and no functional region.
fn in_frame(variant: &Variant, consequence: Consequence, facts: &DomainFacts, coverage: InputCoverage) -> EvaluatorOutcome {
    let position = variant.amino_acid_position();
    let repeat = match (variant.gene.as_deref(), position) {
        (Some(gene), Some(position)) => {
            let hits = regions_at(gene, position, facts);
            match strongest(&hits) {
                Some(_) => None,
                None => hits.into_iter().find(|r| r.kind.is_non_critical()),
            }
        }
        _ => None,
    };

    if let Some(region) = repeat {
        let rationale = format!(
            "{} in non-critical {} {} ({}-{}) outside any functional region",
            consequence.as_str(),
            region.kind.as_str(),
            region.name,
            region.start,
            region.end,
        );
        let source = source_of(facts, &region);
        return emit(Criterion::BP3, Strength::Supporting, ConfidenceLabel::Medium, rationale, source, coverage);
    }

    let (confidence, detail) = match (position, facts.regions.is_some()) {
        (Some(_), true) => (ConfidenceLabel::Medium, "outside any repeat region"),
        _ => (ConfidenceLabel::Low, "repeat annotation unavailable"),
    };
    let rationale = format!("{} changes protein length, {}", consequence.as_str(), detail);
    emit(Criterion::PM4, Strength::Moderate, confidence, rationale, "consequence".to_string(), coverage)
}

pub fn evaluate(variant: &Variant, facts: &DomainFacts, profile: &EvaluationProfile) -> EvaluatorOutcome {
    let expected = DomainFacts::field_names().len();
    let coverage = InputCoverage::new(
        DomainFacts::CATEGORY,
        facts.populated_fields().len(),
        expected,
        facts.sources().into_iter().collect(),
    );

    match variant.effective_consequence() {
        Some(c @ (Consequence::InFrameDeletion | Consequence::InFrameInsertion)) => {
            return in_frame(variant, c, facts, coverage);
        }
        Some(Consequence::Missense) | None => {}
        Some(other) => {
            return EvaluatorOutcome::silent(coverage, format!("PM1 does not apply to {} variants", other.as_str()));
        }
    }

    let Some(gene) = variant.gene.as_deref() else {
        return EvaluatorOutcome::silent(coverage, "no gene symbol");
    };
    let Some(position) = variant.amino_acid_position() else {
        return EvaluatorOutcome::silent(coverage, "no protein position");
    };
    if facts.is_empty() {
        return EvaluatorOutcome::silent(coverage, format!("no region data for {}", gene));
    }

    let hits = regions_at(gene, position, facts);
    let t = &profile.thresholds.domain;

    if let Some(region) = strongest(&hits) {
        let strength = if region.tier >= t.moderate_min_tier {
            Some(Strength::Moderate)
        } else if region.tier >= t.supporting_min_tier {
            Some(Strength::Supporting)
        } else {
            None
        };
        if let Some(strength) = strength {
            let confidence = if region.tier >= t.moderate_min_tier {
                ConfidenceLabel::High
            } else {
                ConfidenceLabel::Medium
            };
            let rationale = format!(
                "residue {} lies in {} ({} {}-{}, tier {:.2})",
                position,
                region.name,
                region.kind.as_str(),
                region.start,
                region.end,
                region.tier,
            );
            return emit(Criterion::PM1, strength, confidence, rationale, source_of(facts, region), coverage);
        }
        return EvaluatorOutcome::silent(
            coverage,
            format!("{} tier {:.2} below PM1 cutoff {}", region.name, region.tier, t.supporting_min_tier),
        );
    }

    if let Some(region) = hits.iter().find(|r| r.kind.is_non_critical()) {
        return EvaluatorOutcome::silent(
            coverage,
            format!("residue {} lies only in non-critical {} {}", position, region.kind.as_str(), region.name),
        );
    }

    EvaluatorOutcome::silent(coverage, format!("residue {} outside annotated regions of {}", position, gene))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use varclass_common::Sourced;
    use varclass_test_utils::{bare_variant, brca1_frameshift, hotspot_at, in_frame_deletion, region, regions, tp53_missense};

    fn run(facts: &DomainFacts) -> EvaluatorOutcome {
        evaluate(&tp53_missense(), facts, &EvaluationProfile::default())
    }

    #[test]
    fn test_established_hotspot_gives_pm1_moderate() {
        let out = run(&hotspot_at(273, 120, 0.95, "cancerhotspots"));
        let code = out.evidence.unwrap();
        assert_eq!(code.criterion(), Criterion::PM1);
        assert_eq!(code.strength(), Strength::Moderate);
        assert_eq!(code.source(), "cancerhotspots");
    }

    #[test]
    fn test_functional_domain_gives_pm1_supporting() {
        let facts = regions(vec![region("DNA-binding", RegionKind::Domain, 102, 292, 0.80)], "uniprot");
        let code = run(&facts).evidence.unwrap();
        assert_eq!(code.criterion(), Criterion::PM1);
        assert_eq!(code.strength(), Strength::Supporting);
    }

    #[test]
    fn test_low_tier_hotspot_is_silent() {
        let out = run(&hotspot_at(273, 1, 0.50, "cancerhotspots"));
        assert!(out.evidence.is_none());
    }

    #[test]
    fn test_hotspot_elsewhere_in_gene_does_not_apply() {
        let out = run(&hotspot_at(175, 300, 0.95, "cancerhotspots"));
        assert!(out.evidence.is_none());
    }

    #[test]
    fn test_in_frame_deletion_in_repeat_gives_bp3() {
        let facts = regions(vec![region("Poly-Gln", RegionKind::CompositionalBias, 100, 140, 0.20)], "uniprot");
        let variant = in_frame_deletion("HTT", "p.Gln120del");
        let code = evaluate(&variant, &facts, &EvaluationProfile::default()).evidence.unwrap();
        assert_eq!(code.criterion(), Criterion::BP3);
        assert_eq!(code.source(), "uniprot");
    }

    #[test]
    fn test_in_frame_deletion_outside_repeat_gives_pm4() {
        let facts = regions(vec![region("Poly-Gln", RegionKind::CompositionalBias, 10, 40, 0.20)], "uniprot");
        let variant = in_frame_deletion("HTT", "p.Gln120del");
        let code = evaluate(&variant, &facts, &EvaluationProfile::default()).evidence.unwrap();
        assert_eq!(code.criterion(), Criterion::PM4);
        assert_eq!(code.strength(), Strength::Moderate);
        assert_eq!(code.confidence(), ConfidenceLabel::Medium);

        let blind = evaluate(&variant, &DomainFacts::default(), &EvaluationProfile::default()).evidence.unwrap();
        assert_eq!(blind.criterion(), Criterion::PM4);
        assert_eq!(blind.confidence(), ConfidenceLabel::Low);
    }

    #[test]
    fn test_missense_in_repeat_is_silent() {
        let facts = regions(vec![region("Poly-Pro", RegionKind::CompositionalBias, 260, 280, 0.20)], "uniprot");
        assert!(run(&facts).evidence.is_none());
    }

    #[test]
    fn test_non_missense_at_hotspot_is_silent() {
        let facts = hotspot_at(273, 120, 0.95, "cancerhotspots");
        let synonymous = tp53_missense().with_consequence(Consequence::Synonymous);
        assert!(evaluate(&synonymous, &facts, &EvaluationProfile::default()).evidence.is_none());

        let hotspot = hotspot_at(1756, 40, 0.95, "cancerhotspots");
        let out = evaluate(&brca1_frameshift(), &hotspot, &EvaluationProfile::default());
        assert!(out.evidence.is_none());
        assert!(out.note.unwrap().contains("frameshift"));
    }

    #[test]
    fn test_critical_region_outranks_overlapping_repeat() {
        let facts = regions(
            vec![
                region("Repeat 1", RegionKind::Repeat, 270, 276, 0.20),
                region("DNA-binding", RegionKind::Domain, 102, 292, 0.80),
            ],
            "uniprot",
        );
        assert_eq!(run(&facts).evidence.map(|c| c.criterion()), Some(Criterion::PM1));
    }

    #[test]
    fn test_highest_tier_wins_across_sources() {
        let mut facts = regions(vec![region("DNA-binding", RegionKind::Domain, 102, 292, 0.80)], "uniprot");
        facts.hotspots = hotspot_at(273, 50, 0.95, "cancerhotspots").hotspots;
        let code = run(&facts).evidence.unwrap();
        assert_eq!(code.strength(), Strength::Moderate);
        assert_eq!(code.source(), "cancerhotspots");
        assert_eq!(run(&facts).coverage.present, 2);
    }

    #[test]
    fn test_missing_gene_or_data_is_silent() {
        let facts = hotspot_at(273, 120, 0.95, "cancerhotspots");
        assert!(evaluate(&bare_variant(), &facts, &EvaluationProfile::default()).evidence.is_none());

        let empty = DomainFacts { hotspots: Some(Sourced::new(Vec::new(), "cancerhotspots")), regions: None };
        assert!(run(&empty).evidence.is_none());
        assert!(run(&DomainFacts::default()).evidence.is_none());
    }
}
