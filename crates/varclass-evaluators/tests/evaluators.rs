//! Cross-evaluator behaviour through the public registry.

use std::collections::BTreeSet;

use pretty_assertions::assert_eq;
use varclass_common::{ConfidenceLabel, Criterion, FactSet, GuidelineVersion, Predictor, PredictorFacts, Strength};
use varclass_evaluators::{evaluate_all, EvaluationInput, EvaluationProfile, EvaluatorKind, PredictorWeights};
use varclass_test_utils::{gene_terms, observed, population, tp53_missense};

fn summarise(facts: &FactSet, seen: &BTreeSet<String>, profile: &EvaluationProfile) -> varclass_evaluators::EvaluationSummary {
    let variant = tp53_missense();
    evaluate_all(&EvaluationInput { variant: &variant, facts, observed_phenotypes: seen, profile })
}

#[test]
fn test_one_of_eight_predictors_never_upgrades_past_supporting() {
    let facts = FactSet {
        predictors: PredictorFacts::default().with(Predictor::AlphaMissense, 1.0, "alphamissense"),
        ..Default::default()
    };
    let summary = summarise(&facts, &BTreeSet::new(), &EvaluationProfile::default());
    let composite = summary.outcome(EvaluatorKind::Composite).unwrap();
    let code = composite.evidence.clone().unwrap();
    assert_eq!(code.criterion(), Criterion::PP3);
    assert_eq!(code.strength(), Strength::Supporting);
    assert_eq!(code.confidence(), ConfidenceLabel::Low);
    assert_eq!((composite.coverage.present, composite.coverage.expected), (1, 8));
}

#[test]
fn test_common_variant_emits_only_ba1() {
    let facts = FactSet { population: population(0.06, "gnomad"), ..Default::default() };
    let evidence = summarise(&facts, &BTreeSet::new(), &EvaluationProfile::default()).evidence();
    assert_eq!(evidence.len(), 1);
    assert_eq!(evidence[0].criterion(), Criterion::BA1);
    assert_eq!(evidence[0].strength(), Strength::StandAlone);
}

#[test]
fn test_phenotype_evaluator_reads_observed_terms() {
    let facts = FactSet {
        phenotype: gene_terms(&["HP:0100013", "HP:0003002", "HP:0002891"], "gene_phenotypes"),
        ..Default::default()
    };
    let seen = observed(&["HP:0100013", "HP:0003002", "HP:0002891"]);
    let evidence = summarise(&facts, &seen, &EvaluationProfile::default()).evidence();
    assert_eq!(evidence.iter().map(|c| c.criterion()).collect::<Vec<_>>(), vec![Criterion::PP4]);
}

#[test]
fn test_profile_loads_from_toml_with_partial_tables() {
    let profile: EvaluationProfile = toml::from_str(
        r#"
        version = "2023"

        [thresholds.composite]
        damaging = 0.7

        [weights]
        revel = 0.5
        "#,
    )
    .unwrap();
    assert_eq!(profile.version, GuidelineVersion::Acmg2023);
    assert_eq!(profile.thresholds.composite.damaging, 0.7);
    assert_eq!(profile.thresholds.composite.benign, 0.4);
    assert_eq!(profile.weights.revel, 0.5);
    assert_eq!(profile.weights.cadd_phred, PredictorWeights::default().cadd_phred);
}

#[test]
fn test_unknown_predictor_weight_is_rejected() {
    let parsed: Result<PredictorWeights, _> = toml::from_str("spliceai = 0.2\n");
    assert!(parsed.is_err());
}
