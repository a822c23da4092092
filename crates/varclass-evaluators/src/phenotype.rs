//! Phenotype-similarity evaluator (PP4 / BP5).
//!
//! Similarity is an information-weighted Jaccard index between the gene's
//! associated terms and the subject's observed terms. Broad terms such as
//! "Phenotypic abnormality" and free-text tokens count for less than a
//! specific HPO identifier. Free text with an entry in the profile's synonym
//! table is mapped to its HPO id first, on both sides.

use std::collections::{BTreeMap, BTreeSet};

use varclass_common::facts::{normalise_phenotype_term, FactBundle};
use varclass_common::thresholds::PhenotypeThresholds;
use varclass_common::{ConfidenceLabel, Criterion, EvidenceCode, InputCoverage, PhenotypeFacts, Strength, Variant};

use crate::outcome::EvaluatorOutcome;
use crate::profile::EvaluationProfile;

/// Gene terms plus observed terms.
const EXPECTED_INPUTS: usize = 2;

fn term_weight(term: &str, t: &PhenotypeThresholds) -> f64 {
    if term.starts_with("TEXT:") || t.low_information_terms.iter().any(|l| l == term) {
        t.low_information_weight
    } else {
        1.0
    }
}

/// Normalise raw observations, dropping blanks.
pub fn normalise_observed<'a>(raw: impl IntoIterator<Item = &'a String>) -> BTreeSet<String> {
    raw.into_iter().filter_map(|t| normalise_phenotype_term(t)).collect()
}

/// Replace `TEXT:` tokens that have a synonym entry with the HPO id.
/// A plural token falls back to its singular ("seizures" → "seizure").
pub fn apply_synonyms(terms: &BTreeSet<String>, t: &PhenotypeThresholds) -> BTreeSet<String> {
    let table: BTreeMap<String, &str> = t
        .synonyms
        .iter()
        .filter_map(|(text, id)| normalise_phenotype_term(text).map(|token| (token, id.as_str())))
        .collect();
    terms
        .iter()
        .map(|term| {
            if !term.starts_with("TEXT:") {
                return term.clone();
            }
            let singular = term
                .strip_suffix('s')
                .filter(|_| !term.ends_with("ss"))
                .map(str::to_string);
            table
                .get(term)
                .or_else(|| singular.as_ref().and_then(|s| table.get(s)))
                .map(|id| id.trim().to_uppercase())
                .unwrap_or_else(|| term.clone())
        })
        .collect()
}

/// Weighted Jaccard similarity in [0, 1]; None for an empty union.
pub fn similarity(gene_terms: &BTreeSet<String>, observed: &BTreeSet<String>, t: &PhenotypeThresholds) -> Option<f64> {
    let union: f64 = gene_terms.union(observed).map(|term| term_weight(term, t)).sum();
    if union <= 0.0 {
        return None;
    }
    let shared: f64 = gene_terms.intersection(observed).map(|term| term_weight(term, t)).sum();
    Some(shared / union)
}

pub fn evaluate(
    _variant: &Variant,
    facts: &PhenotypeFacts,
    observed: &BTreeSet<String>,
    profile: &EvaluationProfile,
) -> EvaluatorOutcome {
    let t = &profile.thresholds.phenotype;
    let observed = apply_synonyms(&normalise_observed(observed), t);
    let present = usize::from(facts.gene_terms.is_some()) + usize::from(!observed.is_empty());
    let coverage = InputCoverage::new(
        PhenotypeFacts::CATEGORY,
        present,
        EXPECTED_INPUTS,
        facts.sources().into_iter().collect(),
    );

    let Some(sourced) = facts.gene_terms.as_ref() else {
        return EvaluatorOutcome::silent(coverage, "no gene-associated phenotypes");
    };
    if observed.is_empty() {
        return EvaluatorOutcome::silent(coverage, "no observed phenotypes supplied");
    }
    let gene_terms = apply_synonyms(&sourced.value, t);

    let distinct = gene_terms.union(&observed).count();
    if distinct < t.min_terms {
        return EvaluatorOutcome::silent(
            coverage,
            format!("{} distinct phenotype terms, need {}", distinct, t.min_terms),
        );
    }
    let Some(score) = similarity(&gene_terms, &observed, t) else {
        return EvaluatorOutcome::silent(coverage, "empty phenotype union");
    };

    let criterion = if score >= t.high_similarity {
        Criterion::PP4
    } else if score <= t.low_similarity {
        Criterion::BP5
    } else {
        return EvaluatorOutcome::silent(coverage, format!("phenotype similarity {:.2} inconclusive", score));
    };

    let shared = gene_terms.intersection(&observed).count();
    let confidence = if observed.iter().all(|o| o.starts_with("TEXT:")) {
        ConfidenceLabel::Low
    } else {
        ConfidenceLabel::Medium
    };
    let disease = facts
        .disease
        .as_ref()
        .map(|d| format!(" for {}", d.value))
        .unwrap_or_default();
    let rationale = format!(
        "phenotype similarity {:.2}{} ({} shared of {} distinct terms)",
        score, disease, shared, distinct,
    );

    match EvidenceCode::new(criterion, Strength::Supporting, confidence, rationale, sourced.source.clone()) {
        Ok(code) => EvaluatorOutcome::emitted(code, coverage),
        Err(e) => EvaluatorOutcome::silent(coverage, e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use varclass_test_utils::{gene_terms, observed, tp53_missense};

    fn run(gene: &[&str], seen: &[&str]) -> EvaluatorOutcome {
        evaluate(&tp53_missense(), &gene_terms(gene, "hpo"), &observed(seen), &EvaluationProfile::default())
    }

    #[test]
    fn test_matching_profile_gives_pp4() {
        let terms = ["HP:0002664", "HP:0100013", "HP:0003002", "HP:0002891"];
        let code = run(&terms, &["hp:0100013", "HP:0003002", "HP:0002891"]).evidence.unwrap();
        // Only the low-information neoplasm term is unmatched.
        assert_eq!(code.criterion(), Criterion::PP4);
        assert_eq!(code.source(), "hpo");
    }

    #[test]
    fn test_disjoint_profile_gives_bp5() {
        let code = run(&["HP:0100013", "HP:0003002"], &["HP:0001250", "HP:0001263"]).evidence.unwrap();
        assert_eq!(code.criterion(), Criterion::BP5);
    }

    #[test]
    fn test_partial_overlap_is_silent() {
        let out = run(&["HP:0100013", "HP:0003002"], &["HP:0100013", "HP:0001250"]);
        assert!(out.evidence.is_none());
    }

    #[test]
    fn test_too_few_terms_is_silent() {
        let out = run(&["HP:0100013"], &["HP:0100013"]);
        assert!(out.evidence.is_none());
        assert_eq!(out.coverage.present, 2);
    }

    #[test]
    fn test_low_information_terms_weigh_less() {
        let t = PhenotypeThresholds::default();
        let gene = observed(&["HP:0000118", "HP:0100013"]);
        let seen = observed(&["HP:0000118"]);
        let score = similarity(&gene, &seen, &t).unwrap();
        assert!((score - 0.3 / 1.3).abs() < 1e-9);
    }

    #[test]
    fn test_free_text_observations_are_tokenised() {
        let seen = observed(&["Breast carcinoma ", "  "]);
        let normalised = normalise_observed(&seen);
        assert_eq!(normalised, observed(&["TEXT:breast_carcinoma"]));
    }

    #[test]
    fn test_free_text_synonym_matches_hpo_gene_term() {
        let terms = ["HP:0003002", "HP:0100013", "HP:0002891"];
        let code = run(&terms, &["Breast cancer", "HP:0100013", "HP:0002891"]).evidence.unwrap();
        assert_eq!(code.criterion(), Criterion::PP4);
        assert_eq!(code.confidence(), ConfidenceLabel::Medium);
    }

    #[test]
    fn test_synonyms_fall_back_to_singular() {
        let t = PhenotypeThresholds::default();
        let mapped = apply_synonyms(&observed(&["TEXT:seizures", "TEXT:abscess", "HP:0000118"]), &t);
        assert_eq!(mapped, observed(&["HP:0001250", "TEXT:abscess", "HP:0000118"]));
    }

    #[test]
    fn test_profile_synonyms_are_used() {
        let mut profile = EvaluationProfile::default();
        profile.thresholds.phenotype.synonyms.insert("li fraumeni tumour".into(), "HP:0002664".into());
        profile.thresholds.phenotype.synonyms.insert("small head".into(), " hp:0000252".into());
        let mapped = apply_synonyms(
            &observed(&["TEXT:li_fraumeni_tumours", "TEXT:small_head"]),
            &profile.thresholds.phenotype,
        );
        assert_eq!(mapped, observed(&["HP:0002664", "HP:0000252"]));
    }

    #[test]
    fn test_missing_inputs_are_silent() {
        let none = evaluate(
            &tp53_missense(),
            &PhenotypeFacts::default(),
            &observed(&["HP:0100013"]),
            &EvaluationProfile::default(),
        );
        assert!(none.evidence.is_none());
        assert_eq!(none.coverage.present, 1);

        let no_observed = run(&["HP:0100013", "HP:0003002", "HP:0002891"], &[]);
        assert!(no_observed.evidence.is_none());
    }
}
