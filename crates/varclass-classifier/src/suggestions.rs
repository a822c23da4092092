//! Follow-up suggestions for results that need more evidence or review.

use varclass_common::{Criterion, EvidenceCode, EvidenceConflict, FactCategory, InputCoverage, Tier};

fn any_of(codes: &[EvidenceCode], criteria: &[Criterion]) -> bool {
    codes.iter().any(|c| criteria.contains(&c.criterion()))
}

fn missing(coverage: &[InputCoverage], category: FactCategory) -> bool {
    coverage
        .iter()
        .find(|c| c.category == category)
        .map(|c| c.present == 0)
        .unwrap_or(true)
}

/// Suggestions for uncertain or flagged results; empty otherwise.
pub fn suggestions(
    tier: Tier,
    evidence: &[EvidenceCode],
    coverage: &[InputCoverage],
    conflict: Option<&EvidenceConflict>,
) -> Vec<String> {
    let review = conflict.map(|c| c.needs_review()).unwrap_or(false);
    if tier != Tier::Uncertain && !review {
        return Vec::new();
    }

    let mut out = Vec::new();
    if review {
        out.push("Resolve the flagged evidence conflict by expert review before reporting".to_string());
    }
    if missing(coverage, FactCategory::Population) {
        out.push("Look up population frequency (gnomAD) for BA1/BS1/PM2".to_string());
    }
    if missing(coverage, FactCategory::Predictors) {
        out.push("Run in-silico predictors (REVEL, CADD, AlphaMissense) for PP3/BP4".to_string());
    }
    if missing(coverage, FactCategory::Clinical) {
        out.push("Check ClinVar assertions at this residue and gene constraint (PS1/PM5/PVS1)".to_string());
    }
    if !any_of(evidence, &[Criterion::PS3, Criterion::BS3]) {
        out.push("Check for well-established functional studies (PS3/BS3)".to_string());
    }
    if !any_of(evidence, &[Criterion::PP1, Criterion::BS4]) {
        out.push("Assess co-segregation with disease in affected family members (PP1/BS4)".to_string());
    }
    if !any_of(evidence, &[Criterion::PS2, Criterion::PM6]) {
        out.push("Confirm de novo status with parental testing (PS2/PM6)".to_string());
    }
    if !any_of(evidence, &[Criterion::PS4]) {
        out.push("Search case-control data for enrichment in affected individuals (PS4)".to_string());
    }
    out.push("Review the literature for published reports of this variant".to_string());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use varclass_test_utils::default_code;

    #[test]
    fn test_confident_results_carry_no_suggestions() {
        let evidence = vec![default_code(Criterion::PVS1), default_code(Criterion::PS3)];
        assert!(suggestions(Tier::Pathogenic, &evidence, &[], None).is_empty());
    }

    #[test]
    fn test_uncertain_without_data_suggests_lookups() {
        let out = suggestions(Tier::Uncertain, &[], &[], None);
        assert_eq!(out.len(), 8);
        assert!(out[2].contains("ClinVar"));
        assert!(out[0].contains("population frequency"));
        assert!(out.last().unwrap().contains("literature"));
    }

    #[test]
    fn test_present_criteria_are_not_suggested() {
        let evidence = vec![default_code(Criterion::PS3)];
        let coverage = vec![
            InputCoverage::new(FactCategory::Population, 1, 3, vec!["gnomad".into()]),
            InputCoverage::new(FactCategory::Predictors, 2, 8, vec!["myvariant".into()]),
        ];
        let out = suggestions(Tier::Uncertain, &evidence, &coverage, None);
        assert!(out.iter().all(|s| !s.contains("PS3/BS3")));
        assert!(out.iter().all(|s| !s.contains("gnomAD")));
        assert!(out[0].contains("ClinVar"));
        assert_eq!(out.len(), 5);
    }
}
