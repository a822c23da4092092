//! Evaluator registry: one pure function per evidence class.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;
use varclass_common::{EvidenceCode, FactCategory, FactSet, InputCoverage, Variant};

use crate::outcome::EvaluatorOutcome;
use crate::profile::EvaluationProfile;
use crate::{clinical, composite, domain, phenotype, population};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluatorKind {
    Population,
    Composite,
    Domain,
    Phenotype,
    Clinical,
}

impl EvaluatorKind {
    pub const ALL: [EvaluatorKind; 5] = [
        EvaluatorKind::Population,
        EvaluatorKind::Composite,
        EvaluatorKind::Domain,
        EvaluatorKind::Phenotype,
        EvaluatorKind::Clinical,
    ];

    /// Fact category the evaluator reads.
    pub fn category(&self) -> FactCategory {
        match self {
            EvaluatorKind::Population => FactCategory::Population,
            EvaluatorKind::Composite => FactCategory::Predictors,
            EvaluatorKind::Domain => FactCategory::Domain,
            EvaluatorKind::Phenotype => FactCategory::Phenotype,
            EvaluatorKind::Clinical => FactCategory::Clinical,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EvaluatorKind::Population => "population",
            EvaluatorKind::Composite => "composite",
            EvaluatorKind::Domain => "domain",
            EvaluatorKind::Phenotype => "phenotype",
            EvaluatorKind::Clinical => "clinical",
        }
    }
}

impl fmt::Display for EvaluatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything an evaluator may read. Borrowed for the length of one run.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationInput<'a> {
    pub variant: &'a Variant,
    pub facts: &'a FactSet,
    pub observed_phenotypes: &'a BTreeSet<String>,
    pub profile: &'a EvaluationProfile,
}

pub type EvaluatorFn = fn(&EvaluationInput<'_>) -> EvaluatorOutcome;

fn run_population(input: &EvaluationInput<'_>) -> EvaluatorOutcome {
    population::evaluate(input.variant, &input.facts.population, input.profile)
}

fn run_composite(input: &EvaluationInput<'_>) -> EvaluatorOutcome {
    composite::evaluate(input.variant, &input.facts.predictors, input.profile)
}

fn run_domain(input: &EvaluationInput<'_>) -> EvaluatorOutcome {
    domain::evaluate(input.variant, &input.facts.domain, input.profile)
}

fn run_phenotype(input: &EvaluationInput<'_>) -> EvaluatorOutcome {
    phenotype::evaluate(input.variant, &input.facts.phenotype, input.observed_phenotypes, input.profile)
}

fn run_clinical(input: &EvaluationInput<'_>) -> EvaluatorOutcome {
    clinical::evaluate(input.variant, &input.facts.clinical, input.profile)
}

/// The evaluators in a fixed order.
pub fn registry() -> [(EvaluatorKind, EvaluatorFn); 5] {
    [
        (EvaluatorKind::Population, run_population as EvaluatorFn),
        (EvaluatorKind::Composite, run_composite as EvaluatorFn),
        (EvaluatorKind::Domain, run_domain as EvaluatorFn),
        (EvaluatorKind::Phenotype, run_phenotype as EvaluatorFn),
        (EvaluatorKind::Clinical, run_clinical as EvaluatorFn),
    ]
}

/// Outcome of every registered evaluator for one variant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub outcomes: Vec<(EvaluatorKind, EvaluatorOutcome)>,
}

impl EvaluationSummary {
    pub fn evidence(&self) -> Vec<EvidenceCode> {
        self.outcomes.iter().filter_map(|(_, o)| o.evidence.clone()).collect()
    }

    pub fn coverage(&self) -> Vec<InputCoverage> {
        self.outcomes.iter().map(|(_, o)| o.coverage.clone()).collect()
    }

    pub fn outcome(&self, kind: EvaluatorKind) -> Option<&EvaluatorOutcome> {
        self.outcomes.iter().find(|(k, _)| *k == kind).map(|(_, o)| o)
    }
}

pub fn evaluate_all(input: &EvaluationInput<'_>) -> EvaluationSummary {
    let outcomes = registry()
        .into_iter()
        .map(|(kind, run)| {
            let outcome = run(input);
            debug!(
                variant = %input.variant.key(),
                evaluator = %kind,
                evidence = ?outcome.evidence.as_ref().map(|c| c.label()),
                note = outcome.note.as_deref().unwrap_or(""),
                "evaluator finished"
            );
            (kind, outcome)
        })
        .collect();
    EvaluationSummary { outcomes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use varclass_common::Criterion;
    use varclass_test_utils::{bare_variant, damaging_predictors, hotspot_at, population, tp53_missense};

    #[test]
    fn test_registry_covers_every_category_once() {
        let categories: BTreeSet<FactCategory> = registry().iter().map(|(k, _)| k.category()).collect();
        assert_eq!(categories.len(), FactCategory::ALL.len());
    }

    #[test]
    fn test_evaluate_all_collects_codes_and_coverage() {
        let facts = FactSet {
            population: population(0.00001, "gnomad"),
            predictors: damaging_predictors("myvariant"),
            domain: hotspot_at(273, 120, 0.95, "cancerhotspots"),
            ..Default::default()
        };
        let variant = tp53_missense();
        let observed = BTreeSet::new();
        let profile = EvaluationProfile::default();
        let summary = evaluate_all(&EvaluationInput {
            variant: &variant,
            facts: &facts,
            observed_phenotypes: &observed,
            profile: &profile,
        });

        let criteria: Vec<Criterion> = summary.evidence().iter().map(|c| c.criterion()).collect();
        assert_eq!(criteria, vec![Criterion::PM2, Criterion::PP3, Criterion::PM1]);
        assert_eq!(summary.coverage().len(), FactCategory::ALL.len());
        assert!(summary.outcome(EvaluatorKind::Phenotype).unwrap().evidence.is_none());
    }

    #[test]
    fn test_empty_facts_produce_no_evidence() {
        let variant = bare_variant();
        let facts = FactSet::default();
        let observed = BTreeSet::new();
        let profile = EvaluationProfile::default();
        let summary = evaluate_all(&EvaluationInput {
            variant: &variant,
            facts: &facts,
            observed_phenotypes: &observed,
            profile: &profile,
        });
        assert!(summary.evidence().is_empty());
        assert!(summary.coverage().iter().all(|c| c.present == 0));
    }
}
