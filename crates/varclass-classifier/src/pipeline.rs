//! End-to-end run: resolve facts, evaluate, classify.

use std::collections::BTreeSet;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use varclass_common::{ClassificationResult, EvidenceCode, EvidenceOrigin, FactSet, Variant};
use varclass_evaluators::{evaluate_all, EvaluationInput, EvaluationProfile, EvaluationSummary};
use varclass_providers::{FetchReport, SourcePriorityFetcher};

use crate::classifier::Classifier;

/// Variants classified at once by `classify_batch` unless configured.
pub const DEFAULT_BATCH_CONCURRENCY: usize = 4;

/// One variant to classify, with whatever the caller already knows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationRequest {
    pub variant: Variant,
    /// Observed HPO identifiers or free-text phenotypes.
    #[serde(default)]
    pub phenotypes: BTreeSet<String>,
    /// Literature-reviewed codes from the interactive front end.
    #[serde(default)]
    pub evidence: Vec<EvidenceCode>,
    /// Pre-populated fact fields; outrank every provider.
    #[serde(default)]
    pub facts: FactSet,
}

impl ClassificationRequest {
    pub fn new(variant: Variant) -> Self {
        Self { variant, phenotypes: BTreeSet::new(), evidence: Vec::new(), facts: FactSet::default() }
    }

    pub fn with_phenotypes(mut self, terms: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.phenotypes.extend(terms.into_iter().map(Into::into));
        self
    }

    pub fn with_evidence(mut self, code: EvidenceCode) -> Self {
        self.evidence.push(code);
        self
    }

    pub fn with_facts(mut self, facts: FactSet) -> Self {
        self.facts = facts;
        self
    }
}

/// The result plus everything needed to trace how it was reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub variant: String,
    pub result: ClassificationResult,
    pub evaluations: EvaluationSummary,
    pub fetch: FetchReport,
}

pub struct ClassificationPipeline {
    fetcher: Arc<SourcePriorityFetcher>,
    profile: EvaluationProfile,
    classifier: Classifier,
    concurrency: usize,
}

impl ClassificationPipeline {
    pub fn new(fetcher: Arc<SourcePriorityFetcher>, profile: EvaluationProfile) -> Self {
        let classifier = Classifier::new(profile.version);
        Self { fetcher, profile, classifier, concurrency: DEFAULT_BATCH_CONCURRENCY }
    }

    /// At most `n` variants in flight during a batch; zero is treated as one.
    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    pub fn profile(&self) -> &EvaluationProfile {
        &self.profile
    }

    /// Classify one variant. Provider failures and missing data only lower
    /// evidence strength and confidence; this never fails.
    #[instrument(skip_all, fields(variant = %request.variant.key()))]
    pub async fn classify(&self, request: ClassificationRequest) -> ClassificationReport {
        let ClassificationRequest { variant, phenotypes, evidence, facts } = request;

        let (facts, fetch) = self.fetcher.resolve_all(&variant, &facts).await;
        let evaluations = evaluate_all(&EvaluationInput {
            variant: &variant,
            facts: &facts,
            observed_phenotypes: &phenotypes,
            profile: &self.profile,
        });

        let mut codes = evaluations.evidence();
        codes.extend(evidence.into_iter().map(|c| c.with_origin(EvidenceOrigin::Interactive)));
        let result = self.classifier.classify(codes, evaluations.coverage());

        info!(
            tier = %result.tier,
            points = result.total_points,
            confidence = result.confidence.as_str(),
            provider_calls = fetch.provider_calls(),
            cache_hits = fetch.cache_hits(),
            "classified"
        );
        ClassificationReport { variant: variant.key(), result, evaluations, fetch }
    }

    /// Classify many variants, at most `concurrency` at a time. Runs share
    /// only the cache. Reports come back in request order.
    pub async fn classify_batch(&self, requests: Vec<ClassificationRequest>) -> Vec<ClassificationReport> {
        info!(variants = requests.len(), concurrency = self.concurrency, "classifying batch");
        stream::iter(requests)
            .map(|r| self.classify(r))
            .buffered(self.concurrency)
            .collect()
            .await
    }
}
