//! Source-priority resolution of fact bundles.
//!
//! For each category the configured providers are consulted in order. Each
//! consultation checks the cache first; a miss calls the provider (with a
//! per-call timeout and bounded retries for transient failures), validates
//! the response and writes it through. Fields are merged first-source-wins
//! and the loop stops as soon as the category is complete.
//!
//! A permanent provider failure is remembered as an empty bundle for the
//! cache's short failure TTL, so the same dead lookup is not repeated on
//! every run. Transient failures are never remembered and are retried on
//! the next resolve.
//!
//! In cache-only mode a miss is reported as `offline` and no provider is
//! called.
//!
//! Categories are independent and resolve concurrently; providers within a
//! category are always consulted one after another.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use varclass_cache::{CacheKey, ValidatedCache};
use varclass_common::{CategoryFacts, FactCategory, FactSet, Variant};

use crate::client::ProviderClient;
use crate::error::FetchError;

/// Source tag used for facts supplied with the request.
pub const SEED_SOURCE: &str = "user";

// ── Policy ──────────────────────────────────────────────────────────────────

/// Timeout and retry bounds for provider calls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts per provider, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
    /// Linear backoff step; attempt `n` waits `n * backoff_ms`.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

fn default_max_attempts() -> u32 { 3 }
fn default_call_timeout_ms() -> u64 { 15_000 }
fn default_backoff_ms() -> u64 { 250 }

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            call_timeout_ms: default_call_timeout_ms(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

impl RetryPolicy {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn backoff_for(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.backoff_ms.saturating_mul(attempt as u64))
    }
}

/// Provider names per category, highest priority first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcePriority {
    #[serde(default = "default_population")]
    pub population: Vec<String>,
    #[serde(default = "default_predictors")]
    pub predictors: Vec<String>,
    #[serde(default = "default_domain")]
    pub domain: Vec<String>,
    #[serde(default = "default_phenotype")]
    pub phenotype: Vec<String>,
    #[serde(default = "default_clinical")]
    pub clinical: Vec<String>,
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn default_population() -> Vec<String> { names(&["gnomad", "myvariant"]) }
fn default_predictors() -> Vec<String> { names(&["myvariant", "alphamissense", "cadd"]) }
fn default_domain() -> Vec<String> { names(&["cancerhotspots", "uniprot"]) }
fn default_phenotype() -> Vec<String> { names(&["gene_phenotypes"]) }
fn default_clinical() -> Vec<String> { names(&["clinvar", "gnomad"]) }

impl Default for SourcePriority {
    fn default() -> Self {
        Self {
            population: default_population(),
            predictors: default_predictors(),
            domain: default_domain(),
            phenotype: default_phenotype(),
            clinical: default_clinical(),
        }
    }
}

impl SourcePriority {
    pub fn for_category(&self, category: FactCategory) -> &[String] {
        match category {
            FactCategory::Population => &self.population,
            FactCategory::Predictors => &self.predictors,
            FactCategory::Domain => &self.domain,
            FactCategory::Phenotype => &self.phenotype,
            FactCategory::Clinical => &self.clinical,
        }
    }

    pub fn set(&mut self, category: FactCategory, providers: Vec<String>) {
        match category {
            FactCategory::Population => self.population = providers,
            FactCategory::Predictors => self.predictors = providers,
            FactCategory::Domain => self.domain = providers,
            FactCategory::Phenotype => self.phenotype = providers,
            FactCategory::Clinical => self.clinical = providers,
        }
    }

    /// Every provider name referenced by any category.
    pub fn all_names(&self) -> impl Iterator<Item = &str> {
        FactCategory::ALL
            .into_iter()
            .flat_map(move |c| self.for_category(c).iter().map(String::as_str))
    }
}

// ── Report ──────────────────────────────────────────────────────────────────

/// What happened when one source was consulted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceStatus {
    Seeded,
    CacheHit,
    Fetched,
    Failed { transient: bool, message: String },
    /// The response arrived but failed validation; nothing was cached.
    Rejected { reason: String },
    /// Cache miss in cache-only mode; the provider was not called.
    Offline,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceAttempt {
    pub provider: String,
    #[serde(flatten)]
    pub status: SourceStatus,
    /// Provider calls made (0 for seeded facts and cache hits).
    pub attempts: u32,
    /// Fields this source contributed to the resolved bundle.
    pub filled: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryReport {
    pub category: FactCategory,
    pub sources: Vec<SourceAttempt>,
    pub complete: bool,
    pub missing: Vec<String>,
}

impl CategoryReport {
    fn new(category: FactCategory) -> Self {
        Self { category, sources: Vec::new(), complete: false, missing: Vec::new() }
    }

    fn finish(&mut self, facts: &CategoryFacts) {
        self.complete = facts.is_complete();
        let populated = facts.populated_fields();
        self.missing = CategoryFacts::empty(self.category)
            .field_names()
            .into_iter()
            .filter(|f| !populated.contains(f))
            .map(str::to_string)
            .collect();
    }

    pub fn provider_calls(&self) -> u32 {
        self.sources.iter().map(|s| s.attempts).sum()
    }

    pub fn cache_hits(&self) -> usize {
        self.sources.iter().filter(|s| s.status == SourceStatus::CacheHit).count()
    }
}

/// Per-category trace of one fetch, returned alongside the facts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchReport {
    pub categories: Vec<CategoryReport>,
}

impl FetchReport {
    pub fn for_category(&self, category: FactCategory) -> Option<&CategoryReport> {
        self.categories.iter().find(|c| c.category == category)
    }

    pub fn provider_calls(&self) -> u32 {
        self.categories.iter().map(CategoryReport::provider_calls).sum()
    }

    pub fn cache_hits(&self) -> usize {
        self.categories.iter().map(CategoryReport::cache_hits).sum()
    }

    pub fn failures(&self) -> usize {
        self.categories
            .iter()
            .flat_map(|c| &c.sources)
            .filter(|s| matches!(s.status, SourceStatus::Failed { .. } | SourceStatus::Rejected { .. }))
            .count()
    }
}

// ── Fetcher ─────────────────────────────────────────────────────────────────

struct Consultation {
    facts: Option<CategoryFacts>,
    status: SourceStatus,
    attempts: u32,
}

pub struct SourcePriorityFetcher {
    cache: Arc<ValidatedCache>,
    providers: HashMap<String, Arc<dyn ProviderClient>>,
    priority: SourcePriority,
    retry: RetryPolicy,
    cache_only: bool,
}

impl SourcePriorityFetcher {
    pub fn new(cache: Arc<ValidatedCache>) -> Self {
        Self {
            cache,
            providers: HashMap::new(),
            priority: SourcePriority::default(),
            retry: RetryPolicy::default(),
            cache_only: false,
        }
    }

    pub fn with_provider(mut self, provider: Arc<dyn ProviderClient>) -> Self {
        self.providers.insert(provider.name().to_string(), provider);
        self
    }

    pub fn with_providers(mut self, providers: impl IntoIterator<Item = Arc<dyn ProviderClient>>) -> Self {
        for p in providers {
            self.providers.insert(p.name().to_string(), p);
        }
        self
    }

    pub fn with_priority(mut self, priority: SourcePriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Serve registered providers from the cache only; a miss never calls out.
    pub fn cache_only(mut self) -> Self {
        self.cache_only = true;
        self
    }

    /// Resolve one category from providers alone.
    pub async fn resolve(&self, category: FactCategory, variant: &Variant) -> CategoryFacts {
        self.resolve_seeded(category, variant, None).await.0
    }

    /// Resolve one category, starting from request-supplied facts.
    /// Seeded fields rank above every provider.
    #[instrument(skip_all, fields(variant = %variant.key(), category = %category))]
    pub async fn resolve_seeded(
        &self,
        category: FactCategory,
        variant: &Variant,
        seed: Option<CategoryFacts>,
    ) -> (CategoryFacts, CategoryReport) {
        let mut acc = CategoryFacts::empty(category);
        let mut report = CategoryReport::new(category);

        if let Some(seed) = seed.filter(|s| s.category() == category && !s.populated_fields().is_empty()) {
            match seed.validate() {
                Ok(()) => {
                    let filled = acc.merge_missing(seed);
                    report.sources.push(SourceAttempt {
                        provider: SEED_SOURCE.to_string(),
                        status: SourceStatus::Seeded,
                        attempts: 0,
                        filled: filled.into_iter().map(str::to_string).collect(),
                    });
                }
                Err(e) => {
                    warn!(error = %e, "Ignoring invalid request-supplied facts");
                    report.sources.push(SourceAttempt {
                        provider: SEED_SOURCE.to_string(),
                        status: SourceStatus::Rejected { reason: e.to_string() },
                        attempts: 0,
                        filled: Vec::new(),
                    });
                }
            }
        }

        for name in self.priority.for_category(category) {
            if acc.is_complete() {
                debug!("All fields populated; remaining providers skipped");
                break;
            }
            let Some(provider) = self.providers.get(name) else {
                debug!(provider = %name, "Provider not registered");
                continue;
            };
            if !provider.supports(category) {
                continue;
            }

            let consultation = self.consult(provider.as_ref(), category, variant).await;
            let filled = consultation
                .facts
                .map(|f| acc.merge_missing(f))
                .unwrap_or_default();
            report.sources.push(SourceAttempt {
                provider: name.clone(),
                status: consultation.status,
                attempts: consultation.attempts,
                filled: filled.into_iter().map(str::to_string).collect(),
            });
        }

        report.finish(&acc);
        debug!(complete = report.complete, missing = report.missing.len(), "Category resolved");
        (acc, report)
    }

    /// Resolve every category concurrently.
    pub async fn resolve_all(&self, variant: &Variant, seed: &FactSet) -> (FactSet, FetchReport) {
        let (population, predictors, domain, phenotype, clinical) = tokio::join!(
            self.resolve_seeded(FactCategory::Population, variant, Some(seed.get(FactCategory::Population))),
            self.resolve_seeded(FactCategory::Predictors, variant, Some(seed.get(FactCategory::Predictors))),
            self.resolve_seeded(FactCategory::Domain, variant, Some(seed.get(FactCategory::Domain))),
            self.resolve_seeded(FactCategory::Phenotype, variant, Some(seed.get(FactCategory::Phenotype))),
            self.resolve_seeded(FactCategory::Clinical, variant, Some(seed.get(FactCategory::Clinical))),
        );

        let mut facts = FactSet::default();
        let mut report = FetchReport::default();
        for (bundle, category_report) in [population, predictors, domain, phenotype, clinical] {
            facts.set(bundle);
            report.categories.push(category_report);
        }
        info!(
            variant = %variant.key(),
            provider_calls = report.provider_calls(),
            cache_hits = report.cache_hits(),
            failures = report.failures(),
            "Facts resolved"
        );
        (facts, report)
    }

    async fn consult(&self, provider: &dyn ProviderClient, category: FactCategory, variant: &Variant) -> Consultation {
        let key = CacheKey::new(category, provider.name(), &variant.id(), provider.schema_version());

        if let Some(payload) = self.cache.get(&key).await {
            match serde_json::from_value::<CategoryFacts>(payload) {
                Ok(facts) if facts.category() == category => {
                    return Consultation { facts: Some(facts), status: SourceStatus::CacheHit, attempts: 0 };
                }
                _ => {
                    // Passed a foreign validator but is not a fact bundle here.
                    if let Err(e) = self.cache.invalidate(&key).await {
                        warn!(provider = provider.name(), category = %category, error = %e, "Could not drop foreign cache entry");
                    }
                }
            }
        }

        if self.cache_only {
            debug!(provider = provider.name(), "Cache miss in cache-only mode");
            return Consultation { facts: None, status: SourceStatus::Offline, attempts: 0 };
        }

        let (result, attempts) = self.call_with_retry(provider, category, variant).await;
        let facts = match result {
            Ok(facts) => facts,
            Err(e) => {
                warn!(provider = provider.name(), category = %category, attempts, error = %e, "Provider unavailable");
                if !e.is_transient() {
                    if let Err(e) = self.cache.put_negative(&key).await {
                        warn!(provider = provider.name(), error = %e, "Could not remember provider failure");
                    }
                }
                return Consultation {
                    facts: None,
                    status: SourceStatus::Failed { transient: e.is_transient(), message: e.message().to_string() },
                    attempts,
                };
            }
        };

        let verdict = if facts.category() != category {
            Err(format!("returned {} facts for a {} request", facts.category(), category))
        } else {
            facts.validate().map_err(|e| e.to_string())
        };
        if let Err(reason) = verdict {
            warn!(provider = provider.name(), category = %category, reason = %reason, "Discarding invalid provider response");
            return Consultation { facts: None, status: SourceStatus::Rejected { reason }, attempts };
        }

        match serde_json::to_value(&facts) {
            Ok(payload) => {
                if let Err(e) = self.cache.put_default(&key, &payload).await {
                    warn!(provider = provider.name(), error = %e, "Cache write failed");
                }
            }
            Err(e) => warn!(provider = provider.name(), error = %e, "Could not serialise facts for cache"),
        }

        Consultation { facts: Some(facts), status: SourceStatus::Fetched, attempts }
    }

    /// Call with a timeout, retrying transient failures with linear backoff.
    /// Returns the final outcome and the number of calls made.
    async fn call_with_retry(
        &self,
        provider: &dyn ProviderClient,
        category: FactCategory,
        variant: &Variant,
    ) -> (Result<CategoryFacts, FetchError>, u32) {
        let max_attempts = self.retry.max_attempts.max(1);
        let timeout = self.retry.call_timeout();
        let mut attempt = 0;
        loop {
            attempt += 1;
            let outcome = match tokio::time::timeout(timeout, provider.fetch(category, variant)).await {
                Ok(result) => result,
                Err(_) => Err(FetchError::Transient(format!(
                    "{} timed out after {} ms",
                    provider.name(),
                    timeout.as_millis()
                ))),
            };
            match outcome {
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    debug!(provider = provider.name(), attempt, error = %e, "Retrying provider");
                    tokio::time::sleep(self.retry.backoff_for(attempt)).await;
                }
                other => return (other, attempt),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_priority() {
        let p = SourcePriority::default();
        assert_eq!(p.for_category(FactCategory::Predictors), ["myvariant", "alphamissense", "cadd"]);
        assert_eq!(p.for_category(FactCategory::Population)[0], "gnomad");
        assert!(p.all_names().any(|n| n == "gene_phenotypes"));
        assert_eq!(p.for_category(FactCategory::Clinical), ["clinvar", "gnomad"]);
    }

    #[test]
    fn test_backoff_is_linear() {
        let r = RetryPolicy::default();
        assert_eq!(r.backoff_for(1), Duration::from_millis(250));
        assert_eq!(r.backoff_for(2), Duration::from_millis(500));
        assert_eq!(r.call_timeout(), Duration::from_secs(15));
    }

    #[test]
    fn test_partial_priority_table_keeps_defaults() {
        let p: SourcePriority = serde_json::from_str(r#"{ "predictors": ["cadd"] }"#).unwrap();
        assert_eq!(p.predictors, vec!["cadd"]);
        assert_eq!(p.population, default_population());
    }
}
