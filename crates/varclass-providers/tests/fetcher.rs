//! Source-priority fetcher behaviour against mock providers and a real on-disk cache.

use std::sync::Arc;
use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use varclass_cache::ValidatedCache;
use varclass_common::facts::FactBundle;
use varclass_common::{CategoryFacts, FactCategory, FactSet, PopulationFacts, Predictor, PredictorFacts, Sourced};
use varclass_providers::{
    FetchError, MockProvider, ProviderClient, RetryPolicy, SourcePriority, SourcePriorityFetcher, SourceStatus,
};
use varclass_test_utils::{damaging_predictors, population, temp_cache, tp53_missense};

fn fast_retry() -> RetryPolicy {
    RetryPolicy { max_attempts: 3, call_timeout_ms: 200, backoff_ms: 5 }
}

fn priority(category: FactCategory, names: &[&str]) -> SourcePriority {
    let mut p = SourcePriority::default();
    p.set(category, names.iter().map(|s| s.to_string()).collect());
    p
}

fn fetcher(cache: ValidatedCache, providers: Vec<Arc<MockProvider>>, priority: SourcePriority) -> SourcePriorityFetcher {
    let mut f = SourcePriorityFetcher::new(Arc::new(cache))
        .with_priority(priority)
        .with_retry(fast_retry());
    for p in providers {
        f = f.with_provider(p as Arc<dyn ProviderClient>);
    }
    f
}

fn predictors_of(facts: CategoryFacts) -> PredictorFacts {
    match facts {
        CategoryFacts::Predictors(p) => p,
        other => panic!("expected predictors, got {:?}", other.category()),
    }
}

#[tokio::test]
async fn test_warm_cache_issues_no_provider_calls() {
    let (_dir, cache) = temp_cache();
    let a = Arc::new(MockProvider::new("a").with(CategoryFacts::Predictors(
        PredictorFacts::default().with(Predictor::Revel, 0.9, "a"),
    )));
    let f = fetcher(cache, vec![a.clone()], priority(FactCategory::Predictors, &["a"]));
    let v = tp53_missense();

    let first = f.resolve(FactCategory::Predictors, &v).await;
    assert_eq!(a.calls(), 1);

    let (second, report) = f.resolve_seeded(FactCategory::Predictors, &v, None).await;
    assert_eq!(a.calls(), 1);
    assert_eq!(first, second);
    assert_eq!(report.cache_hits(), 1);
    assert_eq!(report.provider_calls(), 0);
}

#[tokio::test]
async fn test_first_source_wins_per_field() {
    let (_dir, cache) = temp_cache();
    let a = Arc::new(MockProvider::new("a").with(CategoryFacts::Predictors(
        PredictorFacts::default().with(Predictor::Revel, 0.91, "a"),
    )));
    let b = Arc::new(MockProvider::new("b").with(CategoryFacts::Predictors(
        PredictorFacts::default()
            .with(Predictor::Revel, 0.12, "b")
            .with(Predictor::Sift, 0.01, "b"),
    )));
    let f = fetcher(cache, vec![a.clone(), b.clone()], priority(FactCategory::Predictors, &["a", "b"]));

    let (facts, report) = f.resolve_seeded(FactCategory::Predictors, &tp53_missense(), None).await;
    let p = predictors_of(facts);
    assert_eq!(p.get(Predictor::Revel), Some(0.91));
    assert_eq!(p.scores[&Predictor::Revel].source, "a");
    assert_eq!(p.get(Predictor::Sift), Some(0.01));
    assert_eq!(b.calls(), 1);
    assert_eq!(report.sources[1].filled, vec!["sift".to_string()]);
}

#[tokio::test]
async fn test_complete_bundle_stops_early() {
    let (_dir, cache) = temp_cache();
    let a = Arc::new(MockProvider::new("a").with(CategoryFacts::Predictors(damaging_predictors("a"))));
    let b = Arc::new(MockProvider::new("b").with_category(FactCategory::Predictors));
    let f = fetcher(cache, vec![a, b.clone()], priority(FactCategory::Predictors, &["a", "b"]));

    let (facts, report) = f.resolve_seeded(FactCategory::Predictors, &tp53_missense(), None).await;
    assert!(facts.is_complete());
    assert!(report.complete);
    assert_eq!(b.calls(), 0);
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let (_dir, cache) = temp_cache();
    let a = Arc::new(
        MockProvider::new("a")
            .with(CategoryFacts::Population(population(0.001, "a")))
            .with_failure(FetchError::Transient("503".into())),
    );
    let f = fetcher(cache, vec![a.clone()], priority(FactCategory::Population, &["a"]));

    let (facts, report) = f.resolve_seeded(FactCategory::Population, &tp53_missense(), None).await;
    assert_eq!(a.calls(), 2);
    assert_eq!(report.sources[0].status, SourceStatus::Fetched);
    assert_eq!(report.sources[0].attempts, 2);
    assert_eq!(facts.populated_fields(), vec!["allele_frequency"]);
}

#[tokio::test]
async fn test_transient_failures_stop_at_the_bound() {
    let (_dir, cache) = temp_cache();
    let a = Arc::new(
        MockProvider::new("a")
            .with_category(FactCategory::Population)
            .failing(FetchError::Transient("429".into())),
    );
    let b = Arc::new(MockProvider::new("b").with(CategoryFacts::Population(population(0.02, "b"))));
    let f = fetcher(cache, vec![a.clone(), b], priority(FactCategory::Population, &["a", "b"]));

    let (facts, report) = f.resolve_seeded(FactCategory::Population, &tp53_missense(), None).await;
    assert_eq!(a.calls(), 3);
    assert!(matches!(report.sources[0].status, SourceStatus::Failed { transient: true, .. }));
    let CategoryFacts::Population(p) = facts else { panic!("wrong category") };
    assert_eq!(p.allele_frequency.map(|s| s.source), Some("b".to_string()));
}

#[tokio::test]
async fn test_permanent_failure_is_not_retried() {
    let (_dir, cache) = temp_cache();
    let a = Arc::new(
        MockProvider::new("a")
            .with_category(FactCategory::Population)
            .failing(FetchError::Permanent("404".into())),
    );
    let f = fetcher(cache, vec![a.clone()], priority(FactCategory::Population, &["a"]));

    let (facts, report) = f.resolve_seeded(FactCategory::Population, &tp53_missense(), None).await;
    assert_eq!(a.calls(), 1);
    assert!(facts.populated_fields().is_empty());
    assert_eq!(report.missing.len(), PopulationFacts::field_names().len());
}

#[tokio::test]
async fn test_timeout_counts_as_transient() {
    let (_dir, cache) = temp_cache();
    let slow = Arc::new(
        MockProvider::new("slow")
            .with(CategoryFacts::Population(population(0.001, "slow")))
            .with_delay(Duration::from_millis(500)),
    );
    let retry = RetryPolicy { max_attempts: 2, call_timeout_ms: 50, backoff_ms: 1 };
    let f = SourcePriorityFetcher::new(Arc::new(cache))
        .with_priority(priority(FactCategory::Population, &["slow"]))
        .with_retry(retry)
        .with_provider(slow.clone());

    let (facts, report) = f.resolve_seeded(FactCategory::Population, &tp53_missense(), None).await;
    assert_eq!(slow.calls(), 2);
    assert!(facts.populated_fields().is_empty());
    assert!(matches!(report.sources[0].status, SourceStatus::Failed { transient: true, .. }));
}

#[tokio::test]
async fn test_invalid_response_is_neither_merged_nor_cached() {
    let (dir, cache) = temp_cache();
    let bad = PopulationFacts {
        allele_frequency: Some(Sourced::new(1.7, "a")),
        ..Default::default()
    };
    let a = Arc::new(MockProvider::new("a").with(CategoryFacts::Population(bad)));
    let f = fetcher(cache, vec![a.clone()], priority(FactCategory::Population, &["a"]));
    let v = tp53_missense();

    let (facts, report) = f.resolve_seeded(FactCategory::Population, &v, None).await;
    assert!(facts.populated_fields().is_empty());
    assert!(matches!(report.sources[0].status, SourceStatus::Rejected { .. }));

    // Nothing cached, so the provider is asked again.
    f.resolve(FactCategory::Population, &v).await;
    assert_eq!(a.calls(), 2);
    assert_eq!(ValidatedCache::new(dir.path()).stats().await.unwrap().total, 0);
}

#[tokio::test]
async fn test_seeded_facts_outrank_providers() {
    let (_dir, cache) = temp_cache();
    let a = Arc::new(MockProvider::new("a").with(CategoryFacts::Population(PopulationFacts {
        allele_frequency: Some(Sourced::new(0.3, "a")),
        allele_count: Some(Sourced::new(30, "a")),
        ..Default::default()
    })));
    let f = fetcher(cache, vec![a], priority(FactCategory::Population, &["a"]));

    let mut seed = FactSet::default();
    seed.population = population(0.0001, "user");
    let (facts, report) = f.resolve_all(&tp53_missense(), &seed).await;

    assert_eq!(facts.population.allele_frequency.as_ref().map(|s| s.value), Some(0.0001));
    assert_eq!(facts.population.allele_count.as_ref().map(|s| s.value), Some(30));
    let pop = report.for_category(FactCategory::Population).unwrap();
    assert_eq!(pop.sources[0].status, SourceStatus::Seeded);
}

#[tokio::test]
async fn test_categories_resolve_concurrently() {
    let (_dir, cache) = temp_cache();
    let delay = Duration::from_millis(150);
    let pop = Arc::new(
        MockProvider::new("pop")
            .with(CategoryFacts::Population(population(0.01, "pop")))
            .with_delay(delay),
    );
    let pred = Arc::new(
        MockProvider::new("pred")
            .with(CategoryFacts::Predictors(damaging_predictors("pred")))
            .with_delay(delay),
    );
    let mut p = priority(FactCategory::Population, &["pop"]);
    p.set(FactCategory::Predictors, vec!["pred".to_string()]);
    p.set(FactCategory::Domain, Vec::new());
    p.set(FactCategory::Phenotype, Vec::new());
    let f = fetcher(cache, vec![pop, pred], p);

    let started = Instant::now();
    let (facts, report) = f.resolve_all(&tp53_missense(), &FactSet::default()).await;
    assert!(started.elapsed() < delay * 2, "categories were resolved one after another");
    assert!(facts.predictors.is_complete());
    assert_eq!(report.provider_calls(), 2);
}

#[tokio::test]
async fn test_schema_version_change_misses_old_entries() {
    let (dir, cache) = temp_cache();
    let v = tp53_missense();
    let v1 = Arc::new(MockProvider::new("a").with(CategoryFacts::Population(population(0.01, "a"))));
    fetcher(cache, vec![v1.clone()], priority(FactCategory::Population, &["a"]))
        .resolve(FactCategory::Population, &v)
        .await;

    let v2 = Arc::new(
        MockProvider::new("a")
            .with(CategoryFacts::Population(population(0.01, "a")))
            .with_version("2"),
    );
    fetcher(ValidatedCache::new(dir.path()), vec![v2.clone()], priority(FactCategory::Population, &["a"]))
        .resolve(FactCategory::Population, &v)
        .await;
    assert_eq!(v1.calls(), 1);
    assert_eq!(v2.calls(), 1);
}

#[tokio::test]
async fn test_cache_only_serves_warm_entries_without_calls() {
    let (dir, cache) = temp_cache();
    let v = tp53_missense();
    let a = Arc::new(MockProvider::new("a").with(CategoryFacts::Predictors(damaging_predictors("a"))));
    let warm = fetcher(cache, vec![a.clone()], priority(FactCategory::Predictors, &["a"]))
        .resolve(FactCategory::Predictors, &v)
        .await;
    assert_eq!(a.calls(), 1);

    let offline = fetcher(ValidatedCache::new(dir.path()), vec![a.clone()], priority(FactCategory::Predictors, &["a"]))
        .cache_only();
    let (facts, report) = offline.resolve_seeded(FactCategory::Predictors, &v, None).await;
    assert_eq!(facts, warm);
    assert_eq!(a.calls(), 1);
    assert_eq!(report.cache_hits(), 1);
}

#[tokio::test]
async fn test_cache_only_miss_calls_nothing() {
    let (_dir, cache) = temp_cache();
    let a = Arc::new(MockProvider::new("a").with(CategoryFacts::Population(population(0.01, "a"))));
    let f = fetcher(cache, vec![a.clone()], priority(FactCategory::Population, &["a"])).cache_only();

    let (facts, report) = f.resolve_seeded(FactCategory::Population, &tp53_missense(), None).await;
    assert!(facts.populated_fields().is_empty());
    assert_eq!(a.calls(), 0);
    assert_eq!(report.sources[0].status, SourceStatus::Offline);
    assert_eq!(report.provider_calls(), 0);
}

#[tokio::test]
async fn test_permanent_failure_is_remembered() {
    let (dir, cache) = temp_cache();
    let a = Arc::new(
        MockProvider::new("a")
            .with_category(FactCategory::Population)
            .failing(FetchError::Permanent("404".into())),
    );
    let b = Arc::new(MockProvider::new("b").with(CategoryFacts::Population(population(0.02, "b"))));
    let f = fetcher(cache, vec![a.clone(), b], priority(FactCategory::Population, &["a", "b"]));
    let v = tp53_missense();

    let first = f.resolve(FactCategory::Population, &v).await;
    let (second, report) = f.resolve_seeded(FactCategory::Population, &v, None).await;
    assert_eq!(a.calls(), 1);
    assert_eq!(first, second);
    assert_eq!(report.sources[0].status, SourceStatus::CacheHit);
    assert!(report.sources[0].filled.is_empty());
    assert_eq!(ValidatedCache::new(dir.path()).stats().await.unwrap().total, 2);
}

#[tokio::test]
async fn test_transient_failure_is_asked_again_next_resolve() {
    let (_dir, cache) = temp_cache();
    let a = Arc::new(
        MockProvider::new("a")
            .with_category(FactCategory::Population)
            .failing(FetchError::Transient("503".into())),
    );
    let f = fetcher(cache, vec![a.clone()], priority(FactCategory::Population, &["a"]))
        .with_retry(RetryPolicy { max_attempts: 1, call_timeout_ms: 200, backoff_ms: 1 });
    let v = tp53_missense();

    f.resolve(FactCategory::Population, &v).await;
    f.resolve(FactCategory::Population, &v).await;
    assert_eq!(a.calls(), 2);
}
