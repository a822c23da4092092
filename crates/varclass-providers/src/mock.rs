//! Scriptable in-memory provider for tests and offline runs.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use varclass_common::{CategoryFacts, FactCategory, Variant};

use crate::client::{unsupported, ProviderClient};
use crate::error::FetchError;

/// Mock provider with canned bundles per category.
///
/// Queued failures are returned first, one per call, before the canned
/// bundle is served.
pub struct MockProvider {
    name: String,
    version: String,
    categories: Vec<FactCategory>,
    responses: HashMap<FactCategory, CategoryFacts>,
    failures: Mutex<VecDeque<FetchError>>,
    always_fail: Option<FetchError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockProvider {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            version: "1".to_string(),
            categories: Vec::new(),
            responses: HashMap::new(),
            failures: Mutex::new(VecDeque::new()),
            always_fail: None,
            delay: None,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Serve `facts` for its category.
    pub fn with(mut self, facts: CategoryFacts) -> Self {
        let category = facts.category();
        if !self.categories.contains(&category) {
            self.categories.push(category);
        }
        self.responses.insert(category, facts);
        self
    }

    /// Declare a category without data; calls return an empty bundle.
    pub fn with_category(mut self, category: FactCategory) -> Self {
        if !self.categories.contains(&category) {
            self.categories.push(category);
        }
        self
    }

    /// Queue one failure for the next call.
    pub fn with_failure(self, error: FetchError) -> Self {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(error);
        self
    }

    /// Fail every call.
    pub fn failing(mut self, error: FetchError) -> Self {
        self.always_fail = Some(error);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    /// Number of `fetch` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Most calls that were ever running at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderClient for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn schema_version(&self) -> &str {
        &self.version
    }

    fn categories(&self) -> &[FactCategory] {
        &self.categories
    }

    async fn fetch(&self, category: FactCategory, _variant: &Variant) -> Result<CategoryFacts, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if !self.supports(category) {
            return Err(unsupported(&self.name, category));
        }
        let queued = self.failures.lock().unwrap_or_else(|e| e.into_inner()).pop_front();
        if let Some(err) = queued.or_else(|| self.always_fail.clone()) {
            return Err(err);
        }
        Ok(self
            .responses
            .get(&category)
            .cloned()
            .unwrap_or_else(|| CategoryFacts::empty(category)))
    }
}
