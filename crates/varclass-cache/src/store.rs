//! On-disk store behind [`ValidatedCache`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};
use varclass_common::{CategoryFacts, FactCategory};

use crate::clock::{Clock, SystemClock};
use crate::error::CacheError;
use crate::key::CacheKey;
use crate::locks::KeyLocks;
use crate::ttl::CacheTtls;
use crate::validator::{FactValidator, PayloadValidator};

/// What is written to disk for one key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub payload: Value,
    pub fetched_at: DateTime<Utc>,
    pub ttl_secs: u64,
}

impl CacheEntry {
    pub fn expires_at(&self) -> DateTime<Utc> {
        let ttl = chrono::Duration::seconds(self.ttl_secs.min(i64::MAX as u64) as i64);
        self.fetched_at.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Usable only strictly before `fetched_at + ttl`.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at()
    }
}

/// Entry counts per category.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub entries: BTreeMap<FactCategory, usize>,
    pub total: usize,
}

/// Why a stored entry was discarded.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Rejection {
    Corrupt,
    KeyMismatch,
    Expired,
    Invalid,
}

impl Rejection {
    fn as_str(&self) -> &'static str {
        match self {
            Rejection::Corrupt => "corrupt",
            Rejection::KeyMismatch => "key mismatch",
            Rejection::Expired => "expired",
            Rejection::Invalid => "failed validation",
        }
    }
}

/// Validated TTL cache. Owned by the caller and passed to the fetcher.
pub struct ValidatedCache {
    root: PathBuf,
    ttls: CacheTtls,
    validator: Arc<dyn PayloadValidator>,
    clock: Arc<dyn Clock>,
    locks: KeyLocks,
}

impl ValidatedCache {
    /// Cache rooted at `root` with the fact validator and default TTLs.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ttls: CacheTtls::default(),
            validator: Arc::new(FactValidator),
            clock: Arc::new(SystemClock),
            locks: KeyLocks::new(),
        }
    }

    pub fn default_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from(".cache"))
            .join("varclass")
    }

    pub fn with_ttls(mut self, ttls: CacheTtls) -> Self {
        self.ttls = ttls;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.relative_path())
    }

    /// Return the payload for `key` if a fresh, matching, valid entry exists.
    /// Every other outcome is a miss; a bad entry is deleted before returning.
    pub async fn get(&self, key: &CacheKey) -> Option<Value> {
        let digest = key.digest();
        let _guard = self.locks.lock(&digest).await;
        let path = self.path_for(key);

        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable cache entry");
                self.purge(&path, key, Rejection::Corrupt).await;
                return None;
            }
        };

        let rejection = match serde_json::from_slice::<CacheEntry>(&bytes) {
            Err(_) => Some(Rejection::Corrupt),
            Ok(entry) if entry.key != *key => Some(Rejection::KeyMismatch),
            Ok(entry) if !entry.is_fresh(self.clock.now()) => Some(Rejection::Expired),
            Ok(entry) => match self.validator.validate(key.category, &entry.payload) {
                Ok(()) => {
                    debug!(category = %key.category, source = %key.source, variant = %key.variant_key, "Cache hit");
                    return Some(entry.payload);
                }
                Err(_) => Some(Rejection::Invalid),
            },
        };

        if let Some(reason) = rejection {
            self.purge(&path, key, reason).await;
        }
        None
    }

    /// Validate and store `payload` under `key` for `ttl`.
    /// Invalid payloads are rejected before anything touches disk.
    pub async fn put(&self, key: &CacheKey, payload: &Value, ttl: Duration) -> Result<(), CacheError> {
        self.validator.validate(key.category, payload)?;

        let entry = CacheEntry {
            key: key.clone(),
            payload: payload.clone(),
            fetched_at: self.clock.now(),
            ttl_secs: ttl.as_secs(),
        };
        let bytes = serde_json::to_vec(&entry)?;

        let digest = key.digest();
        let _guard = self.locks.lock(&digest).await;
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write-then-rename so readers never see a partial file.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        debug!(category = %key.category, source = %key.source, variant = %key.variant_key, ttl_secs = ttl.as_secs(), "Cached payload");
        Ok(())
    }

    /// Store with the category's default TTL.
    pub async fn put_default(&self, key: &CacheKey, payload: &Value) -> Result<(), CacheError> {
        let ttl = self.ttls.for_category(key.category);
        self.put(key, payload, ttl).await
    }

    /// Remember a permanent provider failure as an empty bundle of the key's
    /// category, kept only for the short failure TTL.
    pub async fn put_negative(&self, key: &CacheKey) -> Result<(), CacheError> {
        let payload = serde_json::to_value(CategoryFacts::empty(key.category))?;
        self.put(key, &payload, self.ttls.failure()).await
    }

    /// Remove one entry. Returns whether a file existed.
    pub async fn invalidate(&self, key: &CacheKey) -> Result<bool, CacheError> {
        let digest = key.digest();
        let _guard = self.locks.lock(&digest).await;
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove every entry of a category. Returns how many were removed.
    ///
    /// Each file is removed under its key's lock, so a concurrent reader or
    /// writer of that key finishes first.
    pub async fn invalidate_category(&self, category: FactCategory) -> Result<usize, CacheError> {
        let mut removed = 0;
        for path in entry_files(&self.root.join(category.as_str())).await? {
            let Some(digest) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let _guard = self.locks.lock(digest).await;
            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        info!(category = %category, removed, "Invalidated cache category");
        Ok(removed)
    }

    pub async fn stats(&self) -> Result<CacheStats, CacheError> {
        let mut stats = CacheStats::default();
        for category in FactCategory::ALL {
            let n = entry_files(&self.root.join(category.as_str())).await?.len();
            stats.entries.insert(category, n);
            stats.total += n;
        }
        Ok(stats)
    }

    async fn purge(&self, path: &Path, key: &CacheKey, reason: Rejection) {
        match reason {
            Rejection::Expired => debug!(category = %key.category, source = %key.source, variant = %key.variant_key, "Purging expired cache entry"),
            _ => warn!(category = %key.category, source = %key.source, variant = %key.variant_key, reason = reason.as_str(), "Purging cache entry"),
        }
        if let Err(e) = tokio::fs::remove_file(path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "Failed to remove cache entry");
            }
        }
    }
}

/// `*.json` entry files one level below `dir` (one sub-directory per source).
async fn entry_files(dir: &Path) -> Result<Vec<PathBuf>, CacheError> {
    let mut sources = match tokio::fs::read_dir(dir).await {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut out = Vec::new();
    while let Some(source) = sources.next_entry().await? {
        if !source.file_type().await?.is_dir() {
            continue;
        }
        let mut files = tokio::fs::read_dir(source.path()).await?;
        while let Some(file) = files.next_entry().await? {
            let path = file.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                out.push(path);
            }
        }
    }
    Ok(out)
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use pretty_assertions::assert_eq;
    use varclass_common::{CategoryFacts, GenomeBuild, Predictor, PredictorFacts, Variant};

    fn key(source: &str) -> CacheKey {
        let v = Variant::new("17", 7675088, "C", "T", GenomeBuild::GRCh38).unwrap();
        CacheKey::new(FactCategory::Predictors, source, &v.id(), "1")
    }

    fn payload() -> Value {
        let facts = PredictorFacts::default()
            .with(Predictor::Revel, 0.93, "myvariant")
            .with(Predictor::CaddPhred, 28.4, "myvariant");
        serde_json::to_value(CategoryFacts::Predictors(facts)).unwrap()
    }

    #[tokio::test]
    async fn test_put_then_get_is_byte_equal() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ValidatedCache::new(dir.path());
        let k = key("myvariant");

        cache.put(&k, &payload(), Duration::from_secs(60)).await.unwrap();
        let got = cache.get(&k).await.expect("hit");
        assert_eq!(serde_json::to_vec(&got).unwrap(), serde_json::to_vec(&payload()).unwrap());
    }

    #[tokio::test]
    async fn test_expired_entry_is_miss_and_purged() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::default());
        let cache = ValidatedCache::new(dir.path()).with_clock(clock.clone());
        let k = key("myvariant");

        cache.put(&k, &payload(), Duration::from_secs(3600)).await.unwrap();
        clock.advance(chrono::Duration::seconds(3600));
        assert!(cache.get(&k).await.is_none());
        assert!(!dir.path().join(k.relative_path()).exists());
    }

    #[tokio::test]
    async fn test_invalid_payload_rejected_and_never_observable() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ValidatedCache::new(dir.path());
        let k = key("myvariant");
        let bad = serde_json::json!({
            "category": "predictors",
            "facts": { "scores": { "sift": { "value": -3.0, "source": "x" } } }
        });

        assert!(cache.put(&k, &bad, Duration::from_secs(60)).await.is_err());
        assert!(cache.get(&k).await.is_none());
        assert_eq!(cache.stats().await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_miss_and_removed() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ValidatedCache::new(dir.path());
        let k = key("myvariant");
        cache.put(&k, &payload(), Duration::from_secs(60)).await.unwrap();

        let path = dir.path().join(k.relative_path());
        tokio::fs::write(&path, b"{\"key\": {\"categ").await.unwrap();
        assert!(cache.get(&k).await.is_none());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_tampered_payload_fails_revalidation() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ValidatedCache::new(dir.path());
        let k = key("myvariant");
        cache.put(&k, &payload(), Duration::from_secs(60)).await.unwrap();

        let path = dir.path().join(k.relative_path());
        let mut entry: CacheEntry = serde_json::from_slice(&tokio::fs::read(&path).await.unwrap()).unwrap();
        entry.payload["facts"]["scores"]["revel"]["value"] = serde_json::json!(4.2);
        tokio::fs::write(&path, serde_json::to_vec(&entry).unwrap()).await.unwrap();

        assert!(cache.get(&k).await.is_none());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_version_mismatch_is_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ValidatedCache::new(dir.path());
        let k1 = key("myvariant");
        cache.put(&k1, &payload(), Duration::from_secs(60)).await.unwrap();

        let mut k2 = k1.clone();
        k2.version = "2".to_string();
        assert!(cache.get(&k2).await.is_none());
        assert!(cache.get(&k1).await.is_some());
    }

    #[tokio::test]
    async fn test_invalidate_and_stats() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ValidatedCache::new(dir.path());
        cache.put_default(&key("myvariant"), &payload()).await.unwrap();
        cache.put_default(&key("cadd"), &payload()).await.unwrap();

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.entries[&FactCategory::Predictors], 2);
        assert_eq!(stats.total, 2);

        assert!(cache.invalidate(&key("cadd")).await.unwrap());
        assert!(!cache.invalidate(&key("cadd")).await.unwrap());
        assert_eq!(cache.invalidate_category(FactCategory::Predictors).await.unwrap(), 1);
        assert_eq!(cache.stats().await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_invalidate_category_waits_for_key_lock() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(ValidatedCache::new(dir.path()));
        let k = key("myvariant");
        cache.put_default(&k, &payload()).await.unwrap();

        let held = cache.locks.lock(&k.digest()).await;
        let c2 = cache.clone();
        let invalidation = tokio::spawn(async move { c2.invalidate_category(FactCategory::Predictors).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!invalidation.is_finished());
        assert!(dir.path().join(k.relative_path()).exists());

        drop(held);
        assert_eq!(invalidation.await.unwrap().unwrap(), 1);
        assert!(!dir.path().join(k.relative_path()).exists());
    }

    #[tokio::test]
    async fn test_negative_entry_is_empty_and_short_lived() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::default());
        let cache = ValidatedCache::new(dir.path()).with_clock(clock.clone());
        let k = key("myvariant");

        cache.put_negative(&k).await.unwrap();
        let got = cache.get(&k).await.expect("negative entry is a hit");
        assert_eq!(got, serde_json::to_value(CategoryFacts::empty(FactCategory::Predictors)).unwrap());

        clock.advance(chrono::Duration::minutes(61));
        assert!(cache.get(&k).await.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_writers_leave_a_valid_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(ValidatedCache::new(dir.path()));
        let k = key("myvariant");

        let mut handles = Vec::new();
        for _ in 0..16 {
            let cache = cache.clone();
            let k = k.clone();
            handles.push(tokio::spawn(async move {
                cache.put(&k, &payload(), Duration::from_secs(60)).await.unwrap();
                cache.get(&k).await
            }));
        }
        for h in handles {
            assert_eq!(h.await.unwrap(), Some(payload()));
        }
    }
}
