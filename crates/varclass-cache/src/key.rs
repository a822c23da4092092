use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use varclass_common::{FactCategory, VariantId};

/// Logical cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub category: FactCategory,
    pub source: String,
    pub variant_key: String,
    pub version: String,
}

impl CacheKey {
    pub fn new(category: FactCategory, source: &str, variant: &VariantId, version: &str) -> Self {
        Self {
            category,
            source: source.to_string(),
            variant_key: variant.key(),
            version: version.to_string(),
        }
    }

    /// First 32 hex chars of SHA-256 over `category:source:variant:version`.
    pub fn digest(&self) -> String {
        let raw = format!(
            "{}:{}:{}:{}",
            self.category.as_str(),
            self.source,
            self.variant_key,
            self.version
        );
        let hash = Sha256::digest(raw.as_bytes());
        hex::encode(hash)[..32].to_string()
    }

    /// Path of the entry file relative to the cache root.
    pub fn relative_path(&self) -> PathBuf {
        PathBuf::from(self.category.as_str())
            .join(safe_segment(&self.source))
            .join(format!("{}.json", self.digest()))
    }
}

/// Keep a provider name usable as a single path segment.
fn safe_segment(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() { "_".to_string() } else { cleaned }
}

#[cfg(test)]
mod tests {
    use super::*;
    use varclass_common::{GenomeBuild, Variant};

    fn vid() -> VariantId {
        Variant::new("17", 7675088, "C", "T", GenomeBuild::GRCh38).unwrap().id()
    }

    #[test]
    fn test_digest_is_stable_and_short() {
        let k = CacheKey::new(FactCategory::Predictors, "myvariant", &vid(), "1");
        assert_eq!(k.digest().len(), 32);
        assert_eq!(k.digest(), k.clone().digest());
    }

    #[test]
    fn test_version_changes_digest() {
        let a = CacheKey::new(FactCategory::Predictors, "myvariant", &vid(), "1");
        let b = CacheKey::new(FactCategory::Predictors, "myvariant", &vid(), "2");
        assert_ne!(a.digest(), b.digest());
    }

    #[test]
    fn test_source_cannot_escape_directory() {
        let k = CacheKey::new(FactCategory::Domain, "../../etc", &vid(), "1");
        let path = k.relative_path();
        assert!(path.starts_with("domain"));
        assert!(!path.to_string_lossy().contains(".."));
    }
}
