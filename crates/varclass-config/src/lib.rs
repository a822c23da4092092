//! Configuration loading for varclass.
//! Reads varclass.toml from the current directory or the path in the VARCLASS_CONFIG env var.
//!
//! Every field has a default, so an empty file (or no file at all, through
//! [`Config::load_or_default`]) is a valid configuration. Only the problems
//! listed in [`ConfigError`] are fatal, and they are all caught at startup.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;
use varclass_cache::{CacheTtls, ValidatedCache};
use varclass_common::facts::normalise_phenotype_term;
use varclass_common::thresholds::FrequencyThresholds;
use varclass_common::{FactCategory, GuidelineVersion, Predictor, Thresholds};
use varclass_evaluators::{EvaluationProfile, PredictorWeights, WeightError};
use varclass_providers::{is_known_provider, ProviderSettings, RetryPolicy};

pub const CONFIG_ENV: &str = "VARCLASS_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "varclass.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}\nCopy varclass.example.toml to varclass.toml and edit it.")]
    NotFound(PathBuf),

    #[error("could not read {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error("malformed config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown guideline version {0:?} (expected \"2015\" or \"2023\")")]
    UnknownGuidelineVersion(String),

    #[error("unknown predictor {0:?} in [predictor_weights]")]
    UnknownPredictor(String),

    #[error("invalid predictor weights: {0}")]
    Weights(#[from] WeightError),

    #[error("frequency thresholds for {scope} must satisfy 0 < pm2 < bs1 < ba1 <= 1")]
    Thresholds { scope: String },

    #[error("{field} must be within [0, 1], got {value}")]
    OutOfRange { field: &'static str, value: f64 },

    #[error("{lower} ({low}) must be below {upper} ({high})")]
    Misordered { lower: &'static str, low: f64, upper: &'static str, high: f64 },

    #[error("{field} must be finite and not negative, got {value}")]
    Negative { field: &'static str, value: f64 },

    #[error("clinical.min_review_stars must be between 0 and 4, got {0}")]
    ReviewStars(u8),

    #[error("phenotype synonym {term:?} must map to an HPO id, got {target:?}")]
    Synonym { term: String, target: String },

    #[error("unknown provider {name:?} in {category} priority")]
    UnknownProvider { category: FactCategory, name: String },

    #[error("[fetch] {0} must be greater than zero")]
    ZeroFetchSetting(&'static str),

    #[error("[classification] batch_concurrency must be greater than zero")]
    ZeroBatchConcurrency,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub classification: ClassificationConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub fetch: RetryPolicy,
    #[serde(default)]
    pub providers: ProviderSettings,
    /// Predictor name → weight; unlisted predictors keep their default weight.
    #[serde(default)]
    pub predictor_weights: BTreeMap<String, f64>,
    #[serde(default)]
    pub thresholds: Thresholds,
    /// Per-gene frequency ladders, merged over `thresholds.population.genes`.
    #[serde(default)]
    pub gene_thresholds: BTreeMap<String, FrequencyThresholds>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationConfig {
    #[serde(default = "default_guideline_version")]
    pub guideline_version: String,
    /// Variants classified at once in a batch.
    #[serde(default = "default_batch_concurrency")]
    pub batch_concurrency: usize,
}

fn default_guideline_version() -> String { GuidelineVersion::default().as_str().to_string() }
fn default_batch_concurrency() -> usize { 4 }

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self { guideline_version: default_guideline_version(), batch_concurrency: default_batch_concurrency() }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache root; the platform cache directory when unset.
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default)]
    pub ttl: CacheTtls,
}


impl Config {
    /// Load configuration from varclass.toml.
    /// Checks VARCLASS_CONFIG env var first, then current directory.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Self::config_path())
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    pub fn load_or_default() -> Result<Self, ConfigError> {
        match Self::load() {
            Err(ConfigError::NotFound(path)) => {
                warn!(path = %path.display(), "Config file not found; using built-in defaults");
                Ok(Self::default())
            }
            other => other,
        }
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn config_path() -> PathBuf {
        std::env::var(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    /// Check everything that would otherwise fail later.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.profile()?;
        for category in FactCategory::ALL {
            if let Some(name) = self
                .providers
                .priority
                .for_category(category)
                .iter()
                .find(|n| !is_known_provider(n))
            {
                return Err(ConfigError::UnknownProvider { category, name: name.clone() });
            }
        }
        if self.fetch.max_attempts == 0 {
            return Err(ConfigError::ZeroFetchSetting("max_attempts"));
        }
        if self.fetch.call_timeout_ms == 0 {
            return Err(ConfigError::ZeroFetchSetting("call_timeout_ms"));
        }
        if self.classification.batch_concurrency == 0 {
            return Err(ConfigError::ZeroBatchConcurrency);
        }
        Ok(())
    }

    pub fn guideline_version(&self) -> Result<GuidelineVersion, ConfigError> {
        GuidelineVersion::from_str(&self.classification.guideline_version)
            .ok_or_else(|| ConfigError::UnknownGuidelineVersion(self.classification.guideline_version.clone()))
    }

    /// Default weights overridden by `[predictor_weights]`, renormalised to sum to one.
    pub fn predictor_weights(&self) -> Result<PredictorWeights, ConfigError> {
        let mut weights = PredictorWeights::default();
        for (name, &value) in &self.predictor_weights {
            let predictor = Predictor::from_str(name).ok_or_else(|| ConfigError::UnknownPredictor(name.clone()))?;
            match predictor {
                Predictor::Revel => weights.revel = value,
                Predictor::CaddPhred => weights.cadd_phred = value,
                Predictor::AlphaMissense => weights.alphamissense = value,
                Predictor::Sift => weights.sift = value,
                Predictor::Polyphen2 => weights.polyphen2 = value,
                Predictor::MetaSvm => weights.metasvm = value,
                Predictor::Vest4 => weights.vest4 = value,
                Predictor::Fathmm => weights.fathmm = value,
            }
        }
        weights.validate()?;
        if !weights.sums_to_one() {
            warn!(sum = weights.sum(), "Predictor weights do not sum to 1.0; renormalising");
            weights.normalise();
        }
        Ok(weights)
    }

    /// Threshold tables with `[gene_thresholds]` merged in.
    pub fn thresholds(&self) -> Result<Thresholds, ConfigError> {
        let mut thresholds = self.thresholds.clone();
        for (gene, ladder) in &self.gene_thresholds {
            thresholds.population.genes.insert(gene.trim().to_uppercase(), *ladder);
        }

        if !thresholds.population.default.is_ordered() {
            return Err(ConfigError::Thresholds { scope: "the default ladder".to_string() });
        }
        if let Some((gene, _)) = thresholds.population.genes.iter().find(|(_, t)| !t.is_ordered()) {
            return Err(ConfigError::Thresholds { scope: gene.clone() });
        }

        let unit = [
            ("composite.damaging", thresholds.composite.damaging),
            ("composite.benign", thresholds.composite.benign),
            ("domain.moderate_min_tier", thresholds.domain.moderate_min_tier),
            ("domain.supporting_min_tier", thresholds.domain.supporting_min_tier),
            ("phenotype.high_similarity", thresholds.phenotype.high_similarity),
            ("phenotype.low_similarity", thresholds.phenotype.low_similarity),
            ("phenotype.low_information_weight", thresholds.phenotype.low_information_weight),
            ("clinical.pvs1_min_pli", thresholds.clinical.pvs1_min_pli),
        ];
        if let Some((field, value)) = unit.into_iter().find(|(_, v)| !v.is_finite() || !(0.0..=1.0).contains(v)) {
            return Err(ConfigError::OutOfRange { field, value });
        }

        // (lower, upper) cutoffs on the same scale; a crossed pair makes one criterion unreachable.
        let ordered = [
            (
                ("composite.benign", thresholds.composite.benign),
                ("composite.damaging", thresholds.composite.damaging),
            ),
            (
                ("domain.supporting_min_tier", thresholds.domain.supporting_min_tier),
                ("domain.moderate_min_tier", thresholds.domain.moderate_min_tier),
            ),
            (
                ("phenotype.low_similarity", thresholds.phenotype.low_similarity),
                ("phenotype.high_similarity", thresholds.phenotype.high_similarity),
            ),
        ];
        if let Some(((lower, low), (upper, high))) = ordered.into_iter().find(|((_, lo), (_, hi))| lo >= hi) {
            return Err(ConfigError::Misordered { lower, low, upper, high });
        }

        let loeuf = thresholds.clinical.pvs1_max_loeuf;
        if !loeuf.is_finite() || loeuf < 0.0 {
            return Err(ConfigError::Negative { field: "clinical.pvs1_max_loeuf", value: loeuf });
        }
        if thresholds.clinical.min_review_stars > 4 {
            return Err(ConfigError::ReviewStars(thresholds.clinical.min_review_stars));
        }
        for (term, target) in &thresholds.phenotype.synonyms {
            let is_hpo = normalise_phenotype_term(target).is_some_and(|t| t.starts_with("HP:"));
            if !is_hpo {
                return Err(ConfigError::Synonym { term: term.clone(), target: target.clone() });
            }
        }
        Ok(thresholds)
    }

    /// Everything the evaluators need, validated.
    pub fn profile(&self) -> Result<EvaluationProfile, ConfigError> {
        Ok(EvaluationProfile {
            version: self.guideline_version()?,
            thresholds: self.thresholds()?,
            weights: self.predictor_weights()?,
        })
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.cache.dir.clone().unwrap_or_else(ValidatedCache::default_dir)
    }

    pub fn build_cache(&self) -> ValidatedCache {
        ValidatedCache::new(self.cache_dir()).with_ttls(self.cache.ttl)
    }
}
