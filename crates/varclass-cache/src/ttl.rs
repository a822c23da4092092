use std::time::Duration;

use serde::{Deserialize, Serialize};
use varclass_common::FactCategory;

const DAY_SECS: u64 = 24 * 60 * 60;
const MINUTE_SECS: u64 = 60;

/// Default time-to-live per category, in days.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CacheTtls {
    /// Predictor scores rarely change
    #[serde(default = "default_predictor_days")]
    pub predictors_days: u64,
    /// Population data follows periodic bulk releases
    #[serde(default = "default_population_days")]
    pub population_days: u64,
    #[serde(default = "default_domain_days")]
    pub domain_days: u64,
    #[serde(default = "default_phenotype_days")]
    pub phenotype_days: u64,
    #[serde(default = "default_clinical_days")]
    pub clinical_days: u64,
    /// Lifetime of a remembered permanent provider failure
    #[serde(default = "default_failure_minutes")]
    pub failure_minutes: u64,
}

fn default_predictor_days() -> u64 { 7 }
fn default_population_days() -> u64 { 30 }
fn default_domain_days() -> u64 { 7 }
fn default_phenotype_days() -> u64 { 30 }
fn default_clinical_days() -> u64 { 30 }
fn default_failure_minutes() -> u64 { 60 }

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            predictors_days: default_predictor_days(),
            population_days: default_population_days(),
            domain_days: default_domain_days(),
            phenotype_days: default_phenotype_days(),
            clinical_days: default_clinical_days(),
            failure_minutes: default_failure_minutes(),
        }
    }
}

impl CacheTtls {
    pub fn for_category(&self, category: FactCategory) -> Duration {
        let days = match category {
            FactCategory::Predictors => self.predictors_days,
            FactCategory::Population => self.population_days,
            FactCategory::Domain => self.domain_days,
            FactCategory::Phenotype => self.phenotype_days,
            FactCategory::Clinical => self.clinical_days,
        };
        Duration::from_secs(days * DAY_SECS)
    }

    pub fn failure(&self) -> Duration {
        Duration::from_secs(self.failure_minutes * MINUTE_SECS)
    }
}
