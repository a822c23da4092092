use serde::{Deserialize, Serialize};
use varclass_common::{GuidelineVersion, Thresholds};

use crate::weights::PredictorWeights;

/// Everything the evaluators read besides the facts: guideline version,
/// threshold tables and predictor weights. Built once at startup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationProfile {
    pub version: GuidelineVersion,
    pub thresholds: Thresholds,
    pub weights: PredictorWeights,
}

impl EvaluationProfile {
    /// Default tables under the given guideline version.
    pub fn for_version(version: GuidelineVersion) -> Self {
        Self { version, ..Default::default() }
    }
}
