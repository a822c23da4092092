//! Classification outcome types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::evidence::{ConfidenceLabel, EvidenceCode};
use crate::facts::FactCategory;
use crate::thresholds::GuidelineVersion;

/// The five final classification outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Pathogenic,
    LikelyPathogenic,
    Uncertain,
    LikelyBenign,
    Benign,
}

impl Tier {
    /// Fixed, non-overlapping point bands.
    pub fn from_points(total: i32) -> Self {
        match total {
            t if t >= 8 => Tier::Pathogenic,
            4..=7 => Tier::LikelyPathogenic,
            -3..=3 => Tier::Uncertain,
            -7..=-4 => Tier::LikelyBenign,
            _ => Tier::Benign,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Pathogenic => "Pathogenic",
            Tier::LikelyPathogenic => "Likely Pathogenic",
            Tier::Uncertain => "Uncertain Significance",
            Tier::LikelyBenign => "Likely Benign",
            Tier::Benign => "Benign",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How much of an evaluator's expected input was present, and from where.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputCoverage {
    pub category: FactCategory,
    pub present: usize,
    pub expected: usize,
    pub sources: Vec<String>,
}

impl InputCoverage {
    pub fn new(category: FactCategory, present: usize, expected: usize, sources: Vec<String>) -> Self {
        Self { category, present: present.min(expected), expected, sources }
    }

    pub fn none(category: FactCategory, expected: usize) -> Self {
        Self::new(category, 0, expected, Vec::new())
    }

    pub fn ratio(&self) -> f64 {
        crate::confidence::coverage_ratio(self.present, self.expected)
    }
}

/// Shape of a pathogenic/benign disagreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// Stand-alone benign evidence alongside pathogenic evidence.
    StandAloneBenign,
    /// Strong-or-above evidence on both sides.
    StrongOpposition,
    /// Strong pathogenic evidence against only weaker benign evidence.
    LeanPathogenic,
    /// Strong benign evidence against only weaker pathogenic evidence.
    LeanBenign,
    /// Only moderate/supporting evidence on both sides.
    Minor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictResolution {
    /// Scored as-is; no reviewer action required.
    Resolved,
    /// Weaker side set aside from the sum; flagged for review.
    LeanedWithReview,
    /// No precedence applies; flagged for manual review.
    ManualReview,
}

/// A detected conflict and how it was handled. Always part of the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceConflict {
    pub kind: ConflictKind,
    pub resolution: ConflictResolution,
    pub pathogenic_points: i32,
    pub benign_points: i32,
    pub message: String,
}

impl EvidenceConflict {
    pub fn needs_review(&self) -> bool {
        self.resolution != ConflictResolution::Resolved
    }
}

/// Final outcome of one classification run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub tier: Tier,
    pub total_points: i32,
    /// Codes that contributed to the total, in criterion order.
    pub evidence: Vec<EvidenceCode>,
    /// Codes excluded by conflict precedence; never part of the total.
    pub set_aside: Vec<EvidenceCode>,
    pub confidence: ConfidenceLabel,
    pub conflict: Option<EvidenceConflict>,
    /// Tier under the count-based combining rules, for cross-checking.
    pub combining_rules_tier: Tier,
    pub coverage: Vec<InputCoverage>,
    pub suggestions: Vec<String>,
    pub guideline_version: GuidelineVersion,
}

impl ClassificationResult {
    pub fn has_conflict(&self) -> bool {
        self.conflict.is_some()
    }

    pub fn needs_review(&self) -> bool {
        self.conflict.as_ref().map(|c| c.needs_review()).unwrap_or(false)
    }
}
